//! Conversation turn types.
//!
//! The conversation is owned by the chat surface; the pipeline reads only
//! its tail when building request context.

use crate::catalog::ProductId;
use serde::{Deserialize, Serialize};

/// Represents who authored a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// Question from the shopper.
    User,
    /// Reply from the sommelier.
    Assistant,
}

/// One immutable entry of the append-only conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub text: String,
    #[serde(default)]
    pub recommended_ids: Vec<ProductId>,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
            recommended_ids: Vec::new(),
        }
    }

    pub fn assistant(text: impl Into<String>, recommended_ids: Vec<ProductId>) -> Self {
        Self {
            role: TurnRole::Assistant,
            text: text.into(),
            recommended_ids,
        }
    }
}

/// Returns at most the last `k` turns, oldest first.
pub fn recent_turns(history: &[ConversationTurn], k: usize) -> &[ConversationTurn] {
    &history[history.len().saturating_sub(k)..]
}
