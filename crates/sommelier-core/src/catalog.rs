//! Catalog types consumed by the sommelier pipeline.
//!
//! The full [`Product`] comes from the storefront's catalog store; the
//! pipeline only ever reads it to build a [`CatalogDigest`] per request.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a catalog entry.
///
/// The catalog store hands out integer keys, but identifiers echoed back by
/// the model may arrive as strings. Numeric strings normalise to
/// [`ProductId::Int`] so `"7"` and `7` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductId {
    Int(i64),
    Str(String),
}

impl ProductId {
    /// Builds an identifier from free text, preferring the integer form.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(match trimmed.parse::<i64>() {
            Ok(n) => Self::Int(n),
            Err(_) => Self::Str(trimmed.to_string()),
        })
    }

    /// Builds an identifier only when the text is numeric.
    pub fn parse_numeric(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return Some(Self::Int(n));
        }
        // Upstream occasionally renders ids as floats ("15.0").
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            // i64::MAX rounds up to 2^63 as f64, which is already out of range.
            .filter(|f| *f >= i64::MIN as f64 && *f < i64::MAX as f64)
            .map(|f| Self::Int(f as i64))
    }
}

impl From<i64> for ProductId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

/// One purchasable size or edition of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceVariant {
    /// Human label, e.g. "50ml".
    pub label: String,
    pub price_cents: u64,
}

/// A catalog entry as stored by the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    pub olfactory_family: String,
    #[serde(default)]
    pub variants: Vec<PriceVariant>,
    #[serde(default)]
    pub description: String,
}

/// Size-bounded projection of a [`Product`] embedded in the upstream request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDigest {
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    pub olfactory_family: String,
    pub price_summary: String,
    pub short_description: String,
}

impl CatalogDigest {
    /// Projects a product, truncating its description to `description_budget` chars.
    pub fn from_product(product: &Product, description_budget: usize) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            brand: product.brand.clone(),
            olfactory_family: product.olfactory_family.clone(),
            price_summary: price_summary(&product.variants),
            short_description: truncate_chars(product.description.trim(), description_budget),
        }
    }
}

/// Builds the digest for a whole catalog, preserving catalog order.
pub fn build_digest(catalog: &[Product], description_budget: usize) -> Vec<CatalogDigest> {
    catalog
        .iter()
        .map(|product| CatalogDigest::from_product(product, description_budget))
        .collect()
}

/// Renders variants as `"50ml €89.00 / 100ml €129.00"`.
pub fn price_summary(variants: &[PriceVariant]) -> String {
    if variants.is_empty() {
        return "price on request".to_string();
    }
    variants
        .iter()
        .map(|v| {
            format!(
                "{} €{}.{:02}",
                v.label,
                v.price_cents / 100,
                v.price_cents % 100
            )
        })
        .collect::<Vec<_>>()
        .join(" / ")
}

/// Truncates on a char boundary, marking the cut with an ellipsis.
pub fn truncate_chars(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(budget).collect();
    cut.truncate(cut.trim_end().len());
    cut.push('…');
    cut
}
