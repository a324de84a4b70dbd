pub mod ask;
pub mod fingerprint;
pub mod models;
pub mod quota;
pub mod validate;

use std::time::Duration;

/// Renders a duration as `2h 05m` for terminal output.
pub(crate) fn format_wait(duration: Duration) -> String {
    let minutes = duration.as_secs().div_ceil(60);
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}
