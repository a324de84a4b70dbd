//! Best-effort device fingerprint.
//!
//! The fingerprint scopes quota counters per device. It is an anti-abuse
//! signal only: anyone who changes their signals gets a new fingerprint.

use std::env;
use std::fs;

/// Signals a device exposes without any user interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSignals {
    /// Rendering/platform signature (OS, architecture, host name).
    pub renderer: String,
    /// Display geometry, e.g. "120x40".
    pub screen: String,
    pub timezone: String,
    pub language: String,
    pub platform: String,
}

impl DeviceSignals {
    /// Collects signals from the host environment.
    ///
    /// Missing signals fall back to `"unknown"`; collection never fails.
    pub fn collect() -> Self {
        let host = env::var("HOSTNAME")
            .ok()
            .or_else(|| fs::read_to_string("/etc/hostname").ok())
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "unknown".to_string());

        let screen = match (env::var("COLUMNS"), env::var("LINES")) {
            (Ok(cols), Ok(lines)) => format!("{cols}x{lines}"),
            _ => "unknown".to_string(),
        };

        let timezone = env::var("TZ")
            .ok()
            .filter(|tz| !tz.is_empty())
            .unwrap_or_else(|| chrono::Local::now().offset().to_string());

        let language = env::var("LC_ALL")
            .ok()
            .filter(|l| !l.is_empty())
            .or_else(|| env::var("LANG").ok())
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            renderer: format!("{}-{}-{}", env::consts::OS, env::consts::ARCH, host),
            screen,
            timezone,
            language,
            platform: env::consts::FAMILY.to_string(),
        }
    }
}

/// Derives a short opaque identifier from `signals`.
///
/// Deterministic for identical signals; not collision-resistant.
pub fn fingerprint(signals: &DeviceSignals) -> String {
    let joined = [
        signals.renderer.as_str(),
        signals.screen.as_str(),
        signals.timezone.as_str(),
        signals.language.as_str(),
        signals.platform.as_str(),
    ]
    .join("|");

    let hash = joined
        .chars()
        .fold(0u32, |h, c| h.wrapping_mul(31).wrapping_add(c as u32));

    format!("fp_{}", to_base36(hash))
}

/// Fingerprint of the current host.
pub fn current_fingerprint() -> String {
    fingerprint(&DeviceSignals::collect())
}

fn to_base36(mut value: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
