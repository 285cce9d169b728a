//! Estimated-time parsing
//!
//! Step estimates are free text ("8-15 seconds", "2-4 minutes", "200ms").
//! Parsing is lenient and total: anything unexpected maps to a default
//! wait instead of an error.

use crate::config::EngineSettings;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

/// Rules for turning an estimate into a simulated wait
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationPolicy {
    /// Wait for estimates that don't mention seconds
    pub default_wait: Duration,
    /// Seconds used when a seconds estimate has no usable leading number
    pub fallback_seconds: u64,
}

impl Default for DurationPolicy {
    fn default() -> Self {
        Self {
            default_wait: Duration::from_millis(2000),
            fallback_seconds: 5,
        }
    }
}

impl From<&EngineSettings> for DurationPolicy {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            default_wait: Duration::from_millis(settings.default_step_ms),
            fallback_seconds: settings.fallback_seconds,
        }
    }
}

impl DurationPolicy {
    /// Simulated wait for an estimate string
    ///
    /// - contains "second": the leading integer in seconds ("8-15 seconds"
    ///   waits 8s). No leading integer, or a leading zero, falls back to
    ///   `fallback_seconds`. A negative number waits zero.
    /// - anything else (minutes, milliseconds, garbage): `default_wait`.
    pub fn wait_for(&self, estimate: &str) -> Duration {
        if !estimate.contains("second") {
            return self.default_wait;
        }

        match leading_integer(estimate) {
            Some(n) if n < 0 => Duration::ZERO,
            Some(n) if n > 0 => Duration::from_secs(n as u64),
            _ => Duration::from_secs(self.fallback_seconds),
        }
    }
}

/// Leading signed integer after optional whitespace
fn leading_integer(s: &str) -> Option<i64> {
    static LEADING_INT: OnceLock<Regex> = OnceLock::new();
    let re = LEADING_INT.get_or_init(|| {
        Regex::new(r"^\s*([+-]?\d+)").expect("leading integer pattern is valid")
    });

    let digits = re.captures(s)?.get(1)?.as_str();
    match digits.parse::<i64>() {
        Ok(n) => Some(n),
        // Too many digits to fit; treat as the largest wait we can express
        Err(_) if digits.starts_with('-') => Some(i64::MIN),
        Err(_) => Some(i64::MAX),
    }
}

/// Scale a wait by a speed factor. Non-positive or non-finite speeds are ignored.
pub fn scale(wait: Duration, speed: f64) -> Duration {
    if speed.is_finite() && speed > 0.0 {
        Duration::try_from_secs_f64(wait.as_secs_f64() / speed).unwrap_or(Duration::MAX)
    } else {
        wait
    }
}
