//! Evaluation configuration loaded from environment variables.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Evaluation settings shared by checks, filters and aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Compare names and values without folding case.
    pub case_sensitive: bool,
    /// Evaluate elements on the rayon thread pool.
    pub parallel: bool,
    /// Abort budget for one evaluation call; the partial result is kept.
    pub timeout_secs: Option<u64>,
    /// Report unrecognised operators as failures instead of using equals.
    pub strict_operators: bool,
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            case_sensitive: env_flag("IFC_VERIFIER_CASE_SENSITIVE").unwrap_or(false),
            parallel: env_flag("IFC_VERIFIER_PARALLEL").unwrap_or(false),
            timeout_secs: std::env::var("IFC_VERIFIER_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.trim().parse().ok()),
            strict_operators: env_flag("IFC_VERIFIER_STRICT_OPERATORS").unwrap_or(false),
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    parse_flag(&value)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_parse_leniently() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn defaults_keep_equals_fallback() {
        let config = Config::default();
        assert!(!config.strict_operators);
        assert!(!config.case_sensitive);
        assert_eq!(config.timeout(), None);
    }
}
