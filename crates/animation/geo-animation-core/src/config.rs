//! Core configuration for geo-animation-core.

use serde::{Deserialize, Serialize};

use crate::error::AnimationError;
use crate::interp::Easing;

/// Defaults applied to caches and newly created controllers.
/// Hosts usually load this once at start-up from their own config file.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Inactivity window after which a singleton cache drops a manager.
    pub eviction_window_secs: f64,

    /// Transition length used by controllers that do not override it.
    pub default_transition_secs: f32,
    pub default_easing: Easing,

    /// Whether re-triggering the animation that is already fully active restarts it.
    pub restart_on_retrigger: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            eviction_window_secs: 30.0,
            default_transition_secs: 0.0,
            default_easing: Easing::Linear,
            restart_on_retrigger: false,
        }
    }
}

impl Config {
    /// Parse a config from JSON; missing fields keep their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, AnimationError> {
        let cfg: Config = serde_json::from_str(raw).map_err(|e| AnimationError::Config {
            reason: e.to_string(),
        })?;
        if !cfg.eviction_window_secs.is_finite() || cfg.eviction_window_secs < 0.0 {
            return Err(AnimationError::Config {
                reason: format!(
                    "eviction_window_secs must be a non-negative number, got {}",
                    cfg.eviction_window_secs
                ),
            });
        }
        if !cfg.default_transition_secs.is_finite() || cfg.default_transition_secs < 0.0 {
            return Err(AnimationError::Config {
                reason: format!(
                    "default_transition_secs must be a non-negative number, got {}",
                    cfg.default_transition_secs
                ),
            });
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = Config::from_json_str(r#"{ "eviction_window_secs": 5.0 }"#).unwrap();
        assert_eq!(cfg.eviction_window_secs, 5.0);
        assert_eq!(cfg.default_transition_secs, 0.0);
        assert!(!cfg.restart_on_retrigger);
    }

    #[test]
    fn negative_window_is_rejected() {
        let err = Config::from_json_str(r#"{ "eviction_window_secs": -1.0 }"#).unwrap_err();
        assert!(matches!(err, AnimationError::Config { .. }));
    }

    #[test]
    fn easing_parses_snake_case() {
        let cfg = Config::from_json_str(r#"{ "default_easing": "ease_in_out" }"#).unwrap();
        assert_eq!(cfg.default_easing, Easing::EaseInOut);
    }
}
