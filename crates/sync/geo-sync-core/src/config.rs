use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Frame size limits shared by both ends of the connection.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncConfig {
    /// Largest encoded frame accepted or produced.
    pub max_message_bytes: usize,
    /// Largest encoded ticket value inside a data frame.
    pub max_payload_bytes: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: 1 << 20,
            max_payload_bytes: 32 * 1024,
        }
    }
}

impl SyncConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, SyncError> {
        let cfg: SyncConfig = serde_json::from_str(raw).map_err(|e| SyncError::Config {
            reason: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        if self.max_message_bytes == 0 || self.max_payload_bytes == 0 {
            return Err(SyncError::Config {
                reason: "size limits must be non-zero".into(),
            });
        }
        if self.max_payload_bytes > self.max_message_bytes {
            return Err(SyncError::Config {
                reason: format!(
                    "max_payload_bytes ({}) exceeds max_message_bytes ({})",
                    self.max_payload_bytes, self.max_message_bytes
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = SyncConfig::from_json_str(r#"{ "max_payload_bytes": 512 }"#).unwrap();
        assert_eq!(cfg.max_payload_bytes, 512);
        assert_eq!(cfg.max_message_bytes, SyncConfig::default().max_message_bytes);
    }

    #[test]
    fn payload_larger_than_frame_is_rejected() {
        let err = SyncConfig::from_json_str(r#"{ "max_message_bytes": 10, "max_payload_bytes": 20 }"#)
            .unwrap_err();
        assert!(matches!(err, SyncError::Config { .. }));
    }
}
