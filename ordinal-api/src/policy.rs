//! Admission and continuation policies.
//!
//! [`Policy`] bounds what a Router admits for one actor key. [`NextPolicy`] is
//! the directive a handler returns to tell the Router what to do with the rest
//! of that key's queue.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_QUEUE_LIMIT: usize = 64;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 64 * 1024;

/// Per-key admission policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Maximum number of queued messages, including the one in flight.
    pub queue_limit: usize,
    /// How long a caller waits for its message to be resolved.
    pub timeout_ms: u64,
    /// Maximum size of the JSON-serialized payload.
    pub max_payload_bytes: usize,
}

impl Policy {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Applies the fields set in `overrides` on top of this policy.
    pub fn merged_with(&self, overrides: &PolicyOverride) -> Policy {
        Policy {
            queue_limit: overrides.queue_limit.unwrap_or(self.queue_limit),
            timeout_ms: overrides.timeout_ms.unwrap_or(self.timeout_ms),
            max_payload_bytes: overrides.max_payload_bytes.unwrap_or(self.max_payload_bytes),
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            queue_limit: DEFAULT_QUEUE_LIMIT,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

/// Partial policy for one actor type; unset fields fall back to the default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyOverride {
    pub queue_limit: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub max_payload_bytes: Option<usize>,
}

/// Continuation directive returned by a handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextMode {
    /// Process the next queued message for this key in the same cycle.
    #[default]
    Immediate,
    /// Stop processing this key for the current cycle; later cycles resume it.
    Wait,
    /// Reject every message still queued for this key.
    Reject,
}

impl NextMode {
    /// Parses a mode tag, treating anything unrecognized as `Immediate`.
    pub fn parse_lenient(tag: &str) -> NextMode {
        match tag {
            "wait" => NextMode::Wait,
            "reject" => NextMode::Reject,
            _ => NextMode::Immediate,
        }
    }
}

/// Continuation policy attached to an envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextPolicy {
    #[serde(default, deserialize_with = "lenient_mode")]
    pub mode: NextMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

impl NextPolicy {
    pub fn immediate() -> Self {
        Self::default()
    }

    pub fn wait() -> Self {
        Self {
            mode: NextMode::Wait,
            redirect_to: None,
        }
    }

    pub fn reject() -> Self {
        Self {
            mode: NextMode::Reject,
            redirect_to: None,
        }
    }
}

fn lenient_mode<'de, D>(deserializer: D) -> Result<NextMode, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let tag = Option::<String>::deserialize(deserializer)?;
    Ok(tag.as_deref().map(NextMode::parse_lenient).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_policy_wire_shape() {
        let policy = Policy {
            queue_limit: 2,
            timeout_ms: 500,
            max_payload_bytes: 128,
        };
        assert_eq!(
            serde_json::to_value(&policy).unwrap(),
            json!({"queueLimit": 2, "timeoutMs": 500, "maxPayloadBytes": 128})
        );
        assert_eq!(policy.timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_override_merge() {
        let merged = Policy::default().merged_with(&PolicyOverride {
            queue_limit: Some(2),
            ..Default::default()
        });
        assert_eq!(merged.queue_limit, 2);
        assert_eq!(merged.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(merged.max_payload_bytes, DEFAULT_MAX_PAYLOAD_BYTES);
    }

    #[test]
    fn test_unknown_mode_falls_back_to_immediate() {
        let policy: NextPolicy = serde_json::from_value(json!({"mode": "later"})).unwrap();
        assert_eq!(policy.mode, NextMode::Immediate);

        let policy: NextPolicy = serde_json::from_value(json!({})).unwrap();
        assert_eq!(policy.mode, NextMode::Immediate);

        let policy: NextPolicy = serde_json::from_value(json!({"mode": "wait"})).unwrap();
        assert_eq!(policy.mode, NextMode::Wait);
    }
}
