//! # Handler Envelopes
//!
//! A handler answers every message with a [`Reply`]: its result, an optional
//! continuation directive and optional spawn hints. Before the reply leaves
//! the activation it is normalized into an [`Envelope`], where missing fields
//! carry their defaults (`nextPolicy = {mode: immediate}`, `spawn = []`).
//!
//! ## Usage Example
//!
//! ```rust
//! use ordinal_api::envelope::Reply;
//! use ordinal_api::policy::{NextMode, NextPolicy};
//! use serde_json::json;
//!
//! let envelope = Reply::ok(json!({"accepted": true}))
//!     .with_policy(NextPolicy::wait())
//!     .spawn(["q1", "q2"])
//!     .normalize();
//!
//! assert_eq!(envelope.next_policy.mode, NextMode::Wait);
//! assert_eq!(envelope.spawn, vec!["q1", "q2"]);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::policy::NextPolicy;
use crate::types::Payload;

/// Raw handler output; every field but the result is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    #[serde(default)]
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_policy: Option<NextPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawn: Option<Vec<String>>,
}

impl Reply {
    pub fn ok(result: impl Into<Value>) -> Self {
        Self {
            result: result.into(),
            ..Default::default()
        }
    }

    /// A business-level failure: a successful reply whose result encodes the error.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::ok(json!({ "ok": false, "error": message.into() }))
    }

    pub fn with_policy(mut self, policy: NextPolicy) -> Self {
        self.next_policy = Some(policy);
        self
    }

    pub fn spawn<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spawn
            .get_or_insert_with(Vec::new)
            .extend(children.into_iter().map(Into::into));
        self
    }

    /// Fills missing continuation fields with their defaults.
    pub fn normalize(self) -> Envelope {
        Envelope {
            result: self.result,
            next_policy: self.next_policy.unwrap_or_default(),
            spawn: self.spawn.unwrap_or_default(),
        }
    }
}

/// Normalized handler output as returned by an activation's `invoke`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub next_policy: NextPolicy,
    #[serde(default)]
    pub spawn: Vec<String>,
}

impl From<Reply> for Envelope {
    fn from(reply: Reply) -> Self {
        reply.normalize()
    }
}

/// Request shape of an activation's `invoke` operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeRequest {
    pub payload: Payload,
    pub actor_type: String,
    pub actor_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::NextMode;

    #[test]
    fn test_normalize_fills_defaults() {
        let envelope = Reply::ok(json!(1)).normalize();
        assert_eq!(envelope.next_policy.mode, NextMode::Immediate);
        assert!(envelope.spawn.is_empty());
    }

    #[test]
    fn test_envelope_deserializes_with_defaults() {
        let envelope: Envelope = serde_json::from_value(json!({"result": "done"})).unwrap();
        assert_eq!(envelope.result, json!("done"));
        assert_eq!(envelope.next_policy, NextPolicy::immediate());
        assert!(envelope.spawn.is_empty());
    }

    #[test]
    fn test_failure_is_business_level() {
        let envelope = Reply::failure("seat taken").normalize();
        assert_eq!(envelope.result, json!({"ok": false, "error": "seat taken"}));
        assert_eq!(envelope.next_policy.mode, NextMode::Immediate);
    }

    #[test]
    fn test_wire_shape_is_camel_case() {
        let wire = serde_json::to_value(Reply::ok(json!(null)).with_policy(NextPolicy::reject()).normalize()).unwrap();
        assert_eq!(wire["nextPolicy"]["mode"], json!("reject"));
        assert_eq!(wire["spawn"], json!([]));
    }
}
