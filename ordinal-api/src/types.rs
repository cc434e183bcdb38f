use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::errors::{ActorError, RouteError};

/// Unique identifier of one routed message.
pub type MessageId = uuid::Uuid;

/// Opaque, JSON-serializable payload carried by a message.
pub type Payload = serde_json::Value;

/// Actor memory: a JSON object exclusively owned by one activation.
pub type Memory = serde_json::Map<String, serde_json::Value>;

pub type ActorResult<T> = Result<T, ActorError>;
pub type RouteResult<T> = Result<T, RouteError>;

/// Separator between the type and id halves of an [`ActorKey`].
pub const KEY_SEPARATOR: char = ':';

/// Stable identity of a logical actor, rendered as `type:id`.
///
/// Used for addressing activations, keying Router queues and namespacing
/// durable storage. The type half never contains the separator; the id half may.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorKey {
    actor_type: String,
    actor_id: String,
}

impl ActorKey {
    /// Builds a key, rejecting empty halves and a separator inside the type.
    pub fn new(actor_type: impl Into<String>, actor_id: impl Into<String>) -> RouteResult<Self> {
        let actor_type = actor_type.into();
        let actor_id = actor_id.into();

        if actor_type.trim().is_empty() {
            return Err(RouteError::Validation("actorType is required".to_string()));
        }
        if actor_id.trim().is_empty() {
            return Err(RouteError::Validation("actorId is required".to_string()));
        }
        if actor_type.contains(KEY_SEPARATOR) {
            return Err(RouteError::Validation(format!(
                "actorType must not contain '{}': {}",
                KEY_SEPARATOR, actor_type
            )));
        }

        Ok(Self { actor_type, actor_id })
    }

    pub fn actor_type(&self) -> &str {
        &self.actor_type
    }

    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    /// Whether the rendered key starts with `prefix`.
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        self.to_string().starts_with(prefix)
    }
}

impl fmt::Display for ActorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.actor_type, KEY_SEPARATOR, self.actor_id)
    }
}

impl FromStr for ActorKey {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(KEY_SEPARATOR) {
            Some((actor_type, actor_id)) => ActorKey::new(actor_type, actor_id),
            None => Err(RouteError::Validation(format!("malformed actor key: {}", s))),
        }
    }
}

/// Milliseconds since the Unix epoch, the timestamp unit used on the wire.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display_and_parse() {
        let key = ActorKey::new("room", "r1").unwrap();
        assert_eq!(key.to_string(), "room:r1");

        let parsed: ActorKey = "room:r1".parse().unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn test_id_may_contain_separator() {
        let parsed: ActorKey = "session:user:42".parse().unwrap();
        assert_eq!(parsed.actor_type(), "session");
        assert_eq!(parsed.actor_id(), "user:42");
    }

    #[test]
    fn test_invalid_keys_are_validation_errors() {
        assert!(matches!(ActorKey::new("", "x"), Err(RouteError::Validation(_))));
        assert!(matches!(ActorKey::new("room", "  "), Err(RouteError::Validation(_))));
        assert!(matches!(ActorKey::new("a:b", "x"), Err(RouteError::Validation(_))));
        assert!("no-separator".parse::<ActorKey>().is_err());
    }

    #[test]
    fn test_prefix_matching() {
        let key = ActorKey::new("question", "q1").unwrap();
        assert!(key.matches_prefix("question:"));
        assert!(key.matches_prefix("quest"));
        assert!(key.matches_prefix(""));
        assert!(!key.matches_prefix("teacher:"));
    }
}
