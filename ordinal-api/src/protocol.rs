//! Wire shapes exchanged with the front door and between Router and activations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::{Envelope, InvokeRequest};
use crate::errors::{ErrorKind, RouteError};
use crate::policy::Policy;
use crate::types::{Memory, Payload, RouteResult};

/// Router request `{actorType, actorId, payload}`.
///
/// Fields are optional on the wire so that a missing type or id is reported
/// as a validation error instead of a decoding failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    #[serde(default)]
    pub actor_type: Option<String>,
    #[serde(default)]
    pub actor_id: Option<String>,
    #[serde(default)]
    pub payload: Payload,
}

impl RouteRequest {
    pub fn new(actor_type: impl Into<String>, actor_id: impl Into<String>, payload: Payload) -> Self {
        Self {
            actor_type: Some(actor_type.into()),
            actor_id: Some(actor_id.into()),
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

/// Router response: `{ok: true, result}` or `{ok: false, error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl RouteResponse {
    /// HTTP-equivalent status for the front door.
    pub fn status_code(&self) -> u16 {
        self.error.as_ref().map(|e| e.kind.status_code()).unwrap_or(200)
    }
}

impl From<RouteResult<Value>> for RouteResponse {
    fn from(outcome: RouteResult<Value>) -> Self {
        match outcome {
            Ok(result) => RouteResponse {
                ok: true,
                result: Some(result),
                error: None,
            },
            Err(error) => error.into(),
        }
    }
}

impl From<RouteError> for RouteResponse {
    fn from(error: RouteError) -> Self {
        RouteResponse {
            ok: false,
            result: None,
            error: Some(ErrorBody {
                kind: error.kind(),
                message: error.to_string(),
            }),
        }
    }
}

/// Durable summary of one actor key, written by the Router after each drained batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataSnapshot {
    pub actor_type: String,
    pub actor_id: String,
    pub busy: bool,
    pub queue_length: usize,
    pub updated_at: u64,
}

/// One row of a status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    pub actor_key: String,
    pub actor_type: String,
    pub actor_id: String,
    pub busy: bool,
    pub queue_length: usize,
    pub policy: Option<Policy>,
    pub meta_updated_at: Option<u64>,
    pub from_storage: bool,
    pub from_memory: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub actors: Vec<StatusEntry>,
}

impl StatusSnapshot {
    pub fn get(&self, actor_key: &str) -> Option<&StatusEntry> {
        self.actors.iter().find(|entry| entry.actor_key == actor_key)
    }

    pub fn storage_backed(&self) -> impl Iterator<Item = &StatusEntry> {
        self.actors.iter().filter(|entry| entry.from_storage)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    pub actor_type_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetResponse {
    pub ok: bool,
    pub cleared: Vec<String>,
}

/// Operations an activation instance answers over the addressed-call channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ActivationRequest {
    Invoke(InvokeRequest),
    Status,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ActivationResponse {
    Invoked(Envelope),
    Memory(Memory),
    Reset,
}
