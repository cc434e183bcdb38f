use std::collections::HashMap;
use std::time::Duration;

use ordinal_api::policy::{Policy, PolicyOverride};

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Prefix of the Router's durable metadata records.
pub const METADATA_KEY_PREFIX: &str = "meta:";

/// Name prefix of Router instances in the host namespace.
pub const ROUTER_INSTANCE_PREFIX: &str = "router:";

// --- Configuration Enums ---

/// What `admin_reset` does with live queues of the keys it resets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ResetPolicy {
    /// Live queues survive the reset and keep draining against the wiped actor.
    PreserveQueued,
    /// Messages still waiting behind the in-flight one are rejected.
    /// The in-flight message, if any, is left to complete.
    #[default]
    RejectQueued,
}

// --- Router Configuration ---

/// Configuration for a `Router`.
#[derive(Clone, Debug)]
pub struct RouterConfig {
    /// Policy applied to keys whose type has no override.
    pub default_policy: Policy,

    /// Per actor type overrides, merged onto `default_policy`.
    pub type_policies: HashMap<String, PolicyOverride>,

    /// Upper bound on one addressed call to an activation.
    /// An expired call is reported as a dispatch failure and releases the key.
    pub call_timeout: Option<Duration>,

    /// Treatment of live queues during `admin_reset`.
    pub reset_policy: ResetPolicy,

    /// Child actor type used for bare spawn ids, keyed by the parent's type.
    /// Types without an entry spawn children of their own type.
    pub spawn_types: HashMap<String, String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_policy: Policy::default(),
            type_policies: HashMap::new(),
            call_timeout: Some(DEFAULT_CALL_TIMEOUT),
            reset_policy: ResetPolicy::default(),
            spawn_types: HashMap::new(),
        }
    }
}

impl RouterConfig {
    /// Effective policy for keys of `actor_type`.
    pub fn policy_for(&self, actor_type: &str) -> Policy {
        match self.type_policies.get(actor_type) {
            Some(overrides) => self.default_policy.merged_with(overrides),
            None => self.default_policy.clone(),
        }
    }

    /// Child actor type for a bare spawn id emitted by `parent_type`.
    pub fn spawn_type_for<'a>(&'a self, parent_type: &'a str) -> &'a str {
        self.spawn_types
            .get(parent_type)
            .map(String::as_str)
            .unwrap_or(parent_type)
    }

    pub fn with_default_policy(mut self, policy: Policy) -> Self {
        self.default_policy = policy;
        self
    }

    pub fn with_type_policy(mut self, actor_type: impl Into<String>, overrides: PolicyOverride) -> Self {
        self.type_policies.insert(actor_type.into(), overrides);
        self
    }

    pub fn with_spawn_type(mut self, parent_type: impl Into<String>, child_type: impl Into<String>) -> Self {
        self.spawn_types.insert(parent_type.into(), child_type.into());
        self
    }

    pub fn with_reset_policy(mut self, reset_policy: ResetPolicy) -> Self {
        self.reset_policy = reset_policy;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Option<Duration>) -> Self {
        self.call_timeout = call_timeout;
        self
    }
}
