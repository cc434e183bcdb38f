// Integration tests for ordinal::config

use ordinal::config::*;
use ordinal_api::policy::{Policy, PolicyOverride};
use std::time::Duration;

#[test]
fn test_router_config_defaults() {
    let config = RouterConfig::default();

    assert_eq!(config.default_policy, Policy::default());
    assert_eq!(config.default_policy.queue_limit, 64);
    assert_eq!(config.default_policy.timeout(), Duration::from_secs(30));
    assert_eq!(config.default_policy.max_payload_bytes, 64 * 1024);
    assert_eq!(config.call_timeout, Some(DEFAULT_CALL_TIMEOUT));
    assert_eq!(config.reset_policy, ResetPolicy::RejectQueued);
    assert!(config.type_policies.is_empty());
    assert!(config.spawn_types.is_empty());
}

#[test]
fn test_type_policy_merges_onto_default() {
    let config = RouterConfig::default()
        .with_default_policy(Policy {
            queue_limit: 10,
            timeout_ms: 1_000,
            max_payload_bytes: 512,
        })
        .with_type_policy(
            "room",
            PolicyOverride {
                queue_limit: Some(2),
                ..Default::default()
            },
        );

    let room = config.policy_for("room");
    assert_eq!(room.queue_limit, 2);
    assert_eq!(room.timeout_ms, 1_000);
    assert_eq!(room.max_payload_bytes, 512);

    // Types without an override get the default untouched.
    assert_eq!(config.policy_for("lobby"), config.default_policy);
}

#[test]
fn test_spawn_type_mapping() {
    let config = RouterConfig::default().with_spawn_type("teacher", "question");

    assert_eq!(config.spawn_type_for("teacher"), "question");
    assert_eq!(config.spawn_type_for("room"), "room");
}

#[test]
fn test_builder_overrides() {
    let config = RouterConfig::default()
        .with_call_timeout(None)
        .with_reset_policy(ResetPolicy::PreserveQueued);

    assert!(config.call_timeout.is_none());
    assert_eq!(config.reset_policy, ResetPolicy::PreserveQueued);
}

#[test]
fn test_config_debug_format() {
    let config = RouterConfig::default();
    assert!(format!("{:?}", config).contains("default_policy"));
}
