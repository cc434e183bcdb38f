use anyhow::Result;
use ordinal::RouterConfig;
use ordinal_api::errors::RouteError;
use serde_json::json;

mod test_helpers;
use test_helpers::{memory_of, msg, setup_runtime};

#[tokio::test]
async fn test_memory_survives_eviction() -> Result<()> {
    let (runtime, _) = setup_runtime(RouterConfig::default());

    runtime.route("room", "r1", msg("a")).await?;
    runtime.route("room", "r1", msg("b")).await?;
    assert!(runtime.instances().evict("room:r1"));

    let third = runtime.route("room", "r1", msg("c")).await?;
    assert_eq!(third["seen"], json!(3));
    assert_eq!(memory_of(&runtime, "room:r1").await["seen"], json!(["a", "b", "c"]));
    Ok(())
}

#[tokio::test]
async fn test_memory_is_scoped_per_key() -> Result<()> {
    let (runtime, _) = setup_runtime(RouterConfig::default());

    runtime.route("room", "r1", msg("a")).await?;
    let other = runtime.route("room", "r2", msg("b")).await?;
    assert_eq!(other["seen"], json!(1));

    assert_eq!(memory_of(&runtime, "room:r1").await["seen"], json!(["a"]));
    assert_eq!(memory_of(&runtime, "room:r2").await["seen"], json!(["b"]));
    Ok(())
}

#[tokio::test]
async fn test_unknown_actor_type_is_business_error() -> Result<()> {
    let (runtime, _) = setup_runtime(RouterConfig::default());

    let result = runtime.route("ghost", "g1", json!({})).await?;
    assert_eq!(result["ok"], json!(false));
    assert_eq!(result["error"], json!("Unknown actor type: ghost"));

    // The key keeps serving.
    assert!(runtime.route("ghost", "g1", json!({})).await.is_ok());
    Ok(())
}

#[tokio::test]
async fn test_storage_outage_surfaces_as_dispatch_failure() -> Result<()> {
    let (runtime, _) = setup_runtime(RouterConfig::default());

    runtime.backend().set_unavailable(true);
    let outcome = runtime.route("room", "r1", msg("a")).await;
    assert!(matches!(outcome, Err(RouteError::DispatchFailure { .. })));

    runtime.backend().set_unavailable(false);
    let recovered = runtime.route("room", "r1", msg("b")).await?;
    assert_eq!(recovered["seen"], json!(1));
    Ok(())
}
