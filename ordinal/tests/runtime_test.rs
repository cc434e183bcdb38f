use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use ordinal::{ActorRuntime, HandlerRegistry, RouterConfig};
use ordinal_api::envelope::Reply;
use ordinal_api::errors::RouteError;
use ordinal_api::handler::{ActorHandler, HandlerContext, MessageSender};
use ordinal_api::types::{ActorResult, Payload};
use serde_json::json;

mod test_helpers;
use test_helpers::{memory_of, setup_runtime};

#[tokio::test]
async fn test_handlers_message_each_other_through_routers() -> Result<()> {
    let (runtime, journal) = setup_runtime(RouterConfig::default());

    let result = runtime
        .route("lobby", "main", json!({ "target": "r7", "forward": { "tag": "hello" } }))
        .await?;
    assert_eq!(result["via"], json!("lobby"));
    assert_eq!(result["room"], json!({ "tag": "hello", "seen": 1 }));
    assert_eq!(journal.starts(), vec!["r7:hello"]);

    assert_eq!(runtime.router_types(), vec!["lobby", "room"]);
    assert_eq!(
        memory_of(&runtime, "lobby:main").await["last"],
        json!({ "tag": "hello", "seen": 1 })
    );
    Ok(())
}

#[tokio::test]
async fn test_failed_send_fails_the_sender() -> Result<()> {
    let (runtime, _) = setup_runtime(RouterConfig::default());

    // The forwarded message fails inside `room`, so `lobby` fails too.
    let outcome = runtime
        .route(
            "lobby",
            "main",
            json!({ "target": "r1", "forward": { "tag": "x", "fail": true } }),
        )
        .await;
    match outcome {
        Err(RouteError::DispatchFailure { key, reason }) => {
            assert_eq!(key, "lobby:main");
            assert!(reason.contains("room:r1"), "reason: {}", reason);
        }
        other => panic!("expected DispatchFailure, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_runtime_is_a_message_sender() -> Result<()> {
    let (runtime, _) = setup_runtime(RouterConfig::default());

    let sender: Arc<dyn MessageSender> = runtime.clone();
    let result = sender.send("room", "r1", json!({ "tag": "direct" })).await?;
    assert_eq!(result["tag"], json!("direct"));
    Ok(())
}

struct Lonely;

#[async_trait]
impl ActorHandler for Lonely {
    async fn handle(&self, _payload: Payload, ctx: &mut HandlerContext<'_>) -> ActorResult<Reply> {
        Ok(Reply::ok(json!({ "canSend": ctx.can_send(), "now": ctx.now > 0 })))
    }
}

#[tokio::test]
async fn test_context_carries_sender_and_clock() -> Result<()> {
    let registry = HandlerRegistry::builder().register("lonely", Lonely).build()?;
    let runtime = ActorRuntime::new(registry, RouterConfig::default());

    let result = runtime.route("lonely", "l1", json!(null)).await?;
    assert_eq!(result, json!({ "canSend": true, "now": true }));

    Ok(())
}
