#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ordinal::{ActorRuntime, HandlerRegistry, RouterConfig};
use ordinal_api::envelope::Reply;
use ordinal_api::errors::ActorError;
use ordinal_api::handler::{ActorHandler, HandlerContext};
use ordinal_api::policy::NextPolicy;
use ordinal_api::protocol::{ActivationRequest, ActivationResponse};
use ordinal_api::types::{ActorResult, Memory, Payload};
use ordinal_api::ActorType;
use serde_json::{json, Value};

/// Default wait time for drains to settle during tests in milliseconds
pub const DEFAULT_WAIT_TIME: u64 = 30;

/// Waits for a specified duration, useful for letting a drain finish
pub async fn wait_for(duration_millis: u64) {
    tokio::time::sleep(Duration::from_millis(duration_millis)).await;
}

/// Ordered record of handler activity shared by every test handler.
#[derive(Clone, Default)]
pub struct Journal {
    events: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Events starting with `start:`, stripped of the marker.
    pub fn starts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| e.strip_prefix("start:").map(str::to_string))
            .collect()
    }
}

/// Scriptable handler driven entirely by its payload:
///
/// `{"tag": "a", "sleepMs": 10, "mode": "wait", "fail": true, "spawn": ["q1"]}`
///
/// Records `start:<id>:<tag>` and `end:<id>:<tag>`, appends the tag to
/// `memory.seen` and answers `{"tag", "seen"}`.
#[derive(ActorType)]
#[actor(name = "room")]
pub struct ScriptedHandler {
    pub journal: Journal,
}

#[async_trait]
impl ActorHandler for ScriptedHandler {
    async fn handle(&self, payload: Payload, ctx: &mut HandlerContext<'_>) -> ActorResult<Reply> {
        let tag = payload["tag"].as_str().unwrap_or("?").to_string();
        let label = format!("{}:{}", ctx.actor_id, tag);
        self.journal.record(format!("start:{}", label));

        if let Some(ms) = payload["sleepMs"].as_u64() {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        if payload["fail"].as_bool().unwrap_or(false) {
            self.journal.record(format!("end:{}", label));
            return Err(ActorError::HandlerFailed(format!("{} failed on purpose", tag)));
        }

        let seen = ctx
            .memory
            .entry("seen".to_string())
            .or_insert_with(|| json!([]));
        if let Some(list) = seen.as_array_mut() {
            list.push(json!(tag));
        }
        let count = seen.as_array().map(Vec::len).unwrap_or(0);

        let policy = match payload["mode"].as_str() {
            Some("wait") => NextPolicy::wait(),
            Some("reject") => NextPolicy::reject(),
            _ => NextPolicy::immediate(),
        };
        let spawn: Vec<String> = payload["spawn"]
            .as_array()
            .map(|ids| ids.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();

        self.journal.record(format!("end:{}", label));
        Ok(Reply::ok(json!({ "tag": tag, "seen": count }))
            .with_policy(policy)
            .spawn(spawn))
    }
}

/// Hands out question ids on `ask`, letting the Router pre-register them.
#[derive(ActorType)]
#[actor(name = "teacher")]
pub struct TeacherHandler;

#[async_trait]
impl ActorHandler for TeacherHandler {
    async fn handle(&self, payload: Payload, ctx: &mut HandlerContext<'_>) -> ActorResult<Reply> {
        let question = payload["question"].as_str().unwrap_or("q1").to_string();
        let asked = ctx.memory.entry("asked".to_string()).or_insert_with(|| json!([]));
        if let Some(list) = asked.as_array_mut() {
            list.push(json!(question));
        }
        Ok(Reply::ok(json!({ "asked": question })).spawn([question]))
    }
}

/// Answers questions; must never be invoked by spawning alone.
#[derive(ActorType)]
#[actor(name = "question")]
pub struct QuestionHandler {
    pub journal: Journal,
}

#[async_trait]
impl ActorHandler for QuestionHandler {
    async fn handle(&self, payload: Payload, ctx: &mut HandlerContext<'_>) -> ActorResult<Reply> {
        self.journal.record(format!("start:question:{}", ctx.actor_id));
        ctx.memory.insert("answer".to_string(), payload["answer"].clone());
        Ok(Reply::ok(json!({ "answered": true })))
    }
}

/// Forwards its payload to `room:<target>` through the handler's sender.
#[derive(ActorType)]
#[actor(name = "lobby")]
pub struct LobbyHandler;

#[async_trait]
impl ActorHandler for LobbyHandler {
    async fn handle(&self, payload: Payload, ctx: &mut HandlerContext<'_>) -> ActorResult<Reply> {
        let target = payload["target"].as_str().unwrap_or("r1").to_string();
        let forwarded = ctx.send("room", &target, payload["forward"].clone()).await?;
        ctx.memory.insert("last".to_string(), forwarded.clone());
        Ok(Reply::ok(json!({ "via": "lobby", "room": forwarded })))
    }
}

pub fn registry(journal: &Journal) -> HandlerRegistry {
    HandlerRegistry::builder()
        .handler(ScriptedHandler {
            journal: journal.clone(),
        })
        .handler(TeacherHandler)
        .handler(QuestionHandler {
            journal: journal.clone(),
        })
        .handler(LobbyHandler)
        .build()
        .unwrap()
}

/// Runtime with every test handler registered.
pub fn setup_runtime(config: RouterConfig) -> (Arc<ActorRuntime>, Journal) {
    ordinal::logging::init_test();
    let journal = Journal::default();
    let runtime = ActorRuntime::new(registry(&journal), config);
    (runtime, journal)
}

pub fn msg(tag: &str) -> Value {
    json!({ "tag": tag })
}

/// Current memory of the activation behind `name`.
pub async fn memory_of(runtime: &ActorRuntime, name: &str) -> Memory {
    use ordinal_api::host::InstanceNamespace;

    match runtime.instances().resolve(name).call(ActivationRequest::Status).await {
        Ok(ActivationResponse::Memory(memory)) => memory,
        other => panic!("unexpected status response: {:?}", other),
    }
}
