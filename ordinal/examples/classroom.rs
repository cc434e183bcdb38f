use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use ordinal::{logging, ActorRuntime, HandlerRegistry, RouterConfig};
use ordinal_api::envelope::Reply;
use ordinal_api::handler::{ActorHandler, HandlerContext};
use ordinal_api::policy::{NextPolicy, PolicyOverride};
use ordinal_api::protocol::ResetRequest;
use ordinal_api::types::{ActorResult, Payload};
use ordinal_api::ActorType;
use serde_json::{json, Value};

// A teacher posts questions; each question collects answers and reports the
// tally back to its teacher.

#[derive(ActorType)]
struct TeacherHandler;

#[async_trait]
impl ActorHandler for TeacherHandler {
    async fn handle(&self, payload: Payload, ctx: &mut HandlerContext<'_>) -> ActorResult<Reply> {
        match payload["type"].as_str() {
            Some("post") => {
                let posted = ctx.memory.get("posted").and_then(Value::as_u64).unwrap_or(0) + 1;
                ctx.memory.insert("posted".to_string(), json!(posted));
                let question_id = format!("q{}", posted);
                Ok(Reply::ok(json!({ "questionId": question_id })).spawn([question_id]))
            }
            Some("tally") => {
                let question = payload["questionId"].as_str().unwrap_or_default().to_string();
                ctx.memory.insert(question, payload["answers"].clone());
                Ok(Reply::ok(json!({ "recorded": true })))
            }
            // Hold the remaining queue until the next cycle.
            Some("break") => Ok(Reply::ok(json!({ "paused": true })).with_policy(NextPolicy::wait())),
            _ => Ok(Reply::failure("unknown teacher command")),
        }
    }
}

#[derive(ActorType)]
struct QuestionHandler;

#[async_trait]
impl ActorHandler for QuestionHandler {
    async fn handle(&self, payload: Payload, ctx: &mut HandlerContext<'_>) -> ActorResult<Reply> {
        let student = payload["student"].as_str().unwrap_or("anonymous");
        let answers = ctx.memory.entry("answers".to_string()).or_insert_with(|| json!({}));
        answers[student] = payload["answer"].clone();
        let answers = answers.clone();

        let teacher = payload["teacher"].as_str().unwrap_or("t1").to_string();
        let tally = json!({ "type": "tally", "questionId": ctx.actor_id, "answers": answers });
        ctx.send("teacher", &teacher, tally).await?;

        Ok(Reply::ok(json!({ "answers": answers })))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_development();

    let registry = HandlerRegistry::builder()
        .handler(TeacherHandler)
        .handler(QuestionHandler)
        .build()?;
    let config = RouterConfig::default()
        .with_spawn_type("teacher", "question")
        .with_type_policy(
            "question",
            PolicyOverride {
                queue_limit: Some(8),
                timeout_ms: Some(5_000),
                ..Default::default()
            },
        );
    let runtime = ActorRuntime::new(registry, config);

    let posted = runtime.route("teacher", "t1", json!({ "type": "post" })).await?;
    println!("posted: {}", posted);

    let pre_registered = runtime.status("question:").await?;
    println!("pre-registered: {}", serde_json::to_string_pretty(&pre_registered)?);

    let answers = ["ada", "grace", "linus"].map(|student| {
        runtime.route(
            "question",
            "q1",
            json!({ "student": student, "answer": student.len(), "teacher": "t1" }),
        )
    });
    for outcome in join_all(answers).await {
        match outcome {
            Ok(result) => println!("answered: {}", result),
            Err(err) => println!("answer failed ({}): {}", err.kind().as_str(), err),
        }
    }

    runtime.route("teacher", "t1", json!({ "type": "break" })).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let status = runtime.status("").await?;
    println!("actors: {}", serde_json::to_string_pretty(&status)?);

    let reset = runtime
        .admin_reset(ResetRequest {
            actor_type_prefix: "question:".to_string(),
        })
        .await?;
    println!("reset cleared: {:?}", reset.cleared);

    Ok(())
}
