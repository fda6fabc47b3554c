use std::sync::{Arc, Mutex};

use crate::lifecycle::engine::LifecycleEngine;
use crate::lifecycle::error::LifecycleError;
use crate::lifecycle::handle::ModuleLifecycle;
use crate::lifecycle::Stage;

// Shared recorder for callback ordering assertions.
type Recorder = Arc<Mutex<Vec<String>>>;

fn recorder() -> Recorder {
    Arc::new(Mutex::new(Vec::new()))
}

fn record(rec: &Recorder, label: &str) {
    rec.lock().unwrap().push(label.to_string());
}

fn attach_recording(
    engine: &LifecycleEngine,
    module: &str,
    stage: Stage,
    priority: Option<i64>,
    rec: &Recorder,
    label: &str,
) {
    let rec = rec.clone();
    let label = label.to_string();
    engine.attach(
        module,
        stage,
        priority,
        Box::new(move || {
            Box::pin(async move {
                record(&rec, &label);
                Ok(())
            })
        }),
    );
}

#[tokio::test]
async fn prioritised_callbacks_run_ascending_with_ties_in_attach_order() {
    let engine = LifecycleEngine::new();
    engine.register_module("m");
    let rec = recorder();

    attach_recording(&engine, "m", Stage::Ready, Some(10), &rec, "ten-a");
    attach_recording(&engine, "m", Stage::Ready, Some(-5), &rec, "minus-five");
    attach_recording(&engine, "m", Stage::Ready, Some(10), &rec, "ten-b");
    attach_recording(&engine, "m", Stage::Ready, Some(0), &rec, "zero");

    engine.run_stage(Stage::Ready).await.unwrap();
    assert_eq!(
        *rec.lock().unwrap(),
        vec!["minus-five", "zero", "ten-a", "ten-b"]
    );
}

#[tokio::test]
async fn unordered_callbacks_run_after_prioritised_and_all_complete() {
    let engine = LifecycleEngine::new();
    engine.register_module("m");
    let rec = recorder();

    attach_recording(&engine, "m", Stage::Ready, None, &rec, "unordered-1");
    attach_recording(&engine, "m", Stage::Ready, Some(100), &rec, "prioritised");
    attach_recording(&engine, "m", Stage::Ready, None, &rec, "unordered-2");

    engine.run_stage(Stage::Ready).await.unwrap();
    let seen = rec.lock().unwrap().clone();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0], "prioritised");
    assert!(seen.contains(&"unordered-1".to_string()));
    assert!(seen.contains(&"unordered-2".to_string()));
}

#[tokio::test]
async fn first_registered_module_completes_before_later_ones_start() {
    let engine = LifecycleEngine::new();
    engine.register_module("boilerplate");
    engine.register_module("app");
    let rec = recorder();

    // Attach in the opposite order to prove module order wins.
    attach_recording(&engine, "app", Stage::Bootstrap, None, &rec, "app");
    attach_recording(&engine, "boilerplate", Stage::Bootstrap, Some(5), &rec, "boilerplate");

    engine.run_stage(Stage::Bootstrap).await.unwrap();
    assert_eq!(*rec.lock().unwrap(), vec!["boilerplate", "app"]);
}

#[tokio::test]
async fn late_attach_to_an_early_stage_defers_without_error() {
    let engine = LifecycleEngine::new();
    engine.register_module("m");
    engine.run_stage(Stage::Ready).await.unwrap();

    let rec = recorder();
    attach_recording(&engine, "m", Stage::Ready, None, &rec, "late");
    assert!(rec.lock().unwrap().is_empty());

    engine.drain_deferred().await;
    assert_eq!(*rec.lock().unwrap(), vec!["late"]);
}

#[tokio::test]
async fn late_attach_to_a_shutdown_stage_is_dropped() {
    let engine = LifecycleEngine::new();
    engine.register_module("m");
    engine.run_stage(Stage::ShutdownStart).await.unwrap();

    let rec = recorder();
    attach_recording(&engine, "m", Stage::ShutdownStart, None, &rec, "dropped");
    engine.drain_deferred().await;
    // Never deferred, never run.
    assert!(rec.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failure_before_ready_aborts_the_stage() {
    let engine = LifecycleEngine::new();
    engine.register_module("m");
    engine.attach(
        "m",
        Stage::Bootstrap,
        None,
        Box::new(|| Box::pin(async { Err("factory exploded".into()) })),
    );

    match engine.run_stage(Stage::Bootstrap).await {
        Err(LifecycleError::UserCallbackFailure { stage, module, message }) => {
            assert_eq!(stage, Stage::Bootstrap);
            assert_eq!(module, "m");
            assert!(message.contains("factory exploded"));
        }
        other => panic!("expected UserCallbackFailure, got {:?}", other),
    }
}

#[tokio::test]
async fn failure_at_ready_is_logged_but_swallowed() {
    let engine = LifecycleEngine::new();
    engine.register_module("m");
    engine.attach(
        "m",
        Stage::Ready,
        None,
        Box::new(|| Box::pin(async { Err("non-fatal".into()) })),
    );
    assert!(engine.run_stage(Stage::Ready).await.is_ok());
    assert!(engine.has_completed(Stage::Ready));
}

#[tokio::test]
async fn callbacks_attached_while_a_stage_runs_still_run_in_it() {
    let engine = LifecycleEngine::new();
    engine.register_module("m");
    let rec = recorder();

    let inner_engine = engine.clone();
    let inner_rec = rec.clone();
    engine.attach(
        "m",
        Stage::Ready,
        None,
        Box::new(move || {
            Box::pin(async move {
                record(&inner_rec, "outer");
                let nested_rec = inner_rec.clone();
                inner_engine.attach(
                    "m",
                    Stage::Ready,
                    None,
                    Box::new(move || {
                        Box::pin(async move {
                            record(&nested_rec, "nested");
                            Ok(())
                        })
                    }),
                );
                Ok(())
            })
        }),
    );

    engine.run_stage(Stage::Ready).await.unwrap();
    assert_eq!(*rec.lock().unwrap(), vec!["outer", "nested"]);
}

#[tokio::test]
async fn run_stage_reports_a_duration() {
    let engine = LifecycleEngine::new();
    engine.register_module("m");
    let duration = engine.run_stage(Stage::PreInit).await.unwrap();
    assert!(duration <= std::time::Duration::from_secs(5));
}

#[tokio::test]
async fn reset_forgets_completed_stages() {
    let engine = LifecycleEngine::new();
    engine.register_module("m");
    engine.run_stage(Stage::Ready).await.unwrap();
    assert!(engine.has_completed(Stage::Ready));

    engine.reset();
    assert!(!engine.has_completed(Stage::Ready));
    assert!(engine.completed_stages().is_empty());
}

#[tokio::test]
async fn detached_handle_buffers_until_bound() {
    let lifecycle = ModuleLifecycle::new("m");
    let rec = recorder();
    let buffered_rec = rec.clone();
    lifecycle.on_ready(Some(1), move || async move {
        record(&buffered_rec, "buffered");
        Ok(())
    });

    let engine = LifecycleEngine::new();
    engine.run_stage(Stage::PreInit).await.unwrap();
    assert!(rec.lock().unwrap().is_empty());

    lifecycle.bind(&engine);
    engine.run_stage(Stage::Ready).await.unwrap();
    assert_eq!(*rec.lock().unwrap(), vec!["buffered"]);
}

#[tokio::test]
async fn unbound_handle_buffers_again_after_unbind() {
    let lifecycle = ModuleLifecycle::new("m");
    let engine = LifecycleEngine::new();
    lifecycle.bind(&engine);
    lifecycle.unbind();

    let rec = recorder();
    let late_rec = rec.clone();
    lifecycle.on_ready(None, move || async move {
        record(&late_rec, "next-boot");
        Ok(())
    });

    // Nothing reaches the old engine.
    engine.run_stage(Stage::Ready).await.unwrap();
    assert!(rec.lock().unwrap().is_empty());

    let next_engine = LifecycleEngine::new();
    lifecycle.bind(&next_engine);
    next_engine.run_stage(Stage::Ready).await.unwrap();
    assert_eq!(*rec.lock().unwrap(), vec!["next-boot"]);
}
