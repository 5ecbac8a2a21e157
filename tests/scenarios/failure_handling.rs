//! Tests for station failures, fallbacks and timeouts

use crate::helpers::{orchestrator, subsection_lines, ScriptedGenerator, ARABIC_SCENE};
use seven_stations::core::{RunStatus, SuccessPolicy, STATION_FAILED_TEXT};
use seven_stations::execution::PipelineEvent;
use seven_stations::gateway::ModelId;
use std::sync::{Arc, Mutex};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_failed_station_gets_placeholder_and_run_continues() {
    let generator = ScriptedGenerator::new().failing_on(&[3]).shared();
    let orchestrator = orchestrator(generator.clone(), false);

    let run = orchestrator
        .execute(ARABIC_SCENE, None, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(run.outputs.len(), 7);
    assert_eq!(generator.call_count(), 7);

    let failed = &run.outputs[2];
    assert_eq!(failed.station_id, 3);
    assert!(!failed.success);
    assert_eq!(failed.text_output, STATION_FAILED_TEXT);
    assert_eq!(failed.confidence, 0.0);
    assert!(failed.error_message.as_deref().unwrap().contains("503"));

    assert!(run.outputs[3..].iter().all(|o| o.success));

    assert!(!run.success);
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.error.as_deref().unwrap().contains("شبكة الصراع"));
    assert!(run.full_report.contains(STATION_FAILED_TEXT));
}

#[tokio::test]
async fn test_failed_output_is_not_passed_forward() {
    let generator = ScriptedGenerator::new().failing_on(&[1]).shared();
    let orchestrator = orchestrator(generator.clone(), false);

    orchestrator
        .execute(ARABIC_SCENE, None, CancellationToken::new())
        .await
        .unwrap();

    let prompts = generator.prompts();
    for prompt in &prompts[1..] {
        assert!(!prompt.contains(STATION_FAILED_TEXT));
    }
    assert!(prompts[2].contains("الاستدعاء: 2"));
}

#[tokio::test]
async fn test_lenient_policy_accepts_partial_runs() {
    let generator = ScriptedGenerator::new().failing_on(&[2, 5]).shared();
    let orchestrator = orchestrator(generator, false).with_policy(SuccessPolicy::Lenient);

    let run = orchestrator
        .execute(ARABIC_SCENE, None, CancellationToken::new())
        .await
        .unwrap();

    assert!(run.success);
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.failed_stations().count(), 2);
}

#[tokio::test]
async fn test_every_station_failing_still_yields_a_report() {
    let generator = ScriptedGenerator::new()
        .failing_model(ModelId::FlashLite)
        .failing_model(ModelId::Flash)
        .failing_model(ModelId::Pro)
        .shared();
    let orchestrator = orchestrator(generator, true);

    let run = orchestrator
        .execute(ARABIC_SCENE, None, CancellationToken::new())
        .await
        .unwrap();

    assert!(!run.success);
    assert_eq!(run.outputs.len(), 7);
    assert!(run.outputs.iter().all(|o| !o.success));
    assert_eq!(run.confidence, 0.0);
    assert_eq!(subsection_lines(&run.full_report), 7);
}

#[tokio::test]
async fn test_fallback_model_rescues_station() {
    let generator = ScriptedGenerator::new()
        .failing_model(ModelId::Flash)
        .shared();
    let orchestrator = orchestrator(generator.clone(), true);

    let fallbacks = Arc::new(Mutex::new(Vec::new()));
    let sink = fallbacks.clone();
    orchestrator
        .add_event_handler(move |event| {
            if let PipelineEvent::StationFallback { station_id, .. } = event {
                sink.lock().unwrap().push(station_id);
            }
        })
        .await;

    let run = orchestrator
        .execute(ARABIC_SCENE, None, CancellationToken::new())
        .await
        .unwrap();

    assert!(run.success);
    assert_eq!(*fallbacks.lock().unwrap(), vec![2, 6]);

    let station_two = &run.outputs[1];
    assert!(station_two.used_fallback);
    assert_eq!(station_two.model.as_deref(), Some("gemini-2.5-flash-lite"));
    assert!(!run.outputs[0].used_fallback);

    // Two stations needed a second call
    assert_eq!(generator.call_count(), 9);
}

#[tokio::test]
async fn test_fallback_is_tried_only_once() {
    let generator = ScriptedGenerator::new()
        .failing_model(ModelId::Flash)
        .failing_model(ModelId::FlashLite)
        .shared();
    let orchestrator = orchestrator(generator.clone(), true);

    let run = orchestrator
        .execute(ARABIC_SCENE, None, CancellationToken::new())
        .await
        .unwrap();

    // Stations 1-6 each make a primary call and one fallback call
    assert_eq!(generator.call_count(), 6 * 2 + 1);
    assert!(run.outputs[..6].iter().all(|o| !o.success));
    assert!(run.outputs[6].success);
}

#[tokio::test(start_paused = true)]
async fn test_station_timeout_becomes_failure() {
    let generator = ScriptedGenerator::new()
        .with_delay(Duration::from_secs(1_000))
        .shared();
    let orchestrator = orchestrator(generator, false);

    let run = orchestrator
        .execute(ARABIC_SCENE, None, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(run.outputs.len(), 7);
    assert!(run.outputs.iter().all(|o| !o.success));
    assert_eq!(
        run.outputs[0].error_message.as_deref(),
        Some("Timeout after 300 seconds")
    );
    assert_eq!(
        run.outputs[6].error_message.as_deref(),
        Some("Timeout after 600 seconds")
    );
}
