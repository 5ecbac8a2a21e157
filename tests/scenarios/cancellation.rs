//! Tests for cancelling a run between stations

use crate::helpers::{orchestrator, subsection_lines, ScriptedGenerator, ARABIC_SCENE};
use seven_stations::core::RunStatus;
use seven_stations::execution::PipelineEvent;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_cancel_stops_at_next_station_boundary() {
    let generator = ScriptedGenerator::new().shared();
    let orchestrator = orchestrator(generator.clone(), false);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    orchestrator
        .add_event_handler(move |event| {
            if let PipelineEvent::StationCompleted { station_id: 3, .. } = event {
                trigger.cancel();
            }
        })
        .await;

    let run = orchestrator
        .execute(ARABIC_SCENE, None, cancel)
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Cancelled);
    assert!(!run.success);
    assert_eq!(run.error.as_deref(), Some("تم إلغاء التحليل"));

    // Completed stations are kept, nothing after them is attempted
    assert_eq!(run.outputs.len(), 3);
    assert!(run.outputs.iter().all(|o| o.success));
    assert_eq!(generator.call_count(), 3);
    assert_eq!(subsection_lines(&run.full_report), 3);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_does_not_interrupt_a_running_station() {
    let generator = ScriptedGenerator::new()
        .with_delay(Duration::from_secs(5))
        .shared();
    let orchestrator = orchestrator(generator.clone(), false);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        // Lands while station 1 is still generating
        tokio::time::sleep(Duration::from_secs(2)).await;
        trigger.cancel();
    });

    let run = orchestrator
        .execute(ARABIC_SCENE, None, cancel)
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Cancelled);
    assert_eq!(run.outputs.len(), 1);
    assert!(run.outputs[0].success);
}

#[tokio::test]
async fn test_parent_token_cancels_child_runs() {
    let generator = ScriptedGenerator::new().shared();
    let orchestrator = orchestrator(generator.clone(), false);

    let shutdown = CancellationToken::new();
    let child = shutdown.child_token();
    shutdown.cancel();

    let run = orchestrator
        .execute(ARABIC_SCENE, None, child)
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Cancelled);
    assert!(run.outputs.is_empty());
    assert_eq!(generator.call_count(), 0);
}
