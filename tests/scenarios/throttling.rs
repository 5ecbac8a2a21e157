//! Tests for per-model call spacing, measured on paused time

use crate::helpers::{orchestrator_with, stations, CallRecord, ScriptedGenerator, ARABIC_SCENE};
use seven_stations::core::PipelineContext;
use seven_stations::gateway::{GatewayConfig, ModelGateway, ModelId};
use seven_stations::StationExecutor;
use std::sync::Arc;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

fn calls_to(records: &[CallRecord], model: ModelId) -> Vec<CallRecord> {
    let mut calls: Vec<CallRecord> = records
        .iter()
        .filter(|r| r.request.model == model)
        .cloned()
        .collect();
    calls.sort_by_key(|r| r.started);
    calls
}

fn assert_spacing(records: &[CallRecord], model: ModelId, delay: Duration) {
    let calls = calls_to(records, model);
    for pair in calls.windows(2) {
        let finished = pair[0].finished.expect("call finished");
        let gap = pair[1].started - finished;
        assert!(
            gap >= delay,
            "calls {} and {} to {} only {:?} apart",
            pair[0].call,
            pair[1].call,
            model,
            gap
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_same_model_calls_are_spaced() {
    let generator = ScriptedGenerator::new()
        .with_delay(Duration::from_secs(2))
        .shared();
    let orchestrator = orchestrator_with(generator.clone(), GatewayConfig::new(), false);

    let run = orchestrator
        .execute(ARABIC_SCENE, None, CancellationToken::new())
        .await
        .unwrap();
    assert!(run.success);

    let records = generator.records();
    assert_eq!(records.len(), 7);
    assert_spacing(&records, ModelId::FlashLite, Duration::from_secs(6));
    assert_spacing(&records, ModelId::Flash, Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_sequential_run_waits_only_where_needed() {
    let generator = ScriptedGenerator::new().shared();
    let orchestrator = orchestrator_with(generator.clone(), GatewayConfig::new(), false);

    let start = Instant::now();
    orchestrator
        .execute(ARABIC_SCENE, None, CancellationToken::new())
        .await
        .unwrap();

    let mut records = generator.records();
    records.sort_by_key(|r| r.call);
    let offsets: Vec<Duration> = records.iter().map(|r| r.started - start).collect();

    // Station 2 is the first Flash call and goes straight out
    assert_eq!(offsets[0], Duration::ZERO);
    assert_eq!(offsets[1], Duration::ZERO);

    // Stations 3-5 queue behind the Flash Lite spacing
    assert!(offsets[2] >= Duration::from_secs(6));
    assert!(offsets[3] >= Duration::from_secs(12));
    assert!(offsets[4] >= Duration::from_secs(18));

    // Stations 6 and 7 find their models idle long enough
    assert_eq!(offsets[5], offsets[4]);
    assert_eq!(offsets[6], offsets[4]);
}

#[tokio::test(start_paused = true)]
async fn test_models_do_not_wait_on_each_other() {
    let generator = ScriptedGenerator::new().shared();
    let config = GatewayConfig::new()
        .without_throttle()
        .with_delay(ModelId::FlashLite, Duration::from_secs(30));
    let orchestrator = orchestrator_with(generator.clone(), config, false);

    orchestrator
        .execute(ARABIC_SCENE, None, CancellationToken::new())
        .await
        .unwrap();

    let mut records = generator.records();
    records.sort_by_key(|r| r.call);

    // Flash Lite (1) then Flash (2) back to back
    assert_eq!(Some(records[1].started), records[0].finished);
    assert_spacing(&records, ModelId::FlashLite, Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_spacing_holds_across_concurrent_runs() {
    let generator = ScriptedGenerator::new()
        .with_delay(Duration::from_millis(500))
        .shared();
    let orchestrator = Arc::new(orchestrator_with(
        generator.clone(),
        GatewayConfig::new(),
        false,
    ));

    let first = orchestrator.clone();
    let second = orchestrator.clone();
    let third = orchestrator.clone();
    let (a, b, c) = tokio::join!(
        async move {
            first
                .execute(ARABIC_SCENE, None, CancellationToken::new())
                .await
        },
        async move {
            second
                .execute("نص ثانٍ مختلف عن الأول تماماً", None, CancellationToken::new())
                .await
        },
        async move {
            third
                .execute("نص ثالث", Some("ملاحظة".to_string()), CancellationToken::new())
                .await
        },
    );

    for run in [a.unwrap(), b.unwrap(), c.unwrap()] {
        assert!(run.success);
        assert_eq!(run.outputs.len(), 7);
    }

    let records = generator.records();
    assert_eq!(records.len(), 21);
    assert_spacing(&records, ModelId::FlashLite, Duration::from_secs(6));
    assert_spacing(&records, ModelId::Flash, Duration::from_secs(10));
    assert_spacing(&records, ModelId::Pro, Duration::from_secs(15));
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_call_still_holds_off_the_next_one() {
    // Call 1 outlives its 5s budget, call 2 fits in it
    let generator = ScriptedGenerator::new()
        .with_call_delay(1, Duration::from_secs(10))
        .with_call_delay(2, Duration::from_secs(4))
        .shared();
    let gateway = ModelGateway::new(generator.clone(), &GatewayConfig::new());
    let executor = StationExecutor::new(Arc::new(gateway));

    let mut station = stations(false).to_definitions().remove(0);
    assert_eq!(station.model, ModelId::FlashLite);
    station.timeout_secs = 5;

    let first_context = PipelineContext::new(ARABIC_SCENE, None);
    let second_context = PipelineContext::new("نص ثانٍ", None);
    let start = Instant::now();

    let (first, second) = tokio::join!(
        executor.run_station(&station, &first_context),
        async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            executor.run_station(&station, &second_context).await
        },
    );

    assert!(!first.success);
    assert_eq!(first.error_message.as_deref(), Some("Timeout after 5 seconds"));

    // Queued behind the abandoned call, then given the full budget
    assert!(second.success);

    let records = generator.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].started - start, Duration::ZERO);
    assert_eq!(records[0].finished, None);
    assert_eq!(records[1].started - start, Duration::from_secs(5 + 6));
    assert_eq!(
        records[1].finished.map(|t| t - start),
        Some(Duration::from_secs(5 + 6 + 4))
    );
}
