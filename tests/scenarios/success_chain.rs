//! Tests for a run where every station succeeds

use crate::helpers::{orchestrator, ScriptedGenerator, ARABIC_SCENE};
use seven_stations::core::RunStatus;
use seven_stations::gateway::ModelId;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_seven_stations_run_in_order() {
    let generator = ScriptedGenerator::new().shared();
    let orchestrator = orchestrator(generator.clone(), true);

    let run = orchestrator
        .execute(ARABIC_SCENE, None, CancellationToken::new())
        .await
        .unwrap();

    assert!(run.success);
    assert_eq!(run.status, RunStatus::Completed);
    assert!(run.error.is_none());
    assert_eq!(run.stations_count(), 7);

    let ids: Vec<u8> = run.outputs.iter().map(|o| o.station_id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7]);
    assert!(run.outputs.iter().all(|o| o.success && !o.used_fallback));

    // One call per station, never a retry
    assert_eq!(generator.call_count(), 7);
}

#[tokio::test]
async fn test_each_station_uses_its_configured_model() {
    let generator = ScriptedGenerator::new().shared();
    let orchestrator = orchestrator(generator.clone(), true);

    orchestrator
        .execute(ARABIC_SCENE, None, CancellationToken::new())
        .await
        .unwrap();

    let mut records = generator.records();
    records.sort_by_key(|r| r.call);
    let models: Vec<ModelId> = records.iter().map(|r| r.request.model).collect();
    assert_eq!(
        models,
        vec![
            ModelId::FlashLite,
            ModelId::Flash,
            ModelId::FlashLite,
            ModelId::FlashLite,
            ModelId::FlashLite,
            ModelId::Flash,
            ModelId::Pro,
        ]
    );

    // The final report is written at a lower temperature
    assert_eq!(records[6].request.temperature, 0.2);
    assert_eq!(records[0].request.temperature, 0.3);
    assert!(records
        .iter()
        .all(|r| r.request.max_tokens == 48192 && r.request.system_instruction.is_some()));
}

#[tokio::test]
async fn test_earlier_outputs_reach_later_prompts() {
    let generator = ScriptedGenerator::new().shared();
    let orchestrator = orchestrator(generator.clone(), true);

    let run = orchestrator
        .execute(ARABIC_SCENE, None, CancellationToken::new())
        .await
        .unwrap();
    assert!(run.success);

    let prompts = generator.prompts();

    // Station 1 only sees the text
    assert!(prompts[0].contains("دخل أحمد الغرفة"));
    assert!(!prompts[0].contains("الاستدعاء: 1"));

    // Station 2 sees station 1
    assert!(prompts[1].contains("الاستدعاء: 1"));

    // The final station sees all six before it
    for call in 1..=6 {
        assert!(prompts[6].contains(&format!("الاستدعاء: {}", call)));
    }
    assert!(prompts[6].contains("تحليل الشخصيات والأسلوب"));
}

#[tokio::test]
async fn test_prompts_ask_for_plain_text() {
    let generator = ScriptedGenerator::new().shared();
    let orchestrator = orchestrator(generator.clone(), true);

    orchestrator
        .execute(ARABIC_SCENE, None, CancellationToken::new())
        .await
        .unwrap();

    for prompt in generator.prompts() {
        assert!(prompt.contains("بدون JSON"));
        assert!(prompt.contains("==="));
        assert!(!prompt.contains("{{"));
    }
}

#[tokio::test]
async fn test_metadata_reaches_every_prompt() {
    let generator = ScriptedGenerator::new().shared();
    let orchestrator = orchestrator(generator.clone(), true);

    orchestrator
        .execute(
            ARABIC_SCENE,
            Some("ركز على شخصية فاطمة".to_string()),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 7);
    assert!(prompts.iter().all(|p| p.contains("ركز على شخصية فاطمة")));
}

#[tokio::test]
async fn test_confidence_is_bounded() {
    let generator = ScriptedGenerator::new().shared();
    let orchestrator = orchestrator(generator.clone(), true);

    let run = orchestrator
        .execute(ARABIC_SCENE, None, CancellationToken::new())
        .await
        .unwrap();

    for output in &run.outputs {
        assert!((0.0..=1.0).contains(&output.confidence));
        assert!(output.confidence > 0.0);
    }
    assert!((0.0..=1.0).contains(&run.confidence));
}

#[tokio::test]
async fn test_json_replies_score_lower() {
    let structured = ScriptedGenerator::new().shared();
    let json = ScriptedGenerator::new()
        .with_reply(|call, _| format!("{{\"station\": {}, \"analysis\": \"تحليل\"}}", call))
        .shared();

    let structured_run = orchestrator(structured, true)
        .execute(ARABIC_SCENE, None, CancellationToken::new())
        .await
        .unwrap();
    let json_run = orchestrator(json, true)
        .execute(ARABIC_SCENE, None, CancellationToken::new())
        .await
        .unwrap();

    assert!(json_run.confidence < structured_run.confidence);
}
