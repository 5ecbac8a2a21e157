//! Test utilities shared by the integration test binaries

#![allow(dead_code)]

use async_trait::async_trait;
use seven_stations::core::StationsConfig;
use seven_stations::gateway::{
    GatewayConfig, GatewayError, ModelCallRequest, ModelGateway, ModelId, TextGenerator,
};
use seven_stations::PipelineOrchestrator;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::{Duration, Instant};

/// Sixty-odd characters of Arabic dialogue
pub const ARABIC_SCENE: &str =
    "دخل أحمد الغرفة غاضباً. قالت فاطمة: لماذا تأخرت؟ قال أحمد: كان الطريق طويلاً والمطر شديداً.";

pub type ReplyFn = Box<dyn Fn(usize, &ModelCallRequest) -> String + Send + Sync>;

/// One call seen by the scripted generator
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub call: usize,
    pub request: ModelCallRequest,
    pub started: Instant,
    /// `None` while running, or when the caller gave up on the call
    pub finished: Option<Instant>,
}

/// Generator that replies with structured Arabic text and records every call.
///
/// Calls are numbered from 1. Failures can be injected by call number or
/// by model.
pub struct ScriptedGenerator {
    calls: AtomicUsize,
    fail_on: Vec<usize>,
    fail_models: Vec<ModelId>,
    delay: Option<Duration>,
    call_delays: Vec<(usize, Duration)>,
    reply: Option<ReplyFn>,
    log: Mutex<Vec<CallRecord>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on: Vec::new(),
            fail_models: Vec::new(),
            delay: None,
            call_delays: Vec::new(),
            reply: None,
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, calls: &[usize]) -> Self {
        self.fail_on = calls.to_vec();
        self
    }

    pub fn failing_model(mut self, model: ModelId) -> Self {
        self.fail_models.push(model);
        self
    }

    /// Simulated latency of every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Latency of one call, overriding `with_delay`
    pub fn with_call_delay(mut self, call: usize, delay: Duration) -> Self {
        self.call_delays.push((call, delay));
        self
    }

    pub fn with_reply<F>(mut self, reply: F) -> Self
    where
        F: Fn(usize, &ModelCallRequest) -> String + Send + Sync + 'static,
    {
        self.reply = Some(Box::new(reply));
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls in the order they started
    pub fn records(&self) -> Vec<CallRecord> {
        self.log.lock().unwrap().clone()
    }

    /// Prompts in call order
    pub fn prompts(&self) -> Vec<String> {
        let mut records = self.records();
        records.sort_by_key(|r| r.call);
        records.into_iter().map(|r| r.request.prompt).collect()
    }
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Default reply: a small well-formed section naming the call
pub fn structured_reply(call: usize, model: ModelId) -> String {
    format!(
        "=== نتيجة التحليل ===\n• ملاحظة أولى حول الشخصيات والصراع في المشهد\n• ملاحظة ثانية حول البناء الدرامي والإيقاع\nالنموذج: {}\nالاستدعاء: {}",
        model, call
    )
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate_text(&self, request: &ModelCallRequest) -> Result<String, GatewayError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let index = {
            let mut log = self.log.lock().unwrap();
            log.push(CallRecord {
                call,
                request: request.clone(),
                started: Instant::now(),
                finished: None,
            });
            log.len() - 1
        };

        let delay = self
            .call_delays
            .iter()
            .find(|(n, _)| *n == call)
            .map(|(_, delay)| *delay)
            .or(self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.log.lock().unwrap()[index].finished = Some(Instant::now());

        if self.fail_on.contains(&call) || self.fail_models.contains(&request.model) {
            return Err(GatewayError::Api {
                status: 503,
                message: format!("scripted failure on call {}", call),
            });
        }

        Ok(match &self.reply {
            Some(reply) => reply(call, request),
            None => structured_reply(call, request.model),
        })
    }
}

/// Built-in stations, optionally without any fallback model
pub fn stations(with_fallbacks: bool) -> StationsConfig {
    let mut config = StationsConfig::builtin().unwrap();
    if !with_fallbacks {
        config.defaults.fallback_model = None;
        for station in &mut config.stations {
            station.fallback_model = None;
        }
    }
    config
}

/// Orchestrator over the scripted generator with throttling disabled
pub fn orchestrator(
    generator: Arc<ScriptedGenerator>,
    with_fallbacks: bool,
) -> PipelineOrchestrator<Arc<ScriptedGenerator>> {
    orchestrator_with(generator, GatewayConfig::new().without_throttle(), with_fallbacks)
}

pub fn orchestrator_with(
    generator: Arc<ScriptedGenerator>,
    gateway_config: GatewayConfig,
    with_fallbacks: bool,
) -> PipelineOrchestrator<Arc<ScriptedGenerator>> {
    let gateway = ModelGateway::new(generator, &gateway_config);
    PipelineOrchestrator::new(Arc::new(gateway), &stations(with_fallbacks))
}

/// Lines of a report that open a station segment
pub fn subsection_lines(report: &str) -> usize {
    report
        .lines()
        .filter(|line| line.trim_start().starts_with("---"))
        .count()
}
