//! Per-model call spacing

use crate::gateway::ModelId;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

type Slot = Arc<Mutex<Option<Instant>>>;

/// Writes the current time into a slot when dropped, so a call that is
/// abandoned part way still counts toward the model's spacing
struct Stamp<'a>(&'a mut Option<Instant>);

impl Drop for Stamp<'_> {
    fn drop(&mut self) {
        *self.0 = Some(Instant::now());
    }
}

/// Keyed store of "last call finished at" timestamps.
///
/// Each model owns its own async lock, held across the wait, the call and
/// the timestamp update. The timestamp is written even when the caller
/// drops the call before it finishes. Two calls to the same model are
/// therefore always at least `delay` apart (measured from the end of one to
/// the start of the next), while calls to different models proceed
/// independently.
#[derive(Debug)]
pub struct ThrottleTable {
    delays: HashMap<ModelId, Duration>,
    slots: Mutex<HashMap<ModelId, Slot>>,
}

impl ThrottleTable {
    pub fn new(delays: HashMap<ModelId, Duration>) -> Self {
        Self {
            delays,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Configured spacing for a model (zero when unknown)
    pub fn delay_for(&self, model: ModelId) -> Duration {
        self.delays.get(&model).copied().unwrap_or(Duration::ZERO)
    }

    async fn slot(&self, model: ModelId) -> Slot {
        let mut slots = self.slots.lock().await;
        slots.entry(model).or_default().clone()
    }

    /// Run `call` once the model's spacing has elapsed, then stamp the model
    pub async fn run<F, Fut, T>(&self, model: ModelId, call: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let slot = self.slot(model).await;
        let mut last = slot.lock().await;

        if let Some(previous) = *last {
            let ready_at = previous + self.delay_for(model);
            let now = Instant::now();
            if ready_at > now {
                debug!("Throttling {} for {:?}", model, ready_at - now);
                sleep_until(ready_at).await;
            }
        }

        // Stamped on completion and also if this future is dropped mid-call
        let _stamp = Stamp(&mut *last);
        call().await
    }

    /// When the last call to `model` finished, if any
    pub async fn last_call(&self, model: ModelId) -> Option<Instant> {
        let slot = self.slot(model).await;
        let last = slot.lock().await;
        *last
    }
}
