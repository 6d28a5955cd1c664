use serde::Serialize;

/// Host timer request: cancel any timer under `key`, then start a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerRequest {
    pub key: &'static str,
    pub generation: u64,
    pub delay_ms: u64,
}

/// Coalesces bursts of requests into one delayed action.
///
/// Every `schedule` supersedes the previous one; only a fire carrying the
/// latest generation yields the pending value.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    key: &'static str,
    delay_ms: u64,
    generation: u64,
    pending: Option<T>,
}

impl<T> Debouncer<T> {
    pub const fn new(key: &'static str, delay_ms: u64) -> Self {
        Self {
            key,
            delay_ms,
            generation: 0,
            pending: None,
        }
    }

    pub fn schedule(&mut self, value: T) -> TimerRequest {
        self.generation = self.generation.wrapping_add(1);
        self.pending = Some(value);
        TimerRequest {
            key: self.key,
            generation: self.generation,
            delay_ms: self.delay_ms,
        }
    }

    pub fn fire(&mut self, generation: u64) -> Option<T> {
        if generation != self.generation {
            return None;
        }
        self.pending.take()
    }

    pub fn cancel(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
