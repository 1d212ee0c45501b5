use std::time::{SystemTime, UNIX_EPOCH};

// Port for retrieving the current wall-clock time.
//
// Every duration-based rule in the simulation derives from absolute epoch
// timestamps, so injecting the clock makes the whole tick pipeline
// deterministic under test.
pub trait Clock: Send + Sync {
    fn now_epoch_ms(&self) -> u64;
}

/// Production clock backed by `SystemTime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}
