use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Point-in-time copy of the solve counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub errors: u64,
}

/// Monotonic solve counters, for diagnostics only.
///
/// Increments are atomic so independent optimizer runs may share one tracker.
/// Counters are never reset; a fresh tracker starts at zero.
#[derive(Debug, Default)]
pub struct SolveStats {
    requests: AtomicU64,
    errors: AtomicU64,
}

static PROCESS_STATS: OnceLock<Arc<SolveStats>> = OnceLock::new();

impl SolveStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tracker shared by the whole process, created on first use
    pub fn process() -> Arc<SolveStats> {
        PROCESS_STATS
            .get_or_init(|| Arc::new(SolveStats::new()))
            .clone()
    }

    pub fn record_attempt(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}
