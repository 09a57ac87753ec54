use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Timing helper for the intersection-query hooks
///
/// Call [`begin`](Self::begin) from `on_begin_execute_intersection_query`
/// and [`end`](Self::end) from `on_end_execute_intersection_query`.
#[derive(Debug)]
pub struct QueryInstrumentation {
    label: String,
    started: Mutex<Option<Instant>>,
    completed: AtomicU64,
}

impl QueryInstrumentation {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into(), started: Mutex::new(None), completed: AtomicU64::new(0) }
    }

    pub fn begin(&self, geometry_type: &str) {
        tracing::debug!(provider = %self.label, geometry_type, "intersection query started");
        if let Ok(mut started) = self.started.lock() {
            *started = Some(Instant::now());
        }
    }

    /// Log the elapsed time since the matching `begin`
    pub fn end(&self) -> Option<Duration> {
        let elapsed = self.started.lock().ok()?.take().map(|start| start.elapsed());
        self.completed.fetch_add(1, Ordering::Relaxed);

        if let Some(elapsed) = elapsed {
            tracing::debug!(
                provider = %self.label,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                "intersection query finished"
            );
        }
        elapsed
    }

    /// Number of queries that reached the end hook
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }
}
