use std::time::{Duration, Instant};

use tracing::debug;

/// Wall-clock span that logs its duration when finished.
#[derive(Debug)]
pub struct Timer {
    label: String,
    started: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        Timer {
            label: label.into(),
            started: Instant::now(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn finish(self) -> Duration {
        let elapsed = self.elapsed();
        debug!(
            label = %self.label,
            elapsed_ms = elapsed.as_secs_f64() * 1_000.0,
            "timer.finished"
        );
        elapsed
    }
}
