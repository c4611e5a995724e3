//! Scoped debug timers for invocation profiling.

use std::time::Instant;

use log::Level;

/// Logs the elapsed time of a scope at debug level when dropped. The label
/// is only built when debug logging is enabled.
pub struct ScopedTimer {
    label: Option<String>,
    start: Option<Instant>,
}

impl ScopedTimer {
    pub fn debug_lazy<F>(label_gen: F) -> Self
    where
        F: FnOnce() -> String,
    {
        if log::log_enabled!(Level::Debug) {
            Self {
                label: Some(label_gen()),
                start: Some(Instant::now()),
            }
        } else {
            Self {
                label: None,
                start: None,
            }
        }
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        if let (Some(label), Some(start)) = (&self.label, self.start) {
            log::debug!("{} took {} us", label, start.elapsed().as_micros());
        }
    }
}
