use std::time::{Duration, Instant};

/// Logs how long a scope took when dropped.
pub struct ScopedTimer {
    name: String,
    start: Instant,
    level: log::Level,
}

impl ScopedTimer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
            level: log::Level::Info,
        }
    }

    /// Same as `new` but reports at debug level, for per-net scopes.
    pub fn debug(name: impl Into<String>) -> Self {
        let mut timer = Self::new(name);
        timer.level = log::Level::Debug;
        timer
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        log::log!(self.level, "{} took {:?}", self.name, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_timer_keeps_its_name() {
        let timer = ScopedTimer::debug("net 'a'");
        assert_eq!(timer.name, "net 'a'");
        assert_eq!(timer.level, log::Level::Debug);
        assert_eq!(ScopedTimer::new("run").level, log::Level::Info);
    }
}
