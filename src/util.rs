use std::time::Instant;

/// Logs the time spent in a phase when dropped.
///
/// ```ignore
/// let _t = Timed::debug("core marking");
/// // ... work ...
/// // logs "core marking: 1.234ms" when _t goes out of scope
/// ```
///
/// Nothing is measured when the level is disabled, or on `wasm32` where
/// `Instant` has no clock.
pub struct Timed {
    name: &'static str,
    start: Option<Instant>,
    level: log::Level,
}

impl Timed {
    /// A timer that logs at INFO level.
    pub fn info(name: &'static str) -> Self {
        log::debug!("{}...", name);
        Self::start(name, log::Level::Info)
    }

    /// A timer that logs at DEBUG level.
    pub fn debug(name: &'static str) -> Self {
        log::trace!("{}...", name);
        Self::start(name, log::Level::Debug)
    }

    fn start(name: &'static str, level: log::Level) -> Self {
        let start = if cfg!(target_arch = "wasm32") || !log::log_enabled!(level) {
            None
        } else {
            Some(Instant::now())
        };
        Self { name, start, level }
    }
}

impl Drop for Timed {
    fn drop(&mut self) {
        if let Some(start) = self.start {
            log::log!(self.level, "{}: {:.3?}", self.name, start.elapsed());
        }
    }
}
