//! Configuration for the polling engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the polling/wait engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Cadence of polling waits.
    ///
    /// Each [`Session::tick`](crate::engine::session::Session::tick) sleeps
    /// this long. Scripts that must not miss a transient value poll with
    /// [`next_quantum`](crate::engine::session::Session::next_quantum)
    /// instead. Default: 100ms.
    pub tick: Duration,

    /// Optional watchdog for condition waits.
    ///
    /// When set, a `wait_until` whose predicate never holds abandons the
    /// session after this much elapsed time instead of polling forever.
    /// Default: no watchdog, matching the original behavior.
    pub max_wait: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(100),
            max_wait: None,
        }
    }
}

impl EngineConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tick cadence.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Set the condition-wait watchdog.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_cadence() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.tick, Duration::from_millis(100));
        assert_eq!(cfg.max_wait, None);
    }

    #[test]
    fn builders_override_fields() {
        let cfg = EngineConfig::new()
            .with_tick(Duration::from_millis(10))
            .with_max_wait(Duration::from_secs(5));
        assert_eq!(cfg.tick, Duration::from_millis(10));
        assert_eq!(cfg.max_wait, Some(Duration::from_secs(5)));
    }
}
