//! Shared application state for Axum handlers.
//!
//! All components are wrapped in `Arc` so the state is cheap to clone per
//! request. The flag store is a trait object; hosts with a real session
//! backend implement [`AuthFlagStore`] and pass it to [`AppState::with_store`].

use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::gate::GateConfig;
use crate::session::{AuthFlagStore, InMemoryFlagStore};

/// Shared application state for Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Gate configuration derived from `config`
    pub gate: Arc<GateConfig>,
    /// Per-session authorized flags
    pub flags: Arc<dyn AuthFlagStore>,
    /// Timestamp when the application started
    pub started_at: Instant,
}

impl AppState {
    /// Create state backed by an in-memory flag store sized from `config`.
    pub fn new(config: Config) -> Self {
        let flags = InMemoryFlagStore::with_limits(config.session_ttl, config.session_max_entries);
        Self::with_store(config, Arc::new(flags))
    }

    /// Create state with a caller-supplied flag store.
    pub fn with_store(config: Config, flags: Arc<dyn AuthFlagStore>) -> Self {
        let gate = Arc::new(config.gate_config());
        Self {
            config: Arc::new(config),
            gate,
            flags,
            started_at: Instant::now(),
        }
    }

    /// Get uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_derives_gate_config() {
        let config = Config {
            access_key: Some("letmein".to_string()),
            whitelist: vec!["10.0.0.1".to_string()],
            ..Config::default()
        };
        let state = AppState::new(config);

        assert!(state.gate.is_enabled());
        assert_eq!(state.gate.allowlist.len(), 1);
        assert!(state.uptime_seconds() < 5);
    }
}
