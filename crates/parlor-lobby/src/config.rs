//! Lobby configuration.

use std::time::Duration;

/// Tunable parameters for the coordinator.
///
/// Timeouts are injectable so tests can run the full
/// disconnect → grace window → permanent removal cycle in milliseconds.
#[derive(Debug, Clone)]
pub struct LobbyConfig {
    /// How long a disconnected client's seat is held for reconnection.
    pub abandonment_timeout: Duration,

    /// Period of the sweep that permanently removes expired abandonments.
    pub cleanup_interval: Duration,

    /// Minimum members required to start a game; a running game ends when
    /// its client count drops below this.
    pub min_party_size: usize,

    /// Maximum members in a party.
    pub max_party_size: usize,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            abandonment_timeout: Duration::from_secs(15),
            cleanup_interval: Duration::from_secs(10),
            min_party_size: 2,
            max_party_size: 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lobby_config_defaults() {
        let config = LobbyConfig::default();
        assert_eq!(config.abandonment_timeout, Duration::from_secs(15));
        assert_eq!(config.cleanup_interval, Duration::from_secs(10));
        assert_eq!(config.min_party_size, 2);
        assert_eq!(config.max_party_size, 6);
    }
}
