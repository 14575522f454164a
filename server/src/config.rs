//! Server configuration

use std::time::Duration;

/// Tunables for the transport and the game timers.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum number of simultaneous connections
    pub max_clients: usize,
    /// Silence after which a connection is treated as dropped
    pub client_timeout: Duration,
    /// How long a disconnected player keeps their seat
    pub grace_period: Duration,
    /// Countdown between a room filling up and the first deal
    pub prestart_delay: Duration,
    /// Pause after a win before the room is shown the countdown again
    pub win_pause: Duration,
    /// Delay after a win before the automatic rematch is dealt
    pub restart_delay: Duration,
    /// Largest room a player may create
    pub max_capacity: u8,
    /// Accept any well-formed bid instead of requiring a raise
    pub lenient_bids: bool,
    /// Fixed RNG seed for reproducible dice
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_clients: 256,
            client_timeout: Duration::from_secs(10),
            grace_period: Duration::from_secs(20),
            prestart_delay: Duration::from_secs(5),
            win_pause: Duration::from_secs(10),
            restart_delay: Duration::from_secs(15),
            max_capacity: 10,
            lenient_bids: false,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timings() {
        let config = ServerConfig::default();
        assert_eq!(config.grace_period, Duration::from_secs(20));
        assert_eq!(config.prestart_delay, Duration::from_secs(5));
        assert_eq!(config.win_pause, Duration::from_secs(10));
        assert_eq!(config.restart_delay, Duration::from_secs(15));
        assert!(config.win_pause < config.restart_delay);
        assert!(!config.lenient_bids);
    }
}
