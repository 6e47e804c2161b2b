//! Server configuration loaded from environment variables

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration for the session server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP/WebSocket server listens on
    pub bind_addr: SocketAddr,
    /// Rounds per session; reaching it ends the game
    pub max_rounds: u32,
    /// Players required before the host may start a multiplayer room
    pub min_players: usize,
    /// Nickname cap in characters
    pub nickname_max_chars: usize,
    /// Optimistic commit attempts before a version conflict is surfaced
    pub commit_attempts: u32,
    /// Per-room broadcast buffer size
    pub channel_capacity: usize,
    /// How often idle replication channels are dropped
    pub prune_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_rounds: 10,
            min_players: 2,
            nickname_max_chars: 20,
            commit_attempts: 3,
            channel_capacity: 64,
            prune_interval: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    /// Load config from HEARTLINK_* environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: env_parse("HEARTLINK_BIND", defaults.bind_addr, |_| true),
            max_rounds: env_parse("HEARTLINK_MAX_ROUNDS", defaults.max_rounds, |v| *v >= 1),
            min_players: env_parse("HEARTLINK_MIN_PLAYERS", defaults.min_players, |v| *v >= 1),
            nickname_max_chars: env_parse(
                "HEARTLINK_NICKNAME_MAX",
                defaults.nickname_max_chars,
                |v| *v >= 1,
            ),
            commit_attempts: env_parse(
                "HEARTLINK_COMMIT_ATTEMPTS",
                defaults.commit_attempts,
                |v| *v >= 1,
            ),
            channel_capacity: env_parse(
                "HEARTLINK_CHANNEL_CAPACITY",
                defaults.channel_capacity,
                |v| *v >= 1,
            ),
            prune_interval: Duration::from_secs(env_parse(
                "HEARTLINK_PRUNE_INTERVAL_SECS",
                defaults.prune_interval.as_secs(),
                |v| *v >= 1,
            )),
        }
    }
}

/// Read and parse an env var. Unset or blank means default; garbage logs a warning.
fn env_parse<T>(key: &str, default: T, valid: impl Fn(&T) -> bool) -> T
where
    T: FromStr + std::fmt::Debug,
{
    let Some(raw) = std::env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }) else {
        return default;
    };

    match raw.parse::<T>() {
        Ok(value) if valid(&value) => value,
        _ => {
            tracing::warn!(
                "Ignoring invalid {}={:?}, using default {:?}",
                key,
                raw,
                default
            );
            default
        }
    }
}
