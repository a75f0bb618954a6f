use log::{warn, LevelFilter};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    pub log_level: LevelFilter,
    /// Allowed CORS origins. Empty means any origin.
    pub cors_origins: Vec<String>,
    pub reveal_interval: Duration,
    pub reveal_initial_delay: Duration,
    // the game-over role reveal gets a longer lead-in
    pub role_reveal_initial_delay: Duration,
    pub game_idle_ttl: Duration,
    pub finished_game_ttl: Duration,
    pub reap_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 3000,
            log_level: LevelFilter::Info,
            cors_origins: Vec::new(),
            reveal_interval: Duration::from_millis(7000),
            reveal_initial_delay: Duration::from_millis(1500),
            role_reveal_initial_delay: Duration::from_millis(2500),
            game_idle_ttl: Duration::from_secs(6 * 60 * 60),
            finished_game_ttl: Duration::from_secs(30 * 60),
            reap_interval: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup. Unparseable values keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let bind_addr = lookup("BIND_ADDR")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.bind_addr);
        let cors_origins = lookup("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let millis = |key: &str, default: Duration| {
            parsed::<u64>(&lookup, key).map_or(default, Duration::from_millis)
        };
        let secs = |key: &str, default: Duration| {
            parsed::<u64>(&lookup, key).map_or(default, Duration::from_secs)
        };

        Self {
            bind_addr,
            port: parsed(&lookup, "PORT").unwrap_or(defaults.port),
            log_level: parsed(&lookup, "LOG_LEVEL").unwrap_or(defaults.log_level),
            cors_origins,
            reveal_interval: millis("REVEAL_INTERVAL_MS", defaults.reveal_interval),
            reveal_initial_delay: millis("REVEAL_INITIAL_DELAY_MS", defaults.reveal_initial_delay),
            role_reveal_initial_delay: millis(
                "ROLE_REVEAL_INITIAL_DELAY_MS",
                defaults.role_reveal_initial_delay,
            ),
            game_idle_ttl: secs("GAME_IDLE_TTL_SECS", defaults.game_idle_ttl),
            finished_game_ttl: secs("FINISHED_GAME_TTL_SECS", defaults.finished_game_ttl),
            reap_interval: secs("REAP_INTERVAL_SECS", defaults.reap_interval),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid value {:?} for {}", raw, key);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config(&[]);
        assert_eq!(config.listen_addr(), "0.0.0.0:3000");
        assert_eq!(config.log_level, LevelFilter::Info);
        assert_eq!(config.reveal_interval, Duration::from_secs(7));
        assert_eq!(config.role_reveal_initial_delay, Duration::from_millis(2500));
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config(&[
            ("PORT", "8080"),
            ("LOG_LEVEL", "debug"),
            ("REVEAL_INTERVAL_MS", "10"),
            ("CORS_ORIGINS", "http://a.test, http://b.test,"),
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert_eq!(config.reveal_interval, Duration::from_millis(10));
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        let config = config(&[("PORT", "eighty"), ("REAP_INTERVAL_SECS", "-1")]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.reap_interval, Duration::from_secs(60));
    }
}
