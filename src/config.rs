use std::{env, path::PathBuf, time::Duration};

const DEFAULT_LISTEN: &str = "127.0.0.1:33333";
const DEFAULT_SETTINGS_PATH: &str = "tab-summarizer-settings.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub settings_path: PathBuf,
    pub connection_timeout: Duration,
    pub idle_connection_timeout: Duration,
    pub page_fetch_timeout: Duration,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Unparseable numbers fall
    /// back to their defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let secs = |key: &str, default: u64| {
            Duration::from_secs(
                lookup(key)
                    .and_then(|s| s.trim().parse().ok())
                    .unwrap_or(default),
            )
        };

        Self {
            listen: lookup("LISTEN").unwrap_or_else(|| DEFAULT_LISTEN.to_string()),
            settings_path: lookup("SETTINGS_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH), PathBuf::from),
            connection_timeout: secs("CONNECTION_TIMEOUT", 10),
            idle_connection_timeout: secs("IDLE_CONNECTION_TIMEOUT", 60),
            page_fetch_timeout: secs("PAGE_FETCH_TIMEOUT", 20),
        }
    }
}
