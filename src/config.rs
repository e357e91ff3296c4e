use std::env;

/// Default cap for JSON bodies; peers push whole chains.
pub const DEFAULT_JSON_LIMIT: usize = 8 * 1024 * 1024;

/// Process settings read from the environment (and `.env`, loaded by `main`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub json_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            json_limit: DEFAULT_JSON_LIMIT,
        }
    }
}

impl Config {
    /// `HOST`, `PORT` and `JSON_LIMIT_BYTES`; unset or unparsable values fall
    /// back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            json_limit: lookup("JSON_LIMIT_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.json_limit),
        }
    }
}
