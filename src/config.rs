use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} is not a valid socket address: {value}")]
    InvalidBind { var: &'static str, value: String },

    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidWorkers { var: &'static str, value: String },

    #[error("{var} uses an unsupported scheme: {value} (expected sqlite:// or file://)")]
    UnsupportedDbUrl { var: &'static str, value: String },
}

/// Runtime settings read from the environment (after an optional `.env`).
///
/// | Variable | Default |
/// |---|---|
/// | `PLANPATH_BIND` | `127.0.0.1:8080` |
/// | `PLANPATH_DB_URL` | unset: in-memory store |
/// | `PLANPATH_DATAFILES_DIR` | unset: no seed data |
/// | `PLANPATH_WORKERS` | CPU count |
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub bind: SocketAddr,
    pub db_url: Option<String>,
    pub datafiles_dir: Option<PathBuf>,
    pub workers: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        // .env es opcional
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup (tests pass a map here
    /// instead of mutating the process environment).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_raw = get("PLANPATH_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidBind { var: "PLANPATH_BIND", value: bind_raw.clone() })?;

        let db_url = get("PLANPATH_DB_URL");
        if let Some(url) = &db_url {
            if url.contains("://") && !url.starts_with("sqlite://") && !url.starts_with("file://") {
                return Err(ConfigError::UnsupportedDbUrl { var: "PLANPATH_DB_URL", value: url.clone() });
            }
        }

        let workers = match get("PLANPATH_WORKERS") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidWorkers { var: "PLANPATH_WORKERS", value: raw }),
            },
            None => num_cpus::get().max(1),
        };

        Ok(Settings {
            bind,
            db_url,
            datafiles_dir: get("PLANPATH_DATAFILES_DIR").map(PathBuf::from),
            workers,
        })
    }
}
