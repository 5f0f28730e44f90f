//! Server configuration from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `HOST` | `0.0.0.0` |
//! | `PORT` | `5000` |
//! | `PAPERSCOPE_INDEX` | `postgres` (`memory` for a throwaway in-process index) |
//! | `DATABASE_URL` | `postgres://localhost/paperscope` |
//! | `PAPERSCOPE_TEMP_DIR` | system temp dir |
//! | `PAPERSCOPE_AGENT_MAX_ITERATIONS` | `20` |
//! | `PAPERSCOPE_PAGE_CONCURRENCY` | `4` |
//! | `PAPERSCOPE_VISION_TIMEOUT_SECS` | `120` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use paperscope_core::defaults::{
    AGENT_MAX_ITERATIONS, PAGE_CONCURRENCY, SERVER_PORT, VISION_TIMEOUT_SECS,
};
use paperscope_core::{Error, Result};

/// Where papers and chunk collections live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexBackend {
    #[default]
    Postgres,
    Memory,
}

impl FromStr for IndexBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "pgvector" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(Error::Config(format!("Invalid PAPERSCOPE_INDEX: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub index_backend: IndexBackend,
    pub database_url: String,
    pub temp_dir: Option<PathBuf>,
    pub agent_max_iterations: usize,
    pub page_concurrency: usize,
    pub vision_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: SERVER_PORT,
            index_backend: IndexBackend::default(),
            database_url: "postgres://localhost/paperscope".to_string(),
            temp_dir: None,
            agent_max_iterations: AGENT_MAX_ITERATIONS,
            page_concurrency: PAGE_CONCURRENCY,
            vision_timeout: Duration::from_secs(VISION_TIMEOUT_SECS),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unparseable numbers fall
    /// back to their defaults; an unknown index backend is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let number = |key: &str, default: usize| {
            get(key)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(default)
        };

        let index_backend = match get("PAPERSCOPE_INDEX") {
            Some(v) => v.parse()?,
            None => defaults.index_backend,
        };

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: get("PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.port),
            index_backend,
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            temp_dir: get("PAPERSCOPE_TEMP_DIR").map(PathBuf::from),
            agent_max_iterations: number("PAPERSCOPE_AGENT_MAX_ITERATIONS", AGENT_MAX_ITERATIONS)
                .max(1),
            page_concurrency: number("PAPERSCOPE_PAGE_CONCURRENCY", PAGE_CONCURRENCY).max(1),
            vision_timeout: Duration::from_secs(
                number("PAPERSCOPE_VISION_TIMEOUT_SECS", VISION_TIMEOUT_SECS as usize) as u64,
            ),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("PAPERSCOPE_INDEX", "Memory"),
            ("PAPERSCOPE_TEMP_DIR", "/tmp/papers"),
            ("PAPERSCOPE_AGENT_MAX_ITERATIONS", "8"),
            ("PAPERSCOPE_PAGE_CONCURRENCY", "2"),
            ("PAPERSCOPE_VISION_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.index_backend, IndexBackend::Memory);
        assert_eq!(config.temp_dir, Some(PathBuf::from("/tmp/papers")));
        assert_eq!(config.agent_max_iterations, 8);
        assert_eq!(config.page_concurrency, 2);
        assert_eq!(config.vision_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_bad_numbers_fall_back() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("PORT", "http"),
            ("PAPERSCOPE_AGENT_MAX_ITERATIONS", "0"),
            ("PAPERSCOPE_PAGE_CONCURRENCY", "many"),
        ]))
        .unwrap();
        assert_eq!(config.port, SERVER_PORT);
        assert_eq!(config.agent_max_iterations, 1);
        assert_eq!(config.page_concurrency, PAGE_CONCURRENCY);
    }

    #[test]
    fn test_unknown_index_backend_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[("PAPERSCOPE_INDEX", "chroma")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
