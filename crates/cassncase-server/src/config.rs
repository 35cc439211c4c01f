// ABOUTME: Configuration loading and validation for the cassncase server.
// ABOUTME: Reads CASSNCASE_* environment variables and falls back to local defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("CASSNCASE_BIND is not a valid socket address: {0}")]
    InvalidBind(String),
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub home: PathBuf,
    pub db_path: PathBuf,
    pub bind: SocketAddr,
    pub seed: bool,
    pub seed_file: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Environment variables:
    /// - CASSNCASE_HOME: data directory (default: ~/.cassncase)
    /// - CASSNCASE_DB: database file (default: <home>/orders.db)
    /// - CASSNCASE_BIND: socket address to bind (default: 127.0.0.1:7340)
    /// - CASSNCASE_SEED: seed an empty store on open (default: true)
    /// - CASSNCASE_SEED_FILE: JSON array of buyer records replacing the built-in seed
    pub fn from_env() -> Result<Self, ConfigError> {
        let home = std::env::var("CASSNCASE_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                std::env::var("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("/tmp"))
                    .join(".cassncase")
            });

        let db_path = std::env::var("CASSNCASE_DB")
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join("orders.db"));

        let bind_str = std::env::var("CASSNCASE_BIND")
            .unwrap_or_else(|_| "127.0.0.1:7340".to_string());
        let bind: SocketAddr = bind_str
            .parse()
            .map_err(|_| ConfigError::InvalidBind(bind_str))?;

        let seed = std::env::var("CASSNCASE_SEED")
            .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "false" | "0" | "no"))
            .unwrap_or(true);

        let seed_file = std::env::var("CASSNCASE_SEED_FILE")
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            home,
            db_path,
            bind,
            seed,
            seed_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 5] = [
        "CASSNCASE_HOME",
        "CASSNCASE_DB",
        "CASSNCASE_BIND",
        "CASSNCASE_SEED",
        "CASSNCASE_SEED_FILE",
    ];

    fn clear_env() {
        // SAFETY: test-only code; every env-mutating case runs inside one test
        unsafe {
            for var in VARS {
                std::env::remove_var(var);
            }
        }
    }

    // Environment is process-global, so all cases share one test body.
    #[test]
    fn config_reads_environment() {
        clear_env();
        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.bind, "127.0.0.1:7340".parse::<SocketAddr>().unwrap());
        assert!(config.seed);
        assert!(config.seed_file.is_none());
        assert!(config.home.to_string_lossy().contains(".cassncase"));
        assert_eq!(config.db_path, config.home.join("orders.db"));

        // SAFETY: see clear_env
        unsafe {
            std::env::set_var("CASSNCASE_HOME", "/srv/cassncase");
            std::env::set_var("CASSNCASE_SEED", "No");
            std::env::set_var("CASSNCASE_SEED_FILE", "/srv/buyers.json");
        }
        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.db_path, PathBuf::from("/srv/cassncase/orders.db"));
        assert!(!config.seed);
        assert_eq!(config.seed_file, Some(PathBuf::from("/srv/buyers.json")));

        // SAFETY: see clear_env
        unsafe {
            std::env::set_var("CASSNCASE_DB", "/var/lib/orders.sqlite");
            std::env::set_var("CASSNCASE_SEED", "1");
        }
        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.db_path, PathBuf::from("/var/lib/orders.sqlite"));
        assert!(config.seed);

        // SAFETY: see clear_env
        unsafe {
            std::env::set_var("CASSNCASE_BIND", "not-an-address");
        }
        let result = AppConfig::from_env();
        clear_env();

        let err = result.unwrap_err();
        assert!(
            err.to_string().contains("CASSNCASE_BIND"),
            "error should name the variable: {}",
            err
        );
    }
}
