//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If incomplete, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `STRIDE_DB_PATH`: Database file path
//! - `STRIDE_DB_POOL_SIZE`: Connection pool size
//! - `STRIDE_JOB_TIMEOUT_SECS`: Scheduled flush timeout (optional)
//! - `STRIDE_JOIN_TIMEOUT_SECS`: Scheduler shutdown timeout (optional)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./stride.json` or `./stride.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};

use stride_domain::{Config, DatabaseConfig, Result, SchedulerConfig, StrideError};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the required
/// variables are missing, falls back to loading from a config file.
///
/// # Errors
/// Returns `StrideError::Config` if configuration cannot be loaded from
/// either source.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// # Errors
/// Returns `StrideError::Config` if required variables are missing or have
/// invalid values.
pub fn load_from_env() -> Result<Config> {
    let db_path = env_var("STRIDE_DB_PATH")?;
    let db_pool_size = env_var("STRIDE_DB_POOL_SIZE").and_then(|s| {
        s.parse::<u32>().map_err(|e| StrideError::Config(format!("Invalid pool size: {e}")))
    })?;

    let mut scheduler = SchedulerConfig::default();
    if let Ok(raw) = std::env::var("STRIDE_JOB_TIMEOUT_SECS") {
        scheduler.job_timeout_secs = raw
            .parse()
            .map_err(|e| StrideError::Config(format!("Invalid job timeout: {e}")))?;
    }
    if let Ok(raw) = std::env::var("STRIDE_JOIN_TIMEOUT_SECS") {
        scheduler.join_timeout_secs = raw
            .parse()
            .map_err(|e| StrideError::Config(format!("Invalid join timeout: {e}")))?;
    }

    Ok(Config {
        database: DatabaseConfig { path: db_path, pool_size: db_pool_size },
        scheduler,
    })
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `StrideError::Config` if no config file is found or the file is
/// malformed.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(StrideError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            StrideError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| StrideError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content; format detected by extension
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| StrideError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| StrideError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(StrideError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe standard locations and return the first config file found
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(vec![
            cwd.join("config.json"),
            cwd.join("config.toml"),
            cwd.join("stride.json"),
            cwd.join("stride.toml"),
            cwd.join("../config.json"),
            cwd.join("../config.toml"),
        ]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(vec![
                exe_dir.join("config.json"),
                exe_dir.join("config.toml"),
                exe_dir.join("stride.json"),
                exe_dir.join("stride.toml"),
            ]);
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| StrideError::Config(format!("Missing required environment variable: {key}")))
}
