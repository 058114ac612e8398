//! Runtime settings resolved flag-first, then environment, then default.

use std::env;
use std::path::PathBuf;

use tracing::info;

pub const DATA_PATH_ENV: &str = "DATA_PATH";
pub const BIND_ADDR_ENV: &str = "BIND_ADDR";
pub const DEFAULT_DATA_PATH: &str = "data/mentions.csv";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";

#[derive(Debug, Clone)]
pub struct Settings {
    pub data_path: PathBuf,
    pub bind_addr: String,
}

/// Resolve the effective settings. CLI flags win over environment
/// variables, which win over the defaults.
pub fn resolve(data_flag: Option<String>, bind_flag: Option<String>) -> Settings {
    let data_path = data_flag
        .or_else(|| env::var(DATA_PATH_ENV).ok())
        .unwrap_or_else(|| DEFAULT_DATA_PATH.to_string());
    let bind_addr = bind_flag
        .or_else(|| env::var(BIND_ADDR_ENV).ok())
        .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
    let settings = Settings {
        data_path: PathBuf::from(data_path),
        bind_addr,
    };
    info!(
        "Settings resolved - data_path={}, bind={}",
        settings.data_path.display(),
        settings.bind_addr
    );
    settings
}
