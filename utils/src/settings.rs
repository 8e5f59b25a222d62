use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use config::{Environment, File};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct GlobalConfig {
    pub printq_dir: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct DispatcherConfig {
    pub queue_capacity: Option<usize>,
    pub cancel_timeout_ms: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub global: Option<GlobalConfig>,
    pub dispatcher: Option<DispatcherConfig>,
}

lazy_static! {
    pub static ref GLOBAL_CONFIG: Mutex<Config> = Mutex::new(Config::default());
}

pub fn update_config(config: Config) {
    let mut global_config = GLOBAL_CONFIG.lock().unwrap_or_else(|e| e.into_inner());
    *global_config = config;
}

pub fn current_config() -> Config {
    GLOBAL_CONFIG
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}

/// `~/.printq/config`, any extension the `config` crate understands.
pub fn default_config_path() -> Option<PathBuf> {
    home_dir().map(|h| h.join(".printq").join("config"))
}

/// Reads `file` (optional when `required` is false) layered under `PRINTQ_*`
/// environment variables, e.g. `PRINTQ_DISPATCHER__QUEUE_CAPACITY=4`.
pub fn read_config<P: AsRef<Path>>(file: P, required: bool) -> Result<Config> {
    let file = file.as_ref().to_string_lossy().to_string();
    let config = config::Config::builder()
        .add_source(File::with_name(&file).required(required))
        .add_source(Environment::with_prefix("PRINTQ").separator("__"))
        .build()?
        .try_deserialize::<Config>()?;
    Ok(config)
}

/// Loads `file` and installs it as the global config.
pub fn load_config<P: AsRef<Path>>(file: P) -> Result<Config> {
    let config = read_config(file, true)?;
    update_config(config.clone());
    Ok(config)
}

pub fn printq_dir() -> Option<PathBuf> {
    let global_config = GLOBAL_CONFIG.lock().unwrap_or_else(|e| e.into_inner());

    let printq_dir = global_config
        .global
        .as_ref()
        .and_then(|g| g.printq_dir.as_ref())
        .map(PathBuf::from);

    match printq_dir {
        Some(printq_dir) => Some(printq_dir),
        None => home_dir().map(|mut h| {
            h.push(".printq");
            h
        }),
    }
}

pub fn queue_capacity() -> usize {
    let global_config = GLOBAL_CONFIG.lock().unwrap_or_else(|e| e.into_inner());

    match global_config
        .dispatcher
        .as_ref()
        .and_then(|d| d.queue_capacity)
    {
        Some(0) => {
            tracing::warn!(
                "queue_capacity 0 is not allowed, using {}",
                DEFAULT_QUEUE_CAPACITY
            );
            DEFAULT_QUEUE_CAPACITY
        }
        Some(capacity) => capacity,
        None => DEFAULT_QUEUE_CAPACITY,
    }
}

pub fn cancel_timeout() -> Option<Duration> {
    let global_config = GLOBAL_CONFIG.lock().unwrap_or_else(|e| e.into_inner());
    global_config
        .dispatcher
        .as_ref()
        .and_then(|d| d.cancel_timeout_ms)
        .map(Duration::from_millis)
}
