use crate::error::{AppError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_DIR: &str = "todolist-tui";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub instance_url: String,
    pub api_key: Option<String>,
    pub log_file: PathBuf,
    pub hide_finished: bool,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            instance_url: String::new(),
            api_key: None,
            log_file: default_log_file(),
            hide_finished: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// Optional settings from config.toml; every key may be overridden by the environment
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub instance_url: Option<String>,
    pub api_key: Option<String>,
    pub log_file: Option<PathBuf>,
    pub hide_finished: Option<bool>,
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))
    }
}

impl Config {
    /// Loads `.env`, then the config file if present, then the process environment.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let file = match config_file_path() {
            Some(path) if path.exists() => FileConfig::read(&path)?,
            _ => FileConfig::default(),
        };

        Config::from_sources(file, |key| env::var(key).ok())
    }

    pub fn from_sources<F>(file: FileConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let instance_url = env("TODO_INSTANCE_URL")
            .or(file.instance_url)
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| AppError::Config("TODO_INSTANCE_URL not set".to_string()))?;

        let api_key = env("TODO_API_KEY")
            .or(file.api_key)
            .filter(|key| !key.trim().is_empty());

        let log_file = env("TODO_LOG_FILE")
            .map(PathBuf::from)
            .or(file.log_file)
            .unwrap_or(defaults.log_file);

        let hide_finished = match env("TODO_HIDE_FINISHED") {
            Some(value) => parse_bool("TODO_HIDE_FINISHED", &value)?,
            None => file.hide_finished.unwrap_or(defaults.hide_finished),
        };

        let timeout_secs = match env("TODO_TIMEOUT_SECS") {
            Some(value) => value.trim().parse().map_err(|_| {
                AppError::Config(format!("TODO_TIMEOUT_SECS is not a number: {}", value))
            })?,
            None => file.timeout_secs.unwrap_or(defaults.timeout_secs),
        };

        let config = Config {
            instance_url,
            api_key,
            log_file,
            hide_finished,
            timeout_secs,
        };
        debug!(url = %config.instance_url, "configuration resolved");
        Ok(config)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(AppError::Config(format!("{} is not a boolean: {}", key, other))),
    }
}

pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

fn default_log_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(env::temp_dir)
        .join(APP_DIR)
        .join("todolist-tui.log")
}
