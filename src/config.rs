//! Run settings, from an optional YAML file overridden by command line flags.
//!
//! ```yaml
//! save_dir: /srv/archive/existentialcomics
//! restart: false
//! proxies:
//!   - http://10.0.0.1:3128
//! delay_ms: 1000
//! ```

use crate::error::{Error, Result};
use crate::scraper::BASE_URL;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DATABASE_NAME: &str = "existentialcomics.sqlite";

/// Contents of the config file. Every key is optional.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub save_dir: Option<PathBuf>,
    pub restart: Option<bool>,
    pub proxies: Vec<String>,
    pub database: Option<String>,
    pub delay_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub retries: Option<u32>,
    pub overwrite_images: Option<bool>,
    pub base_url: Option<String>,
    pub user_agent: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::Config(format!(
                "no config file found at {}",
                path.display()
            )));
        }
        Self::parse(&fs::read_to_string(path)?)
    }

    pub fn parse(text: &str) -> Result<Self> {
        // An empty document deserializes as unit, not as an empty map.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }
}

/// Values given on the command line. They take precedence over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub dir: Option<PathBuf>,
    pub restart: bool,
    pub database: Option<String>,
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub save_dir: PathBuf,
    pub database: String,
    pub restart: bool,
    pub proxies: Vec<String>,
    pub delay: Duration,
    pub timeout: Duration,
    pub retries: u32,
    pub overwrite_images: bool,
    pub base_url: String,
    pub user_agent: Option<String>,
}

impl Settings {
    pub fn resolve(file: FileConfig, cli: Overrides) -> Result<Self> {
        let save_dir = cli.dir.or(file.save_dir).ok_or_else(|| {
            Error::Config("a save directory is required: use `save_dir` in config or --dir".into())
        })?;

        let database = cli
            .database
            .or(file.database)
            .unwrap_or_else(|| save_dir.join(DEFAULT_DATABASE_NAME).to_string_lossy().into_owned());

        Ok(Self {
            database,
            restart: cli.restart || file.restart.unwrap_or(false),
            proxies: file.proxies,
            delay: Duration::from_millis(cli.delay_ms.or(file.delay_ms).unwrap_or(1000)),
            timeout: Duration::from_secs(file.timeout_secs.unwrap_or(30)),
            retries: file.retries.unwrap_or(2),
            overwrite_images: file.overwrite_images.unwrap_or(false),
            base_url: file.base_url.unwrap_or_else(|| BASE_URL.to_string()),
            user_agent: file.user_agent,
            save_dir,
        })
    }

    /// Reads the config file, if any, and applies command line overrides.
    pub fn load(config: Option<&Path>, cli: Overrides) -> Result<Self> {
        let file = match config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(file, cli)
    }

    /// Creates the save directory if it does not exist yet.
    pub fn prepare_save_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.save_dir).map_err(|e| {
            Error::Config(format!(
                "cannot create save directory {}: {}",
                self.save_dir.display(),
                e
            ))
        })
    }
}
