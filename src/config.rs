use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub practice: PracticeConfig,
    pub catalogue: CatalogueConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct PracticeConfig {
    /// Directory containing the Audio/ and Pic/ media folders.
    pub media_root: PathBuf,
    /// Fixed pause between prompt end and recording start, in milliseconds.
    pub post_prompt_delay_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct CatalogueConfig {
    /// Primary catalogue JSON file.
    pub primary_path: PathBuf,
    /// Last-known-good copy, written whenever a load succeeds.
    pub cache_path: PathBuf,
}

impl PracticeConfig {
    pub fn post_prompt_delay(&self) -> Duration {
        Duration::from_millis(self.post_prompt_delay_ms)
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
