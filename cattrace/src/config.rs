use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Trusted packet sequence id stamped on every track event of a run.
    #[serde(default = "default_sequence_id")]
    pub sequence_id: u32,

    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default = "default_session")]
    pub default_session: String,
    #[serde(default = "default_global_session")]
    pub global_session: String,
}

fn default_sequence_id() -> u32 {
    3903809
}

fn default_tag() -> String {
    "CatTrace".to_string()
}

fn default_session() -> String {
    "default".to_string()
}

fn default_global_session() -> String {
    "global".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sequence_id: default_sequence_id(),
            ingest: IngestConfig::default(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            tag: default_tag(),
            default_session: default_session(),
            global_session: default_global_session(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Trusted sequence id 0 means "no sequence" to trace readers.
    pub fn validate(&self) -> eyre::Result<()> {
        eyre::ensure!(self.sequence_id != 0, "sequence_id must be non-zero");
        Ok(())
    }
}
