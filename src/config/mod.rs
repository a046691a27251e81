pub mod toml_config;

pub use toml_config::ScorerConfig;

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "kabaddi-scorer")]
#[command(about = "Live scorer for a single Kabaddi match")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Identifier the match is stored under; an existing match is resumed
    #[arg(long, default_value = "match")]
    pub match_id: String,

    /// Store matches as JSON files in this directory
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Override the half duration from the config file
    #[arg(long)]
    pub half_minutes: Option<u32>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Loads the config file (or defaults) and applies command-line overrides.
    pub fn resolve(&self) -> crate::utils::error::Result<ScorerConfig> {
        let mut config = match &self.config {
            Some(path) => ScorerConfig::from_file(path)?,
            None => ScorerConfig::default(),
        };
        if let Some(dir) = &self.data_dir {
            config.storage.kind = toml_config::StorageKind::Local;
            config.storage.path = dir.clone();
        }
        if let Some(minutes) = self.half_minutes {
            config.rules.half_duration_minutes = minutes;
        }
        config.logging.verbose |= self.verbose;
        config.logging.json |= self.json_logs;
        Ok(config)
    }
}

#[cfg(feature = "cli")]
impl crate::utils::validation::Validate for CliConfig {
    fn validate(&self) -> crate::utils::error::Result<()> {
        crate::utils::validation::validate_match_id("match_id", &self.match_id)?;
        if let Some(dir) = &self.data_dir {
            crate::utils::validation::validate_path("data_dir", dir)?;
        }
        Ok(())
    }
}
