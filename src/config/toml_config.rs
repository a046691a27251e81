use crate::adapters::{
    HttpMatchStore, HttpPlayerDirectory, LocalMatchStore, MemoryMatchStore, MemoryPlayerDirectory,
};
use crate::domain::model::{
    MatchRules, DEFAULT_BONUS_MIN_DEFENDERS, DEFAULT_HALF_DURATION_SECONDS,
    DEFAULT_RAID_DURATION_SECONDS, DEFAULT_ROSTER_SIZE, DEFAULT_TIMEOUTS_PER_HALF,
};
use crate::domain::ports::{MatchStore, PlayerDirectory};
use crate::utils::error::{Result, ScorerError};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    #[serde(rename = "match")]
    pub rules: RulesConfig,
    pub storage: StorageConfig,
    pub directory: DirectoryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub half_duration_minutes: u32,
    pub timeouts_per_half: u32,
    pub raid_duration_seconds: u32,
    pub roster_size: usize,
    pub bonus_min_defenders: usize,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            half_duration_minutes: DEFAULT_HALF_DURATION_SECONDS / 60,
            timeouts_per_half: DEFAULT_TIMEOUTS_PER_HALF,
            raid_duration_seconds: DEFAULT_RAID_DURATION_SECONDS,
            roster_size: DEFAULT_ROSTER_SIZE,
            bonus_min_defenders: DEFAULT_BONUS_MIN_DEFENDERS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Local,
    Memory,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub kind: StorageKind,
    pub path: String,
    pub endpoint: Option<String>,
    pub request_timeout_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::Local,
            path: "./matches".to_string(),
            endpoint: None,
            request_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryKind {
    Memory,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub kind: DirectoryKind,
    pub endpoint: Option<String>,
    pub request_timeout_seconds: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            kind: DirectoryKind::Memory,
            endpoint: None,
            request_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub verbose: bool,
    pub json: bool,
}

impl ScorerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ScorerError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ScorerError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are
    /// left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ScorerError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn rules(&self) -> MatchRules {
        MatchRules {
            half_duration_seconds: self.rules.half_duration_minutes * 60,
            timeouts_per_half: self.rules.timeouts_per_half,
            raid_duration_seconds: self.rules.raid_duration_seconds,
            roster_size: self.rules.roster_size,
            bonus_min_defenders: self.rules.bonus_min_defenders,
        }
    }

    pub fn build_store(&self) -> Result<Arc<dyn MatchStore>> {
        let store: Arc<dyn MatchStore> = match self.storage.kind {
            StorageKind::Local => Arc::new(LocalMatchStore::new(&self.storage.path)),
            StorageKind::Memory => Arc::new(MemoryMatchStore::new()),
            StorageKind::Http => {
                let endpoint =
                    validation::validate_required_field("storage.endpoint", &self.storage.endpoint)?;
                Arc::new(HttpMatchStore::with_timeout(
                    endpoint,
                    Duration::from_secs(self.storage.request_timeout_seconds),
                )?)
            }
        };
        Ok(store)
    }

    pub fn build_directory(&self) -> Result<Arc<dyn PlayerDirectory>> {
        let directory: Arc<dyn PlayerDirectory> = match self.directory.kind {
            DirectoryKind::Memory => Arc::new(MemoryPlayerDirectory::new()),
            DirectoryKind::Http => {
                let endpoint = validation::validate_required_field(
                    "directory.endpoint",
                    &self.directory.endpoint,
                )?;
                Arc::new(HttpPlayerDirectory::with_timeout(
                    endpoint,
                    Duration::from_secs(self.directory.request_timeout_seconds),
                )?)
            }
        };
        Ok(directory)
    }
}

impl Validate for ScorerConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_range("match.half_duration_minutes", self.rules.half_duration_minutes, 1, 60)?;
        validation::validate_range("match.timeouts_per_half", self.rules.timeouts_per_half, 0, 10)?;
        validation::validate_range("match.raid_duration_seconds", self.rules.raid_duration_seconds, 1, 120)?;
        validation::validate_range("match.roster_size", self.rules.roster_size, 1, 12)?;
        validation::validate_range(
            "match.bonus_min_defenders",
            self.rules.bonus_min_defenders,
            0,
            self.rules.roster_size,
        )?;

        match self.storage.kind {
            StorageKind::Local => validation::validate_path("storage.path", &self.storage.path)?,
            StorageKind::Memory => {}
            StorageKind::Http => {
                let endpoint =
                    validation::validate_required_field("storage.endpoint", &self.storage.endpoint)?;
                validation::validate_url("storage.endpoint", endpoint)?;
                validation::validate_positive_number(
                    "storage.request_timeout_seconds",
                    self.storage.request_timeout_seconds,
                    1,
                )?;
            }
        }

        if self.directory.kind == DirectoryKind::Http {
            let endpoint =
                validation::validate_required_field("directory.endpoint", &self.directory.endpoint)?;
            validation::validate_url("directory.endpoint", endpoint)?;
            validation::validate_positive_number(
                "directory.request_timeout_seconds",
                self.directory.request_timeout_seconds,
                1,
            )?;
        }

        tracing::debug!("Scorer configuration validation passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_standard_rules() {
        let config = ScorerConfig::from_toml_str("").unwrap();
        assert_eq!(config.rules(), MatchRules::default());
        assert_eq!(config.storage.kind, StorageKind::Local);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parses_all_sections() {
        let config = ScorerConfig::from_toml_str(
            r#"
[match]
half_duration_minutes = 15
timeouts_per_half = 1
raid_duration_seconds = 25

[storage]
kind = "http"
endpoint = "https://scores.example.com/api"

[directory]
kind = "http"
endpoint = "https://players.example.com"

[logging]
json = true
"#,
        )
        .unwrap();

        let rules = config.rules();
        assert_eq!(rules.half_duration_seconds, 900);
        assert_eq!(rules.timeouts_per_half, 1);
        assert_eq!(rules.raid_duration_seconds, 25);
        assert_eq!(rules.roster_size, 7);
        assert!(config.logging.json);
        assert!(config.validate().is_ok());
        assert!(config.build_store().is_ok());
    }

    #[test]
    fn test_env_vars_are_substituted() {
        std::env::set_var("KABADDI_TEST_STORE_PATH", "/tmp/kabaddi-matches");
        let config = ScorerConfig::from_toml_str(
            r#"
[storage]
path = "${KABADDI_TEST_STORE_PATH}"
"#,
        )
        .unwrap();
        assert_eq!(config.storage.path, "/tmp/kabaddi-matches");
    }

    #[test]
    fn test_http_storage_needs_endpoint() {
        let config = ScorerConfig::from_toml_str(
            r#"
[storage]
kind = "http"
"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ScorerError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_http_timeouts_must_be_positive() {
        let config = ScorerConfig::from_toml_str(
            r#"
[directory]
kind = "http"
endpoint = "https://players.example.com"
request_timeout_seconds = 0
"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ScorerError::InvalidConfigValueError { ref field, .. })
                if field == "directory.request_timeout_seconds"
        ));
    }

    #[test]
    fn test_rejects_out_of_range_rules() {
        let config = ScorerConfig::from_toml_str(
            r#"
[match]
roster_size = 7
bonus_min_defenders = 9
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        assert!(ScorerConfig::from_toml_str("[match]\nhalf_duration_minutes = \"long\"").is_err());
    }
}
