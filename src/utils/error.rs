use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScorerError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("{message}")]
    ValidationError { message: String },

    #[error("Player '{player_id}' is not on {team}")]
    UnknownPlayerError { player_id: String, team: String },

    #[error("Match store error: {message}")]
    StoreError { message: String },

    #[error("Player directory error: {message}")]
    DirectoryError { message: String },

    #[error("The match session has shut down")]
    SessionClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Configuration,
    Collaborator,
    Contract,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ScorerError {
    pub fn validation(message: impl Into<String>) -> Self {
        ScorerError::ValidationError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ScorerError::ValidationError { .. } => ErrorCategory::Input,
            ScorerError::ConfigError { .. }
            | ScorerError::ConfigValidationError { .. }
            | ScorerError::InvalidConfigValueError { .. }
            | ScorerError::MissingConfigError { .. } => ErrorCategory::Configuration,
            ScorerError::HttpError(_)
            | ScorerError::IoError(_)
            | ScorerError::SerializationError(_)
            | ScorerError::StoreError { .. }
            | ScorerError::DirectoryError { .. } => ErrorCategory::Collaborator,
            ScorerError::UnknownPlayerError { .. } | ScorerError::SessionClosed => {
                ErrorCategory::Contract
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::Low,
            ErrorCategory::Collaborator => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Contract => ErrorSeverity::Critical,
        }
    }

    /// Notice suitable for showing to the scorer at the table.
    pub fn user_friendly_message(&self) -> String {
        match self {
            ScorerError::ValidationError { message } => message.clone(),
            ScorerError::UnknownPlayerError { player_id, .. } => {
                format!("Player {} is not part of this raid's teams", player_id)
            }
            ScorerError::HttpError(_) | ScorerError::StoreError { .. } => {
                "The match could not be synced; scoring continues locally".to_string()
            }
            ScorerError::DirectoryError { .. } => {
                "The player directory is unavailable".to_string()
            }
            ScorerError::IoError(e) => format!("File access failed: {}", e),
            ScorerError::SerializationError(_) => "Saved match data is unreadable".to_string(),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        if let ScorerError::SessionClosed = self {
            return "Restart the scorer; the last saved state will be resumed";
        }
        match self.category() {
            ErrorCategory::Input => "Correct the entry and try again",
            ErrorCategory::Configuration => "Check the configuration file and command-line flags",
            ErrorCategory::Collaborator => "Check connectivity or the data directory; the match keeps running in memory",
            ErrorCategory::Contract => "Select players from the current rosters only",
        }
    }
}

pub type Result<T> = std::result::Result<T, ScorerError>;
