use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP client error: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Failed to fetch {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("Unexpected page structure ({context}): {message}")]
    Structural { context: String, message: String },

    #[error("Cannot parse value '{raw}' ({context})")]
    ValueParse { raw: String, context: String },

    #[error("Exchange rate not found: {reason}")]
    MissingRate { reason: String },

    #[error("Invalid CSS selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Extraction,
    Configuration,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Failure taxonomy recorded in the run manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    StructuralParse,
    ValueParse,
    MissingRate,
    Other,
}

impl EtlError {
    pub fn transport(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn structural(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Structural {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn value_parse(raw: impl Into<String>, context: impl Into<String>) -> Self {
        Self::ValueParse {
            raw: raw.into(),
            context: context.into(),
        }
    }

    pub fn missing_rate(reason: impl Into<String>) -> Self {
        Self::MissingRate {
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ApiError(_) | Self::Transport { .. } => ErrorCategory::Network,
            Self::Structural { .. } | Self::ValueParse { .. } | Self::MissingRate { .. } => {
                ErrorCategory::Extraction
            }
            Self::InvalidSelector { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::ZipError(_)
            | Self::CsvError(_)
            | Self::IoError(_)
            | Self::SerializationError(_) => ErrorCategory::Output,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ValueParse { .. } | Self::MissingRate { .. } => ErrorSeverity::Low,
            Self::ApiError(_) | Self::Transport { .. } => ErrorSeverity::Medium,
            Self::Structural { .. } | Self::CsvError(_) | Self::SerializationError(_) => {
                ErrorSeverity::High
            }
            Self::ZipError(_)
            | Self::IoError(_)
            | Self::InvalidSelector { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::ApiError(_) | Self::Transport { .. } => FailureKind::Transport,
            Self::Structural { .. } | Self::InvalidSelector { .. } => FailureKind::StructuralParse,
            Self::ValueParse { .. } => FailureKind::ValueParse,
            Self::MissingRate { .. } => FailureKind::MissingRate,
            _ => FailureKind::Other,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => {
                "Check network connectivity and that the source site is reachable, then retry"
            }
            ErrorCategory::Extraction => {
                "The source page layout may have changed; inspect the page and update the selectors in the config"
            }
            ErrorCategory::Configuration => "Fix the configuration file and run again",
            ErrorCategory::Output => "Check that the output path exists and is writable",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Transport { url, .. } => format!("Could not download {}", url),
            Self::ApiError(_) => "The HTTP request failed".to_string(),
            Self::Structural { context, .. } => {
                format!("The page for {} does not look like expected", context)
            }
            Self::ConfigValidationError { field, .. }
            | Self::InvalidConfigValueError { field, .. }
            | Self::MissingConfigError { field } => {
                format!("Configuration problem in '{}': {}", field, self)
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_mapping() {
        assert_eq!(
            EtlError::transport("http://x", "HTTP status 500").failure_kind(),
            FailureKind::Transport
        );
        assert_eq!(
            EtlError::structural("salary 2015", "no table").failure_kind(),
            FailureKind::StructuralParse
        );
        assert_eq!(
            EtlError::value_parse("abc", "unemployment").failure_kind(),
            FailureKind::ValueParse
        );
        assert_eq!(
            EtlError::missing_rate("no caption").failure_kind(),
            FailureKind::MissingRate
        );
    }

    #[test]
    fn test_config_errors_are_critical() {
        let err = EtlError::MissingConfigError {
            field: "salary.url_template".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.user_friendly_message().contains("salary.url_template"));
    }
}
