use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("DBC parse error in {file} at line {line}: {message}")]
    DbcParseError {
        file: String,
        line: usize,
        message: String,
    },

    #[error("Failed to decode frame 0x{frame_id:X}: {message}")]
    DecodeError { frame_id: u32, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Decoding,
    Output,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ConvertError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::ProcessingError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ValidationError { .. } => ErrorCategory::Configuration,
            Self::DbcParseError { .. } => ErrorCategory::Input,
            Self::DecodeError { .. } => ErrorCategory::Decoding,
            Self::CsvError(_) | Self::SerializationError(_) | Self::ProcessingError { .. } => {
                ErrorCategory::Output
            }
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::DecodeError { .. } => ErrorSeverity::Low,
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ValidationError { .. } => ErrorSeverity::Medium,
            Self::DbcParseError { .. }
            | Self::CsvError(_)
            | Self::SerializationError(_)
            | Self::ProcessingError { .. } => ErrorSeverity::High,
            Self::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::IoError(e) => format!("File system error: {}", e),
            Self::CsvError(e) => format!("Could not read or write CSV data: {}", e),
            Self::SerializationError(e) => format!("Could not read or write JSON: {}", e),
            Self::ConfigError { message } => format!("Configuration problem: {}", message),
            Self::MissingConfigError { field } => {
                format!("Required setting '{}' is not set", field)
            }
            Self::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            Self::DbcParseError { file, line, message } => {
                format!("DBC file {} could not be parsed (line {}): {}", file, line, message)
            }
            Self::DecodeError { frame_id, message } => {
                format!("Frame 0x{:X} could not be decoded: {}", frame_id, message)
            }
            Self::ProcessingError { message } => format!("Conversion failed: {}", message),
            Self::ValidationError { message } => format!("Invalid input: {}", message),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::IoError(_) => "Check that the paths exist and that you have read/write permission",
            Self::CsvError(_) => "Check that the output directory is writable and the CSV file is not open elsewhere",
            Self::SerializationError(_) => "Check the JSON syntax of the configuration file",
            Self::ConfigError { .. } | Self::MissingConfigError { .. } => {
                "Run `asc-to-csv init` and edit config.json, or pass the value on the command line"
            }
            Self::InvalidConfigValueError { .. } | Self::ValidationError { .. } => {
                "Fix the reported setting in config.json or the command line and retry"
            }
            Self::DbcParseError { .. } => "Verify the DBC file with your CAN tooling and remove malformed lines",
            Self::DecodeError { .. } => "Make sure the DBC matches the bus the ASC log was recorded on",
            Self::ProcessingError { .. } => "Re-run with --debug for details",
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_errors_are_critical() {
        let err = ConvertError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "x"));
        assert_eq!(err.category(), ErrorCategory::System);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_config_error_message() {
        let err = ConvertError::MissingConfigError {
            field: "asc_file".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(err.user_friendly_message().contains("asc_file"));
        assert!(err.recovery_suggestion().contains("init"));
    }
}
