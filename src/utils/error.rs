use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Archive responded with HTTP {status} for {url}")]
    HttpStatusError { status: u16, url: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Image encoding error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("FITS error: {message}")]
    FitsError { message: String },

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

    #[error("Input error: {message}")]
    InputError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Io,
    Format,
    Configuration,
    UserInput,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ClassifierError {
    pub fn fits(message: impl Into<String>) -> Self {
        Self::FitsError {
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::ProcessingError {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ApiError(_) | Self::HttpStatusError { .. } => ErrorCategory::Network,
            Self::IoError(_) => ErrorCategory::Io,
            Self::CsvError(_)
            | Self::SerializationError(_)
            | Self::ImageError(_)
            | Self::FitsError { .. } => ErrorCategory::Format,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::InputError { .. } => ErrorCategory::UserInput,
            Self::ProcessingError { .. } | Self::ValidationError { .. } => {
                ErrorCategory::Processing
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::UserInput => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Format | ErrorCategory::Processing => ErrorSeverity::High,
            ErrorCategory::Io | ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    /// 給終端使用者看的簡短訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ApiError(_) | Self::HttpStatusError { .. } => {
                "Could not download the spectrum from the archive".to_string()
            }
            Self::IoError(e) => format!("A file operation failed: {}", e),
            Self::FitsError { message } => format!("The FITS file could not be read: {}", message),
            Self::ImageError(_) => "The spectrum plot could not be rendered".to_string(),
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => format!("Invalid configuration: {}", self),
            Self::InputError { message } => message.clone(),
            Self::ProcessingError { message } | Self::ValidationError { message } => {
                format!("The spectrum could not be analysed: {}", message)
            }
            Self::CsvError(_) | Self::SerializationError(_) => {
                "The results could not be written".to_string()
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "檢查網路連線，或改用本地 FITS 檔案",
            ErrorCategory::Io => "確認輸出目錄可寫入且磁碟空間足夠",
            ErrorCategory::Format => "確認輸入檔為有效的 FITS 光譜檔",
            ErrorCategory::Configuration => "檢查 config/settings.toml 的內容",
            ErrorCategory::UserInput => "重新執行並依提示輸入",
            ErrorCategory::Processing => "光譜樣本數可能太少，請換一個光譜再試",
        }
    }
}

pub type Result<T> = std::result::Result<T, ClassifierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_follows_category() {
        let err = ClassifierError::fits("missing END card");
        assert_eq!(err.category(), ErrorCategory::Format);
        assert_eq!(err.severity(), ErrorSeverity::High);

        let err = ClassifierError::MissingConfigError {
            field: "source.archive_url".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);

        let err = ClassifierError::InputError {
            message: "no input".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Low);
    }

    #[test]
    fn test_user_friendly_message() {
        let err = ClassifierError::processing("spectrum has 10 samples");
        assert!(err.user_friendly_message().contains("10 samples"));
    }
}
