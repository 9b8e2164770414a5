use thiserror::Error;

#[derive(Error, Debug)]
pub enum SmokeError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV report error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Requirement cycle detected: {cycle}")]
    RequirementCycleError { cycle: String },

    #[error("{package} requires {required}, but the loaded recipe set provides {found}")]
    RequirementConflictError {
        package: String,
        required: String,
        found: String,
    },

    #[error("Checksum mismatch for {package}: expected {expected}, got {actual}")]
    ChecksumMismatchError {
        package: String,
        expected: String,
        actual: String,
    },

    #[error("{failed} of {total} smoke tests failed, report at {report}")]
    VerificationFailedError {
        failed: usize,
        total: usize,
        report: String,
    },

    #[error("Processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Network,
    Data,
    Process,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SmokeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SmokeError::ConfigValidationError { .. }
            | SmokeError::InvalidConfigValueError { .. }
            | SmokeError::MissingConfigError { .. } => ErrorCategory::Config,
            SmokeError::HttpError(_) => ErrorCategory::Network,
            SmokeError::RequirementCycleError { .. }
            | SmokeError::RequirementConflictError { .. }
            | SmokeError::ChecksumMismatchError { .. } => ErrorCategory::Data,
            SmokeError::VerificationFailedError { .. } | SmokeError::ProcessingError { .. } => {
                ErrorCategory::Process
            }
            SmokeError::ZipError(_)
            | SmokeError::CsvError(_)
            | SmokeError::IoError(_)
            | SmokeError::SerializationError(_) => ErrorCategory::System,
        }
    }

    /// 嚴重程度決定 CLI 的退出碼
    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Config => ErrorSeverity::High,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Process => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            SmokeError::ZipError(_) => {
                "Check that the output directory is writable and not full".to_string()
            }
            SmokeError::HttpError(_) => {
                "Check network connectivity and the source URL, then retry".to_string()
            }
            SmokeError::CsvError(_) | SmokeError::SerializationError(_) => {
                "Report content could not be encoded, re-run with --verbose for details".to_string()
            }
            SmokeError::IoError(_) => "Check file permissions and paths".to_string(),
            SmokeError::ConfigValidationError { field, .. }
            | SmokeError::InvalidConfigValueError { field, .. } => {
                format!("Fix the '{}' setting and run again", field)
            }
            SmokeError::MissingConfigError { field } => {
                format!("Provide a value for '{}'", field)
            }
            SmokeError::RequirementCycleError { .. } => {
                "Break the requirement cycle between the listed recipes".to_string()
            }
            SmokeError::RequirementConflictError { package, .. } => {
                format!("Align the version pinned by '{}' with the loaded recipe", package)
            }
            SmokeError::ChecksumMismatchError { package, .. } => {
                format!("Re-download the source for '{}' or update its sha256", package)
            }
            SmokeError::VerificationFailedError { report, .. } => {
                format!("Inspect failures.json inside {}", report)
            }
            SmokeError::ProcessingError { .. } => {
                "Re-run with --verbose to see the failing stage".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SmokeError::HttpError(_) => "A source download failed".to_string(),
            SmokeError::VerificationFailedError { failed, total, .. } => {
                format!("{} of {} packages failed their smoke test", failed, total)
            }
            SmokeError::ConfigValidationError { .. }
            | SmokeError::InvalidConfigValueError { .. }
            | SmokeError::MissingConfigError { .. } => {
                format!("Configuration problem: {}", self)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SmokeError>;
