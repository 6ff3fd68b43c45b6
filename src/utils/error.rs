use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrbitError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration field '{field}' is invalid: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Authentication failed: {message}")]
    AuthError { message: String },

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    #[error("Backend returned {status}: {message}")]
    BackendError { status: u16, message: String },

    #[error("Could not update follow status for {id}")]
    FollowUpdateFailed { id: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Auth,
    Data,
    Config,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl OrbitError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            OrbitError::ApiError(_)
            | OrbitError::BackendError { .. }
            | OrbitError::FollowUpdateFailed { .. } => ErrorCategory::Network,
            OrbitError::AuthError { .. } | OrbitError::NotAuthenticated => ErrorCategory::Auth,
            OrbitError::CsvError(_)
            | OrbitError::SerializationError(_)
            | OrbitError::NotFound { .. }
            | OrbitError::ValidationError { .. } => ErrorCategory::Data,
            OrbitError::ConfigError { .. }
            | OrbitError::ConfigValidationError { .. }
            | OrbitError::InvalidConfigValueError { .. } => ErrorCategory::Config,
            OrbitError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            OrbitError::NotFound { .. } => ErrorSeverity::Low,
            OrbitError::ApiError(_) | OrbitError::FollowUpdateFailed { .. } => {
                ErrorSeverity::Medium
            }
            // 5xx 通常是暫時性的，可以重試
            OrbitError::BackendError { status, .. } if *status >= 500 => ErrorSeverity::Medium,
            OrbitError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            OrbitError::ApiError(_) => "Check your network connection and the backend URL",
            OrbitError::BackendError { status, .. } if *status >= 500 => {
                "The backend is having trouble, try again in a moment"
            }
            OrbitError::BackendError { .. } => {
                "Check that your account is allowed to access this data"
            }
            OrbitError::FollowUpdateFailed { .. } => "Try again, nothing was changed",
            OrbitError::AuthError { .. } => "Check your email and password",
            OrbitError::NotAuthenticated => "Run `orbit login` first",
            OrbitError::NotFound { .. } => "Check the id, or use `orbit search` to find it",
            OrbitError::ConfigError { .. }
            | OrbitError::ConfigValidationError { .. }
            | OrbitError::InvalidConfigValueError { .. } => {
                "Fix the configuration file or the command line flags"
            }
            OrbitError::SerializationError(_) | OrbitError::CsvError(_) => {
                "The data could not be read, check the input format"
            }
            OrbitError::IoError(_) => "Check file permissions and available disk space",
            OrbitError::ValidationError { .. } => "Check the command arguments",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            OrbitError::ApiError(e) if e.is_timeout() => {
                "The backend did not respond in time".to_string()
            }
            OrbitError::ApiError(_) => "Could not reach the backend".to_string(),
            OrbitError::NotAuthenticated => "You are not signed in".to_string(),
            OrbitError::AuthError { message } => format!("Sign in failed: {}", message),
            OrbitError::NotFound { resource, id } => format!("No {} with id {}", resource, id),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OrbitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_of_backend_errors() {
        let transient = OrbitError::BackendError {
            status: 503,
            message: "unavailable".to_string(),
        };
        let denied = OrbitError::BackendError {
            status: 403,
            message: "denied".to_string(),
        };

        assert_eq!(transient.severity(), ErrorSeverity::Medium);
        assert_eq!(denied.severity(), ErrorSeverity::High);
        assert_eq!(transient.category(), ErrorCategory::Network);
    }

    #[test]
    fn test_user_friendly_message() {
        let err = OrbitError::NotFound {
            resource: "athlete".to_string(),
            id: "42".to_string(),
        };
        assert_eq!(err.user_friendly_message(), "No athlete with id 42");
        assert_eq!(err.severity(), ErrorSeverity::Low);

        assert_eq!(
            OrbitError::NotAuthenticated.recovery_suggestion(),
            "Run `orbit login` first"
        );
    }
}
