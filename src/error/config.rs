use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {var}: {reason}")]
    InvalidEnvValue { var: String, reason: String },
    #[error("Minimum delay {min_ms}ms exceeds maximum delay {max_ms}ms")]
    InvalidDelayRange { min_ms: u64, max_ms: u64 },
}
