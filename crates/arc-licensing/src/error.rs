use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LicenseError {
    #[error("failed to read public key file {path}: {source}")]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse public key: {0}")]
    KeyParse(#[source] jsonwebtoken::errors::Error),
    #[error("unexpected signing method: {0}")]
    UnexpectedSigningMethod(String),
    #[error("invalid license: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("invalid license claims: {0}")]
    InvalidClaims(String),
    #[error("license expired")]
    Expired,
    #[error("no active license found")]
    NoLicense,
    #[error("license limit exceeded: {metric} at {usage} of {limit}")]
    LimitExceeded {
        metric: &'static str,
        usage: i64,
        limit: i64,
    },
    #[error("failed to read license file {path}: {source}")]
    LicenseFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LicenseError {
    /// True for failures that mean the token itself cannot be trusted.
    pub fn is_verification(&self) -> bool {
        matches!(
            self,
            LicenseError::UnexpectedSigningMethod(_)
                | LicenseError::InvalidToken(_)
                | LicenseError::InvalidClaims(_)
        )
    }

    pub fn metric_label(&self) -> &'static str {
        match self {
            LicenseError::KeyRead { .. } => "key_read",
            LicenseError::KeyParse(_) => "key_parse",
            LicenseError::UnexpectedSigningMethod(_) => "signing_method",
            LicenseError::InvalidToken(_) => "invalid_token",
            LicenseError::InvalidClaims(_) => "invalid_claims",
            LicenseError::Expired => "expired",
            LicenseError::NoLicense => "no_license",
            LicenseError::LimitExceeded { .. } => "limit_exceeded",
            LicenseError::LicenseFileRead { .. } => "license_file_read",
        }
    }
}

#[derive(Debug, Error)]
pub enum UsageError {
    #[error("usage store error: {0}")]
    Store(#[from] redis::RedisError),
}
