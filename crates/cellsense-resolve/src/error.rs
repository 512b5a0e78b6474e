//! Errors from providers and configuration loading.

use std::time::Duration;

use thiserror::Error;

/// Failure of an external layout/legend provider.
///
/// Callers never see these from the resolution API; they are logged and the
/// default hint or local classification is used instead.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider did not answer within {0:?}")]
    Timeout(Duration),
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("provider returned an invalid response: {0}")]
    InvalidResponse(String),
    #[error("provider response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure while loading or validating a [`crate::ResolverConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration field `{field}`: {message}")]
    Invalid { field: &'static str, message: String },
}
