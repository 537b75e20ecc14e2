//! Configuration loading from the environment and command line.

use std::ffi::OsString;

use clap::Parser;
use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Missing or malformed argument / environment variable.
    #[error("{0}")]
    Parse(#[from] clap::Error),

    /// Parsed, but semantically invalid.
    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ServiceConfig {
    /// Run the semantic checks on an already parsed config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_config(self).map_err(ConfigError::Validation)
    }
}

/// Parse configuration from the given arguments (and the environment).
///
/// Validation is left to the caller so logging can be set up from the parsed
/// config before validation failures are reported.
pub fn load_config<I, T>(args: I) -> Result<ServiceConfig, ConfigError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Ok(ServiceConfig::try_parse_from(args)?)
}
