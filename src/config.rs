//! Environment-driven configuration.
//!
//! The encryption key and the S3 target are supplied out-of-band through
//! environment variables. Missing required values are fatal configuration
//! errors raised before anything is mutated, never silent no-ops.

use crate::{Error, Result};
use std::env;

/// Passphrase for at-rest encryption; required for real backups and restores
pub const ENCRYPTION_KEY_VAR: &str = "BACKUP_ENCRYPTION_KEY";

/// Target bucket for remote sync
pub const S3_BUCKET_VAR: &str = "BACKUP_S3_BUCKET";

/// Optional custom endpoint for S3-compatible, non-AWS backends
pub const S3_ENDPOINT_VAR: &str = "BACKUP_S3_ENDPOINT";

/// Region identifier; defaults to `us-east-1` like the SDK does
pub const S3_REGION_VAR: &str = "BACKUP_S3_REGION";

const DEFAULT_REGION: &str = "us-east-1";

/// Connection settings for the S3 storage backend
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

impl S3Settings {
    /// Read settings from the environment.
    ///
    /// A missing or empty bucket is a fatal configuration error; everything
    /// else is optional and falls back to the SDK's defaults.
    pub fn from_env() -> Result<Self> {
        let bucket = env_non_empty(S3_BUCKET_VAR).ok_or_else(|| {
            Error::configuration(format!("{S3_BUCKET_VAR} is not set"))
        })?;

        Ok(Self {
            bucket,
            region: env_non_empty(S3_REGION_VAR).unwrap_or_else(|| DEFAULT_REGION.to_string()),
            endpoint: env_non_empty(S3_ENDPOINT_VAR),
            access_key: env_non_empty("AWS_ACCESS_KEY_ID"),
            secret_key: env_non_empty("AWS_SECRET_ACCESS_KEY"),
        })
    }
}

/// Read the encryption passphrase from the environment, failing loudly when
/// it is absent or empty
pub fn encryption_key_from_env() -> Result<String> {
    env_non_empty(ENCRYPTION_KEY_VAR)
        .ok_or_else(|| Error::configuration(format!("{ENCRYPTION_KEY_VAR} is not set")))
}

fn env_non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}
