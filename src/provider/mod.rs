//! Provider HTTP Adapters
//!
//! Concrete clients for the provider's block-storage and compute services:
//! - [`auth`]: token authentication against the shared authority URL
//! - [`blockstorage`]: volume listing, lookup, create/delete and
//!   attach/detach actions
//! - [`compute`]: server listing, lookup, and floating-address actions

pub mod auth;
pub mod blockstorage;
pub mod compute;

pub use blockstorage::HttpBlockStorage;
pub use compute::HttpCompute;

use crate::domain::ports::{BlockStorageRef, ComputeRef};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Header carrying the session token on every provider call
pub(crate) const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

// =============================================================================
// Configuration
// =============================================================================

/// Credentials and authority shared by both provider services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Authority (identity service) URL
    pub auth_url: String,
    /// User name
    pub username: String,
    /// Password (should come from secrets in production)
    pub password: String,
    /// Tenant/project name
    pub tenant: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            auth_url: "http://127.0.0.1:5000/v2.0".to_string(),
            username: "admin".to_string(),
            password: String::new(),
            tenant: "admin".to_string(),
        }
    }
}

impl ProviderConfig {
    /// Load credentials from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Factory for the two independent provider client handles
pub struct ProviderFactory;

impl ProviderFactory {
    /// Build a block-storage handle for the given credentials
    pub fn block_storage(config: ProviderConfig) -> BlockStorageRef {
        Arc::new(HttpBlockStorage::new(config))
    }

    /// Build a compute handle for the given credentials
    pub fn compute(config: ProviderConfig) -> ComputeRef {
        Arc::new(HttpCompute::new(config))
    }
}

// =============================================================================
// Shared Response Handling
// =============================================================================

/// Map an unsuccessful provider response to the error taxonomy: 404 means
/// the referenced resource does not exist, everything else passes through
/// as an unclassified API error carrying the body text.
pub(crate) async fn error_from_response(
    resp: reqwest::Response,
    kind: &str,
    reference: &str,
) -> Error {
    let status = resp.status().as_u16();
    if status == 404 {
        return Error::NotFound {
            kind: kind.to_string(),
            reference: reference.to_string(),
        };
    }
    let message = resp.text().await.unwrap_or_default();
    Error::Api { status, message }
}
