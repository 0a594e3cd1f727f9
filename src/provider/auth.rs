//! Token authentication against the provider's authority URL
//!
//! Implements the v2-style password flow: one POST to `{auth_url}/tokens`
//! yields a token id, its expiry, and a service catalog naming the public
//! endpoint of each provider service. Failures here are not wrapped into
//! the manager's own error kinds beyond [`Error::Auth`]; the provider's
//! reason text is carried verbatim.

use crate::error::{Error, Result};
use crate::provider::ProviderConfig;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Service catalog type of the block-storage service
pub const SERVICE_BLOCK_STORAGE: &str = "volume";

/// Service catalog type of the compute service
pub const SERVICE_COMPUTE: &str = "compute";

/// Tokens within this window of expiry are treated as already expired, so a
/// token never dies mid-operation.
const EXPIRY_SLACK_SECS: i64 = 60;

// =============================================================================
// Token Session
// =============================================================================

/// An authenticated session: the token plus the endpoints it unlocks
#[derive(Debug, Clone)]
pub struct TokenSession {
    pub token: String,
    pub expires: Option<DateTime<Utc>>,
    /// Service type to public endpoint URL
    endpoints: BTreeMap<String, String>,
}

impl TokenSession {
    /// Whether the token is expired or close enough to count as expired
    pub fn is_expired(&self) -> bool {
        match self.expires {
            Some(expires) => Utc::now() + Duration::seconds(EXPIRY_SLACK_SECS) >= expires,
            None => false,
        }
    }

    /// Look up the public endpoint for a service type from the catalog
    pub fn endpoint(&self, service_type: &str) -> Result<&str> {
        self.endpoints
            .get(service_type)
            .map(String::as_str)
            .ok_or_else(|| Error::Auth {
                reason: format!("service catalog has no '{service_type}' endpoint"),
            })
    }
}

// =============================================================================
// Wire Payloads
// =============================================================================

#[derive(Serialize)]
struct AuthRequest<'a> {
    auth: AuthPayload<'a>,
}

#[derive(Serialize)]
struct AuthPayload<'a> {
    #[serde(rename = "passwordCredentials")]
    password_credentials: PasswordCredentials<'a>,
    #[serde(rename = "tenantName")]
    tenant_name: &'a str,
}

#[derive(Serialize)]
struct PasswordCredentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct AuthResponse {
    access: Access,
}

#[derive(Deserialize)]
struct Access {
    token: Token,
    #[serde(rename = "serviceCatalog", default)]
    service_catalog: Vec<CatalogEntry>,
}

#[derive(Deserialize)]
struct Token {
    id: String,
    #[serde(default)]
    expires: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct CatalogEntry {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    endpoints: Vec<CatalogEndpoint>,
}

#[derive(Deserialize)]
struct CatalogEndpoint {
    #[serde(rename = "publicURL")]
    public_url: String,
}

// =============================================================================
// Authentication
// =============================================================================

/// Authenticate against the authority URL and build a token session
pub async fn authenticate(
    http: &reqwest::Client,
    config: &ProviderConfig,
) -> Result<TokenSession> {
    let url = format!("{}/tokens", config.auth_url.trim_end_matches('/'));
    debug!("authenticating against {}", url);

    let body = AuthRequest {
        auth: AuthPayload {
            password_credentials: PasswordCredentials {
                username: &config.username,
                password: &config.password,
            },
            tenant_name: &config.tenant,
        },
    };

    let resp = http.post(&url).json(&body).send().await?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        return Err(Error::Auth {
            reason: format!("token request failed ({status}): {text}"),
        });
    }

    let parsed: AuthResponse = resp.json().await?;
    Ok(session_from_response(parsed))
}

fn session_from_response(resp: AuthResponse) -> TokenSession {
    let endpoints = resp
        .access
        .service_catalog
        .into_iter()
        .filter_map(|entry| {
            entry
                .endpoints
                .into_iter()
                .next()
                .map(|ep| (entry.service_type, ep.public_url))
        })
        .collect();

    TokenSession {
        token: resp.access.token.id,
        expires: resp.access.token.expires,
        endpoints,
    }
}
