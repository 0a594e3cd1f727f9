//! Compute HTTP Adapter
//!
//! Implements the compute port against the provider's REST API. Shares the
//! authority and credential handling of the block-storage adapter but holds
//! its own independent token session.

use crate::domain::ports::{ApiServer, ComputeApi};
use crate::error::Result;
use crate::provider::auth::{self, TokenSession, SERVICE_COMPUTE};
use crate::provider::{error_from_response, ProviderConfig, AUTH_TOKEN_HEADER};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

// =============================================================================
// Wire Payloads
// =============================================================================

#[derive(Deserialize)]
struct ServerEnvelope {
    server: ApiServer,
}

#[derive(Deserialize)]
struct ServerListEnvelope {
    servers: Vec<ApiServer>,
}

#[derive(Serialize)]
struct AddFloatingIpRequest<'a> {
    #[serde(rename = "addFloatingIp")]
    body: FloatingIpBody<'a>,
}

#[derive(Serialize)]
struct RemoveFloatingIpRequest<'a> {
    #[serde(rename = "removeFloatingIp")]
    body: FloatingIpBody<'a>,
}

#[derive(Serialize)]
struct FloatingIpBody<'a> {
    address: &'a str,
}

// =============================================================================
// Adapter
// =============================================================================

/// Compute client handle over the provider's REST API
pub struct HttpCompute {
    http: reqwest::Client,
    config: ProviderConfig,
    session: Mutex<Option<TokenSession>>,
}

impl HttpCompute {
    /// Create a new handle; authentication happens on first use
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            session: Mutex::new(None),
        }
    }

    async fn session(&self) -> Result<TokenSession> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            if !session.is_expired() {
                return Ok(session.clone());
            }
            debug!("compute token expired, re-authenticating");
        }
        let fresh = auth::authenticate(&self.http, &self.config).await?;
        *guard = Some(fresh.clone());
        Ok(fresh)
    }

    fn server_url(base: &str, id: &str) -> String {
        format!(
            "{}/servers/{}",
            base.trim_end_matches('/'),
            urlencoding::encode(id)
        )
    }

    async fn server_action<B: Serialize + Sync>(&self, id: &str, body: &B) -> Result<()> {
        let session = self.session().await?;
        let url = format!(
            "{}/action",
            Self::server_url(session.endpoint(SERVICE_COMPUTE)?, id)
        );

        let resp = self
            .http
            .post(&url)
            .header(AUTH_TOKEN_HEADER, &session.token)
            .json(body)
            .send()
            .await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(resp, "instance", id).await)
        }
    }
}

#[async_trait]
impl ComputeApi for HttpCompute {
    async fn list(&self) -> Result<Vec<ApiServer>> {
        let session = self.session().await?;
        let base = session.endpoint(SERVICE_COMPUTE)?;
        let url = format!("{}/servers/detail", base.trim_end_matches('/'));

        let resp = self
            .http
            .get(&url)
            .header(AUTH_TOKEN_HEADER, &session.token)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(error_from_response(resp, "instance", "<listing>").await);
        }

        let body: ServerListEnvelope = resp.json().await?;
        Ok(body.servers)
    }

    async fn get(&self, id: &str) -> Result<ApiServer> {
        let session = self.session().await?;
        let url = Self::server_url(session.endpoint(SERVICE_COMPUTE)?, id);

        let resp = self
            .http
            .get(&url)
            .header(AUTH_TOKEN_HEADER, &session.token)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(error_from_response(resp, "instance", id).await);
        }

        let body: ServerEnvelope = resp.json().await?;
        Ok(body.server)
    }

    async fn add_floating_ip(&self, id: &str, ip: &str) -> Result<()> {
        self.server_action(id, &AddFloatingIpRequest {
            body: FloatingIpBody { address: ip },
        })
        .await
    }

    async fn remove_floating_ip(&self, id: &str, ip: &str) -> Result<()> {
        self.server_action(id, &RemoveFloatingIpRequest {
            body: FloatingIpBody { address: ip },
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floating_ip_request_bodies() {
        let add = AddFloatingIpRequest {
            body: FloatingIpBody { address: "198.51.100.7" },
        };
        assert_eq!(
            serde_json::to_value(&add).unwrap(),
            serde_json::json!({"addFloatingIp": {"address": "198.51.100.7"}})
        );

        let remove = RemoveFloatingIpRequest {
            body: FloatingIpBody { address: "198.51.100.7" },
        };
        assert_eq!(
            serde_json::to_value(&remove).unwrap(),
            serde_json::json!({"removeFloatingIp": {"address": "198.51.100.7"}})
        );
    }

    #[test]
    fn test_server_list_envelope_parse() {
        let envelope: ServerListEnvelope = serde_json::from_str(
            r#"{"servers": [
                {"id": "s1", "name": "server1", "status": "ACTIVE",
                 "key_name": "cloud-key",
                 "addresses": {"private": [{"addr": "10.0.0.5", "version": 4}]}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(envelope.servers.len(), 1);
        assert_eq!(envelope.servers[0].addresses["private"][0].addr, "10.0.0.5");
    }

    #[test]
    fn test_server_url_escapes_id() {
        let url = HttpCompute::server_url("http://host:8774/v2/t", "ins/1");
        assert_eq!(url, "http://host:8774/v2/t/servers/ins%2F1");
    }
}
