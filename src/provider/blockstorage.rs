//! Block Storage HTTP Adapter
//!
//! Implements the block-storage port against the provider's REST API,
//! authenticating lazily through the shared authority and re-authenticating
//! when the cached token nears expiry.

use crate::domain::ports::{ApiVolume, BlockStorageApi};
use crate::error::Result;
use crate::provider::auth::{self, TokenSession, SERVICE_BLOCK_STORAGE};
use crate::provider::{error_from_response, ProviderConfig, AUTH_TOKEN_HEADER};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

// =============================================================================
// Wire Payloads
// =============================================================================

#[derive(Deserialize)]
struct VolumeEnvelope {
    volume: ApiVolume,
}

#[derive(Deserialize)]
struct VolumeListEnvelope {
    volumes: Vec<ApiVolume>,
}

#[derive(Serialize)]
struct CreateVolumeRequest<'a> {
    volume: CreateVolumeBody<'a>,
}

#[derive(Serialize)]
struct CreateVolumeBody<'a> {
    size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_description: Option<&'a str>,
}

#[derive(Serialize)]
struct AttachRequest<'a> {
    #[serde(rename = "os-attach")]
    attach: AttachBody<'a>,
}

#[derive(Serialize)]
struct AttachBody<'a> {
    instance_uuid: &'a str,
    mountpoint: &'a str,
}

// =============================================================================
// Adapter
// =============================================================================

/// Block-storage client handle over the provider's REST API
pub struct HttpBlockStorage {
    http: reqwest::Client,
    config: ProviderConfig,
    session: Mutex<Option<TokenSession>>,
}

impl HttpBlockStorage {
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
            debug!("block-storage token expired, re-authenticating");
        }
        let fresh = auth::authenticate(&self.http, &self.config).await?;
        *guard = Some(fresh.clone());
        Ok(fresh)
    }

    fn volume_url(base: &str, id: &str) -> String {
        format!(
            "{}/volumes/{}",
            base.trim_end_matches('/'),
            urlencoding::encode(id)
        )
    }
}

#[async_trait]
impl BlockStorageApi for HttpBlockStorage {
    async fn list(&self) -> Result<Vec<ApiVolume>> {
        let session = self.session().await?;
        let base = session.endpoint(SERVICE_BLOCK_STORAGE)?;
        let url = format!("{}/volumes/detail", base.trim_end_matches('/'));

        let resp = self
            .http
            .get(&url)
            .header(AUTH_TOKEN_HEADER, &session.token)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(error_from_response(resp, "volume", "<listing>").await);
        }

        let body: VolumeListEnvelope = resp.json().await?;
        Ok(body
            .volumes
            .into_iter()
            .map(|mut v| {
                v.loaded = true;
                v
            })
            .collect())
    }

    async fn get(&self, id: &str) -> Result<ApiVolume> {
        let session = self.session().await?;
        let url = Self::volume_url(session.endpoint(SERVICE_BLOCK_STORAGE)?, id);

        let resp = self
            .http
            .get(&url)
            .header(AUTH_TOKEN_HEADER, &session.token)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(error_from_response(resp, "volume", id).await);
        }

        let body: VolumeEnvelope = resp.json().await?;
        let mut volume = body.volume;
        volume.loaded = true;
        Ok(volume)
    }

    async fn create(
        &self,
        size: u64,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<ApiVolume> {
        let session = self.session().await?;
        let base = session.endpoint(SERVICE_BLOCK_STORAGE)?;
        let url = format!("{}/volumes", base.trim_end_matches('/'));

        let body = CreateVolumeRequest {
            volume: CreateVolumeBody {
                size,
                display_name: name,
                display_description: description,
            },
        };

        let resp = self
            .http
            .post(&url)
            .header(AUTH_TOKEN_HEADER, &session.token)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(error_from_response(resp, "volume", name.unwrap_or("<unnamed>")).await);
        }

        let parsed: VolumeEnvelope = resp.json().await?;
        let mut volume = parsed.volume;
        volume.loaded = true;
        Ok(volume)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let session = self.session().await?;
        let url = Self::volume_url(session.endpoint(SERVICE_BLOCK_STORAGE)?, id);

        let resp = self
            .http
            .delete(&url)
            .header(AUTH_TOKEN_HEADER, &session.token)
            .send()
            .await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(resp, "volume", id).await)
        }
    }

    async fn detach(&self, id: &str) -> Result<()> {
        let session = self.session().await?;
        let url = format!(
            "{}/action",
            Self::volume_url(session.endpoint(SERVICE_BLOCK_STORAGE)?, id)
        );

        let resp = self
            .http
            .post(&url)
            .header(AUTH_TOKEN_HEADER, &session.token)
            .json(&serde_json::json!({"os-detach": {}}))
            .send()
            .await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(resp, "volume", id).await)
        }
    }

    async fn attach(&self, id: &str, instance_id: &str, mount_point: &str) -> Result<()> {
        let session = self.session().await?;
        let url = format!(
            "{}/action",
            Self::volume_url(session.endpoint(SERVICE_BLOCK_STORAGE)?, id)
        );

        let body = AttachRequest {
            attach: AttachBody {
                instance_uuid: instance_id,
                mountpoint: mount_point,
            },
        };

        let resp = self
            .http
            .post(&url)
            .header(AUTH_TOKEN_HEADER, &session.token)
            .json(&body)
            .send()
            .await?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(resp, "volume", id).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_body() {
        let body = CreateVolumeRequest {
            volume: CreateVolumeBody {
                size: 3,
                display_name: Some("d1"),
                display_description: None,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"volume": {"size": 3, "display_name": "d1"}})
        );
    }

    #[test]
    fn test_attach_request_body() {
        let body = AttachRequest {
            attach: AttachBody {
                instance_uuid: "ins-1",
                mountpoint: "/dev/vdn",
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "os-attach": {"instance_uuid": "ins-1", "mountpoint": "/dev/vdn"}
            })
        );
    }

    #[test]
    fn test_volume_envelope_parse() {
        let envelope: VolumeEnvelope = serde_json::from_str(
            r#"{"volume": {"id": "vol-1", "size": 3, "status": "creating", "bootable": "false"}}"#,
        )
        .unwrap();
        assert_eq!(envelope.volume.id, "vol-1");
        assert_eq!(envelope.volume.status, "creating");
        assert!(!envelope.volume.loaded);
    }

    #[test]
    fn test_volume_url_escapes_id() {
        let url = HttpBlockStorage::volume_url("http://host:8776/v1/t/", "vol 1");
        assert_eq!(url, "http://host:8776/v1/t/volumes/vol%201");
    }
}
