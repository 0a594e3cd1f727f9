//! Domain Ports - Core trait definitions for the volume manager
//!
//! These traits define the boundaries between the management logic and the
//! provider's block-storage and compute services. Adapters implement these
//! traits to provide concrete functionality.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

// =============================================================================
// Provider Resource Shapes
// =============================================================================

/// Raw volume payload as returned by the block-storage service.
///
/// Field contents are not validated here; whatever the provider sent is
/// carried through to normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiVolume {
    pub id: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub display_description: Option<String>,
    #[serde(default)]
    pub volume_type: Option<String>,
    /// Some provider versions encode this as the strings "true"/"false".
    #[serde(default, deserialize_with = "bootable_flag")]
    pub bootable: bool,
    /// Attachment descriptors, provider-defined shape, passed through opaquely.
    #[serde(default)]
    pub attachments: Vec<serde_json::Value>,
    /// Whether the payload carried the fully populated detail view.
    /// Set by the adapter that produced it, not part of the wire format.
    #[serde(skip)]
    pub loaded: bool,
}

/// Raw server payload as returned by the compute service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiServer {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub key_name: Option<String>,
    #[serde(default)]
    pub human_id: Option<String>,
    /// Network-name to address-entry mapping, in provider wire shape.
    #[serde(default)]
    pub addresses: BTreeMap<String, Vec<ServerAddress>>,
}

/// One address entry within a server's network listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerAddress {
    pub addr: String,
    #[serde(default)]
    pub version: Option<u8>,
}

fn bootable_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Text(s) => Ok(s.eq_ignore_ascii_case("true")),
    }
}

// =============================================================================
// Block Storage Port
// =============================================================================

/// Port for the block-storage provider service
#[async_trait]
pub trait BlockStorageApi: Send + Sync {
    /// Fetch the full volume listing
    async fn list(&self) -> Result<Vec<ApiVolume>>;

    /// Fetch one volume by id; fails with `Error::NotFound` when the
    /// provider reports no such volume
    async fn get(&self, id: &str) -> Result<ApiVolume>;

    /// Create a volume; the provider assigns id and initial status
    async fn create(
        &self,
        size: u64,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<ApiVolume>;

    /// Delete a volume by id
    async fn delete(&self, id: &str) -> Result<()>;

    /// Detach a volume from whatever it is attached to
    async fn detach(&self, id: &str) -> Result<()>;

    /// Attach a volume to an instance at the given device mount point
    async fn attach(&self, id: &str, instance_id: &str, mount_point: &str) -> Result<()>;
}

// =============================================================================
// Compute Port
// =============================================================================

/// Port for the compute provider service
#[async_trait]
pub trait ComputeApi: Send + Sync {
    /// Fetch the full server listing
    async fn list(&self) -> Result<Vec<ApiServer>>;

    /// Fetch one server by id; fails with `Error::NotFound` when the
    /// provider reports no such server
    async fn get(&self, id: &str) -> Result<ApiServer>;

    /// Associate a floating address with a server
    async fn add_floating_ip(&self, id: &str, ip: &str) -> Result<()>;

    /// Disassociate a floating address from a server
    async fn remove_floating_ip(&self, id: &str, ip: &str) -> Result<()>;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type BlockStorageRef = Arc<dyn BlockStorageApi>;
pub type ComputeRef = Arc<dyn ComputeApi>;
