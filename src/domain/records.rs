//! Canonical Resource Records
//!
//! Converts raw provider payloads into the stable attribute shape the rest
//! of the manager works with. Records are transient value objects: they are
//! built on every resolve/list/create call and never cached, so a caller
//! holding one must re-resolve to observe provider-side changes.

use crate::domain::ports::{ApiServer, ApiVolume};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::error;

// =============================================================================
// Canonical Records
// =============================================================================

/// Normalized view of a block-storage volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeRecord {
    pub id: String,
    pub size: u64,
    /// Provider-controlled status string, compared only for equality
    pub status: String,
    /// Best-effort human name; empty when the provider sent none, not unique
    pub name: String,
    pub description: Option<String>,
    /// Whether provider-side lazy attributes were fully populated
    pub loaded: bool,
    pub volume_type: String,
    pub bootable: bool,
    /// Opaque attachment descriptors in provider shape
    pub attachments: Vec<serde_json::Value>,
}

/// Normalized view of a compute instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub id: String,
    pub name: String,
    pub status: String,
    /// Name of the SSH keypair associated at creation
    pub key_name: Option<String>,
    /// Slug-like alternate identifier
    pub human_id: String,
    /// Network-name to ordered address strings
    pub networks: BTreeMap<String, Vec<String>>,
}

// =============================================================================
// Normalization
// =============================================================================

impl VolumeRecord {
    /// Project a present volume payload into its canonical record. Field
    /// contents are passed through unvalidated, with provider nulls
    /// becoming the record's empty defaults.
    pub fn from_api(volume: ApiVolume) -> Self {
        VolumeRecord {
            id: volume.id,
            size: volume.size,
            status: volume.status,
            name: volume.display_name.unwrap_or_default(),
            description: volume.display_description,
            loaded: volume.loaded,
            volume_type: volume.volume_type.unwrap_or_default(),
            bootable: volume.bootable,
            attachments: volume.attachments,
        }
    }
}

impl InstanceRecord {
    /// Project a present server payload into its canonical record. When
    /// the provider omits `human_id`, a slug of the name stands in for it.
    pub fn from_api(server: ApiServer) -> Self {
        let human_id = server
            .human_id
            .unwrap_or_else(|| slugify(&server.name));

        let networks = server
            .addresses
            .into_iter()
            .map(|(net, entries)| (net, entries.into_iter().map(|e| e.addr).collect()))
            .collect();

        InstanceRecord {
            id: server.id,
            name: server.name,
            status: server.status,
            key_name: server.key_name,
            human_id,
            networks,
        }
    }
}

/// Normalize an optional volume payload. An absent input logs one
/// diagnostic and yields `None`; a record is never partially built.
pub fn normalize_volume(raw: Option<ApiVolume>) -> Option<VolumeRecord> {
    match raw {
        Some(volume) => Some(VolumeRecord::from_api(volume)),
        None => {
            error!("empty volume");
            None
        }
    }
}

/// Normalize an optional server payload. An absent input logs one
/// diagnostic and yields `None`.
pub fn normalize_instance(raw: Option<ApiServer>) -> Option<InstanceRecord> {
    match raw {
        Some(server) => Some(InstanceRecord::from_api(server)),
        None => {
            error!("empty instance");
            None
        }
    }
}

/// Slug form of a server name: lowercase, runs of non-alphanumerics collapsed
/// to single dashes
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::ServerAddress;
    use serde_json::json;

    fn sample_volume() -> ApiVolume {
        ApiVolume {
            id: "vol-1".into(),
            size: 3,
            status: "available".into(),
            display_name: Some("d1".into()),
            display_description: Some("scratch disk".into()),
            volume_type: Some("lvm".into()),
            bootable: true,
            attachments: vec![json!({"server_id": "s1", "device": "/dev/vdb"})],
            loaded: true,
        }
    }

    fn sample_server() -> ApiServer {
        ApiServer {
            id: "ins-1".into(),
            name: "Build Host 01".into(),
            status: "ACTIVE".into(),
            key_name: Some("cloud-key".into()),
            human_id: None,
            addresses: BTreeMap::from([(
                "private".to_string(),
                vec![
                    ServerAddress { addr: "10.0.0.5".into(), version: Some(4) },
                    ServerAddress { addr: "10.0.0.6".into(), version: Some(4) },
                ],
            )]),
        }
    }

    #[test]
    fn test_volume_projection() {
        let record = normalize_volume(Some(sample_volume())).unwrap();
        assert_eq!(record.id, "vol-1");
        assert_eq!(record.size, 3);
        assert_eq!(record.status, "available");
        assert_eq!(record.name, "d1");
        assert_eq!(record.description.as_deref(), Some("scratch disk"));
        assert!(record.loaded);
        assert_eq!(record.volume_type, "lvm");
        assert!(record.bootable);
        assert_eq!(record.attachments.len(), 1);
    }

    #[test]
    fn test_volume_null_defaults() {
        let raw = ApiVolume {
            id: "vol-2".into(),
            size: 1,
            status: "creating".into(),
            display_name: None,
            display_description: None,
            volume_type: None,
            bootable: false,
            attachments: vec![],
            loaded: false,
        };
        let record = normalize_volume(Some(raw)).unwrap();
        assert_eq!(record.name, "");
        assert_eq!(record.description, None);
        assert_eq!(record.volume_type, "");
        assert!(!record.loaded);
    }

    #[test]
    fn test_absent_volume_is_none() {
        assert_eq!(normalize_volume(None), None);
    }

    #[test]
    fn test_instance_projection() {
        let record = normalize_instance(Some(sample_server())).unwrap();
        assert_eq!(record.id, "ins-1");
        assert_eq!(record.name, "Build Host 01");
        assert_eq!(record.status, "ACTIVE");
        assert_eq!(record.key_name.as_deref(), Some("cloud-key"));
        assert_eq!(record.human_id, "build-host-01");
        assert_eq!(
            record.networks["private"],
            vec!["10.0.0.5".to_string(), "10.0.0.6".to_string()]
        );
    }

    #[test]
    fn test_instance_keeps_provider_human_id() {
        let mut server = sample_server();
        server.human_id = Some("build-host".into());
        let record = normalize_instance(Some(server)).unwrap();
        assert_eq!(record.human_id, "build-host");
    }

    #[test]
    fn test_absent_instance_is_none() {
        assert_eq!(normalize_instance(None), None);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Build Host 01"), "build-host-01");
        assert_eq!(slugify("web_frontend.prod"), "web-frontend-prod");
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("---"), "");
    }
}
