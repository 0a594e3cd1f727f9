//! Resource Resolution
//!
//! Turns an id-or-name reference into a canonical record. The id path is a
//! single direct lookup and always wins when both references are supplied;
//! the name path fetches the full listing, normalizes every entry, and
//! returns the first whose name matches. Nothing is cached between calls:
//! two consecutive name resolutions re-fetch and re-scan the listing.

use crate::domain::ports::{BlockStorageApi, ComputeApi};
use crate::domain::records::{normalize_instance, normalize_volume, InstanceRecord, VolumeRecord};
use crate::error::{Error, Result};
use tracing::debug;

/// Resolve a volume reference to its canonical record.
///
/// A provider "not found" on the id path fails with [`Error::NotFound`];
/// any other id-path failure propagates unclassified and never falls back
/// to name matching.
pub async fn resolve_volume(
    api: &dyn BlockStorageApi,
    id: Option<&str>,
    name: Option<&str>,
) -> Result<VolumeRecord> {
    if let Some(id) = id {
        debug!("get volume by id");
        let raw = api.get(id).await?;
        return Ok(VolumeRecord::from_api(raw));
    }

    let Some(name) = name else {
        return Err(Error::NotFound {
            kind: "volume".into(),
            reference: "<unspecified>".into(),
        });
    };

    debug!("get volume by name");
    for raw in api.list().await? {
        if let Some(record) = normalize_volume(Some(raw)) {
            if record.name == name {
                return Ok(record);
            }
        }
    }

    Err(Error::NotFound {
        kind: "volume".into(),
        reference: name.into(),
    })
}

/// Resolve an instance reference to its canonical record.
///
/// Same shape as [`resolve_volume`]: id wins, name falls back to a linear
/// scan of the listing in listing order.
pub async fn resolve_instance(
    api: &dyn ComputeApi,
    id: Option<&str>,
    name: Option<&str>,
) -> Result<InstanceRecord> {
    if let Some(id) = id {
        debug!("get instance by id");
        let raw = api.get(id).await?;
        return Ok(InstanceRecord::from_api(raw));
    }

    let Some(name) = name else {
        return Err(Error::NotFound {
            kind: "instance".into(),
            reference: "<unspecified>".into(),
        });
    };

    debug!("get instance by name");
    for raw in api.list().await? {
        if let Some(record) = normalize_instance(Some(raw)) {
            if record.name == name {
                return Ok(record);
            }
        }
    }

    Err(Error::NotFound {
        kind: "instance".into(),
        reference: name.into(),
    })
}
