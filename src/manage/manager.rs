//! Operation Layer
//!
//! [`CloudManager`] drives the multi-step volume and instance operations:
//! each one resolves name references to ids first, re-fetches the live
//! resource where a destructive call follows, and re-resolves afterwards
//! where the caller needs the post-operation state. Every step is one
//! provider round trip, strictly sequential within the operation.

use crate::domain::ports::{BlockStorageRef, ComputeRef};
use crate::domain::records::{
    normalize_instance, normalize_volume, InstanceRecord, VolumeRecord,
};
use crate::error::Result;
use crate::manage::resolver::{resolve_instance, resolve_volume};
use crate::provider::{ProviderConfig, ProviderFactory};
use tracing::debug;

/// Management facade over one block-storage and one compute handle
pub struct CloudManager {
    block: BlockStorageRef,
    compute: ComputeRef,
}

impl CloudManager {
    /// Build a manager over existing provider handles
    pub fn new(block: BlockStorageRef, compute: ComputeRef) -> Self {
        Self { block, compute }
    }

    /// Build a manager with HTTP handles for the given credentials.
    ///
    /// Both handles authenticate independently on first use; an
    /// authentication failure surfaces from whichever operation touches the
    /// provider first.
    pub fn connect(config: ProviderConfig) -> Self {
        Self {
            block: ProviderFactory::block_storage(config.clone()),
            compute: ProviderFactory::compute(config),
        }
    }

    // =========================================================================
    // Volume Operations
    // =========================================================================

    /// List all volumes as canonical records
    pub async fn volume_list(&self) -> Result<Vec<VolumeRecord>> {
        debug!("get list volumes");
        let volumes = self.block.list().await?;
        Ok(volumes
            .into_iter()
            .filter_map(|v| normalize_volume(Some(v)))
            .collect())
    }

    /// Create a volume; the provider assigns the id and the initial status
    /// (commonly still in progress). Callers poll [`volume_get`] until the
    /// status stabilizes; no polling happens here.
    ///
    /// [`volume_get`]: CloudManager::volume_get
    pub async fn volume_create(
        &self,
        size: u64,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<VolumeRecord> {
        debug!("create volume");
        let created = self.block.create(size, name, description).await?;
        Ok(VolumeRecord::from_api(created))
    }

    /// Get a volume by id or name; id wins when both are supplied
    pub async fn volume_get(&self, id: Option<&str>, name: Option<&str>) -> Result<VolumeRecord> {
        resolve_volume(self.block.as_ref(), id, name).await
    }

    /// Delete a volume by id or name.
    ///
    /// The live volume is re-fetched by id before the delete is issued; a
    /// provider bad-request (e.g. the volume is still attached) becomes
    /// `Error::OperationRejected`.
    pub async fn volume_delete(&self, id: Option<&str>, name: Option<&str>) -> Result<()> {
        let vol_id = match id {
            Some(id) => {
                debug!("delete volume by id");
                id.to_string()
            }
            None => {
                debug!("delete volume by name");
                resolve_volume(self.block.as_ref(), None, name).await?.id
            }
        };

        let live = self.block.get(&vol_id).await?;
        self.block
            .delete(&live.id)
            .await
            .map_err(|e| e.reject_bad_request("volume delete"))
    }

    /// Detach a volume by id or name; same shape as [`volume_delete`]
    ///
    /// [`volume_delete`]: CloudManager::volume_delete
    pub async fn volume_detach(&self, id: Option<&str>, name: Option<&str>) -> Result<()> {
        let vol_id = match id {
            Some(id) => {
                debug!("detach volume by id");
                id.to_string()
            }
            None => {
                debug!("detach volume by name");
                resolve_volume(self.block.as_ref(), None, name).await?.id
            }
        };

        let live = self.block.get(&vol_id).await?;
        self.block
            .detach(&live.id)
            .await
            .map_err(|e| e.reject_bad_request("volume detach"))
    }

    /// Attach a volume to an instance at the given device mount point.
    ///
    /// Both references resolve independently, id over name, before the
    /// provider attach call is issued; a failure in either resolution aborts
    /// the whole operation. Returns the freshly re-resolved volume record so
    /// the caller sees the updated attachments and status.
    pub async fn volume_attach(
        &self,
        mount_point: &str,
        vol_id: Option<&str>,
        vol_name: Option<&str>,
        ins_id: Option<&str>,
        ins_name: Option<&str>,
    ) -> Result<VolumeRecord> {
        debug!("attach volume");

        let vol_id = match vol_id {
            Some(id) => id.to_string(),
            None => resolve_volume(self.block.as_ref(), None, vol_name).await?.id,
        };

        let live = self.block.get(&vol_id).await?;

        let ins_id = match ins_id {
            Some(id) => id.to_string(),
            None => {
                resolve_instance(self.compute.as_ref(), None, ins_name)
                    .await?
                    .id
            }
        };

        self.block.attach(&live.id, &ins_id, mount_point).await?;

        resolve_volume(self.block.as_ref(), Some(&vol_id), None).await
    }

    // =========================================================================
    // Instance Operations
    // =========================================================================

    /// List all instances as canonical records
    pub async fn instance_list(&self) -> Result<Vec<InstanceRecord>> {
        debug!("get list instances");
        let servers = self.compute.list().await?;
        Ok(servers
            .into_iter()
            .filter_map(|s| normalize_instance(Some(s)))
            .collect())
    }

    /// Get an instance by id or name; id wins when both are supplied
    pub async fn instance_get(
        &self,
        id: Option<&str>,
        name: Option<&str>,
    ) -> Result<InstanceRecord> {
        resolve_instance(self.compute.as_ref(), id, name).await
    }

    /// Associate a floating address with an instance, resolving by name
    /// when no id is supplied. The provider's "not found" response surfaces
    /// as `Error::NotFound`.
    pub async fn instance_attach_ip(
        &self,
        ip: &str,
        id: Option<&str>,
        name: Option<&str>,
    ) -> Result<()> {
        debug!("attach ip");
        let ins_id = match id {
            Some(id) => id.to_string(),
            None => resolve_instance(self.compute.as_ref(), None, name).await?.id,
        };

        let live = self.compute.get(&ins_id).await?;
        self.compute.add_floating_ip(&live.id, ip).await
    }

    /// Disassociate a floating address from an instance; same shape as
    /// [`instance_attach_ip`]
    ///
    /// [`instance_attach_ip`]: CloudManager::instance_attach_ip
    pub async fn instance_detach_ip(
        &self,
        ip: &str,
        id: Option<&str>,
        name: Option<&str>,
    ) -> Result<()> {
        debug!("detach ip");
        let ins_id = match id {
            Some(id) => id.to_string(),
            None => resolve_instance(self.compute.as_ref(), None, name).await?.id,
        };

        let live = self.compute.get(&ins_id).await?;
        self.compute.remove_floating_ip(&live.id, ip).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::manage::testing::{server, vol, MockBlockStorage, MockCompute};
    use assert_matches::assert_matches;
    use std::sync::Arc;

    fn manager(
        block: MockBlockStorage,
        compute: MockCompute,
    ) -> (CloudManager, Arc<MockBlockStorage>, Arc<MockCompute>) {
        let block = Arc::new(block);
        let compute = Arc::new(compute);
        (
            CloudManager::new(block.clone(), compute.clone()),
            block,
            compute,
        )
    }

    #[tokio::test]
    async fn test_volume_list_normalizes_every_entry() {
        let (mgr, block, _) =
            manager(MockBlockStorage::new(vec![vol("vol-1", "d1"), vol("vol-2", "d2")]),
                MockCompute::new(vec![]));

        let records = mgr.volume_list().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "d1");
        assert!(records[0].loaded);
        assert_eq!(block.calls(), vec!["list"]);
    }

    #[tokio::test]
    async fn test_volume_list_empty() {
        let (mgr, _, _) = manager(MockBlockStorage::new(vec![]), MockCompute::new(vec![]));
        assert!(mgr.volume_list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_then_get_by_name_round_trip() {
        let (mgr, _, _) = manager(MockBlockStorage::new(vec![]), MockCompute::new(vec![]));

        let created = mgr.volume_create(3, Some("d1"), Some("x")).await.unwrap();
        assert_eq!(created.size, 3);
        assert_eq!(created.name, "d1");

        let fetched = mgr.volume_get(None, Some("d1")).await.unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.size, 3);
        assert_eq!(fetched.description.as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn test_volume_get_prefers_id() {
        let (mgr, block, _) = manager(
            MockBlockStorage::new(vec![vol("vol-1", "d1")]),
            MockCompute::new(vec![]),
        );

        let record = mgr
            .volume_get(Some("vol-1"), Some("not-the-name"))
            .await
            .unwrap();
        assert_eq!(record.id, "vol-1");
        assert_eq!(block.calls(), vec!["get vol-1"]);
    }

    #[tokio::test]
    async fn test_volume_delete_by_id_refetches_live_volume() {
        let (mgr, block, _) = manager(
            MockBlockStorage::new(vec![vol("vol-1", "d1")]),
            MockCompute::new(vec![]),
        );

        mgr.volume_delete(Some("vol-1"), None).await.unwrap();
        assert_eq!(block.calls(), vec!["get vol-1", "delete vol-1"]);
    }

    #[tokio::test]
    async fn test_volume_delete_by_name_resolves_first() {
        let (mgr, block, _) = manager(
            MockBlockStorage::new(vec![vol("vol-1", "d1")]),
            MockCompute::new(vec![]),
        );

        mgr.volume_delete(None, Some("d1")).await.unwrap();
        assert_eq!(block.calls(), vec!["list", "get vol-1", "delete vol-1"]);
    }

    #[tokio::test]
    async fn test_volume_delete_unknown_name() {
        let (mgr, block, _) = manager(
            MockBlockStorage::new(vec![vol("vol-1", "d1")]),
            MockCompute::new(vec![]),
        );

        let err = mgr.volume_delete(None, Some("missing-xyz")).await.unwrap_err();
        assert!(err.is_not_found());
        // resolution failed, nothing destructive was attempted
        assert_eq!(block.calls(), vec!["list"]);
    }

    #[tokio::test]
    async fn test_volume_delete_rejected_translates() {
        let mut block = MockBlockStorage::new(vec![vol("vol-1", "d1")]);
        block.reject_delete = true;
        let (mgr, _, _) = manager(block, MockCompute::new(vec![]));

        let err = mgr.volume_delete(None, Some("d1")).await.unwrap_err();
        assert_matches!(err, Error::OperationRejected { operation, .. }
            if operation == "volume delete");
    }

    #[tokio::test]
    async fn test_volume_detach_rejected_translates() {
        let mut block = MockBlockStorage::new(vec![vol("vol-1", "d1")]);
        block.reject_detach = true;
        let (mgr, _, _) = manager(block, MockCompute::new(vec![]));

        let err = mgr.volume_detach(Some("vol-1"), None).await.unwrap_err();
        assert_matches!(err, Error::OperationRejected { operation, .. }
            if operation == "volume detach");
    }

    #[tokio::test]
    async fn test_volume_detach_by_id() {
        let (mgr, block, _) = manager(
            MockBlockStorage::new(vec![vol("vol-1", "d1")]),
            MockCompute::new(vec![]),
        );

        mgr.volume_detach(Some("vol-1"), None).await.unwrap();
        assert_eq!(block.calls(), vec!["get vol-1", "detach vol-1"]);
    }

    #[tokio::test]
    async fn test_volume_attach_by_ids() {
        let (mgr, block, compute) = manager(
            MockBlockStorage::new(vec![vol("vol-1", "d1")]),
            MockCompute::new(vec![server("ins-1", "server1")]),
        );

        let record = mgr
            .volume_attach("/dev/vdn", Some("vol-1"), None, Some("ins-1"), None)
            .await
            .unwrap();
        assert_eq!(record.id, "vol-1");
        assert_eq!(
            block.calls(),
            vec!["get vol-1", "attach vol-1 ins-1 /dev/vdn", "get vol-1"]
        );
        // both ids supplied, the compute service is never consulted
        assert!(compute.calls().is_empty());
    }

    #[tokio::test]
    async fn test_volume_attach_by_names_resolves_both() {
        let (mgr, block, compute) = manager(
            MockBlockStorage::new(vec![vol("vol-1", "d1")]),
            MockCompute::new(vec![server("ins-1", "server1")]),
        );

        let record = mgr
            .volume_attach("/dev/vdn", None, Some("d1"), None, Some("server1"))
            .await
            .unwrap();
        assert_eq!(record.id, "vol-1");
        assert_eq!(
            block.calls(),
            vec!["list", "get vol-1", "attach vol-1 ins-1 /dev/vdn", "get vol-1"]
        );
        assert_eq!(compute.calls(), vec!["list"]);
    }

    #[tokio::test]
    async fn test_volume_attach_unknown_instance_aborts() {
        let (mgr, block, _) = manager(
            MockBlockStorage::new(vec![vol("vol-1", "d1")]),
            MockCompute::new(vec![server("ins-1", "server1")]),
        );

        let err = mgr
            .volume_attach("/dev/vdn", None, Some("d1"), None, Some("server9"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        // the provider attach call was never issued
        assert!(!block.calls().iter().any(|c| c.starts_with("attach")));
    }

    #[tokio::test]
    async fn test_volume_attach_unknown_volume_aborts() {
        let (mgr, block, compute) = manager(
            MockBlockStorage::new(vec![]),
            MockCompute::new(vec![server("ins-1", "server1")]),
        );

        let err = mgr
            .volume_attach("/dev/vdn", None, Some("d1"), None, Some("server1"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(block.calls(), vec!["list"]);
        assert!(compute.calls().is_empty());
    }

    #[tokio::test]
    async fn test_instance_list() {
        let (mgr, _, compute) = manager(
            MockBlockStorage::new(vec![]),
            MockCompute::new(vec![server("ins-1", "server1")]),
        );

        let records = mgr.instance_list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].networks["private"], vec!["10.0.0.5".to_string()]);
        assert_eq!(compute.calls(), vec!["list"]);
    }

    #[tokio::test]
    async fn test_instance_attach_ip_by_name() {
        let (mgr, _, compute) = manager(
            MockBlockStorage::new(vec![]),
            MockCompute::new(vec![server("ins-1", "server1")]),
        );

        mgr.instance_attach_ip("198.51.100.7", None, Some("server1"))
            .await
            .unwrap();
        assert_eq!(
            compute.calls(),
            vec!["list", "get ins-1", "add_floating_ip ins-1 198.51.100.7"]
        );
    }

    #[tokio::test]
    async fn test_instance_detach_ip_by_id() {
        let (mgr, _, compute) = manager(
            MockBlockStorage::new(vec![]),
            MockCompute::new(vec![server("ins-1", "server1")]),
        );

        mgr.instance_detach_ip("198.51.100.7", Some("ins-1"), None)
            .await
            .unwrap();
        assert_eq!(
            compute.calls(),
            vec!["get ins-1", "remove_floating_ip ins-1 198.51.100.7"]
        );
    }

    #[tokio::test]
    async fn test_instance_attach_ip_provider_not_found() {
        let mut compute = MockCompute::new(vec![server("ins-1", "server1")]);
        compute.missing_floating_ip = true;
        let (mgr, _, _) = manager(MockBlockStorage::new(vec![]), compute);

        let err = mgr
            .instance_attach_ip("198.51.100.7", Some("ins-1"), None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
