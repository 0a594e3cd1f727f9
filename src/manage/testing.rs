//! Scripted provider mocks shared by the resolver and manager tests.
//!
//! The mocks record every provider call in order so tests can assert the
//! exact call sequence an operation issued.

use crate::domain::ports::{ApiServer, ApiVolume, BlockStorageApi, ComputeApi, ServerAddress};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// A volume payload with sensible detail-view defaults
pub(crate) fn vol(id: &str, name: &str) -> ApiVolume {
    ApiVolume {
        id: id.to_string(),
        size: 1,
        status: "available".to_string(),
        display_name: Some(name.to_string()),
        display_description: Some("test volume".to_string()),
        volume_type: Some("standard".to_string()),
        bootable: false,
        attachments: vec![],
        loaded: true,
    }
}

/// A server payload with one private address
pub(crate) fn server(id: &str, name: &str) -> ApiServer {
    ApiServer {
        id: id.to_string(),
        name: name.to_string(),
        status: "ACTIVE".to_string(),
        key_name: Some("cloud-key".to_string()),
        human_id: None,
        addresses: BTreeMap::from([(
            "private".to_string(),
            vec![ServerAddress { addr: "10.0.0.5".to_string(), version: Some(4) }],
        )]),
    }
}

// =============================================================================
// Block Storage Mock
// =============================================================================

pub(crate) struct MockBlockStorage {
    volumes: Mutex<Vec<ApiVolume>>,
    calls: Mutex<Vec<String>>,
    /// When set, delete responds with the provider's bad-request error
    pub reject_delete: bool,
    /// When set, detach responds with the provider's bad-request error
    pub reject_detach: bool,
}

impl MockBlockStorage {
    pub fn new(volumes: Vec<ApiVolume>) -> Self {
        Self {
            volumes: Mutex::new(volumes),
            calls: Mutex::new(Vec::new()),
            reject_delete: false,
            reject_detach: false,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl BlockStorageApi for MockBlockStorage {
    async fn list(&self) -> Result<Vec<ApiVolume>> {
        self.record("list".into());
        Ok(self.volumes.lock().unwrap().clone())
    }

    async fn get(&self, id: &str) -> Result<ApiVolume> {
        self.record(format!("get {id}"));
        self.volumes
            .lock()
            .unwrap()
            .iter()
            .find(|v| v.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                kind: "volume".into(),
                reference: id.into(),
            })
    }

    async fn create(
        &self,
        size: u64,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<ApiVolume> {
        self.record(format!("create {size}"));
        let mut volumes = self.volumes.lock().unwrap();
        let created = ApiVolume {
            id: format!("vol-{}", volumes.len() + 1),
            size,
            status: "creating".to_string(),
            display_name: name.map(str::to_string),
            display_description: description.map(str::to_string),
            volume_type: Some("standard".to_string()),
            bootable: false,
            attachments: vec![],
            loaded: true,
        };
        volumes.push(created.clone());
        Ok(created)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.record(format!("delete {id}"));
        if self.reject_delete {
            return Err(Error::Api {
                status: 400,
                message: "volume is attached".into(),
            });
        }
        self.volumes.lock().unwrap().retain(|v| v.id != id);
        Ok(())
    }

    async fn detach(&self, id: &str) -> Result<()> {
        self.record(format!("detach {id}"));
        if self.reject_detach {
            return Err(Error::Api {
                status: 400,
                message: "volume is not attached".into(),
            });
        }
        Ok(())
    }

    async fn attach(&self, id: &str, instance_id: &str, mount_point: &str) -> Result<()> {
        self.record(format!("attach {id} {instance_id} {mount_point}"));
        Ok(())
    }
}

// =============================================================================
// Compute Mock
// =============================================================================

pub(crate) struct MockCompute {
    servers: Vec<ApiServer>,
    calls: Mutex<Vec<String>>,
    /// When set, floating-address actions respond with the provider's
    /// not-found error
    pub missing_floating_ip: bool,
}

impl MockCompute {
    pub fn new(servers: Vec<ApiServer>) -> Self {
        Self {
            servers,
            calls: Mutex::new(Vec::new()),
            missing_floating_ip: false,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn floating_ip_result(&self, id: &str) -> Result<()> {
        if self.missing_floating_ip {
            Err(Error::NotFound {
                kind: "instance".into(),
                reference: id.into(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ComputeApi for MockCompute {
    async fn list(&self) -> Result<Vec<ApiServer>> {
        self.record("list".into());
        Ok(self.servers.clone())
    }

    async fn get(&self, id: &str) -> Result<ApiServer> {
        self.record(format!("get {id}"));
        self.servers
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                kind: "instance".into(),
                reference: id.into(),
            })
    }

    async fn add_floating_ip(&self, id: &str, ip: &str) -> Result<()> {
        self.record(format!("add_floating_ip {id} {ip}"));
        self.floating_ip_result(id)
    }

    async fn remove_floating_ip(&self, id: &str, ip: &str) -> Result<()> {
        self.record(format!("remove_floating_ip {id} {ip}"));
        self.floating_ip_result(id)
    }
}
