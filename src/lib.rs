//! Cloud Volume Manager
//!
//! A management facade over a cloud provider's block-storage and compute
//! APIs: resolves volumes and instances by id or human name, normalizes
//! provider resource payloads into canonical records, and orchestrates the
//! multi-step operations (create, attach, detach, delete, remote format)
//! that resolve referenced resources before executing provider calls.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                      CLI / Application Callers                 │
//! ├───────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────────┐   ┌───────────────────────────┐ │
//! │  │      Operation Layer     │   │    Remote Format Driver   │ │
//! │  │     (CloudManager)       │   │   (SSH sentinel scan)     │ │
//! │  └────────────┬─────────────┘   └───────────────────────────┘ │
//! │               │                                               │
//! │      ┌────────┴────────┐                                      │
//! │      │     Resolver    │  id-first, name linear-scan fallback │
//! │      └────────┬────────┘                                      │
//! │               │                                               │
//! │      ┌────────┴────────┐                                      │
//! │      │    Normalizer   │  provider payload → canonical record │
//! │      └────────┬────────┘                                      │
//! ├───────────────┼───────────────────────────────────────────────┤
//! │        Provider Ports (block-storage, compute)                │
//! │  ┌──────────────────────────┐   ┌───────────────────────────┐ │
//! │  │   HTTP Block Storage     │   │       HTTP Compute        │ │
//! │  └──────────────────────────┘   └───────────────────────────┘ │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`domain`]: canonical records, normalization, and the provider ports
//! - [`provider`]: HTTP adapters and token authentication
//! - [`manage`]: the resolver and the operation layer
//! - [`remote`]: the secure-shell format driver
//! - [`error`]: error types and handling

pub mod domain;
pub mod error;
pub mod manage;
pub mod provider;
pub mod remote;

// Re-export commonly used types
pub use domain::{
    normalize_instance, normalize_volume, ApiServer, ApiVolume, BlockStorageApi, BlockStorageRef,
    ComputeApi, ComputeRef, InstanceRecord, VolumeRecord,
};

pub use error::{Error, Result};

pub use manage::{resolve_instance, resolve_volume, CloudManager};

pub use provider::{HttpBlockStorage, HttpCompute, ProviderConfig, ProviderFactory};

pub use remote::format_volume;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
