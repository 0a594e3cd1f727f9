//! Core domain types and traits
//!
//! - [`ports`]: trait seams for the provider's block-storage and compute
//!   services, with the raw wire resource shapes
//! - [`records`]: canonical resource records and their normalization

pub mod ports;
pub mod records;

pub use ports::{ApiServer, ApiVolume, BlockStorageApi, BlockStorageRef, ComputeApi, ComputeRef};
pub use records::{normalize_instance, normalize_volume, InstanceRecord, VolumeRecord};
