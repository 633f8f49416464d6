//! `zarrsrs-core` overrides the spatial reference of Zarr rasters from their
//! own metadata.
//!
//! This crate includes:
//! - **Resolver**: builds a spatial reference from a `_CRS` JSON object (`url`,
//!   then `wkt`, then `projjson`) or a `horizontal_CRS_code` authority code.
//! - **Façade**: [`SrsModifierDataset`] and [`SrsModifierDriver`], which wrap the
//!   Zarr driver and its datasets and report the resolved spatial reference.
//! - **Configuration**: [`SrsModifierConfig`], read from `ZARR_SRS_*` variables.
//! - **Operations**: opening and summarizing datasets through a registry.
//!
//! Spatial-reference construction is delegated to an
//! [`SrsFactory`](zarrsrs_core_common::SrsFactory), so the resolution rules can
//! be exercised against any backend.

pub mod config;
pub mod dataset;
pub mod driver;
pub mod error;
pub mod operations;
pub mod resolver;
pub mod types;

pub use config::{SrsModifierConfig, TransformType};
pub use dataset::SrsModifierDataset;
pub use driver::{DRIVER_NAME, SrsModifierDriver, WRAPPED_DRIVER_NAME, register_srs_modifier};
pub use error::{ConfigError, DatasetError, DriverError, ResolveError, SrsModifierError};
pub use resolver::{CrsFormat, Resolution, Resolver};
pub use types::DatasetInfo;
