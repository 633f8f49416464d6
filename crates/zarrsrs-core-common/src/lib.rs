//! Common types and traits shared across `zarrsrs` crates.
//!
//! This crate provides the abstractions shared between `zarrsrs-core` and the
//! driver and spatial-reference backends, preventing circular dependencies.

pub mod drivers;
pub mod factory;
pub mod io;
pub mod srs;

// Re-export commonly used types
pub use drivers::{Driver, DriverCapabilities, SupportStatus};
pub use factory::{DriverRegistry, driver_registry};
pub use io::{Confidence, GeoTransform, OpenInfo, RasterBand, RasterDataset, RasterDriver};
pub use srs::{AuthorityCode, CrsKind, SpatialRef, SrsError, SrsFactory};
