//! Metadata-only Zarr driver.
//!
//! Opens Zarr v2 (`.zarray` / `.zgroup` / `.zattrs`) and v3 (`zarr.json`)
//! stores as rasters: dimensions, bands, data type, fill value, geotransform
//! and attributes. Chunk data is never read.
//!
//! # Example
//!
//! ```no_run
//! use zarrsrs_core_common::{DriverRegistry, OpenInfo, RasterDataset};
//!
//! let registry = DriverRegistry::new();
//! zarrsrs_zarr::register_zarr(&registry);
//! let dataset = registry.open(&OpenInfo::new("temperature.zarr")).unwrap();
//! println!("{} x {}", dataset.raster_x_size(), dataset.raster_y_size());
//! ```

pub mod dataset;
pub mod driver;
pub mod metadata;

use std::sync::Arc;

use zarrsrs_core_common::DriverRegistry;

pub use dataset::ZarrDataset;
pub use driver::ZarrDriver;

/// Register the Zarr driver. Returns `false` if it was already registered.
pub fn register_zarr(registry: &DriverRegistry) -> bool {
    registry.register(Arc::new(ZarrDriver))
}
