//! Data types for reporting on opened datasets.
//!
//! This module defines the serializable summary the CLI prints for `info`.

use std::collections::BTreeMap;

use serde::Serialize;
use zarrsrs_core_common::{RasterBand, RasterDataset, SpatialRef};

/// Information about a dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetInfo {
    /// Path to the dataset
    pub dataset: String,
    /// Driver name
    pub driver: String,
    /// Driver long name
    pub driver_long_name: String,
    /// Raster width in pixels
    pub width: usize,
    /// Raster height in pixels
    pub height: usize,
    /// Band information
    pub bands: Vec<BandInfo>,
    /// Spatial reference information
    pub crs: Option<CrsInfo>,
    /// Affine geotransform coefficients
    pub geo_transform: Option<[f64; 6]>,
    /// Dataset metadata
    pub metadata: BTreeMap<String, String>,
}

/// Information about a band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandInfo {
    /// Band number, 1-based
    pub index: usize,
    /// Data type
    pub data_type: String,
    /// Block size `[x, y]`
    pub block_size: Option<[usize; 2]>,
    /// No-data value
    pub no_data: Option<f64>,
}

/// Information about a spatial reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrsInfo {
    /// CRS name
    pub name: String,
    /// CRS kind (e.g. "Projected")
    pub kind: String,
    /// Authority code (e.g. "EPSG:4326")
    pub authority: Option<String>,
    /// Where the CRS came from (e.g. "wkt")
    pub origin: Option<String>,
    /// WKT representation
    pub wkt: Option<String>,
}

impl BandInfo {
    /// Summarize a band handle.
    #[must_use]
    pub fn from_band(band: &RasterBand) -> Self {
        Self {
            index: band.index,
            data_type: band.data_type.clone(),
            block_size: band.block_size.map(|(x, y)| [x, y]),
            no_data: band.no_data,
        }
    }
}

impl CrsInfo {
    /// Summarize a spatial reference.
    #[must_use]
    pub fn from_spatial_ref(srs: &SpatialRef, origin: Option<&str>) -> Self {
        Self {
            name: srs.name().to_string(),
            kind: srs.kind().as_str().to_string(),
            authority: srs.authority().map(ToString::to_string),
            origin: origin.map(str::to_string),
            wkt: srs.to_wkt().map(str::to_string),
        }
    }
}

impl DatasetInfo {
    /// Summarize an opened dataset.
    #[must_use]
    pub fn from_dataset(dataset: &dyn RasterDataset, driver: &str, driver_long_name: &str) -> Self {
        let bands = (1..=dataset.raster_count())
            .filter_map(|i| dataset.raster_band(i))
            .map(|band| BandInfo::from_band(&band))
            .collect();

        Self {
            dataset: dataset.description().to_string(),
            driver: driver.to_string(),
            driver_long_name: driver_long_name.to_string(),
            width: dataset.raster_x_size(),
            height: dataset.raster_y_size(),
            bands,
            crs: dataset
                .spatial_ref()
                .map(|srs| CrsInfo::from_spatial_ref(srs, dataset.spatial_ref_origin())),
            geo_transform: dataset.geo_transform().map(|gt| gt.coefficients()),
            metadata: dataset.metadata(),
        }
    }
}
