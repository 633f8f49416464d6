//! Display utilities for formatting CLI output.
//!
//! This module provides table row structures and formatting functions
//! for presenting raster dataset information in a human-readable format.

use tabled::{Table, Tabled};

use zarrsrs_core::types::DatasetInfo;
use zarrsrs_core_common::Driver;

const NOT_AVAILABLE: &str = "N/A";

/// Table row representation for displaying band information.
#[derive(Tabled)]
pub struct BandRow {
    /// Band number, 1-based.
    #[tabled(rename = "Band")]
    pub index: usize,
    /// Data type of the band.
    #[tabled(rename = "Type")]
    pub data_type: String,
    /// Natural block size.
    #[tabled(rename = "Block")]
    pub block: String,
    /// No-data value.
    #[tabled(rename = "NoData")]
    pub no_data: String,
}

/// Table row representation for displaying a metadata item.
#[derive(Tabled)]
pub struct MetadataRow {
    /// Metadata key.
    #[tabled(rename = "Key")]
    pub key: String,
    /// Metadata value.
    #[tabled(rename = "Value")]
    pub value: String,
}

/// Table row representation for displaying driver information.
#[derive(Tabled)]
pub struct DriverRow {
    /// Short identifier for the driver (e.g., `Zarr`).
    #[tabled(rename = "Short Name")]
    pub short_name: String,
    /// Full descriptive name of the driver format.
    #[tabled(rename = "Long Name")]
    pub long_name: String,
    /// File extensions claimed by the driver.
    #[tabled(rename = "Extensions")]
    pub extensions: String,
    /// Support status for raster access.
    #[tabled(rename = "Raster")]
    pub raster: String,
    /// Support status for vector access.
    #[tabled(rename = "Vector")]
    pub vector: String,
    /// Support status for virtual I/O.
    #[tabled(rename = "Virtual IO")]
    pub virtual_io: String,
}

impl From<&Driver> for DriverRow {
    fn from(driver: &Driver) -> Self {
        Self {
            short_name: driver.short_name.to_string(),
            long_name: driver.long_name.to_string(),
            extensions: driver.extensions_label(),
            raster: driver.capabilities.raster.as_str().to_string(),
            vector: driver.capabilities.vector.as_str().to_string(),
            virtual_io: driver.capabilities.virtual_io.as_str().to_string(),
        }
    }
}

/// Render the driver table.
#[must_use]
pub fn drivers_table(drivers: &[Driver]) -> String {
    Table::new(drivers.iter().map(DriverRow::from)).to_string()
}

/// Render dataset information as human-readable text.
#[must_use]
pub fn format_dataset_info(info: &DatasetInfo) -> String {
    let mut out = String::new();
    let mut line = |text: String| {
        out.push_str(&text);
        out.push('\n');
    };

    line(format!("Dataset: {}", info.dataset));
    line(format!("Driver: {} ({})", info.driver, info.driver_long_name));
    line(format!(
        "Size: {} x {}, {} band(s)",
        info.width,
        info.height,
        info.bands.len()
    ));

    line("\n=== Coordinate Reference System ===".to_string());
    match &info.crs {
        Some(crs) => {
            line(format!("Name: {}", crs.name));
            line(format!("Kind: {}", crs.kind));
            line(format!(
                "Authority: {}",
                crs.authority.as_deref().unwrap_or(NOT_AVAILABLE)
            ));
            line(format!(
                "Source: {}",
                crs.origin.as_deref().unwrap_or("driver")
            ));
        },
        None => line("None".to_string()),
    }

    if let Some(gt) = info.geo_transform {
        line("\n=== Geotransform ===".to_string());
        line(format!("Origin: ({}, {})", gt[0], gt[3]));
        line(format!("Pixel Size: ({}, {})", gt[1], gt[5]));
        if gt[2] != 0.0 || gt[4] != 0.0 {
            line(format!("Rotation: ({}, {})", gt[2], gt[4]));
        }
    }

    if !info.bands.is_empty() {
        line("\n=== Bands ===".to_string());
        let rows = info.bands.iter().map(|b| BandRow {
            index: b.index,
            data_type: b.data_type.clone(),
            block: b
                .block_size
                .map_or_else(|| NOT_AVAILABLE.to_string(), |[x, y]| format!("{x}x{y}")),
            no_data: b
                .no_data
                .map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string()),
        });
        line(Table::new(rows).to_string());
    }

    if !info.metadata.is_empty() {
        line("\n=== Metadata ===".to_string());
        let rows = info.metadata.iter().map(|(key, value)| MetadataRow {
            key: key.clone(),
            value: value.clone(),
        });
        line(Table::new(rows).to_string());
    }

    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use zarrsrs_core::types::{BandInfo, CrsInfo};
    use zarrsrs_core_common::DriverCapabilities;

    fn sample() -> DatasetInfo {
        DatasetInfo {
            dataset: "scene.zarr".to_string(),
            driver: "ZarrSRSModifier".to_string(),
            driver_long_name: "Zarr with SRS Modification Support".to_string(),
            width: 20,
            height: 10,
            bands: vec![BandInfo {
                index: 1,
                data_type: "float32".to_string(),
                block_size: Some([20, 10]),
                no_data: None,
            }],
            crs: Some(CrsInfo {
                name: "WGS 84".to_string(),
                kind: "Geographic".to_string(),
                authority: Some("EPSG:4326".to_string()),
                origin: Some("url".to_string()),
                wkt: None,
            }),
            geo_transform: Some([0.0, 1.0, 0.0, 10.0, 0.0, -1.0]),
            metadata: BTreeMap::from([("units".to_string(), "K".to_string())]),
        }
    }

    #[test]
    fn test_format_dataset_info() {
        let text = format_dataset_info(&sample());
        assert!(text.contains("Driver: ZarrSRSModifier (Zarr with SRS Modification Support)"));
        assert!(text.contains("Size: 20 x 10, 1 band(s)"));
        assert!(text.contains("Authority: EPSG:4326"));
        assert!(text.contains("Source: url"));
        assert!(text.contains("Origin: (0, 10)"));
        assert!(!text.contains("Rotation"));
        assert!(text.contains("20x10"));
        assert!(text.contains("units"));
    }

    #[test]
    fn test_format_without_crs() {
        let mut info = sample();
        info.crs = None;
        info.geo_transform = None;
        let text = format_dataset_info(&info);
        assert!(text.contains("=== Coordinate Reference System ===\nNone"));
        assert!(!text.contains("Geotransform"));
    }

    #[test]
    fn test_driver_row_creation() {
        let driver = Driver::new(
            "Zarr",
            "Zarr (metadata only)",
            &["zarr"],
            DriverCapabilities::RASTER_VIRTUAL_IO,
        );
        let row = DriverRow::from(&driver);
        assert_eq!(row.short_name, "Zarr");
        assert_eq!(row.extensions, "zarr");
        assert_eq!(row.raster, "Supported");
        assert_eq!(row.vector, "Not Supported");

        let table = drivers_table(&[driver]);
        assert!(table.contains("Virtual IO"));
    }
}
