//! Driver implementation for Zarr format support.
//!
//! This module implements the `RasterDriver` trait so Zarr stores can be
//! opened through the driver registry.

use anyhow::{Result, bail};
use zarrsrs_core_common::{
    Confidence, Driver, DriverCapabilities, OpenInfo, RasterDataset, RasterDriver,
};

use crate::dataset::ZarrDataset;
use crate::metadata::{ZARR_JSON, ZARRAY, ZGROUP};

/// Registration metadata for the Zarr driver.
pub const DRIVER: Driver = Driver::new(
    "Zarr",
    "Zarr (metadata only)",
    &["zarr"],
    DriverCapabilities::RASTER_VIRTUAL_IO,
);

/// Driver for Zarr v2 and v3 arrays and groups.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZarrDriver;

impl RasterDriver for ZarrDriver {
    fn driver(&self) -> Driver {
        DRIVER
    }

    fn identify(&self, info: &OpenInfo) -> Option<Confidence> {
        let is_zarr = info.is_directory()
            && [ZARRAY, ZGROUP, ZARR_JSON]
                .iter()
                .any(|name| info.has_child_file(name));
        is_zarr.then_some(Confidence::DEFAULT)
    }

    fn open(&self, info: &OpenInfo) -> Result<Box<dyn RasterDataset>> {
        if self.identify(info).is_none() {
            bail!("'{info}' is not a Zarr array or group");
        }
        Ok(Box::new(ZarrDataset::open(info.path())?))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_identify() {
        let tmp = TempDir::new().unwrap();
        let info = OpenInfo::new(tmp.path());
        assert!(ZarrDriver.identify(&info).is_none());

        fs::write(tmp.path().join(ZGROUP), "{}").unwrap();
        assert_eq!(ZarrDriver.identify(&info), Some(Confidence::DEFAULT));

        let file = tmp.path().join(ZGROUP);
        assert!(ZarrDriver.identify(&OpenInfo::new(file)).is_none());
    }

    #[test]
    fn test_open_rejects_unrecognized() {
        let tmp = TempDir::new().unwrap();
        let err = ZarrDriver.open(&OpenInfo::new(tmp.path())).err().unwrap();
        assert!(err.to_string().contains("is not a Zarr array or group"));
    }

    #[test]
    fn test_driver_metadata() {
        let driver = ZarrDriver.driver();
        assert_eq!(driver.short_name, "Zarr");
        assert!(driver.handles_extension("ZARR"));
    }
}
