//! Core operations on registered drivers.
//!
//! This module provides the functions the CLI is built on: opening a dataset
//! through the registry, optionally with a forced driver, and summarizing it.

use std::path::Path;

use anyhow::{Result, anyhow};
use log::info;
use zarrsrs_core_common::{Driver, DriverRegistry, OpenInfo, RasterDataset};

use crate::error::driver_not_found;
use crate::types::DatasetInfo;

/// Opens a dataset with the most confident registered driver, or with the
/// driver named by `driver_name`.
///
/// # Arguments
///
/// * `registry` - The registry to dispatch through.
/// * `path` - Path of the dataset.
/// * `driver_name` - Optional short name forcing a specific driver.
///
/// # Returns
///
/// The opened dataset together with the descriptor of the driver that opened it.
///
/// # Errors
///
/// This function will return an error if:
/// - `driver_name` is given but no such driver is registered.
/// - No registered driver recognizes the input.
/// - The chosen driver fails to open it.
pub fn open_dataset(
    registry: &DriverRegistry,
    path: &Path,
    driver_name: Option<&str>,
) -> Result<(Box<dyn RasterDataset>, Driver)> {
    let open_info = OpenInfo::new(path);

    let driver = match driver_name {
        Some(name) => registry
            .find(name)
            .ok_or_else(|| driver_not_found(name, &registry.driver_names()))?,
        None => {
            registry
                .identify(&open_info)
                .ok_or_else(|| anyhow!("'{open_info}' not recognized as a supported dataset"))?
                .0
        },
    };

    let descriptor = driver.driver();
    info!("Opening {open_info} with driver '{}'", descriptor.short_name);
    let dataset = driver.open(&open_info)?;
    Ok((dataset, descriptor))
}

/// Opens a dataset and summarizes it.
///
/// # Errors
///
/// Returns an error if the dataset cannot be opened; see [`open_dataset`].
pub fn dataset_info(
    registry: &DriverRegistry,
    path: &Path,
    driver_name: Option<&str>,
) -> Result<DatasetInfo> {
    let (dataset, driver) = open_dataset(registry, path, driver_name)?;
    Ok(DatasetInfo::from_dataset(
        dataset.as_ref(),
        driver.short_name,
        driver.long_name,
    ))
}
