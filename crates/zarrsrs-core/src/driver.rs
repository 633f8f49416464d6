//! The decorating driver.
//!
//! [`SrsModifierDriver`] claims every input the wrapped Zarr driver claims, at
//! a higher confidence, and wraps the datasets it opens in
//! [`SrsModifierDataset`].

use std::sync::Arc;

use anyhow::Result;
use log::{debug, info};
use zarrsrs_core_common::{
    Confidence, Driver, DriverCapabilities, DriverRegistry, OpenInfo, RasterDataset, RasterDriver,
    SrsFactory,
};

use crate::config::SrsModifierConfig;
use crate::dataset::SrsModifierDataset;
use crate::error::DriverError;

/// Short name the decorator registers under.
pub const DRIVER_NAME: &str = "ZarrSRSModifier";

/// Long name the decorator registers under.
pub const DRIVER_LONG_NAME: &str = "Zarr with SRS Modification Support";

/// Short name of the driver being decorated.
pub const WRAPPED_DRIVER_NAME: &str = "Zarr";

/// Registration metadata for the decorator.
pub const DRIVER: Driver = Driver::new(
    DRIVER_NAME,
    DRIVER_LONG_NAME,
    &["zarr"],
    DriverCapabilities::RASTER_VIRTUAL_IO,
);

/// Driver that delegates to the Zarr driver and overrides the spatial reference.
pub struct SrsModifierDriver {
    wrapped: Arc<dyn RasterDriver>,
    factory: Arc<dyn SrsFactory>,
    config: SrsModifierConfig,
}

impl SrsModifierDriver {
    /// Create a decorator around `wrapped`.
    #[must_use]
    pub fn new(
        wrapped: Arc<dyn RasterDriver>,
        factory: Arc<dyn SrsFactory>,
        config: SrsModifierConfig,
    ) -> Self {
        Self {
            wrapped,
            factory,
            config,
        }
    }

    /// The wrapped driver's registration metadata.
    #[must_use]
    pub fn wrapped_driver(&self) -> Driver {
        self.wrapped.driver()
    }

    /// Configuration handed to every dataset this driver opens.
    #[must_use]
    pub fn config(&self) -> &SrsModifierConfig {
        &self.config
    }

    /// Open an input as the concrete decorated dataset.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NotRecognized`] when the wrapped driver does not
    /// identify the input and [`DriverError::UnderlyingOpenFailed`] when it
    /// identifies it but fails to open it.
    pub fn open_dataset(&self, info: &OpenInfo) -> Result<SrsModifierDataset, DriverError> {
        let wrapped_name = self.wrapped.driver().short_name;

        if self.wrapped.identify(info).is_none() {
            return Err(DriverError::NotRecognized {
                driver: wrapped_name.to_string(),
                path: info.path().to_path_buf(),
            });
        }

        let source = self
            .wrapped
            .open(info)
            .map_err(|e| DriverError::UnderlyingOpenFailed {
                driver: wrapped_name.to_string(),
                path: info.path().to_path_buf(),
                source: e.into(),
            })?;

        debug!("{DRIVER_NAME}: {wrapped_name} opened '{info}'");
        Ok(SrsModifierDataset::new(
            source,
            Arc::clone(&self.factory),
            self.config.clone(),
        ))
    }
}

impl RasterDriver for SrsModifierDriver {
    fn driver(&self) -> Driver {
        DRIVER
    }

    fn identify(&self, info: &OpenInfo) -> Option<Confidence> {
        self.wrapped.identify(info).map(Confidence::boosted)
    }

    fn open(&self, info: &OpenInfo) -> Result<Box<dyn RasterDataset>> {
        Ok(Box::new(self.open_dataset(info)?))
    }
}

/// Register the decorator in front of the already registered Zarr driver.
///
/// Returns `Ok(false)` when a driver named [`DRIVER_NAME`] is already
/// registered; registration is idempotent.
///
/// # Errors
///
/// Returns [`DriverError::MissingUnderlyingDriver`] when no Zarr driver is
/// registered.
pub fn register_srs_modifier(
    registry: &DriverRegistry,
    factory: Arc<dyn SrsFactory>,
    config: SrsModifierConfig,
) -> Result<bool, DriverError> {
    if registry.find(DRIVER_NAME).is_some() {
        debug!("{DRIVER_NAME} already registered");
        return Ok(false);
    }

    let wrapped = registry
        .find(WRAPPED_DRIVER_NAME)
        .ok_or_else(|| DriverError::MissingUnderlyingDriver {
            name: WRAPPED_DRIVER_NAME.to_string(),
            available: registry.driver_names().join(", "),
        })?;

    let registered = registry.register(Arc::new(SrsModifierDriver::new(wrapped, factory, config)));
    if registered {
        info!("Registered {DRIVER_NAME} in front of {WRAPPED_DRIVER_NAME}");
    }
    Ok(registered)
}
