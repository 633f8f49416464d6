//! Driver registry: the host side of driver registration.
//!
//! Drivers register once under their short name. Opening an input asks every
//! registered driver to identify it and dispatches to the most confident one.

use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use anyhow::{Result, anyhow};
use log::debug;

use crate::drivers::Driver;
use crate::io::{Confidence, OpenInfo, RasterDataset, RasterDriver};

/// Registry of raster drivers.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: RwLock<Vec<Arc<dyn RasterDriver>>>,
}

impl DriverRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver.
    ///
    /// Returns `false` and leaves the registry unchanged when a driver with the
    /// same short name (case-insensitive) is already registered.
    pub fn register(&self, driver: Arc<dyn RasterDriver>) -> bool {
        let name = driver.driver().short_name;
        let mut drivers = self.drivers.write().unwrap_or_else(PoisonError::into_inner);
        if drivers
            .iter()
            .any(|d| d.driver().short_name.eq_ignore_ascii_case(name))
        {
            debug!("Driver '{name}' is already registered");
            return false;
        }
        debug!("Registering driver '{name}'");
        drivers.push(driver);
        true
    }

    /// Remove a driver by short name. Returns `true` if one was removed.
    pub fn deregister(&self, name: &str) -> bool {
        let mut drivers = self.drivers.write().unwrap_or_else(PoisonError::into_inner);
        let before = drivers.len();
        drivers.retain(|d| !d.driver().short_name.eq_ignore_ascii_case(name));
        drivers.len() != before
    }

    /// Find a driver by short name (case-insensitive).
    #[must_use]
    pub fn find(&self, name: &str) -> Option<Arc<dyn RasterDriver>> {
        self.drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|d| d.driver().short_name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Descriptors of all registered drivers, in registration order.
    #[must_use]
    pub fn drivers(&self) -> Vec<Driver> {
        self.drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|d| d.driver())
            .collect()
    }

    /// Registered short names in alphabetical order.
    #[must_use]
    pub fn driver_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.drivers().iter().map(|d| d.short_name).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered drivers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.drivers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if no driver is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The driver most confident it recognizes `info`.
    ///
    /// Ties go to the driver registered first.
    #[must_use]
    pub fn identify(&self, info: &OpenInfo) -> Option<(Arc<dyn RasterDriver>, Confidence)> {
        let drivers = self.drivers.read().unwrap_or_else(PoisonError::into_inner);
        let mut best: Option<(Arc<dyn RasterDriver>, Confidence)> = None;
        for driver in drivers.iter() {
            let Some(confidence) = driver.identify(info) else {
                continue;
            };
            debug!(
                "Driver '{}' identified {info} with confidence {confidence}",
                driver.driver().short_name
            );
            if best.as_ref().is_none_or(|(_, current)| confidence > *current) {
                best = Some((Arc::clone(driver), confidence));
            }
        }
        best
    }

    /// Open `info` with the most confident driver.
    ///
    /// # Errors
    ///
    /// Returns an error if no driver recognizes the input or the chosen driver
    /// fails to open it.
    pub fn open(&self, info: &OpenInfo) -> Result<Box<dyn RasterDataset>> {
        let (driver, _) = self
            .identify(info)
            .ok_or_else(|| anyhow!("'{info}' not recognized as a supported dataset"))?;
        debug!("Opening {info} with driver '{}'", driver.driver().short_name);
        driver.open(info)
    }
}

/// The process-wide registry.
pub fn driver_registry() -> &'static DriverRegistry {
    static REGISTRY: OnceLock<DriverRegistry> = OnceLock::new();
    REGISTRY.get_or_init(DriverRegistry::new)
}
