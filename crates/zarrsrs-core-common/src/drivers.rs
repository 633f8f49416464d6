//! Driver descriptors for raster format support and capabilities.
//!
//! A [`Driver`] is the metadata half of a registered driver: the names the host
//! knows it by, the file extensions it claims, and the capability flags it
//! advertises. The behavioral half lives in [`crate::io::RasterDriver`].

/// Support status for a specific driver capability.
///
/// Mirrors the host's `YES` / absent capability flags, with an extra
/// `Planned` state for capabilities a driver intends to grow into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportStatus {
    /// The capability is fully supported and implemented.
    Supported,
    /// The capability is not supported by the driver.
    NotSupported,
    /// The capability is planned for future implementation.
    Planned,
}

impl SupportStatus {
    /// Returns `true` if the capability is fully supported and implemented.
    ///
    /// # Examples
    ///
    /// ```
    /// use zarrsrs_core_common::SupportStatus;
    ///
    /// assert!(SupportStatus::Supported.is_supported());
    /// assert!(!SupportStatus::Planned.is_supported());
    /// ```
    #[must_use]
    pub fn is_supported(&self) -> bool {
        matches!(self, SupportStatus::Supported)
    }

    /// Returns `true` if the capability is supported or planned.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self, SupportStatus::NotSupported)
    }

    /// Returns the string representation of this support status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            SupportStatus::Supported => "Supported",
            SupportStatus::NotSupported => "Not Supported",
            SupportStatus::Planned => "Planned",
        }
    }
}

/// Capabilities advertised by a raster driver.
#[derive(Debug, Clone, Copy)]
pub struct DriverCapabilities {
    /// Raster access (dimensions, bands, geotransform).
    pub raster: SupportStatus,
    /// Vector access (layers, features).
    pub vector: SupportStatus,
    /// Opening through virtual file systems rather than plain paths.
    pub virtual_io: SupportStatus,
}

impl DriverCapabilities {
    /// Capabilities of a raster-only driver that supports virtual I/O.
    pub const RASTER_VIRTUAL_IO: Self = Self {
        raster: SupportStatus::Supported,
        vector: SupportStatus::NotSupported,
        virtual_io: SupportStatus::Supported,
    };

    /// Returns `true` if at least one capability is fully supported.
    #[must_use]
    pub fn has_supported_capability(&self) -> bool {
        self.raster.is_supported() || self.vector.is_supported() || self.virtual_io.is_supported()
    }
}

/// Raster driver definition.
///
/// # Examples
///
/// ```
/// use zarrsrs_core_common::{Driver, DriverCapabilities};
///
/// let driver = Driver::new(
///     "Zarr",
///     "Zarr",
///     &["zarr"],
///     DriverCapabilities::RASTER_VIRTUAL_IO,
/// );
///
/// assert!(driver.handles_extension("ZARR"));
/// assert!(driver.capabilities.raster.is_supported());
/// ```
#[derive(Debug, Clone)]
pub struct Driver {
    /// Short name used for registration and lookup (e.g., `"Zarr"`).
    pub short_name: &'static str,
    /// Long descriptive name for display purposes.
    pub long_name: &'static str,
    /// File extensions claimed by the driver, without the leading dot.
    pub extensions: &'static [&'static str],
    /// Capabilities advertised to the host.
    pub capabilities: DriverCapabilities,
}

impl Driver {
    /// Creates a new driver definition.
    #[must_use]
    pub const fn new(
        short_name: &'static str,
        long_name: &'static str,
        extensions: &'static [&'static str],
        capabilities: DriverCapabilities,
    ) -> Self {
        Self {
            short_name,
            long_name,
            extensions,
            capabilities,
        }
    }

    /// Returns `true` if `extension` (with or without a leading dot) is claimed
    /// by this driver. Comparison is case-insensitive.
    #[must_use]
    pub fn handles_extension(&self, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.');
        self.extensions
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }

    /// Extensions joined by spaces, the way the host lists them.
    #[must_use]
    pub fn extensions_label(&self) -> String {
        self.extensions.join(" ")
    }
}
