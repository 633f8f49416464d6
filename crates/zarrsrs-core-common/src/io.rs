//! I/O traits for opening raster datasets.
//!
//! This module defines the seams between the driver host, the drivers it
//! dispatches to, and the datasets those drivers open. A decorating driver
//! implements the same traits as the driver it wraps, so the host never has to
//! know which one it is talking to.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::drivers::Driver;
use crate::srs::SpatialRef;

/// Everything a driver needs to decide whether it can open an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenInfo {
    path: PathBuf,
}

impl OpenInfo {
    /// Create open information for a filesystem path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The path being opened.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Extension of the path, without the leading dot.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|ext| ext.to_str())
    }

    /// Returns `true` if the path is an existing directory.
    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.path.is_dir()
    }

    /// Returns `true` if the path is a directory holding a file called `name`.
    #[must_use]
    pub fn has_child_file(&self, name: &str) -> bool {
        self.path.join(name).is_file()
    }
}

impl fmt::Display for OpenInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// How sure a driver is that it recognizes an input.
///
/// Higher wins when several drivers claim the same input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Confidence(pub u8);

impl Confidence {
    /// Score reported by a driver that plainly recognizes its format.
    pub const DEFAULT: Self = Self(50);
    /// Score reported by a decorator that wants to preempt the driver it wraps.
    pub const PREFERRED: Self = Self(100);

    /// One above `self` (saturating), and never below [`Confidence::PREFERRED`].
    ///
    /// # Examples
    ///
    /// ```
    /// use zarrsrs_core_common::Confidence;
    ///
    /// assert_eq!(Confidence::DEFAULT.boosted(), Confidence::PREFERRED);
    /// assert_eq!(Confidence(120).boosted(), Confidence(121));
    /// ```
    #[must_use]
    pub fn boosted(self) -> Self {
        Self(self.0.saturating_add(1)).max(Self::PREFERRED)
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Affine transform from pixel/line space to georeferenced space.
///
/// Coefficients follow the host convention:
/// `x = gt[0] + px * gt[1] + line * gt[2]`,
/// `y = gt[3] + px * gt[4] + line * gt[5]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    /// The identity transform (pixel coordinates are georeferenced coordinates).
    pub const IDENTITY: Self = Self([0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);

    /// Raw coefficients.
    #[must_use]
    pub fn coefficients(&self) -> [f64; 6] {
        self.0
    }

    /// Georeferenced coordinate of the top-left corner of the top-left pixel.
    #[must_use]
    pub fn origin(&self) -> (f64, f64) {
        (self.0[0], self.0[3])
    }

    /// Pixel width and height (height is usually negative for north-up rasters).
    #[must_use]
    pub fn pixel_size(&self) -> (f64, f64) {
        (self.0[1], self.0[5])
    }

    /// Returns `true` for north-up rasters without rotation terms.
    #[must_use]
    pub fn is_north_up(&self) -> bool {
        self.0[2] == 0.0 && self.0[4] == 0.0
    }

    /// Map a pixel/line position to georeferenced coordinates.
    ///
    /// # Examples
    ///
    /// ```
    /// use zarrsrs_core_common::GeoTransform;
    ///
    /// let gt = GeoTransform([500_000.0, 10.0, 0.0, 5_000_000.0, 0.0, -10.0]);
    /// assert_eq!(gt.apply(1.0, 2.0), (500_010.0, 4_999_980.0));
    /// ```
    #[must_use]
    pub fn apply(&self, pixel: f64, line: f64) -> (f64, f64) {
        let gt = &self.0;
        (
            gt[0] + pixel * gt[1] + line * gt[2],
            gt[3] + pixel * gt[4] + line * gt[5],
        )
    }
}

/// Handle describing one band of an opened raster.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterBand {
    /// Band number, 1-based.
    pub index: usize,
    /// Width in pixels.
    pub x_size: usize,
    /// Height in pixels.
    pub y_size: usize,
    /// Data type label as reported by the format (e.g. `"float32"`).
    pub data_type: String,
    /// Natural block size `(x, y)`, if the format is chunked.
    pub block_size: Option<(usize, usize)>,
    /// No-data value, if any.
    pub no_data: Option<f64>,
}

/// An opened raster dataset.
pub trait RasterDataset: Send {
    /// Human-readable label, usually the path it was opened from.
    fn description(&self) -> &str;

    /// Raster width in pixels.
    fn raster_x_size(&self) -> usize;

    /// Raster height in pixels.
    fn raster_y_size(&self) -> usize;

    /// Number of bands.
    fn raster_count(&self) -> usize;

    /// Band handle for a 1-based band number.
    ///
    /// Handles are built on request, so datasets with many bands never hold
    /// one per band.
    fn raster_band(&self, index: usize) -> Option<RasterBand>;

    /// Affine geotransform, if the dataset is georeferenced.
    fn geo_transform(&self) -> Option<GeoTransform>;

    /// Spatial reference, if known.
    fn spatial_ref(&self) -> Option<&SpatialRef>;

    /// Where the spatial reference came from, for datasets that track it
    /// (e.g. `"wkt"` for a value parsed from WKT metadata).
    fn spatial_ref_origin(&self) -> Option<&str> {
        None
    }

    /// Replace the dataset's spatial reference.
    ///
    /// # Errors
    ///
    /// The default implementation always fails: datasets are read-only unless
    /// they say otherwise.
    fn set_spatial_ref(&mut self, srs: Option<&SpatialRef>) -> Result<()> {
        let _ = srs;
        anyhow::bail!("dataset '{}' does not support setting a spatial reference", self.description())
    }

    /// Single metadata item.
    fn metadata_item(&self, key: &str) -> Option<String>;

    /// All metadata items, keyed by name.
    fn metadata(&self) -> BTreeMap<String, String>;
}

/// A driver the host can identify inputs with and open datasets through.
pub trait RasterDriver: Send + Sync {
    /// Registration metadata.
    fn driver(&self) -> Driver;

    /// Probe an input. `None` means the driver does not recognize it.
    fn identify(&self, info: &OpenInfo) -> Option<Confidence>;

    /// Open an input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not recognized or cannot be opened.
    fn open(&self, info: &OpenInfo) -> Result<Box<dyn RasterDataset>>;
}
