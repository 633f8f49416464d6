//! Raster view of a Zarr array.
//!
//! The last axis is x, the one before it is y, and every leading axis is
//! flattened into bands.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Result, anyhow, bail};
use log::{debug, warn};
use serde_json::{Map, Value};
use zarrsrs_core_common::{GeoTransform, RasterBand, RasterDataset, SpatialRef};

use crate::metadata::{ArraySummary, Node, child_arrays, read_node};

/// Attribute holding the six geotransform coefficients.
pub const GEOTRANSFORM_ATTRIBUTE: &str = "GeoTransform";

/// A Zarr array opened as a raster.
#[derive(Debug, Clone)]
pub struct ZarrDataset {
    description: String,
    x_size: usize,
    y_size: usize,
    band_count: usize,
    data_type: String,
    block_size: Option<(usize, usize)>,
    no_data: Option<f64>,
    geo_transform: Option<GeoTransform>,
    metadata: BTreeMap<String, String>,
    zarr_format: u8,
}

impl ZarrDataset {
    /// Open the array, or the single array of a group, stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` holds no Zarr metadata, a group does not hold
    /// exactly one array, or the array has fewer than two dimensions.
    pub fn open(path: &Path) -> Result<Self> {
        let description = path.display().to_string();
        match read_node(path)? {
            Node::Array(array) => Self::from_array(description, array),
            Node::Group(group_attributes) => {
                let mut children = child_arrays(path)?;
                if children.len() != 1 {
                    let names: Vec<_> = children
                        .iter()
                        .filter_map(|(p, _)| p.file_name())
                        .map(|n| n.to_string_lossy().into_owned())
                        .collect();
                    bail!(
                        "Zarr group '{description}' holds {} arrays ({}); open one of them directly",
                        names.len(),
                        names.join(", ")
                    );
                }
                let (child, mut array) = children.remove(0);
                debug!("Opening the only array of group '{description}': {}", child.display());
                for (key, value) in group_attributes {
                    array.attributes.entry(key).or_insert(value);
                }
                Self::from_array(child.display().to_string(), array)
            },
        }
    }

    fn from_array(description: String, array: ArraySummary) -> Result<Self> {
        let ndim = array.shape.len();
        if ndim < 2 {
            bail!("Zarr array '{description}' has {ndim} dimension(s); at least 2 are required");
        }

        let shape = array
            .shape
            .iter()
            .map(|&d| usize::try_from(d))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| anyhow!("Zarr array '{description}' shape {:?} does not fit in memory", array.shape))?;
        let x_size = shape[ndim - 1];
        let y_size = shape[ndim - 2];
        let band_count = shape[..ndim - 2]
            .iter()
            .try_fold(1usize, |count, &d| count.checked_mul(d))
            .ok_or_else(|| {
                anyhow!(
                    "Zarr array '{description}' shape {:?} has more bands than can be addressed",
                    array.shape
                )
            })?;
        let block_size = array
            .chunk_shape
            .as_ref()
            .filter(|c| c.len() == ndim)
            .and_then(|c| Some((usize::try_from(c[ndim - 1]).ok()?, usize::try_from(c[ndim - 2]).ok()?)));

        let geo_transform = array
            .attributes
            .get(GEOTRANSFORM_ATTRIBUTE)
            .and_then(|value| {
                let parsed = parse_geo_transform(value);
                if parsed.is_none() {
                    warn!("{description}: ignoring malformed {GEOTRANSFORM_ATTRIBUTE} attribute {value}");
                }
                parsed
            });

        Ok(Self {
            metadata: attributes_as_metadata(&array.attributes),
            description,
            x_size,
            y_size,
            band_count,
            data_type: array.data_type,
            block_size,
            no_data: array.fill_value,
            geo_transform,
            zarr_format: array.zarr_format,
        })
    }

    /// Zarr format version of the opened array.
    #[must_use]
    pub fn zarr_format(&self) -> u8 {
        self.zarr_format
    }
}

/// Strings are kept verbatim; everything else becomes compact JSON.
fn attributes_as_metadata(attributes: &Map<String, Value>) -> BTreeMap<String, String> {
    attributes
        .iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), text)
        })
        .collect()
}

/// Six numbers, as a JSON array or a whitespace/comma separated string.
fn parse_geo_transform(value: &Value) -> Option<GeoTransform> {
    let numbers: Vec<f64> = match value {
        Value::Array(items) => items.iter().map(Value::as_f64).collect::<Option<_>>()?,
        Value::String(text) => text
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(|s| s.parse().ok())
            .collect::<Option<_>>()?,
        _ => return None,
    };
    let coefficients: [f64; 6] = numbers.try_into().ok()?;
    Some(GeoTransform(coefficients))
}

impl RasterDataset for ZarrDataset {
    fn description(&self) -> &str {
        &self.description
    }

    fn raster_x_size(&self) -> usize {
        self.x_size
    }

    fn raster_y_size(&self) -> usize {
        self.y_size
    }

    fn raster_count(&self) -> usize {
        self.band_count
    }

    fn raster_band(&self, index: usize) -> Option<RasterBand> {
        (1..=self.band_count).contains(&index).then(|| RasterBand {
            index,
            x_size: self.x_size,
            y_size: self.y_size,
            data_type: self.data_type.clone(),
            block_size: self.block_size,
            no_data: self.no_data,
        })
    }

    fn geo_transform(&self) -> Option<GeoTransform> {
        self.geo_transform
    }

    fn spatial_ref(&self) -> Option<&SpatialRef> {
        None
    }

    fn metadata_item(&self, key: &str) -> Option<String> {
        self.metadata.get(key).cloned()
    }

    fn metadata(&self) -> BTreeMap<String, String> {
        self.metadata.clone()
    }
}
