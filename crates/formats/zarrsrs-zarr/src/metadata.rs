//! Zarr v2 and v3 node metadata, read through `zarrs`.
//!
//! Only what a raster view needs is kept: shape, chunking, data type, fill
//! value and user attributes. No chunk is ever decoded.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use log::debug;
use serde_json::{Map, Value};
use zarrs::array::{Array, DataType, FillValue};
use zarrs::filesystem::FilesystemStore;
use zarrs::group::Group;

/// v2 array metadata document.
pub const ZARRAY: &str = ".zarray";
/// v2 group metadata document.
pub const ZGROUP: &str = ".zgroup";
/// v2 attributes document.
pub const ZATTRS: &str = ".zattrs";
/// v3 node metadata document.
pub const ZARR_JSON: &str = "zarr.json";

const ROOT: &str = "/";

/// The parts of a Zarr array a raster view is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct ArraySummary {
    /// Format version, 2 or 3.
    pub zarr_format: u8,
    /// Array shape, slowest-varying axis first.
    pub shape: Vec<u64>,
    /// Shape of the first chunk, if the chunk grid defines one.
    pub chunk_shape: Option<Vec<u64>>,
    /// Data type name (e.g. `"float32"`).
    pub data_type: String,
    /// Fill value, when the data type is a plain integer or float.
    pub fill_value: Option<f64>,
    /// User attributes.
    pub attributes: Map<String, Value>,
}

/// A node found on disk.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// An array.
    Array(ArraySummary),
    /// A group and its attributes.
    Group(Map<String, Value>),
}

/// Returns `true` if `dir` holds a Zarr metadata document.
#[must_use]
pub fn has_metadata(dir: &Path) -> bool {
    [ZARRAY, ZGROUP, ZARR_JSON]
        .iter()
        .any(|name| dir.join(name).is_file())
}

/// Read the node stored at `dir`.
///
/// # Errors
///
/// Returns an error if `dir` holds no Zarr metadata or `zarrs` rejects it.
pub fn read_node(dir: &Path) -> Result<Node> {
    if !has_metadata(dir) {
        bail!("{} holds no Zarr metadata", dir.display());
    }

    let store = Arc::new(
        FilesystemStore::new(dir).with_context(|| format!("Failed to open Zarr store {}", dir.display()))?,
    );

    let array_error = match Array::open(store.clone(), ROOT) {
        Ok(array) => return Ok(Node::Array(summarize(dir, &array))),
        Err(e) => e,
    };

    match Group::open(store, ROOT) {
        Ok(group) => Ok(Node::Group(group.attributes().clone())),
        Err(group_error) => {
            debug!("{} is not a group either: {group_error}", dir.display());
            Err(array_error).with_context(|| format!("Failed to read Zarr metadata in {}", dir.display()))
        },
    }
}

fn summarize(dir: &Path, array: &Array<FilesystemStore>) -> ArraySummary {
    let shape = array.shape().to_vec();
    let origin = vec![0; shape.len()];
    let chunk_shape = array
        .chunk_shape(&origin)
        .ok()
        .map(|chunk| chunk.iter().map(|d| d.get()).collect());

    ArraySummary {
        zarr_format: if dir.join(ZARRAY).is_file() { 2 } else { 3 },
        shape,
        chunk_shape,
        data_type: array.data_type().to_string(),
        fill_value: fill_value_as_f64(array.data_type(), array.fill_value()),
        attributes: array.attributes().clone(),
    }
}

#[allow(clippy::cast_precision_loss)]
fn fill_value_as_f64(data_type: &DataType, fill_value: &FillValue) -> Option<f64> {
    let bytes = fill_value.as_ne_bytes();
    let value = match data_type {
        DataType::Int8 => f64::from(i8::from_ne_bytes(bytes.try_into().ok()?)),
        DataType::Int16 => f64::from(i16::from_ne_bytes(bytes.try_into().ok()?)),
        DataType::Int32 => f64::from(i32::from_ne_bytes(bytes.try_into().ok()?)),
        DataType::Int64 => i64::from_ne_bytes(bytes.try_into().ok()?) as f64,
        DataType::UInt8 => f64::from(u8::from_ne_bytes(bytes.try_into().ok()?)),
        DataType::UInt16 => f64::from(u16::from_ne_bytes(bytes.try_into().ok()?)),
        DataType::UInt32 => f64::from(u32::from_ne_bytes(bytes.try_into().ok()?)),
        DataType::UInt64 => u64::from_ne_bytes(bytes.try_into().ok()?) as f64,
        DataType::Float32 => f64::from(f32::from_ne_bytes(bytes.try_into().ok()?)),
        DataType::Float64 => f64::from_ne_bytes(bytes.try_into().ok()?),
        _ => return None,
    };
    Some(value)
}

/// Sub-directories of a group that hold arrays, sorted by name.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed.
pub fn child_arrays(dir: &Path) -> Result<Vec<(PathBuf, ArraySummary)>> {
    let mut children = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let path = entry?.path();
        if !path.is_dir() || !has_metadata(&path) {
            continue;
        }
        match read_node(&path) {
            Ok(Node::Array(array)) => children.push((path, array)),
            Ok(Node::Group(_)) => {},
            Err(e) => debug!("Skipping {}: {e:#}", path.display()),
        }
    }
    children.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(children)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    pub(crate) fn write(dir: &Path, name: &str, value: &Value) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(name), value.to_string()).unwrap();
    }

    /// A complete v2 `.zarray` document.
    pub(crate) fn zarray(shape: &[u64], chunks: &[u64], dtype: &str, fill_value: Value) -> Value {
        json!({
            "zarr_format": 2,
            "shape": shape,
            "chunks": chunks,
            "dtype": dtype,
            "compressor": null,
            "fill_value": fill_value,
            "filters": null,
            "order": "C"
        })
    }

    /// A complete v3 array `zarr.json` document.
    pub(crate) fn zarr_json_array(shape: &[u64], chunks: &[u64], data_type: &str, attributes: Value) -> Value {
        json!({
            "zarr_format": 3,
            "node_type": "array",
            "shape": shape,
            "data_type": data_type,
            "chunk_grid": {"name": "regular", "configuration": {"chunk_shape": chunks}},
            "chunk_key_encoding": {"name": "default", "configuration": {"separator": "/"}},
            "fill_value": 0,
            "codecs": [{"name": "bytes", "configuration": {"endian": "little"}}],
            "attributes": attributes
        })
    }

    #[test]
    fn test_v2_array_with_attributes() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), ZARRAY, &zarray(&[3, 10, 20], &[1, 5, 10], "<f4", json!("NaN")));
        write(tmp.path(), ZATTRS, &json!({"units": "K"}));

        let Node::Array(array) = read_node(tmp.path()).unwrap() else {
            panic!("expected an array");
        };
        assert_eq!(array.zarr_format, 2);
        assert_eq!(array.shape, vec![3, 10, 20]);
        assert_eq!(array.chunk_shape, Some(vec![1, 5, 10]));
        assert_eq!(array.data_type, "float32");
        assert!(array.fill_value.unwrap().is_nan());
        assert_eq!(array.attributes["units"], "K");
    }

    #[test]
    fn test_v2_integer_fill_value() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), ZARRAY, &zarray(&[10, 20], &[10, 20], "<i2", json!(-1)));

        let Node::Array(array) = read_node(tmp.path()).unwrap() else {
            panic!("expected an array");
        };
        assert_eq!(array.data_type, "int16");
        assert_eq!(array.fill_value, Some(-1.0));
        assert!(array.attributes.is_empty());
    }

    #[test]
    fn test_v3_array() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            ZARR_JSON,
            &zarr_json_array(&[100, 200], &[50, 50], "uint16", json!({"_CRS": {"wkt": "GEOGCS[\"x\"]"}})),
        );

        let Node::Array(array) = read_node(tmp.path()).unwrap() else {
            panic!("expected an array");
        };
        assert_eq!(array.zarr_format, 3);
        assert_eq!(array.chunk_shape, Some(vec![50, 50]));
        assert_eq!(array.data_type, "uint16");
        assert_eq!(array.fill_value, Some(0.0));
        assert!(array.attributes["_CRS"].is_object());
    }

    #[test]
    fn test_groups_and_children() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), ZGROUP, &json!({"zarr_format": 2}));
        write(tmp.path(), ZATTRS, &json!({"title": "scene"}));
        write(&tmp.path().join("b"), ZARRAY, &zarray(&[2, 2], &[2, 2], "|u1", json!(0)));
        write(&tmp.path().join("a"), ZARR_JSON, &zarr_json_array(&[4, 4], &[4, 4], "int8", json!({})));
        write(&tmp.path().join("nested"), ZGROUP, &json!({"zarr_format": 2}));
        fs::create_dir_all(tmp.path().join("empty")).unwrap();

        let Node::Group(attributes) = read_node(tmp.path()).unwrap() else {
            panic!("expected a group");
        };
        assert_eq!(attributes["title"], "scene");

        let children = child_arrays(tmp.path()).unwrap();
        let names: Vec<_> = children
            .iter()
            .map(|(p, _)| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(children[1].1.data_type, "uint8");
        assert_eq!(children[0].1.zarr_format, 3);
    }

    #[test]
    fn test_invalid_metadata() {
        let tmp = TempDir::new().unwrap();
        let err = read_node(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("holds no Zarr metadata"));

        fs::write(tmp.path().join(ZARRAY), "{not json").unwrap();
        let err = read_node(tmp.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read Zarr metadata"));
    }
}
