//! Spatial-reference backend for `zarrsrs`.
//!
//! [`ProjSrsFactory`] implements [`SrsFactory`](zarrsrs_core_common::SrsFactory)
//! on top of GDAL's OGR spatial reference (and through it, PROJ): EPSG codes,
//! WKT, PROJJSON and OGC URLs/URNs are all interpreted by the library.

pub mod factory;

pub use factory::{MAX_WKT_DEPTH, ProjSrsFactory};
