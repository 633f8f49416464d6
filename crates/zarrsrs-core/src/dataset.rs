//! The decorating dataset.
//!
//! [`SrsModifierDataset`] owns the dataset opened by the wrapped driver and
//! forwards every raster query to it. The only thing it adds is a spatial
//! reference resolved from `_CRS` / `horizontal_CRS_code` metadata, which
//! shadows whatever the wrapped dataset reports.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, info, warn};
use zarrsrs_core_common::{GeoTransform, RasterBand, RasterDataset, SpatialRef, SrsFactory};

use crate::config::SrsModifierConfig;
use crate::error::{DatasetError, ResolveError};
use crate::resolver::{CRS_METADATA_KEY, CrsFormat, HORIZONTAL_CRS_CODE_KEY, Resolver};

/// Dataset that overrides the wrapped dataset's spatial reference.
pub struct SrsModifierDataset {
    source: Box<dyn RasterDataset>,
    factory: Arc<dyn SrsFactory>,
    config: SrsModifierConfig,
    description: String,
    custom_srs: Option<(SpatialRef, CrsFormat)>,
    original_crs_metadata: Option<String>,
}

impl std::fmt::Debug for SrsModifierDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SrsModifierDataset")
            .field("config", &self.config)
            .field("description", &self.description)
            .field("custom_srs", &self.custom_srs)
            .field("original_crs_metadata", &self.original_crs_metadata)
            .finish_non_exhaustive()
    }
}

impl SrsModifierDataset {
    /// Wrap an opened dataset and resolve its CRS metadata.
    ///
    /// Resolution problems are logged and leave the wrapped dataset's spatial
    /// reference in place; they never fail construction.
    #[must_use]
    pub fn new(
        source: Box<dyn RasterDataset>,
        factory: Arc<dyn SrsFactory>,
        config: SrsModifierConfig,
    ) -> Self {
        let description = source.description().to_string();
        let mut dataset = Self {
            source,
            factory,
            config,
            description,
            custom_srs: None,
            original_crs_metadata: None,
        };
        dataset.parse_crs_metadata();
        dataset.apply_epsg_override();
        dataset
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(self.factory.as_ref()).with_verbose_diagnostics(self.config.debug)
    }

    fn parse_crs_metadata(&mut self) {
        let metadata = self.source.metadata_item(CRS_METADATA_KEY);
        let fallback = if metadata.is_none() {
            self.source.metadata_item(HORIZONTAL_CRS_CODE_KEY)
        } else {
            None
        };

        let resolution = self.resolver().resolve(metadata.as_deref(), fallback.as_deref());
        match resolution {
            Ok(resolution) => {
                if let Some((srs, format)) = resolution.into_spatial_ref() {
                    info!(
                        "{}: using spatial reference '{}' from {}",
                        self.description,
                        srs.name(),
                        format.as_str()
                    );
                    self.custom_srs = Some((srs, format));
                }
            },
            Err(e) => warn!("{}: ignoring CRS metadata: {e}", self.description),
        }

        self.original_crs_metadata = metadata;
    }

    fn apply_epsg_override(&mut self) {
        let Some(code) = self.config.override_epsg() else {
            return;
        };
        match self.factory.from_epsg(code) {
            Ok(srs) => {
                let unchanged = self
                    .custom_srs
                    .as_ref()
                    .is_some_and(|(current, _)| self.factory.is_same(current, &srs));
                if unchanged {
                    debug!("{}: EPSG_OVERRIDE matches the metadata CRS EPSG:{code}", self.description);
                } else {
                    debug!("{}: EPSG_OVERRIDE to EPSG:{code}", self.description);
                }
                self.custom_srs = Some((srs, CrsFormat::Override));
            },
            Err(e) => warn!("{}: EPSG_OVERRIDE to EPSG:{code} failed: {e}", self.description),
        }
    }

    /// Replace the custom spatial reference with the one for an authority code
    /// such as `"EPSG:4326"`.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is malformed or unknown; the current
    /// spatial reference is kept in that case.
    pub fn create_crs_from_epsg(&mut self, code: &str) -> Result<(), ResolveError> {
        let srs = self.resolver().resolve_authority_code(code)?;
        self.custom_srs = Some((srs, CrsFormat::Epsg));
        Ok(())
    }

    /// Replace the custom spatial reference.
    ///
    /// The value is exported to WKT and re-imported through the factory; when
    /// it has no WKT or the factory rejects it, it is stored as given.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::NullSpatialRef`] for `None`, leaving the current
    /// spatial reference untouched.
    pub fn set_spatial_ref(&mut self, srs: Option<&SpatialRef>) -> Result<(), DatasetError> {
        let srs = srs.ok_or(DatasetError::NullSpatialRef)?;
        let copy = match srs.to_wkt() {
            Some(wkt) => self.factory.from_wkt(wkt).unwrap_or_else(|e| {
                debug!("{}: keeping spatial reference as given: {e}", self.description);
                srs.clone()
            }),
            None => srs.clone(),
        };
        self.custom_srs = Some((copy, CrsFormat::External));
        Ok(())
    }

    /// The spatial reference this dataset resolved or was given, ignoring the
    /// wrapped dataset's own.
    #[must_use]
    pub fn custom_spatial_ref(&self) -> Option<&SpatialRef> {
        self.custom_srs.as_ref().map(|(srs, _)| srs)
    }

    /// Which serialization the custom spatial reference came from.
    #[must_use]
    pub fn crs_format(&self) -> Option<CrsFormat> {
        self.custom_srs.as_ref().map(|(_, format)| *format)
    }

    /// The raw `_CRS` text, as read at open.
    #[must_use]
    pub fn original_crs_metadata(&self) -> Option<&str> {
        self.original_crs_metadata.as_deref()
    }

    /// Configuration the dataset was opened with.
    #[must_use]
    pub fn config(&self) -> &SrsModifierConfig {
        &self.config
    }

    /// The wrapped dataset.
    #[must_use]
    pub fn source(&self) -> &dyn RasterDataset {
        self.source.as_ref()
    }
}

impl RasterDataset for SrsModifierDataset {
    fn description(&self) -> &str {
        &self.description
    }

    fn raster_x_size(&self) -> usize {
        self.source.raster_x_size()
    }

    fn raster_y_size(&self) -> usize {
        self.source.raster_y_size()
    }

    fn raster_count(&self) -> usize {
        self.source.raster_count()
    }

    fn raster_band(&self, index: usize) -> Option<RasterBand> {
        self.source.raster_band(index)
    }

    fn geo_transform(&self) -> Option<GeoTransform> {
        self.source.geo_transform()
    }

    fn spatial_ref(&self) -> Option<&SpatialRef> {
        self.custom_spatial_ref().or_else(|| self.source.spatial_ref())
    }

    fn spatial_ref_origin(&self) -> Option<&str> {
        match &self.custom_srs {
            Some((_, format)) => Some(format.as_str()),
            None => self.source.spatial_ref_origin(),
        }
    }

    fn set_spatial_ref(&mut self, srs: Option<&SpatialRef>) -> anyhow::Result<()> {
        SrsModifierDataset::set_spatial_ref(self, srs).map_err(Into::into)
    }

    fn metadata_item(&self, key: &str) -> Option<String> {
        self.source.metadata_item(key)
    }

    fn metadata(&self) -> BTreeMap<String, String> {
        self.source.metadata()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use zarrsrs_core_common::{AuthorityCode, CrsKind, SrsError};

    use super::*;
    use crate::config::TransformType;

    /// In-memory dataset standing in for the wrapped driver.
    pub(crate) struct MemoryDataset {
        pub(crate) metadata: BTreeMap<String, String>,
        pub(crate) srs: Option<SpatialRef>,
        pub(crate) bands: Vec<RasterBand>,
    }

    impl MemoryDataset {
        pub(crate) fn with_metadata(pairs: &[(&str, &str)]) -> Self {
            Self {
                metadata: pairs
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
                srs: Some(SpatialRef::new("source CRS", CrsKind::Projected).with_authority(AuthorityCode::epsg(3857))),
                bands: vec![RasterBand {
                    index: 1,
                    x_size: 20,
                    y_size: 10,
                    data_type: "float32".to_string(),
                    block_size: Some((10, 10)),
                    no_data: Some(-9999.0),
                }],
            }
        }
    }

    impl RasterDataset for MemoryDataset {
        fn description(&self) -> &str {
            "memory.zarr"
        }
        fn raster_x_size(&self) -> usize {
            20
        }
        fn raster_y_size(&self) -> usize {
            10
        }
        fn raster_count(&self) -> usize {
            self.bands.len()
        }
        fn raster_band(&self, index: usize) -> Option<RasterBand> {
            index.checked_sub(1).and_then(|i| self.bands.get(i)).cloned()
        }
        fn geo_transform(&self) -> Option<GeoTransform> {
            Some(GeoTransform([0.0, 1.0, 0.0, 10.0, 0.0, -1.0]))
        }
        fn spatial_ref(&self) -> Option<&SpatialRef> {
            self.srs.as_ref()
        }
        fn metadata_item(&self, key: &str) -> Option<String> {
            self.metadata.get(key).cloned()
        }
        fn metadata(&self) -> BTreeMap<String, String> {
            self.metadata.clone()
        }
    }

    /// Accepts OGC EPSG URLs, WKT starting with `GEOGCS`, PROJJSON with a name,
    /// and EPSG codes 4326 / 32632.
    pub(crate) struct SimpleFactory;

    fn fail(format: &'static str) -> SrsError {
        SrsError::Parse {
            format,
            message: "unsupported".to_string(),
        }
    }

    impl SrsFactory for SimpleFactory {
        fn from_url(&self, url: &str) -> Result<SpatialRef, SrsError> {
            let code = url
                .strip_prefix("http://www.opengis.net/def/crs/EPSG/0/")
                .and_then(|c| c.parse().ok())
                .ok_or_else(|| SrsError::RemoteFetchUnsupported { url: url.to_string() })?;
            self.from_epsg(code)
        }

        fn from_wkt(&self, wkt: &str) -> Result<SpatialRef, SrsError> {
            if wkt.starts_with("GEOGCS[") {
                Ok(SpatialRef::new("wkt CRS", CrsKind::Geographic).with_wkt(wkt))
            } else {
                Err(fail("WKT"))
            }
        }

        fn from_projjson(&self, projjson: &str) -> Result<SpatialRef, SrsError> {
            let value: serde_json::Value = serde_json::from_str(projjson).map_err(|_| fail("PROJJSON"))?;
            let name = value["name"].as_str().ok_or_else(|| fail("PROJJSON"))?;
            Ok(SpatialRef::new(name, CrsKind::Other).with_projjson(projjson))
        }

        fn from_epsg(&self, code: u32) -> Result<SpatialRef, SrsError> {
            let (name, kind) = match code {
                4326 => ("WGS 84", CrsKind::Geographic),
                32632 => ("WGS 84 / UTM zone 32N", CrsKind::Projected),
                _ => {
                    return Err(SrsError::UnknownCode {
                        authority: "EPSG".to_string(),
                        code: code.to_string(),
                    });
                },
            };
            Ok(SpatialRef::new(name, kind)
                .with_authority(AuthorityCode::epsg(code))
                .with_wkt(format!("GEOGCS[\"{name}\",AUTHORITY[\"EPSG\",\"{code}\"]]")))
        }
    }

    fn open(pairs: &[(&str, &str)], config: SrsModifierConfig) -> SrsModifierDataset {
        SrsModifierDataset::new(
            Box::new(MemoryDataset::with_metadata(pairs)),
            Arc::new(SimpleFactory),
            config,
        )
    }

    #[test]
    fn test_crs_metadata_overrides_source() {
        let ds = open(
            &[(CRS_METADATA_KEY, r#"{"url":"http://www.opengis.net/def/crs/EPSG/0/4326"}"#)],
            SrsModifierConfig::default(),
        );
        let srs = ds.spatial_ref().unwrap();
        assert_eq!(srs.epsg_code(), Some(4326));
        assert_eq!(ds.crs_format(), Some(CrsFormat::Url));
        assert_eq!(ds.spatial_ref_origin(), Some("url"));
        assert!(ds.original_crs_metadata().unwrap().contains("opengis"));
    }

    #[test]
    fn test_unusable_metadata_falls_back_to_source() {
        let ds = open(
            &[(CRS_METADATA_KEY, r#"{"url":"ftp://x","wkt":"nope","projjson":{"no":"name"}}"#)],
            SrsModifierConfig::default(),
        );
        assert!(ds.custom_spatial_ref().is_none());
        assert_eq!(ds.spatial_ref().unwrap().epsg_code(), Some(3857));
        assert_eq!(ds.spatial_ref_origin(), None);
    }

    #[test]
    fn test_empty_metadata_is_not_fatal() {
        let ds = open(&[(CRS_METADATA_KEY, "")], SrsModifierConfig::default());
        assert_eq!(ds.spatial_ref().unwrap().name(), "source CRS");
        assert_eq!(ds.original_crs_metadata(), Some(""));
    }

    #[test]
    fn test_horizontal_crs_code_fallback() {
        let ds = open(&[(HORIZONTAL_CRS_CODE_KEY, "EPSG:32632")], SrsModifierConfig::default());
        let srs = ds.spatial_ref().unwrap();
        assert!(srs.is_same(&SimpleFactory.from_epsg(32632).unwrap()));
        assert_eq!(ds.crs_format(), Some(CrsFormat::Epsg));
    }

    #[test]
    fn test_crs_key_shadows_horizontal_code() {
        let ds = open(
            &[(CRS_METADATA_KEY, "not json"), (HORIZONTAL_CRS_CODE_KEY, "EPSG:32632")],
            SrsModifierConfig::default(),
        );
        assert!(ds.custom_spatial_ref().is_none());
    }

    #[test]
    fn test_no_metadata_and_no_source_srs() {
        let mut source = MemoryDataset::with_metadata(&[]);
        source.srs = None;
        let ds = SrsModifierDataset::new(Box::new(source), Arc::new(SimpleFactory), SrsModifierConfig::default());
        assert!(ds.spatial_ref().is_none());
    }

    #[test]
    fn test_spatial_ref_is_idempotent() {
        let ds = open(&[(CRS_METADATA_KEY, r#"{"wkt":"GEOGCS[\"x\"]"}"#)], SrsModifierConfig::default());
        let first = ds.spatial_ref().cloned();
        let second = ds.spatial_ref().cloned();
        assert_eq!(first, second);
    }

    #[test]
    fn test_set_null_spatial_ref_keeps_previous() {
        let mut ds = open(&[(HORIZONTAL_CRS_CODE_KEY, "EPSG:4326")], SrsModifierConfig::default());
        assert_eq!(ds.set_spatial_ref(None), Err(DatasetError::NullSpatialRef));
        assert_eq!(ds.spatial_ref().unwrap().epsg_code(), Some(4326));

        let as_trait: &mut dyn RasterDataset = &mut ds;
        assert!(as_trait.set_spatial_ref(None).is_err());
    }

    #[test]
    fn test_set_spatial_ref_round_trips_through_wkt() {
        let mut ds = open(&[], SrsModifierConfig::default());
        let given = SpatialRef::new("given", CrsKind::Geographic).with_wkt("GEOGCS[\"given\"]");
        ds.set_spatial_ref(Some(&given)).unwrap();

        let stored = ds.spatial_ref().unwrap();
        assert_eq!(stored.name(), "wkt CRS");
        assert!(stored.is_same(&given));
        assert_eq!(ds.crs_format(), Some(CrsFormat::External));
    }

    #[test]
    fn test_set_spatial_ref_without_wkt_is_cloned() {
        let mut ds = open(&[], SrsModifierConfig::default());
        let given = SpatialRef::new("projjson only", CrsKind::Other).with_projjson("{}");
        ds.set_spatial_ref(Some(&given)).unwrap();
        assert_eq!(ds.spatial_ref(), Some(&given));
    }

    #[test]
    fn test_epsg_override() {
        let config = SrsModifierConfig::new()
            .with_transform_type(TransformType::EpsgOverride)
            .with_target_epsg(32632);
        let ds = open(&[(CRS_METADATA_KEY, r#"{"wkt":"GEOGCS[\"x\"]"}"#)], config);
        assert_eq!(ds.spatial_ref().unwrap().epsg_code(), Some(32632));
        assert_eq!(ds.crs_format(), Some(CrsFormat::Override));
    }

    #[test]
    fn test_failed_override_keeps_metadata_result() {
        let config = SrsModifierConfig::new()
            .with_transform_type(TransformType::EpsgOverride)
            .with_target_epsg(1);
        let ds = open(&[(CRS_METADATA_KEY, r#"{"wkt":"GEOGCS[\"x\"]"}"#)], config);
        assert_eq!(ds.crs_format(), Some(CrsFormat::Wkt));
    }

    #[test]
    fn test_create_crs_from_epsg() {
        let mut ds = open(&[], SrsModifierConfig::default());
        assert!(ds.create_crs_from_epsg("EPSG:nope").is_err());
        assert!(ds.custom_spatial_ref().is_none());
        ds.create_crs_from_epsg("EPSG:4326").unwrap();
        assert_eq!(ds.spatial_ref().unwrap().epsg_code(), Some(4326));
    }

    #[test]
    fn test_raster_queries_delegate() {
        let ds = open(&[("units", "m")], SrsModifierConfig::default());
        assert_eq!(ds.description(), "memory.zarr");
        assert_eq!((ds.raster_x_size(), ds.raster_y_size(), ds.raster_count()), (20, 10, 1));
        assert_eq!(ds.raster_band(1).unwrap().no_data, Some(-9999.0));
        assert!(ds.raster_band(0).is_none());
        assert!(ds.raster_band(2).is_none());
        assert_eq!(ds.geo_transform().unwrap().origin(), (0.0, 10.0));
        assert_eq!(ds.metadata_item("units").as_deref(), Some("m"));
        assert_eq!(ds.metadata().len(), 1);
        assert_eq!(ds.source().description(), "memory.zarr");
    }
}
