//! GDAL/OSR spatial-reference backend.
//!
//! Every definition is handed to `gdal::spatial_ref::SpatialRef`, which owns
//! parsing and the EPSG database. The resulting value is exported back into a
//! [`SpatialRef`] (name, kind, authority, WKT, PROJ string) so nothing GDAL
//! owns outlives the call. Nothing is fetched over the network.

use gdal::spatial_ref::SpatialRef as OsrSpatialRef;
use log::debug;
use serde_json::Value;
use url::Url;
use zarrsrs_core_common::{AuthorityCode, CrsKind, SpatialRef, SrsError, SrsFactory};

const EPSG: &str = "EPSG";
const OGC_HOSTS: &[&str] = &["www.opengis.net", "opengis.net"];

/// Deepest bracket nesting accepted in WKT text.
pub const MAX_WKT_DEPTH: usize = 128;

/// [`SrsFactory`] backed by GDAL's OGR spatial reference.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjSrsFactory;

impl ProjSrsFactory {
    /// Create the factory.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

// `gdal` accessors return `Result` or `Option` depending on the binding version.
fn first<T>(value: impl IntoIterator<Item = T>) -> Option<T> {
    value.into_iter().next()
}

fn kind_of(osr: &OsrSpatialRef) -> CrsKind {
    if osr.is_compound() {
        CrsKind::Compound
    } else if osr.is_projected() {
        CrsKind::Projected
    } else if osr.is_geographic() {
        CrsKind::Geographic
    } else if osr.is_geocentric() {
        CrsKind::Geocentric
    } else if osr.is_vertical() {
        CrsKind::Vertical
    } else if osr.is_local() {
        CrsKind::Engineering
    } else {
        CrsKind::Other
    }
}

fn authority_of(osr: &OsrSpatialRef) -> Option<AuthorityCode> {
    let authority = first(osr.auth_name())?;
    let code = first(osr.auth_code())?;
    Some(AuthorityCode::new(authority, code.to_string()))
}

/// Export an OSR object into a plain value.
///
/// Missing authorities are filled in with `AutoIdentifyEPSG`, so a WGS 84 or
/// UTM definition without an `AUTHORITY` node still reports its EPSG code.
fn export(mut osr: OsrSpatialRef, format: &'static str) -> Result<SpatialRef, SrsError> {
    if authority_of(&osr).is_none() {
        if let Err(e) = osr.auto_identify_epsg() {
            debug!("No EPSG code identified for {format} definition: {e}");
        }
    }

    let wkt = osr.to_wkt().map_err(|e| SrsError::Parse {
        format,
        message: format!("cannot export to WKT: {e}"),
    })?;
    let name = first(osr.name())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "unnamed".to_string());

    let mut srs = SpatialRef::new(name, kind_of(&osr)).with_wkt(wkt);
    if let Some(proj4) = first(osr.to_proj4()).filter(|p| !p.trim().is_empty()) {
        srs = srs.with_proj4(proj4.trim());
    }
    if let Some(authority) = authority_of(&osr) {
        srs = srs.with_authority(authority);
    }
    Ok(srs)
}

fn to_osr(srs: &SpatialRef) -> Option<OsrSpatialRef> {
    if let Some(wkt) = srs.to_wkt() {
        if let Ok(osr) = OsrSpatialRef::from_wkt(wkt) {
            return Some(osr);
        }
    }
    srs.to_projjson()
        .and_then(|json| OsrSpatialRef::from_definition(json).ok())
}

/// Reject WKT nested deeper than [`MAX_WKT_DEPTH`] before it reaches a parser.
fn check_wkt_nesting(text: &str) -> Result<(), SrsError> {
    let mut depth = 0usize;
    let mut quoted = false;
    for (offset, c) in text.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '[' | '(' if !quoted => {
                depth += 1;
                if depth > MAX_WKT_DEPTH {
                    return Err(SrsError::Parse {
                        format: "WKT",
                        message: format!("nesting deeper than {MAX_WKT_DEPTH} levels at offset {offset}"),
                    });
                }
            },
            ']' | ')' if !quoted => depth = depth.saturating_sub(1),
            _ => {},
        }
    }
    Ok(())
}

/// `http(s)://www.opengis.net/def/crs/...` and `urn:ogc:def:crs:...` can be
/// resolved offline; anything else would need a download.
fn is_ogc_reference(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {
            let on_ogc_host = url
                .host_str()
                .is_some_and(|host| OGC_HOSTS.iter().any(|h| host.eq_ignore_ascii_case(h)));
            let mut segments = url.path_segments().into_iter().flatten();
            on_ogc_host && segments.next() == Some("def") && segments.next() == Some("crs")
        },
        "urn" => url
            .path()
            .to_ascii_lowercase()
            .starts_with("ogc:def:crs:"),
        _ => false,
    }
}

impl SrsFactory for ProjSrsFactory {
    fn from_url(&self, url: &str) -> Result<SpatialRef, SrsError> {
        let trimmed = url.trim();
        let parsed = Url::parse(trimmed).map_err(|e| SrsError::Parse {
            format: "URL",
            message: format!("{e}: {url}"),
        })?;
        if !is_ogc_reference(&parsed) {
            return Err(SrsError::RemoteFetchUnsupported {
                url: url.to_string(),
            });
        }

        let osr = OsrSpatialRef::from_definition(trimmed).map_err(|e| SrsError::Parse {
            format: "URL",
            message: format!("{e}: {url}"),
        })?;
        export(osr, "URL")
    }

    fn from_wkt(&self, text: &str) -> Result<SpatialRef, SrsError> {
        check_wkt_nesting(text)?;
        let osr = OsrSpatialRef::from_wkt(text.trim()).map_err(|e| SrsError::Parse {
            format: "WKT",
            message: e.to_string(),
        })?;
        export(osr, "WKT")
    }

    fn from_projjson(&self, text: &str) -> Result<SpatialRef, SrsError> {
        // `from_definition` also accepts file names and authority strings.
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(_)) => {},
            Ok(_) => {
                return Err(SrsError::Parse {
                    format: "PROJJSON",
                    message: "expected a JSON object".to_string(),
                });
            },
            Err(e) => {
                return Err(SrsError::Parse {
                    format: "PROJJSON",
                    message: e.to_string(),
                });
            },
        }

        let osr = OsrSpatialRef::from_definition(text.trim()).map_err(|e| SrsError::Parse {
            format: "PROJJSON",
            message: e.to_string(),
        })?;
        Ok(export(osr, "PROJJSON")?.with_projjson(text.trim()))
    }

    fn from_epsg(&self, code: u32) -> Result<SpatialRef, SrsError> {
        let osr = OsrSpatialRef::from_epsg(code).map_err(|e| {
            debug!("EPSG:{code} rejected: {e}");
            SrsError::UnknownCode {
                authority: EPSG.to_string(),
                code: code.to_string(),
            }
        })?;
        let srs = export(osr, EPSG)?;
        Ok(if srs.authority().is_some() {
            srs
        } else {
            srs.with_authority(AuthorityCode::epsg(code))
        })
    }

    fn is_same(&self, a: &SpatialRef, b: &SpatialRef) -> bool {
        match (to_osr(a), to_osr(b)) {
            (Some(a), Some(b)) => a == b,
            _ => a.is_same(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WGS84_NO_AUTHORITY: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433]]"#;

    const WGS84_PROJJSON: &str = r#"{
        "type": "GeographicCRS",
        "name": "WGS 84",
        "datum": {
            "type": "GeodeticReferenceFrame",
            "name": "World Geodetic System 1984",
            "ellipsoid": {"name": "WGS 84", "semi_major_axis": 6378137, "inverse_flattening": 298.257223563}
        },
        "coordinate_system": {
            "subtype": "ellipsoidal",
            "axis": [
                {"name": "Geodetic latitude", "abbreviation": "Lat", "direction": "north", "unit": "degree"},
                {"name": "Geodetic longitude", "abbreviation": "Lon", "direction": "east", "unit": "degree"}
            ]
        },
        "id": {"authority": "EPSG", "code": 4326}
    }"#;

    #[test]
    fn test_from_epsg() {
        let srs = ProjSrsFactory.from_epsg(32632).unwrap();
        assert_eq!(srs.epsg_code(), Some(32632));
        assert!(srs.is_projected());
        assert!(srs.name().contains("UTM zone 32N"));
        let proj4 = srs.to_proj4().unwrap();
        assert!(proj4.contains("+proj=utm"));
        assert!(proj4.contains("+zone=32"));
        assert!(srs.to_wkt().is_some());

        let wgs84 = ProjSrsFactory.from_epsg(4326).unwrap();
        assert!(wgs84.is_geographic());
    }

    #[test]
    fn test_from_epsg_unknown() {
        assert!(matches!(
            ProjSrsFactory.from_epsg(1),
            Err(SrsError::UnknownCode { .. })
        ));
        assert!(matches!(
            ProjSrsFactory.from_epsg(100_000_000),
            Err(SrsError::UnknownCode { .. })
        ));
    }

    #[test]
    fn test_from_url_ogc_forms() {
        for url in [
            "http://www.opengis.net/def/crs/EPSG/0/4326",
            "https://www.opengis.net/def/crs/EPSG/0/4326",
            "urn:ogc:def:crs:EPSG::4326",
        ] {
            let srs = ProjSrsFactory.from_url(url).unwrap();
            assert_eq!(srs.epsg_code(), Some(4326), "{url}");
        }
    }

    #[test]
    fn test_from_url_rejections() {
        assert!(matches!(
            ProjSrsFactory.from_url("https://epsg.io/4326.wkt"),
            Err(SrsError::RemoteFetchUnsupported { .. })
        ));
        assert!(matches!(
            ProjSrsFactory.from_url("http://www.opengis.net/gml/srs/epsg.xml#4326"),
            Err(SrsError::RemoteFetchUnsupported { .. })
        ));
        assert!(matches!(
            ProjSrsFactory.from_url("not a url"),
            Err(SrsError::Parse { format: "URL", .. })
        ));
        assert!(ProjSrsFactory
            .from_url("http://www.opengis.net/def/crs/EPSG/0/abc")
            .is_err());
    }

    #[test]
    fn test_from_wkt() {
        let srs = ProjSrsFactory
            .from_wkt(r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563]],PRIMEM["Greenwich",0],UNIT["degree",0.0174532925199433],AUTHORITY["EPSG","4326"]]"#)
            .unwrap();
        assert_eq!(srs.name(), "WGS 84");
        assert!(srs.is_geographic());
        assert_eq!(srs.epsg_code(), Some(4326));
        assert!(srs.to_proj4().unwrap().contains("longlat"));
        assert!(srs.is_same(&ProjSrsFactory.from_epsg(4326).unwrap()));
    }

    #[test]
    fn test_wkt_without_authority_matches_epsg() {
        let srs = ProjSrsFactory.from_wkt(WGS84_NO_AUTHORITY).unwrap();
        let epsg = ProjSrsFactory.from_epsg(4326).unwrap();

        assert_eq!(srs.epsg_code(), Some(4326));
        assert!(srs.to_proj4().is_some());
        assert!(srs.is_same(&epsg));
        assert!(ProjSrsFactory.is_same(&srs, &epsg));
    }

    #[test]
    fn test_semantic_comparison() {
        let wgs84 = ProjSrsFactory.from_epsg(4326).unwrap();
        let utm = ProjSrsFactory.from_epsg(32632).unwrap();
        assert!(!ProjSrsFactory.is_same(&wgs84, &utm));
        assert!(ProjSrsFactory.is_same(&utm, &utm.clone()));

        let bare = SpatialRef::new("WGS 84", CrsKind::Geographic).with_wkt(WGS84_NO_AUTHORITY);
        assert!(bare.authority().is_none());
        assert!(ProjSrsFactory.is_same(&bare, &wgs84));
    }

    #[test]
    fn test_from_wkt_rejections() {
        assert!(ProjSrsFactory.from_wkt("garbage").is_err());
        assert!(ProjSrsFactory.from_wkt(r#"GEOGCS["WGS 84""#).is_err());
    }

    #[test]
    fn test_deeply_nested_wkt_is_rejected() {
        let text = format!("{}{}", "A[".repeat(200_000), "]".repeat(200_000));
        let err = ProjSrsFactory.from_wkt(&text).unwrap_err();
        assert!(matches!(err, SrsError::Parse { format: "WKT", .. }));
        assert!(err.to_string().contains("nesting deeper than 128"));

        let quoted = format!(r#"GEOGCS["{}"]"#, "[".repeat(1_000));
        assert!(check_wkt_nesting(&quoted).is_ok());
    }

    #[test]
    fn test_from_projjson() {
        let srs = ProjSrsFactory.from_projjson(WGS84_PROJJSON).unwrap();
        assert_eq!(srs.name(), "WGS 84");
        assert!(srs.is_geographic());
        assert_eq!(srs.epsg_code(), Some(4326));
        assert_eq!(srs.to_projjson(), Some(WGS84_PROJJSON.trim()));
        assert!(ProjSrsFactory.is_same(&srs, &ProjSrsFactory.from_epsg(4326).unwrap()));
    }

    #[test]
    fn test_from_projjson_rejections() {
        assert!(matches!(
            ProjSrsFactory.from_projjson("EPSG:4326"),
            Err(SrsError::Parse { format: "PROJJSON", .. })
        ));
        assert!(matches!(
            ProjSrsFactory.from_projjson("[1, 2]"),
            Err(SrsError::Parse { format: "PROJJSON", .. })
        ));
        assert!(ProjSrsFactory
            .from_projjson(r#"{"type":"Unknown"}"#)
            .is_err());
    }
}
