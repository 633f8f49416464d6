//! Spatial reference values and the factory seam that builds them.
//!
//! The [`SrsFactory`] trait is the only way the rest of the workspace
//! constructs a [`SpatialRef`]. Backends decide how much of each serialization
//! they understand; callers only see a value or an [`SrsError`].

use std::fmt;

use thiserror::Error;

/// An authority-qualified identifier such as `EPSG:4326`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthorityCode {
    /// Authority name (e.g. `"EPSG"`).
    pub authority: String,
    /// Code within the authority, kept as text because not every authority
    /// uses numeric codes.
    pub code: String,
}

impl AuthorityCode {
    /// Create an authority code.
    #[must_use]
    pub fn new(authority: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            code: code.into(),
        }
    }

    /// Shorthand for an EPSG code.
    #[must_use]
    pub fn epsg(code: u32) -> Self {
        Self::new("EPSG", code.to_string())
    }

    /// Numeric EPSG code, if this is one.
    #[must_use]
    pub fn epsg_code(&self) -> Option<u32> {
        if self.authority.eq_ignore_ascii_case("EPSG") {
            self.code.trim().parse().ok()
        } else {
            None
        }
    }

    /// Authority names compare case-insensitively, codes compare trimmed.
    #[must_use]
    pub fn matches(&self, other: &AuthorityCode) -> bool {
        self.authority.eq_ignore_ascii_case(&other.authority) && self.code.trim() == other.code.trim()
    }
}

impl fmt::Display for AuthorityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.authority, self.code)
    }
}

/// Broad family a coordinate reference system belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrsKind {
    /// Latitude/longitude on an ellipsoid.
    Geographic,
    /// Planar coordinates derived from a geographic CRS.
    Projected,
    /// Earth-centred cartesian coordinates.
    Geocentric,
    /// Heights or depths.
    Vertical,
    /// A horizontal CRS combined with a vertical one.
    Compound,
    /// Local engineering coordinates.
    Engineering,
    /// Anything else (bound, temporal, parametric, ...).
    Other,
}

impl CrsKind {
    /// Returns the string representation of this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            CrsKind::Geographic => "Geographic",
            CrsKind::Projected => "Projected",
            CrsKind::Geocentric => "Geocentric",
            CrsKind::Vertical => "Vertical",
            CrsKind::Compound => "Compound",
            CrsKind::Engineering => "Engineering",
            CrsKind::Other => "Other",
        }
    }
}

/// A constructed spatial reference.
///
/// Values are immutable once built; a backend fills in whatever
/// serializations it has (WKT, PROJJSON, PROJ string) alongside the name,
/// kind, and authority code.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialRef {
    name: String,
    kind: CrsKind,
    authority: Option<AuthorityCode>,
    wkt: Option<String>,
    projjson: Option<String>,
    proj4: Option<String>,
}

impl SpatialRef {
    /// Create a spatial reference with only a name and a kind.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: CrsKind) -> Self {
        Self {
            name: name.into(),
            kind,
            authority: None,
            wkt: None,
            projjson: None,
            proj4: None,
        }
    }

    /// Attach an authority code.
    #[must_use]
    pub fn with_authority(mut self, authority: AuthorityCode) -> Self {
        self.authority = Some(authority);
        self
    }

    /// Attach a WKT serialization.
    #[must_use]
    pub fn with_wkt(mut self, wkt: impl Into<String>) -> Self {
        self.wkt = Some(wkt.into());
        self
    }

    /// Attach a PROJJSON serialization.
    #[must_use]
    pub fn with_projjson(mut self, projjson: impl Into<String>) -> Self {
        self.projjson = Some(projjson.into());
        self
    }

    /// Attach a PROJ string.
    #[must_use]
    pub fn with_proj4(mut self, proj4: impl Into<String>) -> Self {
        self.proj4 = Some(proj4.into());
        self
    }

    /// CRS name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// CRS family.
    #[must_use]
    pub fn kind(&self) -> CrsKind {
        self.kind
    }

    /// Authority code, if the definition carried one.
    #[must_use]
    pub fn authority(&self) -> Option<&AuthorityCode> {
        self.authority.as_ref()
    }

    /// Numeric EPSG code, if the authority is EPSG.
    #[must_use]
    pub fn epsg_code(&self) -> Option<u32> {
        self.authority.as_ref().and_then(AuthorityCode::epsg_code)
    }

    /// WKT serialization, if available.
    #[must_use]
    pub fn to_wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// PROJJSON serialization, if available.
    #[must_use]
    pub fn to_projjson(&self) -> Option<&str> {
        self.projjson.as_deref()
    }

    /// PROJ string, if available.
    #[must_use]
    pub fn to_proj4(&self) -> Option<&str> {
        self.proj4.as_deref()
    }

    /// Returns `true` for geographic (lat/long) systems.
    #[must_use]
    pub fn is_geographic(&self) -> bool {
        self.kind == CrsKind::Geographic
    }

    /// Returns `true` for projected systems.
    #[must_use]
    pub fn is_projected(&self) -> bool {
        self.kind == CrsKind::Projected
    }

    /// Whether two spatial references describe the same system.
    ///
    /// Authority codes decide when both sides have one. Otherwise the WKT
    /// texts are compared ignoring whitespace, then the PROJJSON documents
    /// are compared structurally.
    ///
    /// # Examples
    ///
    /// ```
    /// use zarrsrs_core_common::{AuthorityCode, CrsKind, SpatialRef};
    ///
    /// let a = SpatialRef::new("WGS 84", CrsKind::Geographic).with_authority(AuthorityCode::epsg(4326));
    /// let b = SpatialRef::new("WGS84", CrsKind::Geographic).with_authority(AuthorityCode::new("epsg", "4326"));
    /// assert!(a.is_same(&b));
    /// ```
    #[must_use]
    pub fn is_same(&self, other: &SpatialRef) -> bool {
        if let (Some(a), Some(b)) = (&self.authority, &other.authority) {
            return a.matches(b);
        }
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return strip_whitespace(a) == strip_whitespace(b);
        }
        if let (Some(a), Some(b)) = (&self.projjson, &other.projjson) {
            return match (
                serde_json::from_str::<serde_json::Value>(a),
                serde_json::from_str::<serde_json::Value>(b),
            ) {
                (Ok(a), Ok(b)) => a == b,
                _ => a == b,
            };
        }
        false
    }
}

impl fmt::Display for SpatialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.authority {
            Some(authority) => write!(f, "{} ({authority})", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Errors raised while constructing a spatial reference.
#[derive(Debug, Error)]
pub enum SrsError {
    /// The definition could not be parsed.
    #[error("Invalid {format} definition: {message}")]
    Parse {
        /// Serialization being parsed (`"URL"`, `"WKT"`, `"PROJJSON"`).
        format: &'static str,
        /// Parser diagnostic.
        message: String,
    },

    /// The authority is known but the code is not in its database.
    #[error("Unknown {authority} code '{code}'")]
    UnknownCode {
        /// The authority name.
        authority: String,
        /// The code that was not found.
        code: String,
    },

    /// The URL would have to be dereferenced over the network.
    #[error("Fetching remote CRS definitions is not supported: {url}")]
    RemoteFetchUnsupported {
        /// The URL.
        url: String,
    },
}

/// Builds spatial references from their serialized forms.
///
/// Implementations must be side-effect free: a failed construction leaves
/// nothing behind.
pub trait SrsFactory: Send + Sync {
    /// Interpret a URL or URN as an authority reference
    /// (e.g. `http://www.opengis.net/def/crs/EPSG/0/4326`).
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be interpreted.
    fn from_url(&self, url: &str) -> Result<SpatialRef, SrsError>;

    /// Parse a WKT (1 or 2) definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a WKT CRS.
    fn from_wkt(&self, wkt: &str) -> Result<SpatialRef, SrsError>;

    /// Parse a PROJJSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a PROJJSON CRS.
    fn from_projjson(&self, projjson: &str) -> Result<SpatialRef, SrsError>;

    /// Look up an EPSG code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is unknown.
    fn from_epsg(&self, code: u32) -> Result<SpatialRef, SrsError>;

    /// Whether two spatial references describe the same system.
    ///
    /// Backends that can compare definitions semantically should override
    /// this; the default is [`SpatialRef::is_same`].
    fn is_same(&self, a: &SpatialRef, b: &SpatialRef) -> bool {
        a.is_same(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authority_code_epsg() {
        let code = AuthorityCode::epsg(32632);
        assert_eq!(code.to_string(), "EPSG:32632");
        assert_eq!(code.epsg_code(), Some(32632));
        assert_eq!(AuthorityCode::new("OGC", "CRS84").epsg_code(), None);
    }

    #[test]
    fn test_is_same_prefers_authority() {
        let a = SpatialRef::new("A", CrsKind::Projected)
            .with_authority(AuthorityCode::epsg(32632))
            .with_wkt("PROJCS[\"A\"]");
        let b = SpatialRef::new("B", CrsKind::Projected)
            .with_authority(AuthorityCode::epsg(32633))
            .with_wkt("PROJCS[\"A\"]");
        assert!(!a.is_same(&b));
        assert!(a.is_same(&a.clone()));
    }

    #[test]
    fn test_is_same_falls_back_to_wkt() {
        let a = SpatialRef::new("WGS 84", CrsKind::Geographic).with_wkt("GEOGCS[\"WGS 84\", UNIT[\"degree\",0.01]]");
        let b = SpatialRef::new("WGS 84", CrsKind::Geographic).with_wkt("GEOGCS[\"WGS 84\",UNIT[\"degree\",0.01]]");
        assert!(a.is_same(&b));
    }

    #[test]
    fn test_is_same_projjson_structural() {
        let a = SpatialRef::new("x", CrsKind::Other).with_projjson(r#"{"type":"GeographicCRS","name":"x"}"#);
        let b = SpatialRef::new("x", CrsKind::Other).with_projjson(r#"{ "name": "x", "type": "GeographicCRS" }"#);
        assert!(a.is_same(&b));
    }

    #[test]
    fn test_is_same_without_common_ground() {
        let a = SpatialRef::new("x", CrsKind::Other).with_wkt("LOCAL_CS[\"x\"]");
        let b = SpatialRef::new("x", CrsKind::Other).with_projjson("{}");
        assert!(!a.is_same(&b));
    }

    #[test]
    fn test_display() {
        let srs = SpatialRef::new("WGS 84", CrsKind::Geographic).with_authority(AuthorityCode::epsg(4326));
        assert_eq!(srs.to_string(), "WGS 84 (EPSG:4326)");
    }
}
