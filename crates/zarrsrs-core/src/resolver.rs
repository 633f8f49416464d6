//! CRS resolution from `_CRS` / `horizontal_CRS_code` metadata.
//!
//! A `_CRS` entry is a JSON object with up to three serializations of the same
//! CRS. They are tried in a fixed order (`url`, then `wkt`, then `projjson`)
//! and the first one the [`SrsFactory`] accepts wins. Individual failures are
//! only logged; the caller sees a single aggregate error when nothing works.
//!
//! # Examples
//!
//! ```
//! use zarrsrs_core::resolver::{Resolution, Resolver};
//! # use zarrsrs_core_common::{AuthorityCode, CrsKind, SpatialRef, SrsError, SrsFactory};
//! # struct Factory;
//! # impl SrsFactory for Factory {
//! #     fn from_url(&self, _: &str) -> Result<SpatialRef, SrsError> {
//! #         Err(SrsError::RemoteFetchUnsupported { url: String::new() })
//! #     }
//! #     fn from_wkt(&self, _: &str) -> Result<SpatialRef, SrsError> {
//! #         Ok(SpatialRef::new("WGS 84", CrsKind::Geographic))
//! #     }
//! #     fn from_projjson(&self, _: &str) -> Result<SpatialRef, SrsError> {
//! #         unreachable!()
//! #     }
//! #     fn from_epsg(&self, code: u32) -> Result<SpatialRef, SrsError> {
//! #         Ok(SpatialRef::new("x", CrsKind::Projected).with_authority(AuthorityCode::epsg(code)))
//! #     }
//! # }
//!
//! let factory = Factory;
//! let resolver = Resolver::new(&factory);
//! let resolution = resolver
//!     .resolve(Some(r#"{"url": "https://example.com/crs", "wkt": "GEOGCS[\"WGS 84\"]"}"#), None)
//!     .unwrap();
//! assert!(matches!(resolution, Resolution::Resolved { .. }));
//! ```

use log::{Level, debug, log};
use serde_json::{Map, Value};
use zarrsrs_core_common::{SpatialRef, SrsFactory};

use crate::error::{FormatAttempt, ResolveError, ValidationError};

/// Metadata key holding the JSON CRS object.
pub const CRS_METADATA_KEY: &str = "_CRS";

/// Metadata key holding a bare authority code, consulted when `_CRS` is absent.
pub const HORIZONTAL_CRS_CODE_KEY: &str = "horizontal_CRS_code";

/// Length of the scheme label in front of a `horizontal_CRS_code` value (`"EPSG:"`).
pub const AUTHORITY_PREFIX_LEN: usize = 5;

/// Serialization a spatial reference was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrsFormat {
    /// `_CRS.url`
    Url,
    /// `_CRS.wkt`
    Wkt,
    /// `_CRS.projjson`
    ProjJson,
    /// `horizontal_CRS_code`
    Epsg,
    /// `EPSG_OVERRIDE` configuration
    Override,
    /// Supplied through `set_spatial_ref`
    External,
}

impl CrsFormat {
    /// Returns the string representation of this format.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            CrsFormat::Url => "url",
            CrsFormat::Wkt => "wkt",
            CrsFormat::ProjJson => "projjson",
            CrsFormat::Epsg => "epsg",
            CrsFormat::Override => "override",
            CrsFormat::External => "external",
        }
    }
}

/// Parsed `_CRS` object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrsCandidate {
    /// Authority URL or URN
    pub url: Option<String>,
    /// Well-known text
    pub wkt: Option<String>,
    /// PROJJSON document (object or string)
    pub projjson: Option<Value>,
}

impl CrsCandidate {
    /// Extract the recognized entries from a JSON object.
    ///
    /// `url` and `wkt` only count when they are strings; `projjson` counts for
    /// any value except `null`.
    #[must_use]
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let string_entry = |key: &str| match object.get(key) {
            Some(Value::String(text)) => Some(text.clone()),
            Some(other) => {
                debug!("Ignoring non-string _CRS.{key} entry: {other}");
                None
            },
            None => None,
        };

        Self {
            url: string_entry("url"),
            wkt: string_entry("wkt"),
            projjson: object.get("projjson").filter(|v| !v.is_null()).cloned(),
        }
    }

    /// Parse raw `_CRS` text.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::EmptyMetadata`] for an empty string and
    /// [`ResolveError::MalformedMetadata`] when the text is not a JSON object.
    pub fn parse(raw: &str) -> Result<Self, ResolveError> {
        if raw.is_empty() {
            return Err(ResolveError::EmptyMetadata);
        }

        let value: Value = serde_json::from_str(raw).map_err(|e| ResolveError::MalformedMetadata {
            message: e.to_string(),
        })?;

        match value {
            Value::Object(object) => Ok(Self::from_object(&object)),
            other => Err(ResolveError::MalformedMetadata {
                message: format!("expected a JSON object, found {}", json_type_name(&other)),
            }),
        }
    }

    fn non_empty_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|s| !s.is_empty())
    }

    fn non_empty_wkt(&self) -> Option<&str> {
        self.wkt.as_deref().filter(|s| !s.is_empty())
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Check that a candidate has at least one entry worth constructing from.
///
/// Only presence is checked: a well-formed but wrong WKT string passes.
///
/// # Errors
///
/// Returns [`ValidationError::NoValidFormat`] when there is no non-empty
/// `url`, no non-empty `wkt`, and no `projjson`.
pub fn validate(candidate: &CrsCandidate) -> Result<(), ValidationError> {
    if candidate.non_empty_url().is_some()
        || candidate.non_empty_wkt().is_some()
        || candidate.projjson.is_some()
    {
        Ok(())
    } else {
        Err(ValidationError::NoValidFormat)
    }
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A spatial reference was constructed.
    Resolved {
        /// The constructed spatial reference
        srs: SpatialRef,
        /// Which serialization produced it
        format: CrsFormat,
    },
    /// Neither metadata key was present; keep the wrapped driver's value.
    NoMetadata,
}

impl Resolution {
    /// The resolved spatial reference, if any.
    #[must_use]
    pub fn into_spatial_ref(self) -> Option<(SpatialRef, CrsFormat)> {
        match self {
            Resolution::Resolved { srs, format } => Some((srs, format)),
            Resolution::NoMetadata => None,
        }
    }
}

/// Resolves CRS metadata against a spatial-reference backend.
pub struct Resolver<'a> {
    factory: &'a dyn SrsFactory,
    trace_level: Level,
}

impl<'a> Resolver<'a> {
    /// Create a resolver with per-attempt diagnostics at TRACE level.
    #[must_use]
    pub fn new(factory: &'a dyn SrsFactory) -> Self {
        Self {
            factory,
            trace_level: Level::Trace,
        }
    }

    /// Promote per-attempt diagnostics to DEBUG level.
    #[must_use]
    pub fn with_verbose_diagnostics(mut self, verbose: bool) -> Self {
        self.trace_level = if verbose { Level::Debug } else { Level::Trace };
        self
    }

    /// Resolve `_CRS` metadata, falling back to a `horizontal_CRS_code` value.
    ///
    /// `fallback_code` is only consulted when `metadata` is `None`.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolveError`] when metadata is present but unusable.
    pub fn resolve(
        &self,
        metadata: Option<&str>,
        fallback_code: Option<&str>,
    ) -> Result<Resolution, ResolveError> {
        match (metadata, fallback_code) {
            (Some(raw), _) => {
                let candidate = CrsCandidate::parse(raw)?;
                self.resolve_candidate(&candidate)
                    .map(|(srs, format)| Resolution::Resolved { srs, format })
            },
            (None, Some(code)) => self.resolve_authority_code(code).map(|srs| Resolution::Resolved {
                srs,
                format: CrsFormat::Epsg,
            }),
            (None, None) => {
                log!(self.trace_level, "No {CRS_METADATA_KEY} or {HORIZONTAL_CRS_CODE_KEY} metadata");
                Ok(Resolution::NoMetadata)
            },
        }
    }

    /// Build a spatial reference from a parsed candidate.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Validation`] when the candidate is empty and
    /// [`ResolveError::NoUsableFormat`] when every present format fails.
    pub fn resolve_candidate(
        &self,
        candidate: &CrsCandidate,
    ) -> Result<(SpatialRef, CrsFormat), ResolveError> {
        validate(candidate)?;

        let mut attempts = Vec::new();

        if let Some(url) = candidate.non_empty_url() {
            match self.factory.from_url(url) {
                Ok(srs) => return Ok(self.accept(srs, CrsFormat::Url)),
                Err(e) => attempts.push(self.reject(CrsFormat::Url, &e)),
            }
        }

        if let Some(wkt) = candidate.non_empty_wkt() {
            match self.factory.from_wkt(wkt) {
                Ok(srs) => return Ok(self.accept(srs, CrsFormat::Wkt)),
                Err(e) => attempts.push(self.reject(CrsFormat::Wkt, &e)),
            }
        }

        if let Some(projjson) = &candidate.projjson {
            let text = match projjson {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            match self.factory.from_projjson(&text) {
                Ok(srs) => return Ok(self.accept(srs, CrsFormat::ProjJson)),
                Err(e) => attempts.push(self.reject(CrsFormat::ProjJson, &e)),
            }
        }

        Err(ResolveError::NoUsableFormat { attempts })
    }

    /// Build a spatial reference from a `horizontal_CRS_code` value such as
    /// `"EPSG:32632"`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidAuthorityCode`] when the value is not a
    /// five-character scheme label followed by a number, and
    /// [`ResolveError::EpsgImportFailed`] when the backend rejects the code.
    pub fn resolve_authority_code(&self, raw: &str) -> Result<SpatialRef, ResolveError> {
        let code = parse_authority_code(raw)?;
        let srs = self
            .factory
            .from_epsg(code)
            .map_err(|source| ResolveError::EpsgImportFailed { code, source })?;
        log!(self.trace_level, "Built spatial reference from {HORIZONTAL_CRS_CODE_KEY} EPSG:{code}");
        Ok(srs)
    }

    fn accept(&self, srs: SpatialRef, format: CrsFormat) -> (SpatialRef, CrsFormat) {
        log!(
            self.trace_level,
            "Built spatial reference '{}' from _CRS.{}",
            srs.name(),
            format.as_str()
        );
        (srs, format)
    }

    fn reject(&self, format: CrsFormat, error: &dyn std::error::Error) -> FormatAttempt {
        log!(self.trace_level, "_CRS.{} rejected: {error}", format.as_str());
        FormatAttempt {
            format,
            message: error.to_string(),
        }
    }
}

/// Strip the scheme label from a `horizontal_CRS_code` value and parse the code.
///
/// # Errors
///
/// Returns [`ResolveError::InvalidAuthorityCode`] if the remainder is not a
/// positive integer.
pub fn parse_authority_code(raw: &str) -> Result<u32, ResolveError> {
    let invalid = || ResolveError::InvalidAuthorityCode {
        code: raw.to_string(),
    };
    let digits = raw.get(AUTHORITY_PREFIX_LEN..).ok_or_else(invalid)?;
    match digits.trim().parse::<u32>() {
        Ok(code) if code > 0 => Ok(code),
        _ => Err(invalid()),
    }
}
