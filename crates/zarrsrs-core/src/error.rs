//! Custom error types for `zarrsrs` operations.
//!
//! Errors are split by how far they are allowed to travel. Driver errors abort
//! an open attempt. Resolution errors never do: the dataset logs them and keeps
//! the wrapped driver's spatial reference.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use zarrsrs_core_common::SrsError;

use crate::resolver::CrsFormat;

/// Main error type for `zarrsrs` operations.
#[derive(Debug, Error)]
pub enum SrsModifierError {
    /// Driver-related errors (unrecognized input, wrapped driver failures)
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// CRS metadata resolution errors
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Dataset operation errors
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic errors from dependencies
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Driver-related errors.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The wrapped driver declined to identify the input
    #[error("'{path}' is not recognized by the {driver} driver", path = path.display())]
    NotRecognized {
        /// The driver that declined
        driver: String,
        /// The input path
        path: PathBuf,
    },

    /// The wrapped driver recognized the input but could not open it
    #[error("The {driver} driver failed to open '{path}': {source}", path = path.display())]
    UnderlyingOpenFailed {
        /// The wrapped driver name
        driver: String,
        /// The input path
        path: PathBuf,
        /// The wrapped driver's error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The driver to decorate is not registered with the host
    #[error("Original {name} driver not available. Registered drivers: {available}")]
    MissingUnderlyingDriver {
        /// The driver that was looked up
        name: String,
        /// Comma-separated list of registered drivers
        available: String,
    },

    /// A driver requested by name is not registered
    #[error("Driver '{name}' not found. Available drivers: {available}")]
    NotFound {
        /// The requested driver name
        name: String,
        /// Comma-separated list of registered drivers
        available: String,
    },
}

/// Guard failures raised before any construction is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// None of `url`, `wkt`, or `projjson` is present
    #[error("_CRS metadata has no url, wkt, or projjson entry")]
    NoValidFormat,
}

/// One failed construction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatAttempt {
    /// The format that was tried
    pub format: CrsFormat,
    /// Why construction failed
    pub message: String,
}

impl fmt::Display for FormatAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.format.as_str(), self.message)
    }
}

/// CRS metadata resolution errors.
///
/// None of these abort a dataset open.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// `_CRS` is present but holds an empty string
    #[error("_CRS metadata is empty")]
    EmptyMetadata,

    /// `_CRS` is not a JSON object
    #[error("Malformed _CRS metadata: {message}")]
    MalformedMetadata {
        /// Parser diagnostic
        message: String,
    },

    /// The candidate object has nothing to construct from
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Every present format failed to construct
    #[error("No usable CRS format in _CRS metadata ({})", join_attempts(attempts))]
    NoUsableFormat {
        /// Failed attempts, in the order they were tried
        attempts: Vec<FormatAttempt>,
    },

    /// `horizontal_CRS_code` does not hold a scheme label followed by a number
    #[error("Invalid authority code '{code}'")]
    InvalidAuthorityCode {
        /// The raw code
        code: String,
    },

    /// The EPSG code was well formed but could not be constructed
    #[error("Failed to build spatial reference from EPSG:{code}: {source}")]
    EpsgImportFailed {
        /// The EPSG code
        code: u32,
        /// The backend error
        #[source]
        source: SrsError,
    },
}

fn join_attempts(attempts: &[FormatAttempt]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Dataset operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatasetError {
    /// `set_spatial_ref` was called without a spatial reference
    #[error("Cannot set a null spatial reference")]
    NullSpatialRef,
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Invalid option value
    #[error("Invalid {option} option: {message}")]
    InvalidOption {
        /// The option name
        option: String,
        /// Why it's invalid
        message: String,
    },
}

/// Type alias for Results using `SrsModifierError`.
pub type Result<T> = std::result::Result<T, SrsModifierError>;

impl SrsModifierError {
    /// Get a user-friendly error message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Driver(e) => e.user_message(),
            Self::Resolve(e) => format!("CRS metadata ignored: {e}"),
            Self::Dataset(e) => e.to_string(),
            Self::Config(e) => format!("Configuration error: {e}"),
            Self::Other(e) => format!("Error: {e:#}"),
        }
    }

    /// Get recovery suggestions if available.
    #[must_use]
    pub fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Driver(e) => e.recovery_suggestion(),
            Self::Resolve(e) => e.recovery_suggestion(),
            Self::Config(_) => Some(
                "Check ZARR_SRS_TRANSFORM_TYPE, ZARR_SRS_TARGET_EPSG and ZARR_SRS_DEBUG."
                    .to_string(),
            ),
            _ => None,
        }
    }

    /// Recover the typed error behind an [`anyhow::Error`] returned by the
    /// operations layer, falling back to [`SrsModifierError::Other`].
    #[must_use]
    pub fn classify(err: anyhow::Error) -> Self {
        let err = match err.downcast::<DriverError>() {
            Ok(e) => return Self::Driver(e),
            Err(err) => err,
        };
        let err = match err.downcast::<ConfigError>() {
            Ok(e) => return Self::Config(e),
            Err(err) => err,
        };
        let err = match err.downcast::<ResolveError>() {
            Ok(e) => return Self::Resolve(e),
            Err(err) => err,
        };
        match err.downcast::<DatasetError>() {
            Ok(e) => Self::Dataset(e),
            Err(err) => Self::Other(err),
        }
    }
}

impl DriverError {
    fn user_message(&self) -> String {
        match self {
            Self::NotFound { name, available } | Self::MissingUnderlyingDriver { name, available } => {
                format!(
                    "Driver '{name}' not found.\n\nAvailable drivers:\n{}",
                    available
                        .split(", ")
                        .map(|d| format!("  - {d}"))
                        .collect::<Vec<_>>()
                        .join("\n")
                )
            },
            Self::NotRecognized { .. } | Self::UnderlyingOpenFailed { .. } => self.to_string(),
        }
    }

    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::NotFound { .. } => {
                Some("Run 'zarrsrs drivers' to see all registered drivers.".to_string())
            },
            Self::MissingUnderlyingDriver { .. } => {
                Some("Register the Zarr driver before the SRS modifier.".to_string())
            },
            Self::NotRecognized { .. } => {
                Some("Check that the path points at a Zarr array or group.".to_string())
            },
            Self::UnderlyingOpenFailed { .. } => None,
        }
    }
}

impl ResolveError {
    fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::MalformedMetadata { .. } | Self::EmptyMetadata => {
                Some("Rewrite the _CRS attribute as a JSON object.".to_string())
            },
            Self::Validation(_) | Self::NoUsableFormat { .. } => Some(
                "Provide a url, wkt, or projjson entry the spatial reference backend understands."
                    .to_string(),
            ),
            Self::InvalidAuthorityCode { .. } | Self::EpsgImportFailed { .. } => {
                Some("Use a code of the form 'EPSG:32632'.".to_string())
            },
        }
    }
}

/// Helper to create `DriverError::NotFound` with the registered drivers.
#[must_use]
pub fn driver_not_found(name: &str, available: &[&str]) -> DriverError {
    DriverError::NotFound {
        name: name.to_string(),
        available: available.join(", "),
    }
}
