//! Configuration for the SRS modifier driver.
//!
//! Options are read once, when the driver is built, and never revisited. The
//! process environment is the usual source; [`SrsModifierConfig::from_lookup`]
//! accepts any key/value source so callers and tests can supply their own.

use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::error::ConfigError;

/// Environment option selecting the transform strategy.
pub const TRANSFORM_TYPE_OPTION: &str = "ZARR_SRS_TRANSFORM_TYPE";

/// Environment option holding the EPSG code used by `EPSG_OVERRIDE`.
pub const TARGET_EPSG_OPTION: &str = "ZARR_SRS_TARGET_EPSG";

/// Environment option enabling verbose CRS diagnostics.
pub const DEBUG_OPTION: &str = "ZARR_SRS_DEBUG";

/// What to do with the resolved spatial reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformType {
    /// Keep whatever the metadata resolves to.
    #[default]
    None,
    /// Replace the spatial reference with the configured target EPSG code.
    EpsgOverride,
}

impl TransformType {
    /// Returns the option value for this transform type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            TransformType::None => "NONE",
            TransformType::EpsgOverride => "EPSG_OVERRIDE",
        }
    }
}

impl fmt::Display for TransformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "NONE" => Ok(TransformType::None),
            "EPSG_OVERRIDE" => Ok(TransformType::EpsgOverride),
            other => Err(ConfigError::InvalidOption {
                option: TRANSFORM_TYPE_OPTION.to_string(),
                message: format!("unknown transform type '{other}' (expected NONE or EPSG_OVERRIDE)"),
            }),
        }
    }
}

/// SRS modifier configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SrsModifierConfig {
    /// Transform strategy (default: `NONE`)
    pub transform_type: TransformType,
    /// Target EPSG code, 0 when unset (default: 0)
    pub target_epsg: u32,
    /// Verbose CRS diagnostics (default: off)
    pub debug: bool,
}

impl SrsModifierConfig {
    /// Create a configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the transform strategy
    #[must_use]
    pub fn with_transform_type(mut self, transform_type: TransformType) -> Self {
        self.transform_type = transform_type;
        self
    }

    /// Set the target EPSG code
    #[must_use]
    pub fn with_target_epsg(mut self, target_epsg: u32) -> Self {
        self.target_epsg = target_epsg;
        self
    }

    /// Enable or disable verbose diagnostics
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// The EPSG code to override the spatial reference with, if any.
    #[must_use]
    pub fn override_epsg(&self) -> Option<u32> {
        match self.transform_type {
            TransformType::EpsgOverride if self.target_epsg > 0 => Some(self.target_epsg),
            _ => None,
        }
    }

    /// Check option combinations.
    ///
    /// # Errors
    ///
    /// Returns an error when `EPSG_OVERRIDE` is selected without a target code.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transform_type == TransformType::EpsgOverride && self.target_epsg == 0 {
            return Err(ConfigError::InvalidOption {
                option: TARGET_EPSG_OPTION.to_string(),
                message: "EPSG_OVERRIDE requires a non-zero target EPSG code".to_string(),
            });
        }
        Ok(())
    }

    /// Build a configuration from a key/value source; absent keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be parsed or the combination is invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use zarrsrs_core::config::{SrsModifierConfig, TransformType};
    ///
    /// let config = SrsModifierConfig::from_lookup(|key| match key {
    ///     "ZARR_SRS_TRANSFORM_TYPE" => Some("EPSG_OVERRIDE".to_string()),
    ///     "ZARR_SRS_TARGET_EPSG" => Some("4326".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    ///
    /// assert_eq!(config.transform_type, TransformType::EpsgOverride);
    /// assert_eq!(config.override_epsg(), Some(4326));
    /// assert!(!config.debug);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(TRANSFORM_TYPE_OPTION) {
            config.transform_type = value.parse()?;
        }
        if let Some(value) = lookup(TARGET_EPSG_OPTION) {
            config.target_epsg = parse_epsg(&value)?;
        }
        if let Some(value) = lookup(DEBUG_OPTION) {
            config.debug = parse_bool(DEBUG_OPTION, &value)?;
        }

        config.validate()?;
        debug!(
            "SRS modifier configuration: transform_type={}, target_epsg={}, debug={}",
            config.transform_type, config.target_epsg, config.debug
        );
        Ok(config)
    }

    /// Build a configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or the combination is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

fn parse_epsg(value: &str) -> Result<u32, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(0);
    }
    value.parse().map_err(|_| ConfigError::InvalidOption {
        option: TARGET_EPSG_OPTION.to_string(),
        message: format!("'{value}' is not a non-negative integer"),
    })
}

/// Parse a boolean option the way the host does: `YES`/`ON`/`TRUE`/`1` or
/// `NO`/`OFF`/`FALSE`/`0`, case-insensitive.
///
/// # Errors
///
/// Returns an error for any other value.
pub fn parse_bool(option: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_uppercase().as_str() {
        "YES" | "ON" | "TRUE" | "1" => Ok(true),
        "" | "NO" | "OFF" | "FALSE" | "0" => Ok(false),
        other => Err(ConfigError::InvalidOption {
            option: option.to_string(),
            message: format!("'{other}' is not a boolean"),
        }),
    }
}
