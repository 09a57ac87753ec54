//! Layered provider settings
//!
//! Values start from built-in defaults and are overridden, in order, by a
//! TOML file, `GEOPROVIDER_*` environment variables and command-line flags.

use crate::error::{ProviderError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// How providers treat features whose geometry cannot be converted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidityMode {
    /// Fail the load on the first invalid geometry
    Strict,
    /// Skip invalid geometries with a warning
    #[default]
    Lenient,
}

impl FromStr for ValidityMode {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(ValidityMode::Strict),
            "lenient" => Ok(ValidityMode::Lenient),
            _ => Err(ProviderError::ConfigInvalid {
                key: "geometry_validity".to_string(),
                reason: format!("'{}' is neither strict nor lenient", s),
            }),
        }
    }
}

/// Layer a value came from, weakest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfigSource {
    Default,
    File,
    Environment,
    Cli,
}

/// A setting tagged with the layer that supplied it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Take `value` unless the current one came from a stronger layer
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source >= self.source {
            self.value = value;
            self.source = source;
        }
    }

    fn apply(&mut self, value: Option<T>, source: ConfigSource) {
        if let Some(value) = value {
            self.update(value, source);
        }
    }
}

/// One layer of optional settings
///
/// The same shape is read from a TOML file, from the environment and from
/// command-line flags.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ConfigLayer {
    pub srid: Option<i32>,
    pub geometry_validity: Option<ValidityMode>,
    pub instrument_queries: Option<bool>,
}

impl ConfigLayer {
    /// Read a layer from a TOML file; unreadable or malformed files fail
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ProviderError::ConfigInvalid {
            key: path.display().to_string(),
            reason: format!("cannot read file: {}", e),
        })?;

        toml::from_str(&content).map_err(|e| ProviderError::ConfigInvalid {
            key: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Read a layer from `GEOPROVIDER_*` variables, ignoring invalid values
    pub fn from_env() -> Self {
        Self {
            srid: env_value("GEOPROVIDER_SRID", |s| s.parse().ok()),
            geometry_validity: env_value("GEOPROVIDER_GEOMETRY_VALIDITY", |s| s.parse().ok()),
            instrument_queries: env_value("GEOPROVIDER_INSTRUMENT_QUERIES", parse_bool),
        }
    }
}

fn env_value<T>(key: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
    let raw = env::var(key).ok()?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        tracing::warn!(key, value = %raw, "ignoring invalid environment value");
    }
    parsed
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Effective provider settings
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub srid: ConfigValue<i32>,
    pub geometry_validity: ConfigValue<ValidityMode>,
    pub instrument_queries: ConfigValue<bool>,
}

impl ProviderConfig {
    pub fn with_defaults() -> Self {
        Self {
            srid: ConfigValue::new(0, ConfigSource::Default),
            geometry_validity: ConfigValue::new(ValidityMode::default(), ConfigSource::Default),
            instrument_queries: ConfigValue::new(false, ConfigSource::Default),
        }
    }

    /// Apply every value present in `layer`
    pub fn apply(&mut self, layer: ConfigLayer, source: ConfigSource) {
        self.srid.apply(layer.srid, source);
        self.geometry_validity.apply(layer.geometry_validity, source);
        self.instrument_queries.apply(layer.instrument_queries, source);
    }

    pub fn load_from_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.apply(ConfigLayer::from_toml_file(path)?, ConfigSource::File);
        Ok(self)
    }

    pub fn load_from_env(mut self) -> Self {
        self.apply(ConfigLayer::from_env(), ConfigSource::Environment);
        self
    }

    pub fn update_from_cli(&mut self, overrides: ConfigLayer) {
        self.apply(overrides, ConfigSource::Cli);
    }

    /// Values and their sources, keyed by setting name
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        HashMap::from([
            ("srid".to_string(), (self.srid.value.to_string(), self.srid.source)),
            (
                "geometry_validity".to_string(),
                (format!("{:?}", self.geometry_validity.value), self.geometry_validity.source),
            ),
            (
                "instrument_queries".to_string(),
                (self.instrument_queries.value.to_string(), self.instrument_queries.source),
            ),
        ])
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_weaker_layer_does_not_override() {
        let mut config = ProviderConfig::with_defaults();
        config.update_from_cli(ConfigLayer { srid: Some(4326), ..Default::default() });
        config.apply(
            ConfigLayer { srid: Some(3857), instrument_queries: Some(true), ..Default::default() },
            ConfigSource::File,
        );

        assert_eq!(config.srid.value, 4326);
        assert_eq!(config.srid.source, ConfigSource::Cli);
        // Settings the CLI left alone still take the file value
        assert!(config.instrument_queries.value);
        assert_eq!(config.instrument_queries.source, ConfigSource::File);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "srid = 3857\ngeometry_validity = \"strict\"").unwrap();

        let config = ProviderConfig::with_defaults().load_from_file(file.path()).unwrap();

        assert_eq!(config.srid.value, 3857);
        assert_eq!(config.srid.source, ConfigSource::File);
        assert_eq!(config.geometry_validity.value, ValidityMode::Strict);
        assert_eq!(config.instrument_queries.source, ConfigSource::Default);
    }

    #[test]
    fn test_load_from_invalid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "srid = \"not a number\"").unwrap();

        let err = ProviderConfig::with_defaults().load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, ProviderError::ConfigInvalid { .. }));
    }

    #[test]
    #[serial]
    fn test_load_from_env_skips_invalid_values() {
        env::set_var("GEOPROVIDER_SRID", "28992");
        env::set_var("GEOPROVIDER_GEOMETRY_VALIDITY", "bogus");
        env::set_var("GEOPROVIDER_INSTRUMENT_QUERIES", "yes");

        let config = ProviderConfig::with_defaults().load_from_env();

        env::remove_var("GEOPROVIDER_SRID");
        env::remove_var("GEOPROVIDER_GEOMETRY_VALIDITY");
        env::remove_var("GEOPROVIDER_INSTRUMENT_QUERIES");

        assert_eq!(config.srid.value, 28992);
        assert_eq!(config.srid.source, ConfigSource::Environment);
        assert_eq!(config.geometry_validity.source, ConfigSource::Default);
        assert!(config.instrument_queries.value);
    }

    #[test]
    fn test_validity_mode_from_str() {
        assert_eq!("strict".parse::<ValidityMode>().unwrap(), ValidityMode::Strict);
        assert_eq!("LENIENT".parse::<ValidityMode>().unwrap(), ValidityMode::Lenient);
        assert!("sometimes".parse::<ValidityMode>().is_err());
    }
}
