//! Helpers for walking driver configuration tables.
//!
//! Point configurations are deserialized by hand — an explicit walk over the
//! TOML table, matching each key — so that an unknown key can be rejected
//! with an error naming it. (Derived deserializers either ignore unknown
//! fields or reject them with a message shaped by serde, neither of which
//! matches the "unknown parameter" contract.) Device-level configurations
//! with no such requirement use plain `serde` derives instead.

use std::path::Path;

use crate::error::{ConfigError, FieldioResult};

/// Interprets a configuration node as a table of parameters.
pub fn as_table(value: &toml::Value) -> Result<&toml::value::Table, ConfigError> {
    value.as_table().ok_or(ConfigError::ExpectedTable)
}

/// Extracts a string parameter, naming it on type mismatch.
pub fn string_parameter(name: &str, value: &toml::Value) -> Result<String, ConfigError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| ConfigError::invalid_value(name, "expected a string"))
}

/// Parses a TOML configuration document from a string.
pub fn parse(document: &str) -> FieldioResult<toml::Value> {
    Ok(toml::from_str(document)?)
}

/// Loads and parses a TOML configuration file.
pub fn load_file(path: impl AsRef<Path>) -> FieldioResult<toml::Value> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "loading configuration file");
    let document = std::fs::read_to_string(path)?;
    parse(&document)
}
