//! The hand-walked configuration shape shared by input and output points.

use fieldio_core::config::{as_table, string_parameter};
use fieldio_core::error::ConfigError;

/// The raw parameters of one point, before the per-direction checks.
pub(crate) struct PointConfig {
    pub name: Option<String>,
    pub data_type: Option<String>,
    pub address: Option<String>,
}

impl PointConfig {
    /// Walks a point's configuration table, rejecting any key that is not
    /// one of `name`, `data_type` or `address`.
    pub fn parse(config: &toml::Value) -> Result<Self, ConfigError> {
        let table = as_table(config)?;
        let mut parsed = Self {
            name: None,
            data_type: None,
            address: None,
        };
        for (key, value) in table {
            match key.as_str() {
                "name" => parsed.name = Some(string_parameter("name", value)?),
                "data_type" => parsed.data_type = Some(string_parameter("data_type", value)?),
                "address" => parsed.address = Some(string_parameter("address", value)?),
                other => return Err(ConfigError::UnknownParameter(other.to_owned())),
            }
        }
        Ok(parsed)
    }

    /// The configured `data_type` keyword.
    pub fn data_type(&self) -> Result<&str, ConfigError> {
        self.data_type.as_deref().ok_or(ConfigError::MissingDataType)
    }

    /// The configured register address.
    pub fn address(&self) -> Result<&str, ConfigError> {
        self.address
            .as_deref()
            .ok_or_else(|| ConfigError::invalid_value("address", "parameter is required"))
    }

    /// The element name; unnamed points take their address as the name.
    pub fn element_name(&self) -> Result<String, ConfigError> {
        match &self.name {
            Some(name) => Ok(name.clone()),
            None => Ok(self.address()?.to_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(text: &str) -> toml::Value {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn test_parses_the_three_known_keys() {
        let parsed = PointConfig::parse(&value(
            "name = \"t\"\ndata_type = \"float64\"\naddress = \"ai.t\"\n",
        ))
        .unwrap();
        assert_eq!(parsed.data_type().ok(), Some("float64"));
        assert_eq!(parsed.address().ok(), Some("ai.t"));
        assert_eq!(parsed.element_name().ok(), Some("t".to_owned()));
    }

    #[test]
    fn test_unknown_key_is_named_in_the_error() {
        let error = PointConfig::parse(&value("data_type = \"bool\"\nscale = 2.5\n")).err();
        assert_eq!(error, Some(ConfigError::UnknownParameter("scale".to_owned())));
    }

    #[test]
    fn test_missing_keys_have_dedicated_errors() {
        let parsed = PointConfig::parse(&value("name = \"t\"\n")).unwrap();
        assert_eq!(parsed.data_type().err(), Some(ConfigError::MissingDataType));
        assert_eq!(
            parsed.address().err(),
            Some(ConfigError::invalid_value("address", "parameter is required"))
        );
    }

    #[test]
    fn test_unnamed_point_takes_its_address_as_name() {
        let parsed = PointConfig::parse(&value("data_type = \"bool\"\naddress = \"di.3\"\n")).unwrap();
        assert_eq!(parsed.element_name().ok(), Some("di.3".to_owned()));
    }

    #[test]
    fn test_non_table_config_is_rejected() {
        let error = PointConfig::parse(&toml::Value::Integer(7)).err();
        assert_eq!(error, Some(ConfigError::ExpectedTable));
    }
}
