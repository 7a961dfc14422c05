//! Error types for the connection lifecycle and configuration layers.
//!
//! This module defines two narrow error domains plus one umbrella type:
//!
//! - [`DeviceError`]: runtime errors reported by a device link or by a
//!   read/write on a single data point. The absence of an error ("success")
//!   is expressed as `Option<DeviceError>::None` rather than as a dedicated
//!   variant, so state fields read naturally (`last_error: Option<DeviceError>`).
//! - [`ConfigError`]: errors raised while loading a driver or data-point
//!   configuration. These are fatal for the object being loaded and abort the
//!   load with a message naming the offending parameter.
//! - [`FieldioError`]: the umbrella used at crate boundaries (factory `build`,
//!   config file loading), converting from the narrow domains and from the
//!   underlying parser/IO errors via `#[from]`.
//!
//! The classification in [`DeviceError::is_connection_error`] is the policy
//! boundary between errors that tear down the shared device link and errors
//! that stay local to one data point.

use thiserror::Error;

// =============================================================================
// Device Errors
// =============================================================================

/// An error reported by the device link or by a data-point read/write.
///
/// The set is deliberately small; transports may map their own failures onto
/// the transport-level variants (`Timeout`, `ConnectionReset`,
/// `ConnectionRefused`) or fall back to `Unknown`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceError {
    /// The device link is not open. Reported while gracefully disconnected.
    #[error("the device is not connected")]
    NotConnected,

    /// No value has been read from the device yet.
    ///
    /// This is the state of every input between connecting and the first
    /// successful read. It is a per-point condition and never affects the
    /// shared link.
    #[error("no data was read yet")]
    NoData,

    /// The device did not respond within the transport's deadline.
    #[error("the connection timed out")]
    Timeout,

    /// The connection was reset by the device or by the network path.
    #[error("the connection was reset")]
    ConnectionReset,

    /// The device refused the connection.
    #[error("the connection was refused")]
    ConnectionRefused,

    /// An error that could not be classified.
    #[error("an unknown error occurred")]
    Unknown,
}

impl DeviceError {
    /// Whether this error affects the device link as a whole.
    ///
    /// Transport-level failures (and `NotConnected` itself) tear down the
    /// shared connection state and fan out to every registered sink. Absence
    /// of data and unclassified errors stay local to the reporting point: an
    /// error we cannot attribute to the link must not take the link down for
    /// every other point using it.
    pub fn is_connection_error(&self) -> bool {
        match self {
            DeviceError::NotConnected
            | DeviceError::Timeout
            | DeviceError::ConnectionReset
            | DeviceError::ConnectionRefused => true,
            DeviceError::NoData | DeviceError::Unknown => false,
        }
    }
}

/// Renders an optional error the way state attributes expose it.
///
/// `None` means the last operation succeeded and reads as `"success"`;
/// anything else is the error's display message.
pub fn status_message(error: Option<&DeviceError>) -> String {
    match error {
        None => "success".to_owned(),
        Some(error) => error.to_string(),
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// An error raised while loading a driver or data-point configuration.
///
/// Configuration errors are permanent: the offending object fails to load and
/// the message names the parameter that caused it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration contains a parameter this object does not know.
    #[error("unknown parameter \"{0}\"")]
    UnknownParameter(String),

    /// The configuration does not assign a data type to the point.
    #[error("missing \"data_type\" parameter")]
    MissingDataType,

    /// The `data_type` keyword does not name a supported type.
    #[error("unknown data type \"{0}\"")]
    UnknownDataType(String),

    /// A parameter is present but its value has the wrong shape.
    #[error("invalid value for parameter \"{name}\": {reason}")]
    InvalidValue {
        /// The parameter the value belongs to.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The configuration node is not a table of parameters.
    #[error("expected a table of parameters")]
    ExpectedTable,
}

impl ConfigError {
    /// Builds an [`ConfigError::InvalidValue`] from a key and a reason.
    pub fn invalid_value(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Umbrella
// =============================================================================

/// Convenience alias for results using the crate-wide error type.
pub type FieldioResult<T> = std::result::Result<T, FieldioError>;

/// Umbrella error for driver loading and crate-boundary operations.
#[derive(Error, Debug)]
pub enum FieldioError {
    /// A device-level failure surfaced through a fallible boundary call.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// A configuration was rejected while loading an object.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A configuration document could not be parsed at all.
    #[error("configuration parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// File or socket level failure while loading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_messages() {
        assert_eq!(
            DeviceError::NotConnected.to_string(),
            "the device is not connected"
        );
        assert_eq!(DeviceError::NoData.to_string(), "no data was read yet");
        assert_eq!(
            DeviceError::Unknown.to_string(),
            "an unknown error occurred"
        );
        assert_eq!(DeviceError::Timeout.to_string(), "the connection timed out");
    }

    #[test]
    fn test_status_message_success() {
        assert_eq!(status_message(None), "success");
        assert_eq!(
            status_message(Some(&DeviceError::NoData)),
            "no data was read yet"
        );
    }

    #[test]
    fn test_connection_error_classification() {
        assert!(DeviceError::NotConnected.is_connection_error());
        assert!(DeviceError::Timeout.is_connection_error());
        assert!(DeviceError::ConnectionReset.is_connection_error());
        assert!(DeviceError::ConnectionRefused.is_connection_error());
        assert!(!DeviceError::NoData.is_connection_error());
        assert!(!DeviceError::Unknown.is_connection_error());
    }

    #[test]
    fn test_config_error_names_parameter() {
        let err = ConfigError::UnknownParameter("polarity".into());
        assert_eq!(err.to_string(), "unknown parameter \"polarity\"");

        let err = ConfigError::invalid_value("address", "expected a string");
        assert!(err.to_string().contains("address"));
        assert!(err.to_string().contains("expected a string"));
    }

    #[test]
    fn test_umbrella_wraps_domains() {
        let err: FieldioError = ConfigError::MissingDataType.into();
        assert!(err.to_string().contains("missing \"data_type\""));

        let err: FieldioError = DeviceError::Timeout.into();
        assert!(err.to_string().contains("timed out"));
    }
}
