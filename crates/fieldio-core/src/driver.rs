//! Driver factories and the registry a host resolves them from.
//!
//! A driver crate exposes one [`DriverFactory`] per device class it can
//! build. The host collects factories into a [`DriverRegistry`] at startup,
//! then builds device elements from configuration: `validate` gives a cheap
//! syntactic check without side effects, `build` constructs the device and
//! its child points. Building returns a boxed future because real drivers
//! probe hardware while constructing.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::element::Element;
use crate::error::{ConfigError, FieldioResult};

/// Builds device elements of one driver type from configuration.
pub trait DriverFactory: Send + Sync {
    /// The identifier configurations use to select this driver.
    fn driver_type(&self) -> &'static str;

    /// Checks a configuration without building anything.
    fn validate(&self, config: &toml::Value) -> Result<(), ConfigError>;

    /// Builds the device element, including its configured points.
    fn build(&self, config: toml::Value) -> BoxFuture<'static, FieldioResult<Arc<dyn Element>>>;
}

/// The set of driver factories known to a host.
///
/// Populated once at startup and read-only afterwards.
#[derive(Default)]
pub struct DriverRegistry {
    factories: Vec<Box<dyn DriverFactory>>,
}

impl DriverRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a factory. Last registration wins on duplicate driver types.
    pub fn register(&mut self, factory: Box<dyn DriverFactory>) {
        tracing::debug!(driver_type = factory.driver_type(), "driver registered");
        self.factories.push(factory);
    }

    /// Finds the factory for a driver type.
    pub fn factory(&self, driver_type: &str) -> Option<&dyn DriverFactory> {
        self.factories
            .iter()
            .rev()
            .find(|factory| factory.driver_type() == driver_type)
            .map(Box::as_ref)
    }

    /// The registered driver types, in registration order.
    pub fn driver_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.iter().map(|factory| factory.driver_type())
    }
}
