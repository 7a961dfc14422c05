//! Attribute descriptors and the handles used to access them.
//!
//! Attributes are the named, read-only state an element exposes to observers:
//! last errors, the connection time, the point value itself. An element
//! enumerates its attributes through `for_each_attribute` callbacks and hands
//! out a [`ReadHandle`] (and for writable points a [`WriteHandle`]) on
//! request; an unrecognized attribute name yields `None`.
//!
//! The standard attribute set lives in [`attributes`] as static descriptors.
//! Only the `value` attribute is built at runtime, because its data type is
//! the point's configured type.

use std::sync::Arc;

use thiserror::Error;

use crate::error::DeviceError;
use crate::value::{DataType, Value};

/// Descriptor of a single named attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute {
    /// The reflection name observers use to look the attribute up.
    pub name: &'static str,
    /// The data type of the values the attribute yields.
    pub data_type: DataType,
}

impl Attribute {
    /// Creates an attribute descriptor.
    pub const fn new(name: &'static str, data_type: DataType) -> Self {
        Self { name, data_type }
    }
}

/// The standard attributes shared by all drivers.
pub mod attributes {
    use super::Attribute;
    use crate::value::DataType;

    /// The last read error of a point, as a message string.
    pub static ERROR: Attribute = Attribute::new("error", DataType::String);

    /// The last write error of an output, as a message string.
    pub static WRITE_ERROR: Attribute = Attribute::new("write_error", DataType::String);

    /// The time of the last connect or disconnect of the device.
    pub static CONNECTION_TIME: Attribute = Attribute::new("connection_time", DataType::Time);

    /// The last connection error of the device, as a message string.
    pub static DEVICE_ERROR: Attribute = Attribute::new("device_error", DataType::String);

    /// The time a point's value or error state last changed.
    pub static UPDATE_TIME: Attribute = Attribute::new("update_time", DataType::Time);

    /// Builds the `value` attribute for a point of the given type.
    pub fn value(data_type: DataType) -> Attribute {
        Attribute::new("value", data_type)
    }
}

/// A cheap, cloneable accessor for one attribute's current value.
///
/// Reading can fail: the `value` attribute of a point that has never been
/// read yields the point's current error instead of a value. State attributes
/// (`error`, `connection_time`, ...) always read successfully.
#[derive(Clone)]
pub struct ReadHandle {
    read: Arc<dyn Fn() -> Result<Value, DeviceError> + Send + Sync>,
}

impl ReadHandle {
    /// Wraps a closure producing the attribute's current value.
    pub fn new(read: impl Fn() -> Result<Value, DeviceError> + Send + Sync + 'static) -> Self {
        Self {
            read: Arc::new(read),
        }
    }

    /// Reads the attribute's current value.
    pub fn read(&self) -> Result<Value, DeviceError> {
        (self.read)()
    }
}

impl std::fmt::Debug for ReadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ReadHandle(..)")
    }
}

/// The value handed to a [`WriteHandle`] did not fit the point's data type.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("value does not fit data type \"{expected}\"")]
pub struct ValueMismatch {
    /// The data type the point was configured with.
    pub expected: DataType,
}

/// A cheap, cloneable accessor used to schedule a value for writing.
///
/// Writing through the handle does not touch the device; it stores the value
/// as pending until the owning output's write task next runs while connected.
#[derive(Clone)]
pub struct WriteHandle {
    write: Arc<dyn Fn(Value) -> Result<(), ValueMismatch> + Send + Sync>,
}

impl WriteHandle {
    /// Wraps a closure accepting scheduled values.
    pub fn new(write: impl Fn(Value) -> Result<(), ValueMismatch> + Send + Sync + 'static) -> Self {
        Self {
            write: Arc::new(write),
        }
    }

    /// Schedules a value, rejecting it if it does not fit the point's type.
    pub fn write(&self, value: Value) -> Result<(), ValueMismatch> {
        (self.write)(value)
    }
}

impl std::fmt::Debug for WriteHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WriteHandle(..)")
    }
}
