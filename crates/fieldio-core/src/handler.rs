//! The per-data-type handler interfaces behind every input and output.
//!
//! A point object (the element the host talks to) is data-type agnostic; all
//! typed behavior sits in a handler chosen once, at load time, from the
//! configured `data_type` keyword. Handlers are trait objects produced by a
//! [`HandlerRegistry`](crate::registry::HandlerRegistry); a point never
//! changes its handler.
//!
//! The error-sink traits are the upward path: a handler that fails a read or
//! write updates its own state first and then reports through the sink, so
//! the owning point can escalate connection-affecting errors to the device.

use crate::attribute::{Attribute, ReadHandle, WriteHandle};
use crate::error::DeviceError;
use crate::event::Event;
use crate::timestamp::Timestamp;
use crate::value::DataType;

/// Observer for failed reads, implemented by the point owning the handler.
pub trait ReadErrorSink: Send + Sync {
    /// Called after a read failed and the handler state was updated.
    fn handle_read_error(&self, timestamp: Timestamp, error: DeviceError);
}

/// Observer for failed writes, implemented by the output owning the handler.
pub trait WriteErrorSink: Send + Sync {
    /// Called after a write failed and the handler state was updated.
    fn handle_write_error(&self, timestamp: Timestamp, error: DeviceError);
}

/// Type-specific behavior of an input point.
pub trait InputHandler: Send + Sync {
    /// The data type this handler was instantiated for.
    fn data_type(&self) -> DataType;

    /// Iterates over the handler's attributes until `f` returns `true`.
    ///
    /// Returns whether the iteration was stopped by `f`.
    fn for_each_attribute(&self, f: &mut dyn FnMut(Attribute) -> bool) -> bool;

    /// Iterates over the handler's events until `f` returns `true`.
    ///
    /// Returns whether the iteration was stopped by `f`.
    fn for_each_event(&self, f: &mut dyn FnMut(&Event) -> bool) -> bool;

    /// Creates a read handle for an attribute, or `None` if the attribute is
    /// not one of the handler's.
    fn make_read_handle(&self, attribute: &Attribute) -> Option<ReadHandle>;

    /// Post-configuration setup. Called once, after loading succeeded and
    /// before any task runs.
    fn realize(&self) {}

    /// Reads the point from the device and updates the handler state.
    ///
    /// Only called while the device reports connected. Failures are recorded
    /// in the handler state and reported through `error_sink`.
    fn read(&self, timestamp: Timestamp, error_sink: &dyn ReadErrorSink);

    /// Applies a device connection-state change to the read state.
    fn update_read_state(&self, timestamp: Timestamp, error: Option<&DeviceError>);
}

/// Type-specific behavior of an output point.
///
/// Outputs poll their current value like inputs do, and additionally write
/// scheduled values back to the device.
pub trait OutputHandler: Send + Sync {
    /// The data type this handler was instantiated for.
    fn data_type(&self) -> DataType;

    /// Iterates over the handler's attributes until `f` returns `true`.
    ///
    /// Returns whether the iteration was stopped by `f`.
    fn for_each_attribute(&self, f: &mut dyn FnMut(Attribute) -> bool) -> bool;

    /// Iterates over the handler's events until `f` returns `true`.
    ///
    /// Returns whether the iteration was stopped by `f`.
    fn for_each_event(&self, f: &mut dyn FnMut(&Event) -> bool) -> bool;

    /// Creates a read handle for an attribute, or `None` if the attribute is
    /// not one of the handler's.
    fn make_read_handle(&self, attribute: &Attribute) -> Option<ReadHandle>;

    /// Creates a write handle for an attribute, or `None` if the attribute
    /// is not writable through this handler.
    fn make_write_handle(&self, attribute: &Attribute) -> Option<WriteHandle>;

    /// Post-configuration setup. Called once, after loading succeeded and
    /// before any task runs.
    fn realize(&self) {}

    /// Reads the point's current value from the device and updates the read
    /// state. Only called while the device reports connected.
    fn read(&self, timestamp: Timestamp, error_sink: &dyn ReadErrorSink);

    /// Writes the pending value to the device, if one is scheduled, and
    /// updates the write state. Only called while the device reports
    /// connected.
    fn write(&self, timestamp: Timestamp, error_sink: &dyn WriteErrorSink);

    /// Applies a device connection-state change to the read state.
    ///
    /// The write state is deliberately left alone: it holds the outcome of
    /// the last write, which a connection transition does not change.
    fn update_read_state(&self, timestamp: Timestamp, error: Option<&DeviceError>);
}
