//! Per-point value and error state driven by the staged read/write tasks.
//!
//! Every configured data point owns a [`ReadState`]; outputs additionally own
//! a [`WriteState`]. The states hold exactly what the attribute layer
//! exposes: the last known value, the last read/write error and the time of
//! the last change. They are mutated only from the point's task cycle and
//! from connection-state notifications, so a plain reader/writer lock is
//! enough.
//!
//! Semantics worth noting:
//!
//! - A failed read keeps the previous value. The value only disappears with
//!   the point itself.
//! - The `read_error`/`write_error` events fire when an operation *newly*
//!   fails, not on every failing cycle.
//! - A connection-state change rewrites the read error (`NoData` while the
//!   link is up but the point has not been read yet), but never touches the
//!   write state: that one only ever holds the outcome of the last write.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::attribute::ReadHandle;
use crate::error::{status_message, DeviceError};
use crate::event::Event;
use crate::timestamp::{self, Timestamp};
use crate::value::{ScalarValue, Value};

// =============================================================================
// Read State
// =============================================================================

struct ReadCell<T> {
    value: Option<T>,
    error: Option<DeviceError>,
    update_time: Timestamp,
}

/// The value-and-error state of one data point's read direction.
pub struct ReadState<T> {
    cell: RwLock<ReadCell<T>>,
    updated_event: Event,
    read_error_event: Event,
}

impl<T: ScalarValue> ReadState<T> {
    /// Creates the state for a point that has never been read, on a device
    /// that is not connected.
    pub fn new() -> Self {
        Self {
            cell: RwLock::new(ReadCell {
                value: None,
                error: Some(DeviceError::NotConnected),
                update_time: timestamp::never(),
            }),
            updated_event: Event::new("updated"),
            read_error_event: Event::new("read_error"),
        }
    }

    /// Records the outcome of one read cycle.
    pub fn update_read(&self, timestamp: Timestamp, result: Result<T, DeviceError>) {
        match result {
            Ok(value) => {
                {
                    let mut cell = self.cell.write();
                    cell.value = Some(value);
                    cell.error = None;
                    cell.update_time = timestamp;
                }
                self.updated_event.raise(timestamp);
            }
            Err(error) => {
                let newly_failed = {
                    let mut cell = self.cell.write();
                    let previous = cell.error.replace(error);
                    cell.update_time = timestamp;
                    previous != Some(error)
                };
                if newly_failed {
                    self.read_error_event.raise(timestamp);
                }
            }
        }
    }

    /// Applies a connection-state change to the read state.
    ///
    /// While the link is up there is still no fresh value, so `None` maps to
    /// [`DeviceError::NoData`] until the next successful read clears it.
    pub fn update_connection_state(&self, timestamp: Timestamp, error: Option<&DeviceError>) {
        let effective = error.copied().unwrap_or(DeviceError::NoData);
        let mut cell = self.cell.write();
        if cell.error == Some(effective) {
            return;
        }
        cell.error = Some(effective);
        cell.update_time = timestamp;
    }

    /// The last successfully read value, if any.
    pub fn value(&self) -> Option<T> {
        self.cell.read().value.clone()
    }

    /// The current read error, `None` after a successful read.
    pub fn error(&self) -> Option<DeviceError> {
        self.cell.read().error
    }

    /// The time the value or error last changed.
    pub fn update_time(&self) -> Timestamp {
        self.cell.read().update_time
    }

    /// The event raised on every successful read.
    pub fn updated_event(&self) -> &Event {
        &self.updated_event
    }

    /// The event raised when a read newly fails.
    pub fn read_error_event(&self) -> &Event {
        &self.read_error_event
    }

    /// Handle yielding the point's value, or its current error while no
    /// value has been read yet.
    pub fn value_handle(self: &Arc<Self>) -> ReadHandle {
        let state = Arc::clone(self);
        ReadHandle::new(move || {
            let cell = state.cell.read();
            match &cell.value {
                Some(value) => Ok(value.clone().into_value()),
                None => Err(cell.error.unwrap_or(DeviceError::NoData)),
            }
        })
    }

    /// Handle yielding the read error as a message string.
    pub fn error_handle(self: &Arc<Self>) -> ReadHandle {
        let state = Arc::clone(self);
        ReadHandle::new(move || {
            Ok(Value::Text(status_message(
                state.cell.read().error.as_ref(),
            )))
        })
    }

    /// Handle yielding the time of the last state change.
    pub fn update_time_handle(self: &Arc<Self>) -> ReadHandle {
        let state = Arc::clone(self);
        ReadHandle::new(move || Ok(Value::Time(state.cell.read().update_time)))
    }
}

impl<T: ScalarValue> Default for ReadState<T> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Write State
// =============================================================================

struct WriteCell<T> {
    pending: Option<T>,
    error: Option<DeviceError>,
    write_time: Timestamp,
}

/// The pending-value and error state of one output's write direction.
///
/// Values scheduled through the point's write handle wait here until the
/// write task next runs while the device is connected. Scheduling twice
/// between cycles keeps only the newest value.
pub struct WriteState<T> {
    cell: RwLock<WriteCell<T>>,
    write_error_event: Event,
}

impl<T: ScalarValue> WriteState<T> {
    /// Creates the state for an output nothing has been written to.
    pub fn new() -> Self {
        Self {
            cell: RwLock::new(WriteCell {
                pending: None,
                error: None,
                write_time: timestamp::never(),
            }),
            write_error_event: Event::new("write_error"),
        }
    }

    /// Stores a value to be written on the next write cycle.
    pub fn schedule(&self, value: T) {
        self.cell.write().pending = Some(value);
    }

    /// Takes the value scheduled for writing, if any.
    pub fn take_pending(&self) -> Option<T> {
        self.cell.write().pending.take()
    }

    /// Records the outcome of one write cycle.
    pub fn update_write(&self, timestamp: Timestamp, result: Result<(), DeviceError>) {
        match result {
            Ok(()) => {
                let mut cell = self.cell.write();
                cell.error = None;
                cell.write_time = timestamp;
            }
            Err(error) => {
                let newly_failed = {
                    let mut cell = self.cell.write();
                    let previous = cell.error.replace(error);
                    cell.write_time = timestamp;
                    previous != Some(error)
                };
                if newly_failed {
                    self.write_error_event.raise(timestamp);
                }
            }
        }
    }

    /// The current write error, `None` after a successful write (and before
    /// the first one).
    pub fn error(&self) -> Option<DeviceError> {
        self.cell.read().error
    }

    /// The time of the last write attempt.
    pub fn write_time(&self) -> Timestamp {
        self.cell.read().write_time
    }

    /// The event raised when a write newly fails.
    pub fn write_error_event(&self) -> &Event {
        &self.write_error_event
    }

    /// Handle yielding the write error as a message string.
    pub fn error_handle(self: &Arc<Self>) -> ReadHandle {
        let state = Arc::clone(self);
        ReadHandle::new(move || {
            Ok(Value::Text(status_message(
                state.cell.read().error.as_ref(),
            )))
        })
    }
}

impl<T: ScalarValue> Default for WriteState<T> {
    fn default() -> Self {
        Self::new()
    }
}
