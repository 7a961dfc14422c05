//! The simulated device link and its register bank.
//!
//! A [`SimTransport`] stands in for a fieldbus connection: data points read
//! and write named registers, and the [`FaultPlan`] decides which operations
//! fail. The register bank is shared, so tests can change input values from
//! outside while the device owns the transport.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use fieldio_core::connection::Transport;
use fieldio_core::error::DeviceError;
use fieldio_core::value::Value;

use crate::fault::FaultPlan;

// =============================================================================
// Register Bank
// =============================================================================

/// The addressable state of one simulated device.
#[derive(Debug, Default)]
pub struct Registers {
    cells: Mutex<HashMap<String, Value>>,
}

impl Registers {
    /// Creates an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value under an address, creating the register if needed.
    pub fn set(&self, address: impl Into<String>, value: Value) {
        self.cells.lock().insert(address.into(), value);
    }

    /// The current value of a register, if it exists.
    pub fn get(&self, address: &str) -> Option<Value> {
        self.cells.lock().get(address).cloned()
    }

    /// Removes a register, returning its last value.
    pub fn remove(&self, address: &str) -> Option<Value> {
        self.cells.lock().remove(address)
    }
}

// =============================================================================
// Transport
// =============================================================================

/// The simulated link a device's connection manager opens and closes.
///
/// Reads and writes require an open link; the register access itself is
/// instantaneous, so the open deadline the [`Transport`] contract asks for is
/// trivially met.
pub struct SimTransport {
    registers: Arc<Registers>,
    faults: Arc<FaultPlan>,
    link_up: bool,
}

impl SimTransport {
    /// Creates a transport over a shared register bank.
    pub fn new(registers: Arc<Registers>, faults: Arc<FaultPlan>) -> Self {
        Self {
            registers,
            faults,
            link_up: false,
        }
    }

    /// Whether the link is currently open.
    pub fn is_open(&self) -> bool {
        self.link_up
    }

    /// Reads one register.
    ///
    /// An address with no register behind it yields [`DeviceError::NoData`],
    /// the same way a device responds for a point that has no value yet.
    pub fn read_register(&mut self, address: &str) -> Result<Value, DeviceError> {
        if !self.link_up {
            return Err(DeviceError::NotConnected);
        }
        self.faults.check_read(address)?;
        self.registers.get(address).ok_or(DeviceError::NoData)
    }

    /// Writes one register.
    pub fn write_register(&mut self, address: &str, value: Value) -> Result<(), DeviceError> {
        if !self.link_up {
            return Err(DeviceError::NotConnected);
        }
        self.faults.check_write(address)?;
        self.registers.set(address, value);
        Ok(())
    }
}

impl Transport for SimTransport {
    fn open(&mut self) -> Result<(), DeviceError> {
        self.faults.check_connect()?;
        self.link_up = true;
        Ok(())
    }

    fn close(&mut self) {
        self.link_up = false;
    }
}
