//! Simulated Field Device Driver for fieldio
//!
//! This crate provides a fully simulated field device for exercising the
//! connection, task and data-point machinery without physical hardware. The
//! device is a bank of addressable registers behind a fallible link; inputs
//! poll registers, outputs poll them and write scheduled values back.
//!
//! # Fault Injection
//!
//! Failures are driven by a [`FaultPlan`]: deterministic scenarios (refuse
//! the first N connects, drop the link after N reads, time a specific
//! address out) plus seedable random read/write fault rates. A seeded plan
//! replays the same failures on every run.
//!
//! # Configuration
//!
//! ```toml
//! name = "plc-1"
//! connect_failures = 2
//!
//! [registers]
//! "ai.temperature" = 21.5
//! "di.running" = true
//!
//! [[inputs]]
//! name = "temperature"
//! data_type = "float64"
//! address = "ai.temperature"
//!
//! [[outputs]]
//! name = "setpoint"
//! data_type = "float64"
//! address = "ao.setpoint"
//! ```
//!
//! # Driver Factory Pattern
//!
//! The driver is registered with a host through its factory:
//!
//! ```rust,ignore
//! use fieldio_core::driver::DriverRegistry;
//! use fieldio_driver_sim::SimDeviceFactory;
//!
//! let mut registry = DriverRegistry::new();
//! registry.register(Box::new(SimDeviceFactory));
//! ```

mod config;
mod device;
mod fault;
mod handlers;
mod input;
mod output;
mod tasks;
mod transport;

// Re-export driver types
pub use device::{SimDevice, SimDeviceConfig, SimDeviceFactory};
pub use input::SimInput;
pub use output::SimOutput;

// Re-export the simulation plumbing for tests and custom harnesses
pub use fault::{FaultPlan, FaultScenario, SimRng};
pub use tasks::ReconnectTask;
pub use transport::{Registers, SimTransport};
