//! The simulated device element and its driver factory.
//!
//! A device owns the register bank, the fault plan and the connection
//! manager; its input and output points share all three. The factory parses
//! the TOML shape below, loads every point, and only then realizes them, so
//! a configuration error anywhere leaves nothing half-wired:
//!
//! ```toml
//! name = "plc-1"
//! connect_failures = 0
//!
//! [registers]
//! "ai.temperature" = 21.5
//!
//! [[inputs]]
//! name = "temperature"
//! data_type = "float64"
//! address = "ai.temperature"
//! ```

use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde::Deserialize;
use uuid::Uuid;

use fieldio_core::attribute::{attributes, Attribute, ReadHandle};
use fieldio_core::connection::ConnectionManager;
use fieldio_core::driver::DriverFactory;
use fieldio_core::element::Element;
use fieldio_core::error::{status_message, ConfigError, DeviceError, FieldioError, FieldioResult};
use fieldio_core::event::Event;
use fieldio_core::task::Task;
use fieldio_core::value::Value;

use crate::fault::{FaultPlan, FaultScenario};
use crate::input::SimInput;
use crate::output::SimOutput;
use crate::tasks::ReconnectTask;
use crate::transport::{Registers, SimTransport};

// =============================================================================
// Configuration
// =============================================================================

/// The TOML-facing shape of one simulated device.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimDeviceConfig {
    /// The element name of the device.
    pub name: String,
    /// A fixed device id; a random one is assigned when omitted.
    #[serde(default)]
    pub id: Option<Uuid>,
    /// Seed for the fault-injection generator, for reproducible runs.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Number of connect attempts the device refuses before accepting one.
    #[serde(default)]
    pub connect_failures: u32,
    /// Drop the link after this many successful reads.
    #[serde(default)]
    pub drop_after_reads: Option<u32>,
    /// Probability in `0.0..=1.0` of a random read fault.
    #[serde(default)]
    pub read_failure_rate: f64,
    /// Probability in `0.0..=1.0` of a random write fault.
    #[serde(default)]
    pub write_failure_rate: f64,
    /// Initial register contents, keyed by address.
    #[serde(default)]
    pub registers: toml::value::Table,
    /// Input point configurations.
    #[serde(default)]
    pub inputs: Vec<toml::Value>,
    /// Output point configurations.
    #[serde(default)]
    pub outputs: Vec<toml::Value>,
}

impl SimDeviceConfig {
    fn fault_plan(&self) -> FaultPlan {
        let mut scenarios = Vec::new();
        if self.connect_failures > 0 {
            scenarios.push(FaultScenario::RefuseConnects {
                count: self.connect_failures,
            });
        }
        if let Some(count) = self.drop_after_reads {
            scenarios.push(FaultScenario::DropAfterReads { count });
        }
        FaultPlan::new(
            scenarios,
            self.read_failure_rate,
            self.write_failure_rate,
            self.seed,
        )
    }
}

/// Converts one configured register literal into a runtime value.
fn register_value(address: &str, raw: &toml::Value) -> Result<Value, ConfigError> {
    match raw {
        toml::Value::Boolean(value) => Ok(Value::Bool(*value)),
        toml::Value::Integer(value) => Ok(Value::Int(*value)),
        toml::Value::Float(value) => Ok(Value::Float(*value)),
        toml::Value::String(value) => Ok(Value::Text(value.clone())),
        _ => Err(ConfigError::invalid_value(
            address,
            "register values must be scalars",
        )),
    }
}

// =============================================================================
// Device
// =============================================================================

/// A simulated field device holding a bank of addressable registers.
pub struct SimDevice {
    name: String,
    id: Uuid,
    manager: Arc<ConnectionManager<SimTransport>>,
    registers: Arc<Registers>,
    children: RwLock<Vec<Arc<dyn Element>>>,
    reconnect_task: Arc<dyn Task>,
    device_error_handle: ReadHandle,
    connection_time_handle: ReadHandle,
}

impl SimDevice {
    /// Creates a device with an empty register bank.
    pub fn new(name: impl Into<String>, id: Option<Uuid>, faults: FaultPlan) -> Arc<Self> {
        let registers = Arc::new(Registers::new());
        let transport = SimTransport::new(Arc::clone(&registers), Arc::new(faults));
        let manager = Arc::new(ConnectionManager::new(transport));
        let reconnect_task: Arc<dyn Task> = Arc::new(ReconnectTask::new(Arc::clone(&manager)));
        let device_error_handle = {
            let manager = Arc::clone(&manager);
            ReadHandle::new(move || Ok(Value::Text(status_message(manager.last_error().as_ref()))))
        };
        let connection_time_handle = {
            let manager = Arc::clone(&manager);
            ReadHandle::new(move || Ok(Value::Time(manager.connection_time())))
        };
        Arc::new(Self {
            name: name.into(),
            id: id.unwrap_or_else(Uuid::new_v4),
            manager,
            registers,
            children: RwLock::new(Vec::new()),
            reconnect_task,
            device_error_handle,
            connection_time_handle,
        })
    }

    /// Builds a device and seeds its registers from a parsed configuration.
    pub fn from_config(config: &SimDeviceConfig) -> Result<Arc<Self>, ConfigError> {
        let device = Self::new(config.name.clone(), config.id, config.fault_plan());
        for (address, raw) in &config.registers {
            device
                .registers
                .set(address.clone(), register_value(address, raw)?);
        }
        Ok(device)
    }

    /// The device id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The connection manager shared by all of the device's points.
    pub fn manager(&self) -> &Arc<ConnectionManager<SimTransport>> {
        &self.manager
    }

    /// The register bank backing the simulated hardware.
    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    /// Reads one register through the connection.
    pub fn read_register(&self, address: &str) -> Result<Value, DeviceError> {
        self.manager
            .with_transport(|transport| transport.read_register(address))
    }

    /// Writes one register through the connection.
    pub fn write_register(&self, address: &str, value: Value) -> Result<(), DeviceError> {
        self.manager
            .with_transport(|transport| transport.write_register(address, value))
    }

    pub(crate) fn adopt(&self, child: Arc<dyn Element>) {
        self.children.write().push(child);
    }
}

impl Element for SimDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn for_each_attribute(&self, f: &mut dyn FnMut(Attribute) -> bool) -> bool {
        f(attributes::DEVICE_ERROR) || f(attributes::CONNECTION_TIME)
    }

    fn for_each_event(&self, f: &mut dyn FnMut(&Event) -> bool) -> bool {
        f(self.manager.connected_event()) || f(self.manager.disconnected_event())
    }

    fn for_each_task(&self, f: &mut dyn FnMut(&Arc<dyn Task>) -> bool) -> bool {
        f(&self.reconnect_task)
    }

    fn for_each_child(&self, f: &mut dyn FnMut(&Arc<dyn Element>) -> bool) -> bool {
        self.children.read().iter().any(|child| f(child))
    }

    fn make_read_handle(&self, attribute: &Attribute) -> Option<ReadHandle> {
        if *attribute == attributes::DEVICE_ERROR {
            Some(self.device_error_handle.clone())
        } else if *attribute == attributes::CONNECTION_TIME {
            Some(self.connection_time_handle.clone())
        } else {
            None
        }
    }
}

impl std::fmt::Debug for SimDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimDevice")
            .field("name", &self.name)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Builds simulated devices from their TOML configuration.
#[derive(Debug, Default)]
pub struct SimDeviceFactory;

impl DriverFactory for SimDeviceFactory {
    fn driver_type(&self) -> &'static str {
        "sim"
    }

    fn validate(&self, config: &toml::Value) -> Result<(), ConfigError> {
        let parsed: SimDeviceConfig = config
            .clone()
            .try_into()
            .map_err(|error: toml::de::Error| {
                ConfigError::invalid_value("device", error.to_string())
            })?;
        for (address, raw) in &parsed.registers {
            register_value(address, raw)?;
        }
        for raw in &parsed.inputs {
            SimInput::validate(raw)?;
        }
        for raw in &parsed.outputs {
            SimOutput::validate(raw)?;
        }
        Ok(())
    }

    fn build(&self, config: toml::Value) -> BoxFuture<'static, FieldioResult<Arc<dyn Element>>> {
        Box::pin(async move {
            let parsed: SimDeviceConfig = config.try_into().map_err(FieldioError::Parse)?;
            let device = SimDevice::from_config(&parsed).map_err(FieldioError::Config)?;

            let mut inputs = Vec::with_capacity(parsed.inputs.len());
            for raw in &parsed.inputs {
                inputs.push(SimInput::load(&device, raw).map_err(FieldioError::Config)?);
            }
            let mut outputs = Vec::with_capacity(parsed.outputs.len());
            for raw in &parsed.outputs {
                outputs.push(SimOutput::load(&device, raw).map_err(FieldioError::Config)?);
            }

            // Wire the points to the device only after every configuration
            // error had its chance to surface.
            for input in &inputs {
                input.realize();
            }
            for output in &outputs {
                output.realize();
            }
            for input in inputs {
                device.adopt(input);
            }
            for output in outputs {
                device.adopt(output);
            }

            tracing::info!(name = %parsed.name, id = %device.id(), "loaded simulated device");
            let element: Arc<dyn Element> = device;
            Ok(element)
        })
    }
}
