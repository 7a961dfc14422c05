//! Typed read/write handlers and the registries that select them.
//!
//! One handler class per direction, generic over the point's scalar type;
//! the registries instantiate them for every supported `data_type` keyword.
//! Strings are deliberately missing from the input registry: the simulated
//! device only accepts them on outputs, and an input configured with
//! `data_type = "string"` must fail to load.

use std::sync::Arc;

use fieldio_core::attribute::{attributes, Attribute, ReadHandle, ValueMismatch, WriteHandle};
use fieldio_core::error::DeviceError;
use fieldio_core::event::Event;
use fieldio_core::handler::{InputHandler, OutputHandler, ReadErrorSink, WriteErrorSink};
use fieldio_core::point::{ReadState, WriteState};
use fieldio_core::registry::{HandlerRegistry, RegistryEntry};
use fieldio_core::timestamp::Timestamp;
use fieldio_core::value::{DataType, ScalarValue};

use crate::device::SimDevice;

/// Everything a handler factory needs to build a handler for one point.
pub struct HandlerSeed {
    /// The device the point belongs to.
    pub device: Arc<SimDevice>,
    /// The register address the point is mapped to.
    pub address: String,
}

// =============================================================================
// Input Handler
// =============================================================================

struct TypedInputHandler<T: ScalarValue> {
    device: Arc<SimDevice>,
    address: String,
    read_state: Arc<ReadState<T>>,
}

fn new_input_handler<T: ScalarValue>(seed: HandlerSeed) -> Box<dyn InputHandler> {
    Box::new(TypedInputHandler::<T> {
        device: seed.device,
        address: seed.address,
        read_state: Arc::new(ReadState::new()),
    })
}

impl<T: ScalarValue> InputHandler for TypedInputHandler<T> {
    fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    fn for_each_attribute(&self, f: &mut dyn FnMut(Attribute) -> bool) -> bool {
        f(attributes::value(T::DATA_TYPE)) || f(attributes::UPDATE_TIME) || f(attributes::ERROR)
    }

    fn for_each_event(&self, f: &mut dyn FnMut(&Event) -> bool) -> bool {
        f(self.read_state.updated_event()) || f(self.read_state.read_error_event())
    }

    fn make_read_handle(&self, attribute: &Attribute) -> Option<ReadHandle> {
        if *attribute == attributes::value(T::DATA_TYPE) {
            Some(self.read_state.value_handle())
        } else if *attribute == attributes::UPDATE_TIME {
            Some(self.read_state.update_time_handle())
        } else if *attribute == attributes::ERROR {
            Some(self.read_state.error_handle())
        } else {
            None
        }
    }

    fn read(&self, timestamp: Timestamp, error_sink: &dyn ReadErrorSink) {
        // A register value that does not decode as the configured type is a
        // device-side fault, not a configuration error.
        let result = self
            .device
            .read_register(&self.address)
            .and_then(|value| T::from_value(&value).ok_or(DeviceError::Unknown));
        let error = result.as_ref().err().copied();
        self.read_state.update_read(timestamp, result);
        if let Some(error) = error {
            error_sink.handle_read_error(timestamp, error);
        }
    }

    fn update_read_state(&self, timestamp: Timestamp, error: Option<&DeviceError>) {
        self.read_state.update_connection_state(timestamp, error);
    }
}

// =============================================================================
// Output Handler
// =============================================================================

struct TypedOutputHandler<T: ScalarValue> {
    device: Arc<SimDevice>,
    address: String,
    read_state: Arc<ReadState<T>>,
    write_state: Arc<WriteState<T>>,
}

fn new_output_handler<T: ScalarValue>(seed: HandlerSeed) -> Box<dyn OutputHandler> {
    Box::new(TypedOutputHandler::<T> {
        device: seed.device,
        address: seed.address,
        read_state: Arc::new(ReadState::new()),
        write_state: Arc::new(WriteState::new()),
    })
}

impl<T: ScalarValue> OutputHandler for TypedOutputHandler<T> {
    fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    fn for_each_attribute(&self, f: &mut dyn FnMut(Attribute) -> bool) -> bool {
        f(attributes::value(T::DATA_TYPE))
            || f(attributes::UPDATE_TIME)
            || f(attributes::ERROR)
            || f(attributes::WRITE_ERROR)
    }

    fn for_each_event(&self, f: &mut dyn FnMut(&Event) -> bool) -> bool {
        f(self.read_state.updated_event())
            || f(self.read_state.read_error_event())
            || f(self.write_state.write_error_event())
    }

    fn make_read_handle(&self, attribute: &Attribute) -> Option<ReadHandle> {
        if *attribute == attributes::value(T::DATA_TYPE) {
            Some(self.read_state.value_handle())
        } else if *attribute == attributes::UPDATE_TIME {
            Some(self.read_state.update_time_handle())
        } else if *attribute == attributes::ERROR {
            Some(self.read_state.error_handle())
        } else if *attribute == attributes::WRITE_ERROR {
            Some(self.write_state.error_handle())
        } else {
            None
        }
    }

    fn make_write_handle(&self, attribute: &Attribute) -> Option<WriteHandle> {
        if *attribute != attributes::value(T::DATA_TYPE) {
            return None;
        }
        let state = Arc::clone(&self.write_state);
        Some(WriteHandle::new(move |value| {
            match T::from_value(&value) {
                Some(value) => {
                    state.schedule(value);
                    Ok(())
                }
                None => Err(ValueMismatch {
                    expected: T::DATA_TYPE,
                }),
            }
        }))
    }

    fn read(&self, timestamp: Timestamp, error_sink: &dyn ReadErrorSink) {
        let result = self
            .device
            .read_register(&self.address)
            .and_then(|value| T::from_value(&value).ok_or(DeviceError::Unknown));
        let error = result.as_ref().err().copied();
        self.read_state.update_read(timestamp, result);
        if let Some(error) = error {
            error_sink.handle_read_error(timestamp, error);
        }
    }

    fn write(&self, timestamp: Timestamp, error_sink: &dyn WriteErrorSink) {
        let Some(pending) = self.write_state.take_pending() else {
            return;
        };
        tracing::debug!(address = %self.address, "writing scheduled value");
        let result = self
            .device
            .write_register(&self.address, pending.into_value());
        let error = result.as_ref().err().copied();
        self.write_state.update_write(timestamp, result);
        if let Some(error) = error {
            error_sink.handle_write_error(timestamp, error);
        }
    }

    fn update_read_state(&self, timestamp: Timestamp, error: Option<&DeviceError>) {
        self.read_state.update_connection_state(timestamp, error);
    }
}

// =============================================================================
// Registries
// =============================================================================

pub(crate) static INPUT_HANDLERS: HandlerRegistry<HandlerSeed, dyn InputHandler> =
    HandlerRegistry::new(&[
        RegistryEntry::new("bool", new_input_handler::<bool>),
        RegistryEntry::new("uint8", new_input_handler::<u8>),
        RegistryEntry::new("uint16", new_input_handler::<u16>),
        RegistryEntry::new("uint32", new_input_handler::<u32>),
        RegistryEntry::new("uint64", new_input_handler::<u64>),
        RegistryEntry::new("int8", new_input_handler::<i8>),
        RegistryEntry::new("int16", new_input_handler::<i16>),
        RegistryEntry::new("int32", new_input_handler::<i32>),
        RegistryEntry::new("int64", new_input_handler::<i64>),
        RegistryEntry::new("float32", new_input_handler::<f32>),
        RegistryEntry::new("float64", new_input_handler::<f64>),
    ]);

pub(crate) static OUTPUT_HANDLERS: HandlerRegistry<HandlerSeed, dyn OutputHandler> =
    HandlerRegistry::new(&[
        RegistryEntry::new("bool", new_output_handler::<bool>),
        RegistryEntry::new("uint8", new_output_handler::<u8>),
        RegistryEntry::new("uint16", new_output_handler::<u16>),
        RegistryEntry::new("uint32", new_output_handler::<u32>),
        RegistryEntry::new("uint64", new_output_handler::<u64>),
        RegistryEntry::new("int8", new_output_handler::<i8>),
        RegistryEntry::new("int16", new_output_handler::<i16>),
        RegistryEntry::new("int32", new_output_handler::<i32>),
        RegistryEntry::new("int64", new_output_handler::<i64>),
        RegistryEntry::new("float32", new_output_handler::<f32>),
        RegistryEntry::new("float64", new_output_handler::<f64>),
        RegistryEntry::new("string", new_output_handler::<String>),
    ]);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::{FaultPlan, FaultScenario};
    use fieldio_core::timestamp::now;
    use fieldio_core::value::Value;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        read_errors: Mutex<Vec<DeviceError>>,
        write_errors: Mutex<Vec<DeviceError>>,
    }

    impl ReadErrorSink for RecordingSink {
        fn handle_read_error(&self, _timestamp: Timestamp, error: DeviceError) {
            self.read_errors.lock().push(error);
        }
    }

    impl WriteErrorSink for RecordingSink {
        fn handle_write_error(&self, _timestamp: Timestamp, error: DeviceError) {
            self.write_errors.lock().push(error);
        }
    }

    fn connected_device(faults: FaultPlan) -> Arc<SimDevice> {
        let device = SimDevice::new("bench", None, faults);
        device.manager().request_connect(now());
        device
    }

    fn seed(device: &Arc<SimDevice>, address: &str) -> HandlerSeed {
        HandlerSeed {
            device: Arc::clone(device),
            address: address.to_owned(),
        }
    }

    #[test]
    fn test_input_registry_has_no_string_entry() {
        assert!(INPUT_HANDLERS.supports("float64"));
        assert!(!INPUT_HANDLERS.supports("string"));
        assert!(OUTPUT_HANDLERS.supports("string"));
    }

    #[test]
    fn test_read_decodes_into_the_configured_type() {
        let device = connected_device(FaultPlan::none());
        device.registers().set("ai.level", Value::UInt(128));
        let handler = new_input_handler::<u8>(seed(&device, "ai.level"));
        let sink = RecordingSink::default();

        handler.read(now(), &sink);

        let value = handler
            .make_read_handle(&attributes::value(DataType::UInt8))
            .map(|handle| handle.read());
        assert_eq!(value, Some(Ok(Value::UInt(128))));
        assert!(sink.read_errors.lock().is_empty());
    }

    #[test]
    fn test_undecodable_register_reads_as_unknown_error() {
        let device = connected_device(FaultPlan::none());
        device.registers().set("ai.level", Value::Text("garbage".into()));
        let handler = new_input_handler::<u8>(seed(&device, "ai.level"));
        let sink = RecordingSink::default();

        handler.read(now(), &sink);

        assert_eq!(sink.read_errors.lock().as_slice(), &[DeviceError::Unknown]);
        let error = handler
            .make_read_handle(&attributes::ERROR)
            .map(|handle| handle.read());
        assert_eq!(
            error,
            Some(Ok(Value::Text("an unknown error occurred".into())))
        );
        // A point-local error leaves the shared link alone.
        assert!(device.manager().connected());
    }

    #[test]
    fn test_read_faults_are_reported_to_the_sink() {
        let device = connected_device(FaultPlan::scenario(FaultScenario::ReadTimeout {
            address: "ai.broken".to_owned(),
        }));
        let handler = new_input_handler::<f64>(seed(&device, "ai.broken"));
        let sink = RecordingSink::default();

        handler.read(now(), &sink);

        assert_eq!(sink.read_errors.lock().as_slice(), &[DeviceError::Timeout]);
    }

    #[test]
    fn test_write_delivers_the_pending_value() {
        let device = connected_device(FaultPlan::none());
        let handler = new_output_handler::<f64>(seed(&device, "ao.setpoint"));
        let sink = RecordingSink::default();

        // Nothing pending: the cycle is a no-op.
        handler.write(now(), &sink);
        assert_eq!(device.registers().get("ao.setpoint"), None);

        let handle = handler
            .make_write_handle(&attributes::value(DataType::Float64))
            .unwrap();
        assert_eq!(handle.write(Value::Float(2.5)), Ok(()));
        handler.write(now(), &sink);

        assert_eq!(device.registers().get("ao.setpoint"), Some(Value::Float(2.5)));
        let write_error = handler
            .make_read_handle(&attributes::WRITE_ERROR)
            .map(|handle| handle.read());
        assert_eq!(write_error, Some(Ok(Value::Text("success".into()))));
        assert!(sink.write_errors.lock().is_empty());
    }

    #[test]
    fn test_write_handle_rejects_mismatched_values() {
        let device = connected_device(FaultPlan::none());
        let handler = new_output_handler::<bool>(seed(&device, "do.run"));

        let handle = handler
            .make_write_handle(&attributes::value(DataType::Bool))
            .unwrap();
        assert_eq!(
            handle.write(Value::Text("on".into())),
            Err(ValueMismatch {
                expected: DataType::Bool
            })
        );

        // Only the value attribute is writable.
        assert!(handler.make_write_handle(&attributes::WRITE_ERROR).is_none());
    }

    #[test]
    fn test_connection_state_touches_read_but_not_write_state() {
        let device = connected_device(FaultPlan::scenario(FaultScenario::WriteTimeout {
            address: "ao.position".to_owned(),
        }));
        let handler = new_output_handler::<i32>(seed(&device, "ao.position"));
        let sink = RecordingSink::default();

        // Fail one write so the write state carries an error.
        let handle = handler
            .make_write_handle(&attributes::value(DataType::Int32))
            .unwrap();
        let _ = handle.write(Value::Int(5));
        handler.write(now(), &sink);
        assert_eq!(
            sink.write_errors.lock().as_slice(),
            &[DeviceError::Timeout]
        );

        // A connection transition rewrites the read error only.
        handler.update_read_state(now(), None);
        let read_error = handler
            .make_read_handle(&attributes::ERROR)
            .map(|handle| handle.read());
        assert_eq!(
            read_error,
            Some(Ok(Value::Text("no data was read yet".into())))
        );
        let write_error = handler
            .make_read_handle(&attributes::WRITE_ERROR)
            .map(|handle| handle.read());
        assert_eq!(
            write_error,
            Some(Ok(Value::Text("the connection timed out".into())))
        );
    }
}
