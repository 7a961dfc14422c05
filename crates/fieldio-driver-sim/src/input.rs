//! The input point element: a read-only value polled from the device.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;

use fieldio_core::attribute::{Attribute, ReadHandle};
use fieldio_core::connection::ErrorSink;
use fieldio_core::element::Element;
use fieldio_core::error::{ConfigError, DeviceError};
use fieldio_core::event::Event;
use fieldio_core::handler::{InputHandler, ReadErrorSink};
use fieldio_core::task::{ExecutionContext, OperationTarget, PollTask, Task};
use fieldio_core::timestamp::Timestamp;

use crate::config::PointConfig;
use crate::device::SimDevice;
use crate::handlers::{HandlerSeed, INPUT_HANDLERS};

/// One input point, bound to a register address on its device.
///
/// The typed behavior lives in the handler selected at load time from the
/// `data_type` keyword; the point itself only wires the handler to the
/// device's connection manager and to its read task.
pub struct SimInput {
    name: String,
    device: Arc<SimDevice>,
    handler: Box<dyn InputHandler>,
    realized: AtomicBool,
    tasks: OnceCell<Vec<Arc<dyn Task>>>,
}

impl SimInput {
    /// Loads an input from its configuration table.
    pub fn load(device: &Arc<SimDevice>, config: &toml::Value) -> Result<Arc<Self>, ConfigError> {
        let parsed = PointConfig::parse(config)?;
        let keyword = parsed.data_type()?;
        let address = parsed.address()?.to_owned();
        let name = parsed.element_name()?;

        let handler = INPUT_HANDLERS.create(
            keyword,
            HandlerSeed {
                device: Arc::clone(device),
                address,
            },
        )?;

        let input = Arc::new(Self {
            name,
            device: Arc::clone(device),
            handler,
            realized: AtomicBool::new(false),
            tasks: OnceCell::new(),
        });
        let read_task: Arc<dyn Task> = Arc::new(PollTask::new(Arc::clone(&input)));
        let _ = input.tasks.set(vec![read_task]);
        Ok(input)
    }

    /// Checks an input configuration without building anything.
    pub fn validate(config: &toml::Value) -> Result<(), ConfigError> {
        let parsed = PointConfig::parse(config)?;
        let keyword = parsed.data_type()?;
        parsed.address()?;
        if !INPUT_HANDLERS.supports(keyword) {
            return Err(ConfigError::UnknownDataType(keyword.to_owned()));
        }
        Ok(())
    }

    /// Completes the setup once loading the whole device succeeded.
    ///
    /// From this point on the input follows the device's connection state.
    pub fn realize(self: &Arc<Self>) {
        if self.realized.swap(true, Ordering::SeqCst) {
            return;
        }
        self.handler.realize();
        let sink: Weak<dyn ErrorSink> = Arc::<Self>::downgrade(self);
        self.device.manager().add_error_sink(sink);
    }
}

impl OperationTarget for SimInput {
    fn request_connect(&self, timestamp: Timestamp) {
        self.device.manager().request_connect(timestamp);
    }

    fn request_disconnect(&self, timestamp: Timestamp) {
        self.device.manager().request_disconnect(timestamp);
    }

    fn perform_operation(&self, context: &ExecutionContext) {
        // While the device is down the read state already says so; polling
        // would only produce the same NotConnected error again.
        if !self.device.manager().connected() {
            return;
        }
        self.handler.read(context.scheduled_time(), self);
    }
}

impl ReadErrorSink for SimInput {
    fn handle_read_error(&self, timestamp: Timestamp, error: DeviceError) {
        self.device
            .manager()
            .handle_error(timestamp, error, Some(self));
    }
}

impl ErrorSink for SimInput {
    fn connection_state_changed(&self, timestamp: Timestamp, error: Option<&DeviceError>) {
        self.handler.update_read_state(timestamp, error);
    }
}

impl Element for SimInput {
    fn name(&self) -> &str {
        &self.name
    }

    fn for_each_attribute(&self, f: &mut dyn FnMut(Attribute) -> bool) -> bool {
        self.handler.for_each_attribute(f)
    }

    fn for_each_event(&self, f: &mut dyn FnMut(&Event) -> bool) -> bool {
        self.handler.for_each_event(f)
    }

    fn for_each_task(&self, f: &mut dyn FnMut(&Arc<dyn Task>) -> bool) -> bool {
        self.tasks
            .get()
            .is_some_and(|tasks| tasks.iter().any(|task| f(task)))
    }

    fn make_read_handle(&self, attribute: &Attribute) -> Option<ReadHandle> {
        self.handler.make_read_handle(attribute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::FaultPlan;
    use fieldio_core::attribute::attributes;
    use fieldio_core::element::find_attribute;
    use fieldio_core::timestamp::now;
    use fieldio_core::value::Value;

    fn device() -> Arc<SimDevice> {
        SimDevice::new("bench", None, FaultPlan::none())
    }

    fn table(text: &str) -> toml::Value {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn test_load_requires_a_data_type() {
        let error = SimInput::load(&device(), &table("address = \"ai.0\"\n")).err();
        assert_eq!(error, Some(ConfigError::MissingDataType));
    }

    #[test]
    fn test_load_rejects_unknown_parameters() {
        let error = SimInput::load(
            &device(),
            &table("data_type = \"bool\"\naddress = \"di.0\"\nscale = 10\n"),
        )
        .err();
        assert_eq!(error, Some(ConfigError::UnknownParameter("scale".to_owned())));
    }

    #[test]
    fn test_inputs_reject_the_string_data_type() {
        let config = table("data_type = \"string\"\naddress = \"r.0\"\n");
        assert_eq!(
            SimInput::validate(&config).err(),
            Some(ConfigError::UnknownDataType("string".to_owned()))
        );
        assert_eq!(
            SimInput::load(&device(), &config).err(),
            Some(ConfigError::UnknownDataType("string".to_owned()))
        );
    }

    #[test]
    fn test_unnamed_input_is_named_after_its_address() {
        let input = SimInput::load(&device(), &table("data_type = \"bool\"\naddress = \"di.7\"\n"))
            .unwrap();
        assert_eq!(input.name(), "di.7");
    }

    #[test]
    fn test_input_carries_one_read_task() {
        let input = SimInput::load(&device(), &table("data_type = \"bool\"\naddress = \"di.0\"\n"))
            .unwrap();
        let mut tasks = 0;
        input.for_each_task(&mut |_| {
            tasks += 1;
            false
        });
        assert_eq!(tasks, 1);
    }

    #[test]
    fn test_attributes_come_from_the_handler() {
        let input = SimInput::load(
            &device(),
            &table("data_type = \"float64\"\naddress = \"ai.0\"\n"),
        )
        .unwrap();
        let value = find_attribute(input.as_ref(), "value").unwrap();
        assert_eq!(value, attributes::value(fieldio_core::value::DataType::Float64));
        assert!(find_attribute(input.as_ref(), "update_time").is_some());
        assert!(find_attribute(input.as_ref(), "error").is_some());
        assert!(find_attribute(input.as_ref(), "write_error").is_none());
    }

    #[test]
    fn test_realized_input_follows_the_connection_state() {
        let device = device();
        device.registers().set("ai.0", Value::Float(4.25));
        let input = SimInput::load(
            &device,
            &table("data_type = \"float64\"\naddress = \"ai.0\"\n"),
        )
        .unwrap();
        input.realize();

        let error = input.make_read_handle(&attributes::ERROR).unwrap();
        assert_eq!(
            error.read(),
            Ok(Value::Text("the device is not connected".into()))
        );

        // Connecting flips the effective error to "no data yet"; the first
        // poll then clears it.
        device.manager().request_connect(now());
        assert_eq!(error.read(), Ok(Value::Text("no data was read yet".into())));
        input.perform_operation(&ExecutionContext::new(now()));
        assert_eq!(error.read(), Ok(Value::Text("success".into())));

        let value = input.make_read_handle(&attributes::value(
            fieldio_core::value::DataType::Float64,
        ));
        assert_eq!(value.map(|handle| handle.read()), Some(Ok(Value::Float(4.25))));
    }

    #[test]
    fn test_unrealized_input_ignores_the_connection() {
        let device = device();
        let input = SimInput::load(
            &device,
            &table("data_type = \"float64\"\naddress = \"ai.0\"\n"),
        )
        .unwrap();

        device.manager().request_connect(now());
        let error = input.make_read_handle(&attributes::ERROR).unwrap();
        assert_eq!(
            error.read(),
            Ok(Value::Text("the device is not connected".into()))
        );
    }
}
