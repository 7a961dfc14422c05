//! The output point element: a writable value that is also polled back.
//!
//! Outputs run two independent staged lifecycles, one reading the current
//! register value and one flushing scheduled writes. Both file their own
//! connect request, so the device stays up as long as either is active.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;

use fieldio_core::attribute::{Attribute, ReadHandle, WriteHandle};
use fieldio_core::connection::ErrorSink;
use fieldio_core::element::Element;
use fieldio_core::error::{ConfigError, DeviceError};
use fieldio_core::event::Event;
use fieldio_core::handler::{OutputHandler, ReadErrorSink, WriteErrorSink};
use fieldio_core::task::{ExecutionContext, PollTask, Task};
use fieldio_core::timestamp::Timestamp;

use crate::config::PointConfig;
use crate::device::SimDevice;
use crate::handlers::{HandlerSeed, OUTPUT_HANDLERS};
use crate::tasks::{OutputReadTarget, OutputWriteTarget};

/// One output point, bound to a register address on its device.
pub struct SimOutput {
    name: String,
    device: Arc<SimDevice>,
    handler: Box<dyn OutputHandler>,
    realized: AtomicBool,
    tasks: OnceCell<Vec<Arc<dyn Task>>>,
}

impl SimOutput {
    /// Loads an output from its configuration table.
    pub fn load(device: &Arc<SimDevice>, config: &toml::Value) -> Result<Arc<Self>, ConfigError> {
        let parsed = PointConfig::parse(config)?;
        let keyword = parsed.data_type()?;
        let address = parsed.address()?.to_owned();
        let name = parsed.element_name()?;

        let handler = OUTPUT_HANDLERS.create(
            keyword,
            HandlerSeed {
                device: Arc::clone(device),
                address,
            },
        )?;

        let output = Arc::new(Self {
            name,
            device: Arc::clone(device),
            handler,
            realized: AtomicBool::new(false),
            tasks: OnceCell::new(),
        });
        let read_task: Arc<dyn Task> =
            Arc::new(PollTask::new(OutputReadTarget(Arc::clone(&output))));
        let write_task: Arc<dyn Task> =
            Arc::new(PollTask::new(OutputWriteTarget(Arc::clone(&output))));
        let _ = output.tasks.set(vec![read_task, write_task]);
        Ok(output)
    }

    /// Checks an output configuration without building anything.
    pub fn validate(config: &toml::Value) -> Result<(), ConfigError> {
        let parsed = PointConfig::parse(config)?;
        let keyword = parsed.data_type()?;
        parsed.address()?;
        if !OUTPUT_HANDLERS.supports(keyword) {
            return Err(ConfigError::UnknownDataType(keyword.to_owned()));
        }
        Ok(())
    }

    /// Completes the setup once loading the whole device succeeded.
    pub fn realize(self: &Arc<Self>) {
        if self.realized.swap(true, Ordering::SeqCst) {
            return;
        }
        self.handler.realize();
        let sink: Weak<dyn ErrorSink> = Arc::<Self>::downgrade(self);
        self.device.manager().add_error_sink(sink);
    }

    pub(crate) fn request_connect(&self, timestamp: Timestamp) {
        self.device.manager().request_connect(timestamp);
    }

    pub(crate) fn request_disconnect(&self, timestamp: Timestamp) {
        self.device.manager().request_disconnect(timestamp);
    }

    pub(crate) fn perform_read(&self, context: &ExecutionContext) {
        if !self.device.manager().connected() {
            return;
        }
        self.handler.read(context.scheduled_time(), self);
    }

    pub(crate) fn perform_write(&self, context: &ExecutionContext) {
        // Scheduled values survive downtime; they are flushed on the first
        // write cycle after the connection is back.
        if !self.device.manager().connected() {
            return;
        }
        self.handler.write(context.scheduled_time(), self);
    }
}

impl ReadErrorSink for SimOutput {
    fn handle_read_error(&self, timestamp: Timestamp, error: DeviceError) {
        self.device
            .manager()
            .handle_error(timestamp, error, Some(self));
    }
}

impl WriteErrorSink for SimOutput {
    fn handle_write_error(&self, timestamp: Timestamp, error: DeviceError) {
        self.device
            .manager()
            .handle_error(timestamp, error, Some(self));
    }
}

impl ErrorSink for SimOutput {
    fn connection_state_changed(&self, timestamp: Timestamp, error: Option<&DeviceError>) {
        self.handler.update_read_state(timestamp, error);
    }
}

impl Element for SimOutput {
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

    fn make_write_handle(&self, attribute: &Attribute) -> Option<WriteHandle> {
        self.handler.make_write_handle(attribute)
    }
}
