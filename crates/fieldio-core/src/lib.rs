//! `fieldio-core`
//!
//! Core building blocks for fieldio device drivers: the connection lifecycle
//! machine, the staged task protocol, and the typed data-point abstractions
//! every driver shares.
//!
//! ## Architecture
//!
//! A driver is a tree of [`Element`]s: one device element owning the
//! transport, with one child element per configured input or output point.
//! Three mechanisms connect them:
//!
//! - **[`ConnectionManager`]**: counts connect requests from the points'
//!   tasks, opens the [`Transport`] on the first request and closes it when
//!   the last one is withdrawn, and fans connection-state changes out to
//!   registered [`ErrorSink`]s.
//! - **Staged tasks**: the scheduler drives every [`Task`] through the
//!   pre-operational → operational → post-operational lifecycle;
//!   [`PollTask`] implements the standard read/write cycle over an
//!   [`OperationTarget`].
//! - **Typed handlers**: each point delegates its typed behavior to an
//!   [`InputHandler`]/[`OutputHandler`] chosen from a static
//!   [`HandlerRegistry`] by the configured `data_type` keyword.
//!
//! ## Key Types
//!
//! - [`DeviceError`]: the device error domain and its connection-affecting
//!   classification
//! - [`ReadState`]/[`WriteState`]: per-point value and error state
//! - [`Attribute`]/[`Event`]: the reflection surface observers consume
//! - [`DriverFactory`]: builds device elements from TOML configuration

pub mod attribute;
pub mod config;
pub mod connection;
pub mod driver;
pub mod element;
pub mod error;
pub mod event;
pub mod handler;
pub mod point;
pub mod registry;
pub mod task;
pub mod timestamp;
pub mod value;

// Re-export commonly used types
pub use anyhow::{anyhow, Result};

pub use attribute::{attributes, Attribute, ReadHandle, ValueMismatch, WriteHandle};
pub use connection::{ConnectionManager, ErrorSink, Transport};
pub use driver::{DriverFactory, DriverRegistry};
pub use element::Element;
pub use error::{ConfigError, DeviceError, FieldioError, FieldioResult};
pub use event::{Event, EventSubscription};
pub use handler::{InputHandler, OutputHandler, ReadErrorSink, WriteErrorSink};
pub use point::{ReadState, WriteState};
pub use registry::{HandlerRegistry, RegistryEntry};
pub use task::{ExecutionContext, OperationTarget, PollTask, Task, TaskStage, TaskStages, TaskStatus};
pub use timestamp::Timestamp;
pub use value::{DataType, ScalarValue, Value};
