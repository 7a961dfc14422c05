//! The staged task protocol the scheduler drives components through.
//!
//! A scheduler owns a set of [`Task`]s and moves them through up to three
//! stages — pre-operational, operational, post-operational — invoking the
//! entry callbacks in a fixed order, once per scheduling cycle:
//!
//! ```text
//! prepare_pre_operational → pre_operational* → operational* →
//! prepare_post_operational → post_operational* → finish_post_operational
//! ```
//!
//! (`*` = once per cycle while the owning process stays in that stage.)
//!
//! [`PollTask`] implements the standard lifecycle shared by read and write
//! tasks: file a connect request up front, perform the operation every cycle,
//! withdraw the request on the way out. Phases never retry; a failed
//! operation surfaces through the error-sink path, not through the task
//! status.

use crate::timestamp::Timestamp;

// =============================================================================
// Stages & Status
// =============================================================================

/// One stage of the scheduling lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStage {
    /// The startup stage before regular operation.
    PreOperational = 0,
    /// The steady state; `operational` runs every cycle.
    Operational = 1,
    /// The shutdown stage after regular operation.
    PostOperational = 2,
}

/// The set of stages a task takes part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskStages(u8);

impl TaskStages {
    /// No stages at all.
    pub const NONE: TaskStages = TaskStages(0);

    /// All three stages.
    pub const ALL: TaskStages = TaskStages::NONE
        .with(TaskStage::PreOperational)
        .with(TaskStage::Operational)
        .with(TaskStage::PostOperational);

    const fn bit(stage: TaskStage) -> u8 {
        1 << (stage as u8)
    }

    /// The set containing exactly one stage.
    pub const fn just(stage: TaskStage) -> Self {
        TaskStages(Self::bit(stage))
    }

    /// This set with one more stage added.
    pub const fn with(self, stage: TaskStage) -> Self {
        TaskStages(self.0 | Self::bit(stage))
    }

    /// Whether the set contains the given stage.
    pub fn contains(self, stage: TaskStage) -> bool {
        self.0 & Self::bit(stage) != 0
    }
}

/// What a stage-entry callback tells the scheduler about its progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// The phase is complete; the scheduler may move on.
    Ready,
    /// The phase needs more cycles; the scheduler will call again.
    Pending,
}

// =============================================================================
// Execution Context
// =============================================================================

/// Per-cycle information the scheduler passes into every phase call.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionContext {
    scheduled_time: Timestamp,
}

impl ExecutionContext {
    /// Creates a context for a cycle scheduled at the given time.
    pub fn new(scheduled_time: Timestamp) -> Self {
        Self { scheduled_time }
    }

    /// The time this cycle was scheduled for.
    ///
    /// All state transitions triggered from within the cycle record this
    /// time, not a time they sample themselves.
    pub fn scheduled_time(&self) -> Timestamp {
        self.scheduled_time
    }
}

// =============================================================================
// Task Protocol
// =============================================================================

/// A schedulable task following the staged lifecycle.
///
/// Only `stages` and `operational` are mandatory; the remaining callbacks
/// default to doing nothing and reporting [`TaskStatus::Ready`], which is
/// what tasks that only act in the operational stage want.
pub trait Task: Send + Sync {
    /// The stages this task wants to be driven through.
    fn stages(&self) -> TaskStages;

    /// Entry into the pre-operational stage.
    fn prepare_pre_operational(&self, context: &ExecutionContext) -> TaskStatus {
        let _ = context;
        TaskStatus::Ready
    }

    /// One pre-operational cycle.
    fn pre_operational(&self, context: &ExecutionContext) -> TaskStatus {
        let _ = context;
        TaskStatus::Ready
    }

    /// One operational cycle.
    fn operational(&self, context: &ExecutionContext);

    /// Entry into the post-operational stage.
    fn prepare_post_operational(&self, context: &ExecutionContext) -> TaskStatus {
        let _ = context;
        TaskStatus::Ready
    }

    /// One post-operational cycle.
    fn post_operational(&self, context: &ExecutionContext) -> TaskStatus {
        let _ = context;
        TaskStatus::Ready
    }

    /// Exit from the post-operational stage.
    fn finish_post_operational(&self, context: &ExecutionContext) {
        let _ = context;
    }
}

/// The capability set [`PollTask`] drives.
///
/// Implemented by the objects owning a data point: connect requests are
/// forwarded to the device's connection manager, and `perform_operation` is
/// the point's read or write body (a no-op while disconnected).
pub trait OperationTarget: Send + Sync {
    /// Files a connect request with the underlying device.
    fn request_connect(&self, timestamp: Timestamp);

    /// Withdraws the connect request.
    fn request_disconnect(&self, timestamp: Timestamp);

    /// Performs one read or write cycle.
    fn perform_operation(&self, context: &ExecutionContext);
}

impl<T: OperationTarget + ?Sized> OperationTarget for std::sync::Arc<T> {
    fn request_connect(&self, timestamp: Timestamp) {
        (**self).request_connect(timestamp);
    }

    fn request_disconnect(&self, timestamp: Timestamp) {
        (**self).request_disconnect(timestamp);
    }

    fn perform_operation(&self, context: &ExecutionContext) {
        (**self).perform_operation(context);
    }
}

// =============================================================================
// Poll Task
// =============================================================================

/// The standard staged lifecycle for a polled read or write operation.
///
/// One instance per point and direction. The connect request filed in
/// `prepare_pre_operational` stays outstanding until
/// `finish_post_operational`, spanning the whole operational life of the
/// owning process.
pub struct PollTask<T: OperationTarget> {
    target: T,
}

impl<T: OperationTarget> PollTask<T> {
    /// Creates the task for the given target.
    pub fn new(target: T) -> Self {
        Self { target }
    }

    /// The target this task drives.
    pub fn target(&self) -> &T {
        &self.target
    }
}

impl<T: OperationTarget> Task for PollTask<T> {
    fn stages(&self) -> TaskStages {
        TaskStages::ALL
    }

    fn prepare_pre_operational(&self, context: &ExecutionContext) -> TaskStatus {
        self.target.request_connect(context.scheduled_time());

        // Take a first sample right away so an initial value is available
        // when the pre-operational stage begins. Whatever the outcome, this
        // reports Ready: a retry in a later prepare cycle would hit the same
        // connection state.
        self.target.perform_operation(context);
        TaskStatus::Ready
    }

    fn pre_operational(&self, context: &ExecutionContext) -> TaskStatus {
        self.target.perform_operation(context);
        TaskStatus::Ready
    }

    fn operational(&self, context: &ExecutionContext) {
        self.target.perform_operation(context);
    }

    fn prepare_post_operational(&self, _context: &ExecutionContext) -> TaskStatus {
        TaskStatus::Ready
    }

    fn post_operational(&self, context: &ExecutionContext) -> TaskStatus {
        self.target.perform_operation(context);
        TaskStatus::Ready
    }

    fn finish_post_operational(&self, context: &ExecutionContext) {
        self.target.request_disconnect(context.scheduled_time());
    }
}
