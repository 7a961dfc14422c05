//! Driver-side tasks: the reconnect service and the output task targets.

use std::sync::Arc;

use fieldio_core::connection::ConnectionManager;
use fieldio_core::task::{ExecutionContext, OperationTarget, Task, TaskStage, TaskStages};
use fieldio_core::timestamp::Timestamp;

use crate::output::SimOutput;
use crate::transport::SimTransport;

/// Operational-only service task that retries a dead connection.
///
/// The read and write phases never retry on their own; scheduling this task
/// against the device is the one place a lost connection comes back.
pub struct ReconnectTask {
    manager: Arc<ConnectionManager<SimTransport>>,
}

impl ReconnectTask {
    /// Creates the task for one device's connection manager.
    pub fn new(manager: Arc<ConnectionManager<SimTransport>>) -> Self {
        Self { manager }
    }
}

impl Task for ReconnectTask {
    fn stages(&self) -> TaskStages {
        TaskStages::just(TaskStage::Operational)
    }

    fn operational(&self, context: &ExecutionContext) {
        self.manager.reconnect(context.scheduled_time());
    }
}

// An output runs two polled lifecycles against one object, so the target
// trait is implemented on these thin wrappers rather than on the output.

pub(crate) struct OutputReadTarget(pub(crate) Arc<SimOutput>);

impl OperationTarget for OutputReadTarget {
    fn request_connect(&self, timestamp: Timestamp) {
        self.0.request_connect(timestamp);
    }

    fn request_disconnect(&self, timestamp: Timestamp) {
        self.0.request_disconnect(timestamp);
    }

    fn perform_operation(&self, context: &ExecutionContext) {
        self.0.perform_read(context);
    }
}

pub(crate) struct OutputWriteTarget(pub(crate) Arc<SimOutput>);

impl OperationTarget for OutputWriteTarget {
    fn request_connect(&self, timestamp: Timestamp) {
        self.0.request_connect(timestamp);
    }

    fn request_disconnect(&self, timestamp: Timestamp) {
        self.0.request_disconnect(timestamp);
    }

    fn perform_operation(&self, context: &ExecutionContext) {
        self.0.perform_write(context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::{FaultPlan, FaultScenario};
    use crate::transport::Registers;
    use fieldio_core::timestamp::now;

    fn manager_with(faults: FaultPlan) -> Arc<ConnectionManager<SimTransport>> {
        let transport = SimTransport::new(Arc::new(Registers::new()), Arc::new(faults));
        Arc::new(ConnectionManager::new(transport))
    }

    #[test]
    fn test_reconnect_task_runs_in_the_operational_stage_only() {
        let task = ReconnectTask::new(manager_with(FaultPlan::none()));
        let stages = task.stages();
        assert!(stages.contains(TaskStage::Operational));
        assert!(!stages.contains(TaskStage::PreOperational));
        assert!(!stages.contains(TaskStage::PostOperational));
    }

    #[test]
    fn test_reconnect_task_recovers_a_refused_connection() {
        let manager = manager_with(FaultPlan::scenario(FaultScenario::RefuseConnects {
            count: 1,
        }));
        let task = ReconnectTask::new(Arc::clone(&manager));

        manager.request_connect(now());
        assert!(!manager.connected());

        task.operational(&ExecutionContext::new(now()));
        assert!(manager.connected());

        // Connected again: further cycles are no-ops.
        task.operational(&ExecutionContext::new(now()));
        assert!(manager.connected());
    }

    #[test]
    fn test_reconnect_task_leaves_an_unrequested_device_alone() {
        let manager = manager_with(FaultPlan::none());
        let task = ReconnectTask::new(Arc::clone(&manager));

        task.operational(&ExecutionContext::new(now()));
        assert!(!manager.connected());
    }
}
