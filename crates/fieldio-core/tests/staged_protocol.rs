//! Integration tests driving [`PollTask`]s against a live connection
//! manager, the way a scheduler drives read and write tasks in production.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fieldio_core::connection::{ConnectionManager, Transport};
use fieldio_core::error::DeviceError;
use fieldio_core::task::{ExecutionContext, OperationTarget, PollTask, Task, TaskStatus};
use fieldio_core::timestamp::{now, Timestamp};

// ===== Test doubles =====

#[derive(Default)]
struct FlakyTransport {
    failures_before_success: usize,
    opens: usize,
}

impl Transport for FlakyTransport {
    fn open(&mut self) -> Result<(), DeviceError> {
        self.opens += 1;
        if self.opens <= self.failures_before_success {
            Err(DeviceError::Timeout)
        } else {
            Ok(())
        }
    }

    fn close(&mut self) {}
}

/// A data point that counts how often its operation actually ran. The
/// operation body follows the production pattern: silently skip the cycle
/// while the device is down.
struct CountingPoint {
    manager: Arc<ConnectionManager<FlakyTransport>>,
    operations: AtomicUsize,
    skipped: AtomicUsize,
}

impl CountingPoint {
    fn new(manager: Arc<ConnectionManager<FlakyTransport>>) -> Arc<Self> {
        Arc::new(Self {
            manager,
            operations: AtomicUsize::new(0),
            skipped: AtomicUsize::new(0),
        })
    }

    fn operations(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    fn skipped(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }
}

impl OperationTarget for CountingPoint {
    fn request_connect(&self, timestamp: Timestamp) {
        self.manager.request_connect(timestamp);
    }

    fn request_disconnect(&self, timestamp: Timestamp) {
        self.manager.request_disconnect(timestamp);
    }

    fn perform_operation(&self, _context: &ExecutionContext) {
        if !self.manager.connected() {
            self.skipped.fetch_add(1, Ordering::SeqCst);
            return;
        }
        self.operations.fetch_add(1, Ordering::SeqCst);
    }
}

fn drive_full_lifecycle(task: &dyn Task, operational_cycles: usize) {
    let context = ExecutionContext::new(now());
    assert_eq!(task.prepare_pre_operational(&context), TaskStatus::Ready);
    assert_eq!(task.pre_operational(&context), TaskStatus::Ready);
    for _ in 0..operational_cycles {
        task.operational(&ExecutionContext::new(now()));
    }
    let context = ExecutionContext::new(now());
    assert_eq!(task.prepare_post_operational(&context), TaskStatus::Ready);
    assert_eq!(task.post_operational(&context), TaskStatus::Ready);
    task.finish_post_operational(&context);
}

// ===== Lifecycle against a live manager =====

/// A full lifecycle over a healthy device: the connection comes up at
/// prepare, every phase's operation runs, and the connection goes down at
/// finish.
#[test]
fn test_lifecycle_connects_operates_and_disconnects() {
    let manager = Arc::new(ConnectionManager::new(FlakyTransport::default()));
    let point = CountingPoint::new(Arc::clone(&manager));
    let task = PollTask::new(Arc::clone(&point));

    drive_full_lifecycle(&task, 3);

    // prepare sample + pre-operational + 3 operational + post-operational
    assert_eq!(point.operations(), 6);
    assert_eq!(point.skipped(), 0);
    assert!(!manager.connected());
    assert_eq!(manager.pending_requests(), 0);
}

/// When the device cannot be reached, every phase still completes with
/// `Ready` and the operation body skips each cycle instead of failing.
#[test]
fn test_lifecycle_over_a_dead_device_stays_ready() {
    let transport = FlakyTransport {
        failures_before_success: usize::MAX,
        opens: 0,
    };
    let manager = Arc::new(ConnectionManager::new(transport));
    let point = CountingPoint::new(Arc::clone(&manager));
    let task = PollTask::new(Arc::clone(&point));

    drive_full_lifecycle(&task, 2);

    assert_eq!(point.operations(), 0);
    assert_eq!(point.skipped(), 5);
    assert_eq!(manager.last_error(), Some(DeviceError::NotConnected));
}

/// The phases themselves never retry a failed connect; recovery belongs to
/// the reconnect service, after which operations resume.
#[test]
fn test_phases_do_not_retry_but_reconnect_recovers() {
    let transport = FlakyTransport {
        failures_before_success: 1,
        opens: 0,
    };
    let manager = Arc::new(ConnectionManager::new(transport));
    let point = CountingPoint::new(Arc::clone(&manager));
    let task = PollTask::new(Arc::clone(&point));

    let context = ExecutionContext::new(now());
    assert_eq!(task.prepare_pre_operational(&context), TaskStatus::Ready);
    assert_eq!(task.pre_operational(&context), TaskStatus::Ready);
    task.operational(&ExecutionContext::new(now()));

    // Three cycles ran against a down link; only one open was attempted.
    assert_eq!(point.operations(), 0);
    assert_eq!(point.skipped(), 3);
    assert_eq!(manager.with_transport(|t| t.opens), 1);

    manager.reconnect(now());
    assert!(manager.connected());

    task.operational(&ExecutionContext::new(now()));
    assert_eq!(point.operations(), 1);
}

/// Two tasks sharing one device keep the connection up until the last of
/// them has withdrawn its request.
#[test]
fn test_shared_device_disconnects_after_the_last_task() {
    let manager = Arc::new(ConnectionManager::new(FlakyTransport::default()));
    let read_point = CountingPoint::new(Arc::clone(&manager));
    let write_point = CountingPoint::new(Arc::clone(&manager));
    let read_task = PollTask::new(Arc::clone(&read_point));
    let write_task = PollTask::new(Arc::clone(&write_point));

    let context = ExecutionContext::new(now());
    read_task.prepare_pre_operational(&context);
    write_task.prepare_pre_operational(&context);
    assert_eq!(manager.pending_requests(), 2);
    assert_eq!(manager.with_transport(|t| t.opens), 1);

    read_task.finish_post_operational(&context);
    assert!(manager.connected(), "one request is still outstanding");

    write_task.finish_post_operational(&context);
    assert!(!manager.connected());
}

/// State transitions use the cycle's scheduled time, not a sampled one.
#[test]
fn test_transitions_record_the_scheduled_time() {
    let manager = Arc::new(ConnectionManager::new(FlakyTransport::default()));
    let point = CountingPoint::new(Arc::clone(&manager));
    let task = PollTask::new(Arc::clone(&point));

    let scheduled = now();
    task.prepare_pre_operational(&ExecutionContext::new(scheduled));
    assert_eq!(manager.connection_time(), scheduled);
}
