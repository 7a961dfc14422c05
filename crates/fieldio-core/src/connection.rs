//! The connection lifecycle machine shared by every data point of a device.
//!
//! One [`ConnectionManager`] instance stands between a device's transport and
//! all the points using it. Points (and tasks) never open or close the
//! transport themselves; they file connect requests, and the manager opens
//! the link when the first request arrives and closes it when the last one is
//! withdrawn. State changes fan out to registered [`ErrorSink`]s and raise
//! the `connected`/`disconnected` events.
//!
//! Concurrency model: the request counter is atomic, so requests may arrive
//! from any thread, but the connect/disconnect/notify sequence itself assumes
//! a single active caller (one scheduler thread per device). State is mutated
//! before sinks are notified and no lock is held across a sink callback, so a
//! sink may re-enter `request_connect`/`request_disconnect` or report errors
//! from inside its notification handler.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::DeviceError;
use crate::event::Event;
use crate::timestamp::{self, Timestamp};

// =============================================================================
// Transport
// =============================================================================

/// The device link a [`ConnectionManager`] opens and closes.
///
/// `open` runs synchronously inside `request_connect`; the scheduler cycle
/// blocks for its duration. Implementations must therefore enforce their own
/// deadline and return [`DeviceError::Timeout`] instead of hanging — the
/// lifecycle machine has no suspension point to impose one from outside.
pub trait Transport: Send {
    /// Opens the link to the device.
    fn open(&mut self) -> Result<(), DeviceError>;

    /// Closes the link. Best effort; errors during teardown are not reported.
    fn close(&mut self);
}

// =============================================================================
// Error Sinks
// =============================================================================

/// An observer notified whenever the connection state changes.
///
/// The callback fires in three situations, distinguished by the `error`
/// argument:
///
/// | Reason                                | `error`                       |
/// |---------------------------------------|-------------------------------|
/// | A connection was established          | `None`                        |
/// | The connection was gracefully closed  | `Some(NotConnected)`          |
/// | The connection was lost unexpectedly  | `Some(<the specific error>)`  |
///
/// Callbacks run without any manager lock held, so a sink may call back into
/// the manager. It must still return promptly; it runs inside the scheduler
/// cycle that triggered the change.
pub trait ErrorSink: Send + Sync {
    /// Called after the connection state changed.
    fn connection_state_changed(&self, timestamp: Timestamp, error: Option<&DeviceError>);
}

// =============================================================================
// Connection Manager
// =============================================================================

/// Reference-counting state holder inside the manager; everything except the
/// request counter and the `is_up` flag lives behind this lock.
struct StateInner {
    /// Time of the last connect or disconnect transition.
    connection_time: Timestamp,
    /// `None` while up; `NotConnected` while gracefully down; the failure
    /// code while down due to an error.
    last_error: Option<DeviceError>,
}

/// Owns a device link and the connection state every point of that device
/// shares.
///
/// The manager counts outstanding connect requests: the link is opened on the
/// 0→1 transition of the counter and closed on the 1→0 transition. Both
/// transitions, as well as connection losses reported through
/// [`handle_error`](Self::handle_error), notify all registered sinks.
///
/// Every `request_connect` must be balanced by exactly one later
/// `request_disconnect`. Withdrawing a request that was never filed is a
/// programming error: it is logged, trips a debug assertion, and leaves the
/// counter untouched.
pub struct ConnectionManager<T: Transport> {
    /// The device link. Locked only for open/close and `with_transport`.
    transport: Mutex<T>,
    /// Outstanding connect requests.
    request_count: AtomicUsize,
    /// Lock-free mirror of "a live link exists", for `connected()`.
    is_up: AtomicBool,
    state: Mutex<StateInner>,
    /// Registered observers. The manager does not own them; dead entries are
    /// pruned on the next notification.
    sinks: Mutex<Vec<Weak<dyn ErrorSink>>>,
    connected_event: Event,
    disconnected_event: Event,
}

impl<T: Transport> ConnectionManager<T> {
    /// Creates a manager for the given transport, starting disconnected.
    pub fn new(transport: T) -> Self {
        Self {
            transport: Mutex::new(transport),
            request_count: AtomicUsize::new(0),
            is_up: AtomicBool::new(false),
            state: Mutex::new(StateInner {
                connection_time: timestamp::never(),
                last_error: Some(DeviceError::NotConnected),
            }),
            sinks: Mutex::new(Vec::new()),
            connected_event: Event::new("connected"),
            disconnected_event: Event::new("disconnected"),
        }
    }

    /// Registers a sink for future state-change notifications.
    ///
    /// Sinks are held weakly; a sink that has been dropped is skipped and
    /// eventually pruned. Registration never triggers a notification.
    pub fn add_error_sink(&self, sink: Weak<dyn ErrorSink>) {
        self.sinks.lock().push(sink);
    }

    /// Files a connect request.
    ///
    /// On the 0→1 transition of the request count this attempts to open the
    /// transport synchronously and notifies every sink with the outcome
    /// before returning — callers registered as sinks must be prepared for
    /// their `connection_state_changed` to run from inside this call. At any
    /// other count this only bumps the counter.
    pub fn request_connect(&self, timestamp: Timestamp) {
        let previous = self.request_count.fetch_add(1, Ordering::AcqRel);
        if previous == 0 {
            self.connect(timestamp);
        }
    }

    /// Withdraws a connect request.
    ///
    /// On the 1→0 transition this closes the transport, records
    /// [`DeviceError::NotConnected`], and notifies every sink before
    /// returning. Calling without a matching `request_connect` is a contract
    /// violation; see the type-level docs.
    pub fn request_disconnect(&self, timestamp: Timestamp) {
        let previous =
            self.request_count
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                    count.checked_sub(1)
                });
        match previous {
            Ok(1) => self.disconnect(timestamp),
            Ok(_) => {}
            Err(_) => {
                tracing::error!(
                    "request_disconnect without a matching request_connect; ignoring"
                );
                debug_assert!(false, "unbalanced request_disconnect");
            }
        }
    }

    /// Reports an error detected outside the manager, e.g. by a failed read
    /// or write on a data point.
    ///
    /// Errors that are not connection-affecting (see
    /// [`DeviceError::is_connection_error`]) are ignored here; they stay in
    /// the reporting point's own state. Connection-affecting errors tear the
    /// link down and notify every sink except `sender`, so a point that
    /// already handled the error it reported is not told about it again.
    pub fn handle_error(
        &self,
        timestamp: Timestamp,
        error: DeviceError,
        sender: Option<&dyn ErrorSink>,
    ) {
        if !error.is_connection_error() {
            tracing::trace!(%error, "non-connection error, not propagated");
            return;
        }

        tracing::warn!(%error, "connection-affecting error reported");
        if self.is_up.load(Ordering::Acquire) {
            self.transport.lock().close();
        }
        self.update_state(timestamp, Some(error), sender);
    }

    /// Whether a live connection currently exists.
    pub fn connected(&self) -> bool {
        self.is_up.load(Ordering::Acquire)
    }

    /// Number of outstanding connect requests.
    pub fn pending_requests(&self) -> usize {
        self.request_count.load(Ordering::Acquire)
    }

    /// Time of the last connect or disconnect transition.
    pub fn connection_time(&self) -> Timestamp {
        self.state.lock().connection_time
    }

    /// The last connection error, or `None` while the link is up.
    pub fn last_error(&self) -> Option<DeviceError> {
        self.state.lock().last_error
    }

    /// The event raised on every transition to connected.
    pub fn connected_event(&self) -> &Event {
        &self.connected_event
    }

    /// The event raised on every transition to disconnected, graceful or not.
    pub fn disconnected_event(&self) -> &Event {
        &self.disconnected_event
    }

    /// Runs `f` with exclusive access to the transport.
    ///
    /// This is how drivers reach their link for reads and writes. Do not call
    /// back into the manager from inside `f`; the transport lock is held.
    pub fn with_transport<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.transport.lock())
    }

    /// Re-attempts the connection if requests are outstanding but the link is
    /// down. Driven by a periodic reconnect task; a no-op otherwise.
    pub fn reconnect(&self, timestamp: Timestamp) {
        if self.connected() || self.request_count.load(Ordering::Acquire) == 0 {
            return;
        }
        tracing::debug!("reconnect task retrying connection");
        self.connect(timestamp);
    }

    /// Opens the transport and records the outcome.
    fn connect(&self, timestamp: Timestamp) {
        tracing::debug!("attempting to connect");
        let outcome = self.transport.lock().open();
        match outcome {
            Ok(()) => self.update_state(timestamp, None, None),
            Err(error) => {
                tracing::warn!(%error, "connection attempt failed");
                self.update_state(timestamp, Some(error), None);
            }
        }
    }

    /// Closes the transport and records the graceful shutdown.
    fn disconnect(&self, timestamp: Timestamp) {
        tracing::debug!("closing connection");
        self.transport.lock().close();
        self.update_state(timestamp, Some(DeviceError::NotConnected), None);
    }

    /// Records a new state and, if anything changed, raises events and
    /// notifies sinks.
    ///
    /// State is fully updated before the first callback runs, and no lock is
    /// held while callbacks run. Reporting the same state twice is a no-op,
    /// which makes repeated teardown reports idempotent.
    fn update_state(
        &self,
        timestamp: Timestamp,
        error: Option<DeviceError>,
        exclude: Option<&dyn ErrorSink>,
    ) {
        let now_up = error.is_none();
        let was_up;
        {
            let mut state = self.state.lock();
            was_up = self.is_up.load(Ordering::Acquire);
            if was_up == now_up && state.last_error == error {
                return;
            }
            state.connection_time = timestamp;
            state.last_error = error;
            self.is_up.store(now_up, Ordering::Release);
        }

        if now_up && !was_up {
            tracing::info!(%timestamp, "device connected");
            self.connected_event.raise(timestamp);
        } else if !now_up && was_up {
            tracing::info!(%timestamp, error = %crate::error::status_message(error.as_ref()), "device disconnected");
            self.disconnected_event.raise(timestamp);
        }

        let sinks: Vec<Arc<dyn ErrorSink>> = {
            let mut registered = self.sinks.lock();
            registered.retain(|sink| sink.strong_count() > 0);
            registered.iter().filter_map(Weak::upgrade).collect()
        };
        let exclude_ptr = exclude.map(|sink| sink as *const dyn ErrorSink as *const ());
        for sink in sinks {
            if exclude_ptr == Some(Arc::as_ptr(&sink) as *const ()) {
                continue;
            }
            sink.connection_state_changed(timestamp, error.as_ref());
        }
    }
}
