//! Timestamps used throughout the lifecycle and data-point layers.
//!
//! Scheduled times flow in from the scheduler with every task phase; state
//! transitions and value updates record the time they were handed, never a
//! time they sample themselves. [`now`] exists for callers that sit outside
//! a scheduled context (tests, interactive tools).

use chrono::{DateTime, Utc};

/// The timestamp type carried through every phase call and state transition.
pub type Timestamp = DateTime<Utc>;

/// Returns the current wall-clock time.
pub fn now() -> Timestamp {
    Utc::now()
}

/// The "never" timestamp used before any transition has happened.
///
/// A freshly created component reports this as its connection time until the
/// first connect or disconnect records a real one.
pub fn never() -> Timestamp {
    DateTime::<Utc>::MIN_UTC
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_precedes_everything() {
        assert!(never() < now());
    }
}
