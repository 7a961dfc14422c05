//! Fault injection for the simulated device link.
//!
//! A [`FaultPlan`] decides, per operation, whether the simulated transport
//! succeeds or fails and with which [`DeviceError`]. Deterministic scenarios
//! cover the interesting lifecycle transitions (refused connects, a link that
//! drops mid-run); random failure rates with a seedable RNG cover soak-style
//! resilience tests.
//!
//! Scenario failures map to connection-affecting errors, so they exercise
//! the teardown and reconnect paths. Random failures map to
//! [`DeviceError::Unknown`], which stays local to the failing point.

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use fieldio_core::error::DeviceError;

// =============================================================================
// Seeded RNG
// =============================================================================

/// Thread-safe, optionally seeded random number generator.
///
/// With a seed the failure pattern is reproducible run to run; without one
/// the generator seeds itself from the OS.
pub struct SimRng {
    inner: Mutex<ChaCha8Rng>,
}

impl SimRng {
    /// Creates a generator, seeded if `seed` is given.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            inner: Mutex::new(rng),
        }
    }

    /// Whether an operation should fail, given a failure probability in
    /// `0.0..=1.0`.
    pub fn should_fail(&self, rate: f64) -> bool {
        if rate <= 0.0 {
            return false;
        }
        if rate >= 1.0 {
            return true;
        }
        self.inner.lock().gen::<f64>() < rate
    }

    /// A uniformly random `u64`.
    pub fn next_u64(&self) -> u64 {
        self.inner.lock().gen()
    }
}

impl Default for SimRng {
    fn default() -> Self {
        Self::new(None)
    }
}

impl std::fmt::Debug for SimRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimRng").finish_non_exhaustive()
    }
}

// =============================================================================
// Fault Scenarios
// =============================================================================

/// A deterministic failure pattern for the simulated link.
#[derive(Debug, Clone)]
pub enum FaultScenario {
    /// Refuse the first `count` connect attempts, then accept.
    RefuseConnects {
        /// How many attempts to refuse.
        count: u32,
    },

    /// Reset the link after `count` successful reads.
    DropAfterReads {
        /// How many reads succeed before the reset.
        count: u32,
    },

    /// Every read of one register address times out.
    ReadTimeout {
        /// The affected register address.
        address: String,
    },

    /// Every write to one register address times out.
    WriteTimeout {
        /// The affected register address.
        address: String,
    },
}

#[derive(Debug, Default)]
struct FaultState {
    connect_attempts: u32,
    reads: u32,
}

/// The failure behavior of one simulated device.
#[derive(Debug)]
pub struct FaultPlan {
    scenarios: Vec<FaultScenario>,
    read_failure_rate: f64,
    write_failure_rate: f64,
    rng: SimRng,
    state: Mutex<FaultState>,
}

impl FaultPlan {
    /// Creates a plan from scenarios plus random per-operation failure rates.
    pub fn new(
        scenarios: Vec<FaultScenario>,
        read_failure_rate: f64,
        write_failure_rate: f64,
        seed: Option<u64>,
    ) -> Self {
        Self {
            scenarios,
            read_failure_rate,
            write_failure_rate,
            rng: SimRng::new(seed),
            state: Mutex::new(FaultState::default()),
        }
    }

    /// A plan that never fails anything.
    pub fn none() -> Self {
        Self::new(Vec::new(), 0.0, 0.0, None)
    }

    /// A plan with a single scenario and no random failures.
    pub fn scenario(scenario: FaultScenario) -> Self {
        Self::new(vec![scenario], 0.0, 0.0, None)
    }

    /// Decides the outcome of a connect attempt.
    pub fn check_connect(&self) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        state.connect_attempts += 1;
        for scenario in &self.scenarios {
            if let FaultScenario::RefuseConnects { count } = scenario {
                if state.connect_attempts <= *count {
                    return Err(DeviceError::ConnectionRefused);
                }
            }
        }
        Ok(())
    }

    /// Decides the outcome of reading one register.
    pub fn check_read(&self, address: &str) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        for scenario in &self.scenarios {
            match scenario {
                FaultScenario::ReadTimeout { address: target } if target == address => {
                    return Err(DeviceError::Timeout);
                }
                FaultScenario::DropAfterReads { count } if state.reads >= *count => {
                    return Err(DeviceError::ConnectionReset);
                }
                _ => {}
            }
        }
        if self.rng.should_fail(self.read_failure_rate) {
            return Err(DeviceError::Unknown);
        }
        state.reads += 1;
        Ok(())
    }

    /// Decides the outcome of writing one register.
    pub fn check_write(&self, address: &str) -> Result<(), DeviceError> {
        for scenario in &self.scenarios {
            if let FaultScenario::WriteTimeout { address: target } = scenario {
                if target == address {
                    return Err(DeviceError::Timeout);
                }
            }
        }
        if self.rng.should_fail(self.write_failure_rate) {
            return Err(DeviceError::Unknown);
        }
        Ok(())
    }

    /// Clears the scenario counters.
    pub fn reset(&self) {
        *self.state.lock() = FaultState::default();
    }
}

impl Default for FaultPlan {
    fn default() -> Self {
        Self::none()
    }
}
