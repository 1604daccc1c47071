use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Time source and sleep primitive used by every poll loop.
///
/// Polls block the calling thread; the clock is the only suspension point.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `Instant::now` and `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual clock for tests.
///
/// `sleep` returns immediately after advancing virtual time by the requested
/// duration plus the configured overshoot, and every requested duration is
/// recorded so tests can count retries.
#[derive(Debug)]
pub struct SimulatedClock {
    origin: Instant,
    overshoot: Duration,
    state: Mutex<SimulatedState>,
}

#[derive(Debug, Default)]
struct SimulatedState {
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

impl Default for SimulatedClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            overshoot: Duration::ZERO,
            state: Mutex::new(SimulatedState::default()),
        }
    }

    /// Every sleep wakes up `overshoot` later than requested, mimicking
    /// scheduler jitter.
    pub fn with_sleep_overshoot(mut self, overshoot: Duration) -> Self {
        self.overshoot = overshoot;
        self
    }

    /// Move virtual time forward without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        self.state().elapsed += duration;
    }

    pub fn elapsed(&self) -> Duration {
        self.state().elapsed
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.state().sleeps.clone()
    }

    pub fn sleep_count(&self) -> usize {
        self.state().sleeps.len()
    }

    fn state(&self) -> MutexGuard<'_, SimulatedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for SimulatedClock {
    fn now(&self) -> Instant {
        self.origin + self.state().elapsed
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.state();
        state.elapsed += duration + self.overshoot;
        state.sleeps.push(duration);
    }
}
