//! Time sources for pacing

use std::cell::{Cell, RefCell};
use std::thread;
use std::time::{Duration, Instant};

use crate::shutdown::Shutdown;

/// Granularity of interruptible sleeps
const SLEEP_SLICE: Duration = Duration::from_millis(200);

/// Reads the time and blocks the run loop
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Real clock backed by `thread::sleep`.
///
/// With a [`Shutdown`] attached, sleeps return early once an interrupt has
/// been requested.
#[derive(Debug, Clone, Default)]
pub struct SystemClock {
    shutdown: Option<Shutdown>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interruptible(shutdown: Shutdown) -> Self {
        Self {
            shutdown: Some(shutdown),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        let Some(shutdown) = &self.shutdown else {
            thread::sleep(duration);
            return;
        };

        let deadline = Instant::now() + duration;
        while !shutdown.is_requested() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            thread::sleep(remaining.min(SLEEP_SLICE));
        }
    }
}

/// Simulated clock: sleeping advances time instantly and is recorded
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Cell<Duration>,
    sleeps: RefCell<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Cell::new(Duration::ZERO),
            sleeps: RefCell::new(Vec::new()),
        }
    }

    /// Move time forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        self.elapsed.set(self.elapsed.get() + duration);
    }

    /// Total simulated time since creation
    pub fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        self.advance(duration);
    }
}
