//! Time source for everything that reads the wall clock.
//!
//! Progress rate limiting and backup naming depend on the current time.
//! Callers receive a [`Clock`] instead of calling `Timestamp::now()` so
//! tests can move time by hand.

use jiff::Timestamp;

pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves when told to.
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock(std::cell::Cell<Timestamp>);

#[cfg(test)]
impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self(std::cell::Cell::new(start))
    }

    pub fn advance(&self, by: jiff::SignedDuration) {
        self.0.set(self.0.get() + by);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.0.get()
    }
}
