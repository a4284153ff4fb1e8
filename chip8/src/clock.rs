//! Frame clock.
use std::{
    thread,
    time::{Duration, Instant},
};

use crate::constants::*;

/// Clock frequency, in hertz (per second)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hz(pub u64);

impl Default for Hz {
    fn default() -> Self {
        Hz(DELAY_FREQUENCY)
    }
}

impl From<Hz> for Duration {
    fn from(freq: Hz) -> Self {
        if freq.0 == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(NANOS_IN_SECOND / freq.0)
        }
    }
}

/// Timer to synchronize the host loop with the 60Hz frame rate of the VM.
///
/// It is designed to work with the yielding cooperative pattern
/// of the interpreter loop. When the VM yields control back to the
/// caller, time elapses until it is resumed. Once the interpreter
/// is resumed, the elapsed time is taken into account when determining
/// the next frame.
#[derive(Debug)]
pub struct Clock {
    interval: Duration,
    start: Instant,
}

impl Clock {
    /// Creates a new clock with the current time as internal state.
    pub fn new(freq: Hz) -> Self {
        Self {
            interval: freq.into(),
            start: Instant::now(),
        }
    }

    /// Time between two frames.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Set the clock state back to zero.
    pub fn reset(&mut self) {
        self.start = Instant::now()
    }

    /// Check without blocking whether a frame is due.
    ///
    /// When it is, the clock is reset for the next frame.
    pub fn tick(&mut self) -> bool {
        if self.start.elapsed() >= self.interval {
            // Reset back to zero, rather than trying to catch up.
            //
            // If the VM was paused for debugging, and a large
            // amount of time has elapsed until it is resumed,
            // it should simply continue at the next frame running
            // at its usual speed.
            self.reset();
            true
        } else {
            false
        }
    }

    /// Block the current thread until the next frame.
    pub fn wait(&mut self) {
        while !self.tick() {
            // Sleep does not have enough resolution, and causes
            // the clock to run at 30 FPS.
            //
            // Spinning a loop causes high CPU usage and fan madness.
            //
            // Yielding in a loop is the best alternative.
            thread::yield_now();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clock_hz() {
        let interval: Duration = Hz(60).into();
        assert_eq!(interval.as_millis(), 16);

        let interval: Duration = Hz(0).into();
        assert_eq!(interval, Duration::ZERO);
    }

    #[test]
    fn test_clock_tick() {
        let mut clock = Clock::new(Hz(0));
        assert!(clock.tick());

        let mut clock = Clock::new(Hz(1));
        assert!(!clock.tick());
    }
}
