// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Settable clock double.

use std::cell::Cell;
use std::rc::Rc;

use pulse_core::clock::{Clock, ClockHandle};

/// Clock that reads whatever the test last set, never the wall clock.
#[derive(Debug)]
pub struct FixedClock {
    now: Cell<u64>,
}

impl FixedClock {
    /// Clock pinned at `start` milliseconds.
    #[must_use]
    pub fn new(start: u64) -> Rc<Self> {
        Rc::new(Self {
            now: Cell::new(start),
        })
    }

    /// Jumps to an absolute time.
    pub fn set(&self, millis: u64) {
        self.now.set(millis);
    }

    /// Moves forward by `millis`.
    pub fn advance(&self, millis: u64) {
        self.now.set(self.now.get().saturating_add(millis));
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.now.get()
    }
}

/// Builds a fixed clock and the [`ClockHandle`] to inject it with.
///
/// The returned `Rc<FixedClock>` stays in the test's hands for `set`/
/// `advance` calls; the handle goes into the bus or coordinator.
#[must_use]
pub fn fixed_clock(start: u64) -> (ClockHandle, Rc<FixedClock>) {
    let clock = FixedClock::new(start);
    let handle: ClockHandle = clock.clone();
    (handle, clock)
}
