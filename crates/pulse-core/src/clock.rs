// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Clock seam used to timestamp events and transaction lifecycles.
//!
//! The bus and the coordinator never read the wall clock inline; they hold an
//! injected [`Clock`] so tests can pin time. Timestamps are milliseconds since
//! the Unix epoch.

use std::rc::Rc;

/// Millisecond timestamp source.
pub trait Clock {
    /// Returns the current time in milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}

/// Default clock backed by [`std::time::SystemTime`].
///
/// Best-effort: a clock set before the epoch reads as 0 rather than failing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        u64::try_from(millis).unwrap_or(u64::MAX)
    }
}

/// Shared handle to a clock implementation.
///
/// The crate is single-threaded by contract, so handles are `Rc`, not `Arc`.
pub type ClockHandle = Rc<dyn Clock>;

/// Returns the default system clock handle.
#[must_use]
pub fn system_clock() -> ClockHandle {
    Rc::new(SystemClock)
}
