// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for pulse crates.
#![forbid(unsafe_code)]
//!
//! This crate provides commonly used test utilities to reduce duplication
//! across the pulse test suite.
//!
//! # Modules
//!
//! - [`clock`] - Settable clock double for sweep and timestamp assertions
//! - [`harness`] - Pre-wired bus/coordinator/world bundles
//! - [`payloads`] - Canonical sample payload builders
//! - [`probe`] - Recording listener that captures delivered events

pub mod clock;
pub mod harness;
pub mod payloads;
pub mod probe;

// Re-export commonly used items at crate root for convenience
pub use clock::{fixed_clock, FixedClock};
pub use harness::Harness;
pub use payloads::{
    action_report, balance_change, chaos_change, energy_change, resource_change, stats_snapshot,
};
pub use probe::EventProbe;
