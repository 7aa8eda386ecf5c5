// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Canonical sample payload builders.

use pulse_core::payload::{
    ActionKind, ActionReport, BalanceChange, ChaosChange, EventPayload, ResourceChange,
};
use pulse_core::world::{PlayerState, ResourceKind};

/// Resource change payload with the delta left for normalization.
#[must_use]
pub fn resource_change(resource: ResourceKind, old: i64, new: i64) -> EventPayload {
    EventPayload::ResourceChanged(ResourceChange::new(resource, old, new, "fixture"))
}

/// Energy change payload, the most common fixture shape.
#[must_use]
pub fn energy_change(old: i64, new: i64) -> EventPayload {
    resource_change(ResourceKind::Energy, old, new)
}

/// Cell chaos change payload with the delta left for normalization.
#[must_use]
pub fn chaos_change(row: usize, col: usize, old: f64, new: f64) -> EventPayload {
    EventPayload::ChaosChanged(ChaosChange::new(row, col, old, new))
}

/// World balance payload at the given post-shift chaos level.
#[must_use]
pub fn balance_change(chaos: f64, chaos_delta: f64) -> EventPayload {
    EventPayload::BalanceChanged(BalanceChange::new(chaos, chaos_delta))
}

/// Action completion payload.
#[must_use]
pub fn action_report(action: ActionKind, row: usize, col: usize, cost: i64) -> EventPayload {
    EventPayload::ActionCompleted(ActionReport {
        action,
        row,
        col,
        cost,
    })
}

/// Stat block for a fresh default player.
#[must_use]
pub fn stats_snapshot() -> EventPayload {
    EventPayload::StatsUpdated(PlayerState::new().stats_snapshot())
}
