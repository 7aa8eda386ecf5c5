// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Canonical typed payloads, one schema per event family.
//!
//! Producers populate these shapes directly; downstream layers match on the
//! variant instead of sniffing for ad-hoc fields. The only intentionally
//! loose variant is [`EventPayload::Custom`], the escape hatch for topics
//! outside the canonical families.

use serde::{Deserialize, Serialize};

use crate::txn::TxnId;
use crate::world::{CellKind, ResourceKind};

/// Player-visible action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Step to an adjacent cell.
    Move,
    /// Reveal an adjacent cell.
    Sense,
    /// Work a revealed cell.
    Interact,
    /// Reduce a cell's chaos.
    Stabilize,
}

impl ActionKind {
    /// Lowercase name used in logs and transaction kinds.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Sense => "sense",
            Self::Interact => "interact",
            Self::Stabilize => "stabilize",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload for `player:resource:changed:*` events.
///
/// `delta` may be left `None` by the producer; normalization fills it with
/// `new_value - old_value`. A producer-supplied delta is never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceChange {
    /// Which resource moved.
    pub resource: ResourceKind,
    /// Value before the change.
    pub old_value: i64,
    /// Value after the change.
    pub new_value: i64,
    /// Signed change, filled by normalization when absent.
    pub delta: Option<i64>,
    /// Producer-supplied cause, e.g. `"stabilize"` or `"turn upkeep"`.
    pub reason: Box<str>,
}

impl ResourceChange {
    /// Builds a change record with the delta left for normalization.
    #[must_use]
    pub fn new(resource: ResourceKind, old_value: i64, new_value: i64, reason: &str) -> Self {
        Self {
            resource,
            old_value,
            new_value,
            delta: None,
            reason: Box::from(reason),
        }
    }
}

/// Payload for `player:stats:updated` events: the full stat block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Current energy.
    pub energy: i64,
    /// Energy capacity.
    pub energy_max: i64,
    /// Current movement points.
    pub movement: i64,
    /// Movement-point capacity.
    pub movement_max: i64,
    /// Current evolution points.
    pub evolution: i64,
    /// Evolution-point capacity.
    pub evolution_max: i64,
    /// Player row on the grid.
    pub row: usize,
    /// Player column on the grid.
    pub col: usize,
    /// Acquired trait names.
    pub traits: Vec<Box<str>>,
    /// Lifetime move count.
    pub moves_made: u32,
    /// Lifetime explored-tile count.
    pub tiles_explored: u32,
    /// Lifetime turn count.
    pub turns_taken: u32,
}

/// Payload for `player:trait:added` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitChange {
    /// Trait that was gained.
    pub name: Box<str>,
    /// What granted it.
    pub source: Box<str>,
}

/// Payload for `player:action:completed:*` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReport {
    /// Completed action.
    pub action: ActionKind,
    /// Target row.
    pub row: usize,
    /// Target column.
    pub col: usize,
    /// Resource units the action cost.
    pub cost: i64,
}

/// Payload for `tile:explored` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileReveal {
    /// Revealed row.
    pub row: usize,
    /// Revealed column.
    pub col: usize,
    /// Cell type at reveal time.
    pub kind: CellKind,
    /// Cell chaos at reveal time.
    pub chaos: f64,
}

/// Payload for `tile:type:changed` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileMutation {
    /// Mutated row.
    pub row: usize,
    /// Mutated column.
    pub col: usize,
    /// Type before the mutation.
    pub old_kind: CellKind,
    /// Type after the mutation.
    pub new_kind: CellKind,
}

/// Payload for `tile:chaos:changed` events.
///
/// Shaped like [`ResourceChange`]: old/new plus a normalization-filled delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChaosChange {
    /// Affected row.
    pub row: usize,
    /// Affected column.
    pub col: usize,
    /// Chaos before the change.
    pub old_chaos: f64,
    /// Chaos after the change.
    pub new_chaos: f64,
    /// Signed change, filled by normalization when absent.
    pub delta: Option<f64>,
}

impl ChaosChange {
    /// Builds a change record with the delta left for normalization.
    #[must_use]
    pub const fn new(row: usize, col: usize, old_chaos: f64, new_chaos: f64) -> Self {
        Self {
            row,
            col,
            old_chaos,
            new_chaos,
            delta: None,
        }
    }
}

/// Payload for `system:balance:changed` events.
///
/// `order` is always the complement of `chaos`; the constructor maintains it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceChange {
    /// World chaos after the shift, in `0.0..=1.0`.
    pub chaos: f64,
    /// World order after the shift, `1.0 - chaos`.
    pub order: f64,
    /// Signed chaos shift that produced this state.
    pub chaos_delta: f64,
}

impl BalanceChange {
    /// Builds a balance record from the post-shift chaos level.
    #[must_use]
    pub fn new(chaos: f64, chaos_delta: f64) -> Self {
        Self {
            chaos,
            order: 1.0 - chaos,
            chaos_delta,
        }
    }
}

/// Turn boundary marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    /// A new turn just began.
    Started,
    /// The current turn just ended.
    Ended,
}

/// Payload for `system:turn:*` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnInfo {
    /// One-based turn number.
    pub number: u32,
    /// Which boundary this event marks.
    pub phase: TurnPhase,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Victory condition reached.
    Victory,
    /// Run lost.
    Defeat,
    /// Level cleared, run continues.
    LevelComplete,
}

/// Payload for `system:victory:achieved`, `system:game:over`, and
/// `system:level:completed` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Terminal outcome.
    pub outcome: Outcome,
    /// Turn the run ended on.
    pub turn: u32,
    /// Human-readable cause.
    pub reason: Box<str>,
}

/// Payload for `system:transaction:rolledback` notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackNotice {
    /// Rolled-back transaction.
    pub txn: TxnId,
    /// Kind the transaction was opened with.
    pub kind: Box<str>,
    /// Caller-supplied cause.
    pub reason: Box<str>,
}

/// Merged chaos/balance view attached to designated aggregate events at
/// commit, so one listener can observe both deltas without re-deriving them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombinedState {
    /// Cell chaos before the change.
    pub cell_old_chaos: f64,
    /// Cell chaos after the change.
    pub cell_new_chaos: f64,
    /// Cell-level chaos delta.
    pub cell_delta: f64,
    /// World chaos after the shift.
    pub chaos: f64,
    /// World order after the shift.
    pub order: f64,
    /// World-level chaos delta.
    pub chaos_delta: f64,
}

impl CombinedState {
    /// Merges the cell-level and world-level views recorded in one
    /// transaction.
    #[must_use]
    pub fn merge(cell: &ChaosChange, balance: &BalanceChange) -> Self {
        Self {
            cell_old_chaos: cell.old_chaos,
            cell_new_chaos: cell.new_chaos,
            cell_delta: cell
                .delta
                .unwrap_or(cell.new_chaos - cell.old_chaos),
            chaos: balance.chaos,
            order: balance.order,
            chaos_delta: balance.chaos_delta,
        }
    }
}

/// Event data, one canonical variant per family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    /// Marker-only notification with no data.
    Empty,
    /// Player resource movement.
    ResourceChanged(ResourceChange),
    /// Full player stat refresh.
    StatsUpdated(StatsSnapshot),
    /// Gained trait.
    TraitGained(TraitChange),
    /// Completed player action.
    ActionCompleted(ActionReport),
    /// Newly revealed cell.
    TileExplored(TileReveal),
    /// Cell type mutation.
    TileTypeChanged(TileMutation),
    /// Cell chaos change.
    ChaosChanged(ChaosChange),
    /// World balance shift.
    BalanceChanged(BalanceChange),
    /// Turn boundary.
    TurnChanged(TurnInfo),
    /// Run-ending report.
    RunEnded(RunReport),
    /// Transaction rollback notification.
    RolledBack(RollbackNotice),
    /// Escape hatch for topics outside the canonical families.
    Custom(serde_json::Value),
}

impl EventPayload {
    /// Short variant label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::ResourceChanged(_) => "resource-changed",
            Self::StatsUpdated(_) => "stats-updated",
            Self::TraitGained(_) => "trait-gained",
            Self::ActionCompleted(_) => "action-completed",
            Self::TileExplored(_) => "tile-explored",
            Self::TileTypeChanged(_) => "tile-type-changed",
            Self::ChaosChanged(_) => "chaos-changed",
            Self::BalanceChanged(_) => "balance-changed",
            Self::TurnChanged(_) => "turn-changed",
            Self::RunEnded(_) => "run-ended",
            Self::RolledBack(_) => "rolled-back",
            Self::Custom(_) => "custom",
        }
    }

    /// Returns a copy with normalization applied.
    ///
    /// Only the change-shaped variants carry derivable fields: an absent
    /// delta becomes `new - old`. Everything else is cloned as-is.
    #[must_use]
    pub fn normalized(&self) -> Self {
        match self {
            Self::ResourceChanged(change) => {
                let mut change = change.clone();
                if change.delta.is_none() {
                    change.delta = Some(change.new_value - change.old_value);
                }
                Self::ResourceChanged(change)
            }
            Self::ChaosChanged(change) => {
                let mut change = change.clone();
                if change.delta.is_none() {
                    change.delta = Some(change.new_chaos - change.old_chaos);
                }
                Self::ChaosChanged(change)
            }
            other => other.clone(),
        }
    }

    /// Borrows the resource change, if that's what this payload is.
    #[must_use]
    pub const fn as_resource_change(&self) -> Option<&ResourceChange> {
        match self {
            Self::ResourceChanged(change) => Some(change),
            _ => None,
        }
    }

    /// Borrows the chaos change, if that's what this payload is.
    #[must_use]
    pub const fn as_chaos_change(&self) -> Option<&ChaosChange> {
        match self {
            Self::ChaosChanged(change) => Some(change),
            _ => None,
        }
    }

    /// Borrows the balance change, if that's what this payload is.
    #[must_use]
    pub const fn as_balance_change(&self) -> Option<&BalanceChange> {
        match self {
            Self::BalanceChanged(change) => Some(change),
            _ => None,
        }
    }

    /// Borrows the stat snapshot, if that's what this payload is.
    #[must_use]
    pub const fn as_stats(&self) -> Option<&StatsSnapshot> {
        match self {
            Self::StatsUpdated(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}
