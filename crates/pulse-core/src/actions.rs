// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Named orchestration helpers: the one-call entry points for multi-step
//! domain actions.
//!
//! Every helper follows the same shape: open a transaction, validate
//! preconditions against the current world before touching anything, apply
//! the domain mutations through the world's own methods, stage one payload
//! per sequence step, and commit. Any failure before commit rolls the
//! transaction back, so listeners observe either the full ordered burst or a
//! single rollback notification — never a partial one.
//!
//! The helpers never mutate domain state directly; [`crate::world`] owns its
//! own invariants (resource clamping, chaos bounds, complementary balance).

use serde::Serialize;
use tracing::debug;

use crate::bus::EventBus;
use crate::constants::{
    INTERACT_BALANCE_DIVISOR, INTERACT_CHAOS_REDUCTION, INTERACT_ENERGY_COST,
    INTERACT_EVOLUTION_REWARD, MOVE_MOVEMENT_COST, SENSE_ENERGY_COST, STABILIZE_BALANCE_DIVISOR,
    STABILIZE_CHAOS_REDUCTION, STABILIZE_ENERGY_COST,
};
use crate::payload::{
    ActionKind, ActionReport, BalanceChange, ChaosChange, EventPayload, ResourceChange,
    TileMutation, TileReveal, TurnInfo, TurnPhase,
};
use crate::registry::{
    PLAYER_ACTION_INTERACT, PLAYER_ACTION_MOVE, PLAYER_ACTION_SENSE, PLAYER_ACTION_STABILIZE,
    PLAYER_ENERGY_CHANGED, PLAYER_EVOLUTION_CHANGED, PLAYER_MOVEMENT_CHANGED, PLAYER_STATS_UPDATED,
    SYSTEM_BALANCE_CHANGED, SYSTEM_TURN_ENDED, SYSTEM_TURN_STARTED, TILE_CHAOS_CHANGED,
    TILE_EXPLORED, TILE_TYPE_CHANGED,
};
use crate::txn::{
    TransactionCoordinator, TxnError, TxnId, TXN_ENERGY_CHANGE, TXN_EVOLUTION_CHANGE,
    TXN_INTERACT, TXN_MOVE, TXN_MOVEMENT_CHANGE, TXN_SENSE, TXN_STABILIZE, TXN_TURN_ADVANCE,
};
use crate::world::{CellKind, ResourceError, ResourceKind, World};

/// Failure of a named orchestration helper.
///
/// Precondition faults are raised before any mutation or staging, so a
/// failed helper leaves the world exactly as it found it.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ActionError {
    /// A resource check failed. The message shape is the UI contract:
    /// `Not enough energy: have 3, need 5`.
    #[error(transparent)]
    Resource(#[from] ResourceError),
    /// The target coordinates fall outside the grid.
    #[error("no cell at row {row}, col {col}")]
    OutOfBounds {
        /// Requested row.
        row: usize,
        /// Requested column.
        col: usize,
    },
    /// The target cell is impassable.
    #[error("cell at row {row}, col {col} is blocked")]
    Blocked {
        /// Target row.
        row: usize,
        /// Target column.
        col: usize,
    },
    /// The action requires a revealed cell.
    #[error("cell at row {row}, col {col} is unexplored")]
    Unexplored {
        /// Target row.
        row: usize,
        /// Target column.
        col: usize,
    },
    /// The coordinator rejected a transaction operation.
    #[error(transparent)]
    Txn(#[from] TxnError),
}

/// Result of a successful [`move_player`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveOutcome {
    /// Transaction that carried the emissions.
    pub txn: TxnId,
    /// Row the player now occupies.
    pub row: usize,
    /// Column the player now occupies.
    pub col: usize,
    /// Movement points before the step.
    pub movement_old: i64,
    /// Movement points after the step.
    pub movement_new: i64,
}

/// Result of a successful [`sense_tile`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SenseOutcome {
    /// Transaction that carried the emissions.
    pub txn: TxnId,
    /// Sensed row.
    pub row: usize,
    /// Sensed column.
    pub col: usize,
    /// Cell type revealed.
    pub kind: CellKind,
    /// Cell chaos at reveal time.
    pub chaos: f64,
    /// `true` when this sense revealed the cell for the first time.
    pub newly_explored: bool,
    /// Energy before the sense.
    pub energy_old: i64,
    /// Energy after the sense.
    pub energy_new: i64,
}

/// Result of a successful [`interact_tile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InteractOutcome {
    /// Transaction that carried the emissions.
    pub txn: TxnId,
    /// Worked row.
    pub row: usize,
    /// Worked column.
    pub col: usize,
    /// `(old, new)` cell type when the interaction mutated it.
    pub kind_change: Option<(CellKind, CellKind)>,
    /// Evolution points before the award.
    pub evolution_old: i64,
    /// Evolution points after the award.
    pub evolution_new: i64,
    /// Energy before the interaction.
    pub energy_old: i64,
    /// Energy after the interaction.
    pub energy_new: i64,
}

/// Result of a successful [`stabilize_tile`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StabilizeOutcome {
    /// Transaction that carried the emissions.
    pub txn: TxnId,
    /// Stabilized row.
    pub row: usize,
    /// Stabilized column.
    pub col: usize,
    /// Cell chaos before the action.
    pub cell_old_chaos: f64,
    /// Cell chaos after the action.
    pub cell_new_chaos: f64,
    /// World chaos after the scaled balance shift.
    pub world_chaos: f64,
    /// Signed world chaos shift (cell delta over the stabilize divisor).
    pub balance_delta: f64,
    /// Energy before the action.
    pub energy_old: i64,
    /// Energy after the action.
    pub energy_new: i64,
}

/// Result of a successful [`change_resource`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceOutcome {
    /// Transaction that carried the emissions.
    pub txn: TxnId,
    /// Resource that moved.
    pub resource: ResourceKind,
    /// Value before the change.
    pub old_value: i64,
    /// Value after the change (clamped at capacity for gains).
    pub new_value: i64,
    /// Actual signed change, after clamping.
    pub delta: i64,
}

/// Result of a successful [`advance_turn`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    /// Transaction that carried the emissions.
    pub txn: TxnId,
    /// Turn that just ended.
    pub ended: u32,
    /// Turn that just started.
    pub started: u32,
    /// World chaos after the turn-boundary recompute.
    pub world_chaos: f64,
}

/// Transaction kind for a standalone change of `resource`.
#[must_use]
const fn change_kind(resource: ResourceKind) -> &'static str {
    match resource {
        ResourceKind::Energy => TXN_ENERGY_CHANGE,
        ResourceKind::Movement => TXN_MOVEMENT_CHANGE,
        ResourceKind::Evolution => TXN_EVOLUTION_CHANGE,
    }
}

/// Standardized resource-changed event name for `resource`.
#[must_use]
const fn resource_event(resource: ResourceKind) -> &'static str {
    match resource {
        ResourceKind::Energy => PLAYER_ENERGY_CHANGED,
        ResourceKind::Movement => PLAYER_MOVEMENT_CHANGED,
        ResourceKind::Evolution => PLAYER_EVOLUTION_CHANGED,
    }
}

/// Runs `body` inside a fresh transaction of `kind`: commit on `Ok`,
/// rollback with the error as the reason on `Err`.
///
/// `initial` is the pre-action snapshot stored on the record, readable
/// through [`crate::txn::Transaction::initial`] until release.
fn transacted<T>(
    coord: &mut TransactionCoordinator,
    bus: &mut EventBus,
    kind: &str,
    initial: EventPayload,
    body: impl FnOnce(&mut TransactionCoordinator, TxnId) -> Result<T, ActionError>,
) -> Result<(TxnId, T), ActionError> {
    let txn = coord.begin_with(kind, initial);
    match body(coord, txn) {
        Ok(value) => {
            coord.commit(txn, bus)?;
            Ok((txn, value))
        }
        Err(err) => {
            debug!(txn = %txn, kind, %err, "action failed, rolling back");
            // The transaction is pending by construction; absorb the
            // rollback result so the original fault is what surfaces.
            let _ = coord.rollback(txn, bus, &err.to_string());
            Err(err)
        }
    }
}

/// Steps the player to `(row, col)`, spending movement points.
///
/// Emits the `move` sequence: action completion, movement change, stats.
///
/// # Errors
/// [`ActionError::OutOfBounds`] or [`ActionError::Blocked`] for a bad
/// target; [`ActionError::Resource`] when movement points are short. No
/// mutation occurs on any error path.
pub fn move_player(
    coord: &mut TransactionCoordinator,
    bus: &mut EventBus,
    world: &mut World,
    row: usize,
    col: usize,
) -> Result<MoveOutcome, ActionError> {
    let initial = EventPayload::StatsUpdated(world.player.stats_snapshot());
    let (txn, (old, new)) = transacted(coord, bus, TXN_MOVE, initial, |coord, txn| {
        let cell = world
            .grid
            .cell(row, col)
            .ok_or(ActionError::OutOfBounds { row, col })?;
        if cell.kind == CellKind::Blocked {
            return Err(ActionError::Blocked { row, col });
        }
        let (old, new) = world.player.spend(ResourceKind::Movement, MOVE_MOVEMENT_COST)?;
        world.player.step_to(row, col);

        coord.record(
            txn,
            PLAYER_ACTION_MOVE,
            EventPayload::ActionCompleted(ActionReport {
                action: ActionKind::Move,
                row,
                col,
                cost: MOVE_MOVEMENT_COST,
            }),
        )?;
        coord.record(
            txn,
            PLAYER_MOVEMENT_CHANGED,
            EventPayload::ResourceChanged(ResourceChange::new(
                ResourceKind::Movement,
                old,
                new,
                "move",
            )),
        )?;
        coord.record(
            txn,
            PLAYER_STATS_UPDATED,
            EventPayload::StatsUpdated(world.player.stats_snapshot()),
        )?;
        Ok((old, new))
    })?;

    Ok(MoveOutcome {
        txn,
        row,
        col,
        movement_old: old,
        movement_new: new,
    })
}

/// Reveals the cell at `(row, col)`, spending energy.
///
/// Emits the `sense` sequence: tile reveal, action completion, energy
/// change, stats. Re-sensing an already-explored cell is allowed and
/// re-emits the reveal with current cell state.
///
/// # Errors
/// [`ActionError::OutOfBounds`] or [`ActionError::Resource`]; no mutation
/// occurs on either.
pub fn sense_tile(
    coord: &mut TransactionCoordinator,
    bus: &mut EventBus,
    world: &mut World,
    row: usize,
    col: usize,
) -> Result<SenseOutcome, ActionError> {
    let initial = EventPayload::StatsUpdated(world.player.stats_snapshot());
    let (txn, outcome) = transacted(coord, bus, TXN_SENSE, initial, |coord, txn| {
        let cell = world
            .grid
            .cell(row, col)
            .ok_or(ActionError::OutOfBounds { row, col })?;
        let newly_explored = !cell.explored;
        let (old, new) = world.player.spend(ResourceKind::Energy, SENSE_ENERGY_COST)?;
        let cell = world
            .grid
            .cell_mut(row, col)
            .ok_or(ActionError::OutOfBounds { row, col })?;
        cell.explored = true;
        let (kind, chaos) = (cell.kind, cell.chaos);
        if newly_explored {
            world.player.note_explored();
        }

        coord.record(
            txn,
            TILE_EXPLORED,
            EventPayload::TileExplored(TileReveal {
                row,
                col,
                kind,
                chaos,
            }),
        )?;
        coord.record(
            txn,
            PLAYER_ACTION_SENSE,
            EventPayload::ActionCompleted(ActionReport {
                action: ActionKind::Sense,
                row,
                col,
                cost: SENSE_ENERGY_COST,
            }),
        )?;
        coord.record(
            txn,
            PLAYER_ENERGY_CHANGED,
            EventPayload::ResourceChanged(ResourceChange::new(
                ResourceKind::Energy,
                old,
                new,
                "sense",
            )),
        )?;
        coord.record(
            txn,
            PLAYER_STATS_UPDATED,
            EventPayload::StatsUpdated(world.player.stats_snapshot()),
        )?;
        Ok((kind, chaos, newly_explored, old, new))
    })?;

    let (kind, chaos, newly_explored, energy_old, energy_new) = outcome;
    Ok(SenseOutcome {
        txn,
        row,
        col,
        kind,
        chaos,
        newly_explored,
        energy_old,
        energy_new,
    })
}

/// Cell type produced by working a cell, when the interaction mutates it.
///
/// Chaotic cells are tamed to normal; normal cells are refined to ordered;
/// ordered cells are worked without a type change.
const fn interact_transition(kind: CellKind) -> Option<CellKind> {
    match kind {
        CellKind::Chaotic => Some(CellKind::Normal),
        CellKind::Normal => Some(CellKind::Ordered),
        CellKind::Ordered | CellKind::Blocked => None,
    }
}

/// Works the explored cell at `(row, col)`: spends energy, may mutate the
/// cell type, and awards evolution points.
///
/// A type mutation also bleeds some chaos out of the cell and shifts the
/// world balance by the cell delta scaled down through the interact divisor.
/// Emits the `interact` sequence; the type-change step is skipped when the
/// cell type did not change.
///
/// # Errors
/// [`ActionError::OutOfBounds`], [`ActionError::Blocked`],
/// [`ActionError::Unexplored`], or [`ActionError::Resource`]; no mutation
/// occurs on any of them.
pub fn interact_tile(
    coord: &mut TransactionCoordinator,
    bus: &mut EventBus,
    world: &mut World,
    row: usize,
    col: usize,
) -> Result<InteractOutcome, ActionError> {
    let initial = EventPayload::StatsUpdated(world.player.stats_snapshot());
    let (txn, outcome) = transacted(coord, bus, TXN_INTERACT, initial, |coord, txn| {
        let cell = world
            .grid
            .cell(row, col)
            .ok_or(ActionError::OutOfBounds { row, col })?;
        if cell.kind == CellKind::Blocked {
            return Err(ActionError::Blocked { row, col });
        }
        if !cell.explored {
            return Err(ActionError::Unexplored { row, col });
        }
        let (energy_old, energy_new) =
            world.player.spend(ResourceKind::Energy, INTERACT_ENERGY_COST)?;

        let cell = world
            .grid
            .cell_mut(row, col)
            .ok_or(ActionError::OutOfBounds { row, col })?;
        let old_kind = cell.kind;
        let kind_change = interact_transition(old_kind).map(|new_kind| {
            cell.kind = new_kind;
            let (_, _) = cell.shift_chaos(-INTERACT_CHAOS_REDUCTION);
            (old_kind, new_kind)
        });
        if kind_change.is_some() {
            // The grid shift already clamped; the balance takes the scaled
            // nominal delta so repeated taming keeps nudging order upward.
            world
                .balance
                .shift(-INTERACT_CHAOS_REDUCTION / INTERACT_BALANCE_DIVISOR);
        }
        // Awards clamp at capacity, so they cannot fail.
        let (evolution_old, evolution_new) = world
            .player
            .adjust(ResourceKind::Evolution, INTERACT_EVOLUTION_REWARD)?;

        if let Some((old_kind, new_kind)) = kind_change {
            coord.record(
                txn,
                TILE_TYPE_CHANGED,
                EventPayload::TileTypeChanged(TileMutation {
                    row,
                    col,
                    old_kind,
                    new_kind,
                }),
            )?;
        }
        coord.record(
            txn,
            PLAYER_ACTION_INTERACT,
            EventPayload::ActionCompleted(ActionReport {
                action: ActionKind::Interact,
                row,
                col,
                cost: INTERACT_ENERGY_COST,
            }),
        )?;
        coord.record(
            txn,
            PLAYER_ENERGY_CHANGED,
            EventPayload::ResourceChanged(ResourceChange::new(
                ResourceKind::Energy,
                energy_old,
                energy_new,
                "interact",
            )),
        )?;
        coord.record(
            txn,
            PLAYER_EVOLUTION_CHANGED,
            EventPayload::ResourceChanged(ResourceChange::new(
                ResourceKind::Evolution,
                evolution_old,
                evolution_new,
                "interact",
            )),
        )?;
        coord.record(
            txn,
            PLAYER_STATS_UPDATED,
            EventPayload::StatsUpdated(world.player.stats_snapshot()),
        )?;
        Ok((kind_change, evolution_old, evolution_new, energy_old, energy_new))
    })?;

    let (kind_change, evolution_old, evolution_new, energy_old, energy_new) = outcome;
    Ok(InteractOutcome {
        txn,
        row,
        col,
        kind_change,
        evolution_old,
        evolution_new,
        energy_old,
        energy_new,
    })
}

/// Stabilizes the explored cell at `(row, col)`: spends energy, reduces the
/// cell's chaos, and shifts the world balance by the cell delta scaled down
/// through the stabilize divisor.
///
/// Emits the full `stabilize` sequence; the designated aggregate events
/// (`player:action:completed:stabilize`, `player:stats:updated`) carry the
/// merged cell/world chaos view assembled at commit.
///
/// # Errors
/// [`ActionError::OutOfBounds`], [`ActionError::Unexplored`], or
/// [`ActionError::Resource`]; no mutation occurs on any of them.
pub fn stabilize_tile(
    coord: &mut TransactionCoordinator,
    bus: &mut EventBus,
    world: &mut World,
    row: usize,
    col: usize,
) -> Result<StabilizeOutcome, ActionError> {
    let initial = EventPayload::StatsUpdated(world.player.stats_snapshot());
    let (txn, outcome) = transacted(coord, bus, TXN_STABILIZE, initial, |coord, txn| {
        let cell = world
            .grid
            .cell(row, col)
            .ok_or(ActionError::OutOfBounds { row, col })?;
        if !cell.explored {
            return Err(ActionError::Unexplored { row, col });
        }
        let (energy_old, energy_new) =
            world.player.spend(ResourceKind::Energy, STABILIZE_ENERGY_COST)?;

        let cell = world
            .grid
            .cell_mut(row, col)
            .ok_or(ActionError::OutOfBounds { row, col })?;
        let (cell_old, cell_new) = cell.shift_chaos(-STABILIZE_CHAOS_REDUCTION);
        let cell_delta = cell_new - cell_old;
        let balance_delta = cell_delta / STABILIZE_BALANCE_DIVISOR;
        let (_, world_chaos) = world.balance.shift(balance_delta);

        coord.record(
            txn,
            TILE_CHAOS_CHANGED,
            EventPayload::ChaosChanged(ChaosChange::new(row, col, cell_old, cell_new)),
        )?;
        coord.record(
            txn,
            SYSTEM_BALANCE_CHANGED,
            EventPayload::BalanceChanged(BalanceChange::new(world_chaos, balance_delta)),
        )?;
        coord.record(
            txn,
            PLAYER_ACTION_STABILIZE,
            EventPayload::ActionCompleted(ActionReport {
                action: ActionKind::Stabilize,
                row,
                col,
                cost: STABILIZE_ENERGY_COST,
            }),
        )?;
        coord.record(
            txn,
            PLAYER_ENERGY_CHANGED,
            EventPayload::ResourceChanged(ResourceChange::new(
                ResourceKind::Energy,
                energy_old,
                energy_new,
                "stabilize",
            )),
        )?;
        coord.record(
            txn,
            PLAYER_STATS_UPDATED,
            EventPayload::StatsUpdated(world.player.stats_snapshot()),
        )?;
        Ok((cell_old, cell_new, world_chaos, balance_delta, energy_old, energy_new))
    })?;

    let (cell_old_chaos, cell_new_chaos, world_chaos, balance_delta, energy_old, energy_new) =
        outcome;
    Ok(StabilizeOutcome {
        txn,
        row,
        col,
        cell_old_chaos,
        cell_new_chaos,
        world_chaos,
        balance_delta,
        energy_old,
        energy_new,
    })
}

/// Applies a signed change to one player resource.
///
/// Gains clamp at the resource's capacity; a spend that would go below zero
/// is rejected before any mutation with the canonical shortfall message.
/// Emits the `<resource>:change` sequence: resource change, then stats.
///
/// # Errors
/// [`ActionError::Resource`] on a shortfall. Nothing is mutated, no
/// sequence event fires; the rolled-back transaction emits only its single
/// rollback notification.
pub fn change_resource(
    coord: &mut TransactionCoordinator,
    bus: &mut EventBus,
    world: &mut World,
    resource: ResourceKind,
    amount: i64,
    reason: &str,
) -> Result<ResourceOutcome, ActionError> {
    let initial = EventPayload::StatsUpdated(world.player.stats_snapshot());
    let (txn, (old, new)) = transacted(coord, bus, change_kind(resource), initial, |coord, txn| {
        let (old, new) = world.player.adjust(resource, amount)?;
        coord.record(
            txn,
            resource_event(resource),
            EventPayload::ResourceChanged(ResourceChange::new(resource, old, new, reason)),
        )?;
        coord.record(
            txn,
            PLAYER_STATS_UPDATED,
            EventPayload::StatsUpdated(world.player.stats_snapshot()),
        )?;
        Ok((old, new))
    })?;

    Ok(ResourceOutcome {
        txn,
        resource,
        old_value: old,
        new_value: new,
        delta: new - old,
    })
}

/// Ends the current turn and starts the next.
///
/// Player upkeep runs (movement refills) and the world balance is recomputed
/// from the grid's mean chaos. Emits the `turn:advance` sequence: turn
/// ended, balance, turn started.
///
/// # Errors
/// Only [`ActionError::Txn`] faults surface here; the turn mutation itself
/// cannot fail.
pub fn advance_turn(
    coord: &mut TransactionCoordinator,
    bus: &mut EventBus,
    world: &mut World,
) -> Result<TurnOutcome, ActionError> {
    let initial = EventPayload::StatsUpdated(world.player.stats_snapshot());
    let (txn, (ended, started, world_chaos)) =
        transacted(coord, bus, TXN_TURN_ADVANCE, initial, |coord, txn| {
            let chaos_before = world.balance.chaos();
            let (ended, started) = world.next_turn();
            let world_chaos = world.balance.chaos();

            coord.record(
                txn,
                SYSTEM_TURN_ENDED,
                EventPayload::TurnChanged(TurnInfo {
                    number: ended,
                    phase: TurnPhase::Ended,
                }),
            )?;
            coord.record(
                txn,
                SYSTEM_BALANCE_CHANGED,
                EventPayload::BalanceChanged(BalanceChange::new(
                    world_chaos,
                    world_chaos - chaos_before,
                )),
            )?;
            coord.record(
                txn,
                SYSTEM_TURN_STARTED,
                EventPayload::TurnChanged(TurnInfo {
                    number: started,
                    phase: TurnPhase::Started,
                }),
            )?;
            Ok((ended, started, world_chaos))
        })?;

    Ok(TurnOutcome {
        txn,
        ended,
        started,
        world_chaos,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::bus::ListenerError;
    use crate::constants::DEFAULT_CELL_CHAOS;
    use crate::event::Event;

    fn explored_world() -> World {
        let mut world = World::new(3, 3);
        for row in 0..3 {
            for col in 0..3 {
                if let Some(cell) = world.grid.cell_mut(row, col) {
                    cell.explored = true;
                }
            }
        }
        world
    }

    fn name_log(bus: &mut EventBus, names: &[&str]) -> Rc<RefCell<Vec<String>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        for name in names {
            let log = Rc::clone(&log);
            bus.register(name, move |_bus: &mut EventBus, event: &Event| {
                log.borrow_mut().push(event.name.to_string());
                Ok::<(), ListenerError>(())
            });
        }
        log
    }

    #[test]
    fn move_spends_movement_and_updates_position() {
        let mut coord = TransactionCoordinator::new();
        let mut bus = EventBus::new();
        let mut world = World::new(3, 3);
        let log = name_log(
            &mut bus,
            &[PLAYER_ACTION_MOVE, PLAYER_MOVEMENT_CHANGED, PLAYER_STATS_UPDATED],
        );

        let outcome = move_player(&mut coord, &mut bus, &mut world, 1, 2).expect("move");
        assert_eq!((outcome.row, outcome.col), (1, 2));
        assert_eq!(outcome.movement_new, outcome.movement_old - MOVE_MOVEMENT_COST);
        // The pre-action snapshot stays readable on the closed record.
        let record = coord.transaction(outcome.txn).expect("record");
        let before = record.initial().and_then(EventPayload::as_stats).expect("snapshot");
        assert_eq!(before.movement, outcome.movement_old);
        assert_eq!((before.row, before.col), (0, 0));
        assert_eq!((world.player.row(), world.player.col()), (1, 2));
        assert_eq!(
            *log.borrow(),
            vec![
                PLAYER_ACTION_MOVE.to_owned(),
                PLAYER_MOVEMENT_CHANGED.to_owned(),
                PLAYER_STATS_UPDATED.to_owned()
            ]
        );
    }

    #[test]
    fn move_to_blocked_cell_fails_without_mutation() {
        let mut coord = TransactionCoordinator::new();
        let mut bus = EventBus::new();
        let mut world = World::new(3, 3);
        world.grid.cell_mut(1, 1).expect("cell").kind = CellKind::Blocked;
        let movement_before = world.player.resource(ResourceKind::Movement);

        let err = move_player(&mut coord, &mut bus, &mut world, 1, 1).expect_err("blocked");
        assert_eq!(err, ActionError::Blocked { row: 1, col: 1 });
        assert_eq!(world.player.resource(ResourceKind::Movement), movement_before);
        assert_eq!((world.player.row(), world.player.col()), (0, 0));
        assert_eq!(coord.live_count(), 0, "rolled back and removed");
    }

    #[test]
    fn move_out_of_bounds_fails() {
        let mut coord = TransactionCoordinator::new();
        let mut bus = EventBus::new();
        let mut world = World::new(2, 2);
        let err = move_player(&mut coord, &mut bus, &mut world, 5, 0).expect_err("oob");
        assert_eq!(err, ActionError::OutOfBounds { row: 5, col: 0 });
    }

    #[test]
    fn sense_marks_explored_once() {
        let mut coord = TransactionCoordinator::new();
        let mut bus = EventBus::new();
        let mut world = World::new(2, 2);

        let first = sense_tile(&mut coord, &mut bus, &mut world, 0, 1).expect("sense");
        assert!(first.newly_explored);
        assert_eq!(first.kind, CellKind::Normal);
        assert_eq!(first.chaos, DEFAULT_CELL_CHAOS);
        assert_eq!(world.player.stats_snapshot().tiles_explored, 1);

        let again = sense_tile(&mut coord, &mut bus, &mut world, 0, 1).expect("re-sense");
        assert!(!again.newly_explored);
        assert_eq!(world.player.stats_snapshot().tiles_explored, 1);
    }

    #[test]
    fn interact_tames_chaotic_cells_and_awards_evolution() {
        let mut coord = TransactionCoordinator::new();
        let mut bus = EventBus::new();
        let mut world = explored_world();
        world.grid.cell_mut(0, 0).expect("cell").kind = CellKind::Chaotic;
        let log = name_log(&mut bus, &[TILE_TYPE_CHANGED]);

        let outcome = interact_tile(&mut coord, &mut bus, &mut world, 0, 0).expect("interact");
        assert_eq!(outcome.kind_change, Some((CellKind::Chaotic, CellKind::Normal)));
        assert_eq!(outcome.evolution_new, INTERACT_EVOLUTION_REWARD);
        assert_eq!(world.grid.cell(0, 0).expect("cell").kind, CellKind::Normal);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn interact_on_ordered_cell_skips_the_type_change_event() {
        let mut coord = TransactionCoordinator::new();
        let mut bus = EventBus::new();
        let mut world = explored_world();
        world.grid.cell_mut(0, 0).expect("cell").kind = CellKind::Ordered;
        let log = name_log(&mut bus, &[TILE_TYPE_CHANGED, PLAYER_ACTION_INTERACT]);

        let outcome = interact_tile(&mut coord, &mut bus, &mut world, 0, 0).expect("interact");
        assert!(outcome.kind_change.is_none());
        assert_eq!(*log.borrow(), vec![PLAYER_ACTION_INTERACT.to_owned()]);
    }

    #[test]
    fn interact_requires_an_explored_cell() {
        let mut coord = TransactionCoordinator::new();
        let mut bus = EventBus::new();
        let mut world = World::new(2, 2);
        let err = interact_tile(&mut coord, &mut bus, &mut world, 0, 0).expect_err("hidden");
        assert_eq!(err, ActionError::Unexplored { row: 0, col: 0 });
    }

    #[test]
    fn stabilize_scales_the_cell_delta_into_the_balance() {
        let mut coord = TransactionCoordinator::new();
        let mut bus = EventBus::new();
        let mut world = explored_world();

        let outcome = stabilize_tile(&mut coord, &mut bus, &mut world, 1, 1).expect("stabilize");
        assert!((outcome.cell_old_chaos - 0.5).abs() < 1e-9);
        assert!((outcome.cell_new_chaos - 0.3).abs() < 1e-9);
        // Cell delta -0.2 over divisor 10.0.
        assert!((outcome.balance_delta - (-0.02)).abs() < 1e-9);
        assert!((world.balance.chaos() - 0.48).abs() < 1e-9);
        assert_eq!(
            outcome.energy_old - outcome.energy_new,
            STABILIZE_ENERGY_COST
        );
    }

    #[test]
    fn failed_action_surfaces_the_resource_message_verbatim() {
        let mut coord = TransactionCoordinator::new();
        let mut bus = EventBus::new();
        let mut world = explored_world();
        world.player.set_resource(ResourceKind::Energy, 1, 20);

        let err = stabilize_tile(&mut coord, &mut bus, &mut world, 0, 0).expect_err("short");
        assert_eq!(err.to_string(), "Not enough energy: have 1, need 2");
        assert_eq!(world.player.resource(ResourceKind::Energy), 1);
    }

    #[test]
    fn advance_turn_recomputes_balance_from_the_grid() {
        let mut coord = TransactionCoordinator::new();
        let mut bus = EventBus::new();
        let mut world = World::new(1, 2);
        world.grid.cell_mut(0, 0).expect("cell").chaos = 0.1;
        world
            .player
            .spend(ResourceKind::Movement, 2)
            .expect("spend");

        let outcome = advance_turn(&mut coord, &mut bus, &mut world).expect("turn");
        assert_eq!((outcome.ended, outcome.started), (1, 2));
        // Mean of [0.1, 0.5].
        assert!((outcome.world_chaos - 0.3).abs() < 1e-9);
        assert_eq!(
            world.player.resource(ResourceKind::Movement),
            world.player.resource_max(ResourceKind::Movement)
        );
    }
}
