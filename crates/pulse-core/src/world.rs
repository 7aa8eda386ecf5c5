// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Minimal domain state the orchestration helpers mutate.
//!
//! The world is deliberately small: player resources and position, a
//! row-major hex grid, and the global chaos/order balance. Rendering, input,
//! and persistence live elsewhere.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CELL_CHAOS, DEFAULT_ENERGY_MAX, DEFAULT_EVOLUTION_MAX, DEFAULT_MOVEMENT_MAX,
};
use crate::payload::StatsSnapshot;

/// Spendable player resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Fuel for sense, interact, and stabilize actions.
    Energy,
    /// Per-turn step allowance.
    Movement,
    /// Long-term progression currency.
    Evolution,
}

impl ResourceKind {
    /// Lowercase name used in messages, reasons, and transaction kinds.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Energy => "energy",
            Self::Movement => "movement",
            Self::Evolution => "evolution",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a spend would take a resource below zero.
///
/// The message shape is part of the public contract; UI layers show it
/// verbatim.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ResourceError {
    /// The player lacks the points to cover the spend.
    #[error("Not enough {resource}: have {have}, need {need}")]
    Insufficient {
        /// Resource that fell short.
        resource: ResourceKind,
        /// Points currently held.
        have: i64,
        /// Points the spend required.
        need: i64,
    },
}

/// Player position, resources, traits, and lifetime counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    row: usize,
    col: usize,
    energy: i64,
    energy_max: i64,
    movement: i64,
    movement_max: i64,
    evolution: i64,
    evolution_max: i64,
    traits: Vec<Box<str>>,
    moves_made: u32,
    tiles_explored: u32,
    turns_taken: u32,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            row: 0,
            col: 0,
            energy: DEFAULT_ENERGY_MAX,
            energy_max: DEFAULT_ENERGY_MAX,
            movement: DEFAULT_MOVEMENT_MAX,
            movement_max: DEFAULT_MOVEMENT_MAX,
            evolution: 0,
            evolution_max: DEFAULT_EVOLUTION_MAX,
            traits: Vec::new(),
            moves_made: 0,
            tiles_explored: 0,
            turns_taken: 0,
        }
    }
}

impl PlayerState {
    /// Fresh player at the origin with full energy and movement.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current row.
    #[must_use]
    pub const fn row(&self) -> usize {
        self.row
    }

    /// Current column.
    #[must_use]
    pub const fn col(&self) -> usize {
        self.col
    }

    /// Current value of one resource.
    #[must_use]
    pub const fn resource(&self, kind: ResourceKind) -> i64 {
        match kind {
            ResourceKind::Energy => self.energy,
            ResourceKind::Movement => self.movement,
            ResourceKind::Evolution => self.evolution,
        }
    }

    /// Capacity of one resource.
    #[must_use]
    pub const fn resource_max(&self, kind: ResourceKind) -> i64 {
        match kind {
            ResourceKind::Energy => self.energy_max,
            ResourceKind::Movement => self.movement_max,
            ResourceKind::Evolution => self.evolution_max,
        }
    }

    /// Overrides a resource value and capacity. Fixture seam.
    pub fn set_resource(&mut self, kind: ResourceKind, value: i64, max: i64) {
        let slot = match kind {
            ResourceKind::Energy => (&mut self.energy, &mut self.energy_max),
            ResourceKind::Movement => (&mut self.movement, &mut self.movement_max),
            ResourceKind::Evolution => (&mut self.evolution, &mut self.evolution_max),
        };
        *slot.1 = max;
        *slot.0 = value.clamp(0, max);
    }

    /// Applies a signed resource change.
    ///
    /// Gains clamp at capacity. A spend that would go below zero is rejected
    /// before any mutation, with the canonical shortfall message.
    ///
    /// Returns `(old, new)` on success.
    ///
    /// # Errors
    /// [`ResourceError::Insufficient`] when `amount` is negative and exceeds
    /// the current value.
    pub fn adjust(&mut self, kind: ResourceKind, amount: i64) -> Result<(i64, i64), ResourceError> {
        let old = self.resource(kind);
        if amount < 0 && old + amount < 0 {
            return Err(ResourceError::Insufficient {
                resource: kind,
                have: old,
                need: -amount,
            });
        }
        let new = (old + amount).clamp(0, self.resource_max(kind));
        match kind {
            ResourceKind::Energy => self.energy = new,
            ResourceKind::Movement => self.movement = new,
            ResourceKind::Evolution => self.evolution = new,
        }
        Ok((old, new))
    }

    /// Spends `cost` points. Sugar over a negative [`PlayerState::adjust`].
    ///
    /// # Errors
    /// [`ResourceError::Insufficient`] when the player cannot cover the cost.
    pub fn spend(&mut self, kind: ResourceKind, cost: i64) -> Result<(i64, i64), ResourceError> {
        self.adjust(kind, -cost)
    }

    /// Moves the player and bumps the lifetime move counter.
    pub fn step_to(&mut self, row: usize, col: usize) {
        self.row = row;
        self.col = col;
        self.moves_made += 1;
    }

    /// Bumps the lifetime explored-tile counter.
    pub fn note_explored(&mut self) {
        self.tiles_explored += 1;
    }

    /// Records a gained trait.
    pub fn add_trait(&mut self, name: &str) {
        self.traits.push(Box::from(name));
    }

    /// Acquired trait names, in gain order.
    #[must_use]
    pub fn traits(&self) -> &[Box<str>] {
        &self.traits
    }

    /// Turn upkeep: refills movement and bumps the turn counter.
    fn begin_turn(&mut self) {
        self.movement = self.movement_max;
        self.turns_taken += 1;
    }

    /// Full stat block, the payload of `player:stats:updated`.
    #[must_use]
    pub fn stats_snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            energy: self.energy,
            energy_max: self.energy_max,
            movement: self.movement,
            movement_max: self.movement_max,
            evolution: self.evolution,
            evolution_max: self.evolution_max,
            row: self.row,
            col: self.col,
            traits: self.traits.clone(),
            moves_made: self.moves_made,
            tiles_explored: self.tiles_explored,
            turns_taken: self.turns_taken,
        }
    }
}

/// Cell types on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    /// Ordinary terrain.
    Normal,
    /// High-chaos terrain; interaction can tame it.
    Chaotic,
    /// Low-chaos terrain.
    Ordered,
    /// Impassable.
    Blocked,
}

impl CellKind {
    /// Lowercase name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Chaotic => "chaotic",
            Self::Ordered => "ordered",
            Self::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for CellKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One hex cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    /// Row of this cell.
    pub row: usize,
    /// Column of this cell.
    pub col: usize,
    /// Terrain type.
    pub kind: CellKind,
    /// Chaos level in `0.0..=1.0`.
    pub chaos: f64,
    /// Whether the player has revealed this cell.
    pub explored: bool,
}

impl GridCell {
    /// Shifts the cell's chaos by `delta`, clamping to `0.0..=1.0`.
    ///
    /// Returns `(old, new)`.
    pub fn shift_chaos(&mut self, delta: f64) -> (f64, f64) {
        let old = self.chaos;
        self.chaos = (old + delta).clamp(0.0, 1.0);
        (old, self.chaos)
    }
}

/// Row-major hex grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HexGrid {
    rows: usize,
    cols: usize,
    cells: Vec<GridCell>,
}

impl HexGrid {
    /// Builds a `rows × cols` grid of normal, unexplored cells at the
    /// default chaos level.
    #[must_use]
    pub fn new(rows: usize, cols: usize) -> Self {
        let mut cells = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                cells.push(GridCell {
                    row,
                    col,
                    kind: CellKind::Normal,
                    chaos: DEFAULT_CELL_CHAOS,
                    explored: false,
                });
            }
        }
        Self { rows, cols, cells }
    }

    /// Row count.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Column count.
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Returns `true` when the coordinates fall inside the grid.
    #[must_use]
    pub const fn in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }

    /// Borrows a cell; out-of-bounds coordinates yield `None`.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&GridCell> {
        if self.in_bounds(row, col) {
            self.cells.get(row * self.cols + col)
        } else {
            None
        }
    }

    /// Mutably borrows a cell; out-of-bounds coordinates yield `None`.
    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut GridCell> {
        if self.in_bounds(row, col) {
            self.cells.get_mut(row * self.cols + col)
        } else {
            None
        }
    }

    /// Iterates cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &GridCell> {
        self.cells.iter()
    }

    /// Mean chaos across all cells; `0.0` for an empty grid.
    #[must_use]
    pub fn mean_chaos(&self) -> f64 {
        if self.cells.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = self.cells.len() as f64;
        self.cells.iter().map(|c| c.chaos).sum::<f64>() / count
    }
}

/// Global chaos/order balance. `order` is always `1.0 - chaos`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBalance {
    chaos: f64,
    order: f64,
}

impl WorldBalance {
    /// Builds a balance at the given chaos level, clamped to `0.0..=1.0`.
    #[must_use]
    pub fn new(chaos: f64) -> Self {
        let chaos = chaos.clamp(0.0, 1.0);
        Self {
            chaos,
            order: 1.0 - chaos,
        }
    }

    /// Current chaos level.
    #[must_use]
    pub const fn chaos(&self) -> f64 {
        self.chaos
    }

    /// Current order level.
    #[must_use]
    pub const fn order(&self) -> f64 {
        self.order
    }

    /// Shifts chaos by `delta`, clamping and keeping order complementary.
    ///
    /// Returns `(old_chaos, new_chaos)`.
    pub fn shift(&mut self, delta: f64) -> (f64, f64) {
        let old = self.chaos;
        self.chaos = (old + delta).clamp(0.0, 1.0);
        self.order = 1.0 - self.chaos;
        (old, self.chaos)
    }

    /// Replaces the chaos level outright, clamping as in [`WorldBalance::shift`].
    pub fn set_chaos(&mut self, chaos: f64) -> (f64, f64) {
        let old = self.chaos;
        self.chaos = chaos.clamp(0.0, 1.0);
        self.order = 1.0 - self.chaos;
        (old, self.chaos)
    }
}

impl Default for WorldBalance {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_CHAOS)
    }
}

/// The full mutable domain state handed to the orchestration helpers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    /// Player position, resources, and counters.
    pub player: PlayerState,
    /// The hex grid.
    pub grid: HexGrid,
    /// Global chaos/order balance.
    pub balance: WorldBalance,
    turn: u32,
}

impl World {
    /// Builds a world with a fresh player on a `rows × cols` grid, on turn 1.
    #[must_use]
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            player: PlayerState::new(),
            grid: HexGrid::new(rows, cols),
            balance: WorldBalance::default(),
            turn: 1,
        }
    }

    /// One-based current turn number.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    /// Advances to the next turn: player upkeep runs and the balance is
    /// recomputed from the grid.
    ///
    /// Returns `(ended_turn, started_turn)`.
    pub fn next_turn(&mut self) -> (u32, u32) {
        let ended = self.turn;
        self.turn += 1;
        self.player.begin_turn();
        self.balance.set_chaos(self.grid.mean_chaos());
        (ended, self.turn)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

    use super::*;

    #[test]
    fn adjust_rejects_overspend_before_mutating() {
        let mut player = PlayerState::new();
        player.set_resource(ResourceKind::Energy, 3, 20);
        let err = player.adjust(ResourceKind::Energy, -5).expect_err("shortfall");
        assert_eq!(
            err.to_string(),
            "Not enough energy: have 3, need 5"
        );
        assert_eq!(player.resource(ResourceKind::Energy), 3);
    }

    #[test]
    fn adjust_clamps_gain_at_capacity() {
        let mut player = PlayerState::new();
        player.set_resource(ResourceKind::Energy, 18, 20);
        let (old, new) = player.adjust(ResourceKind::Energy, 5).expect("gain");
        assert_eq!((old, new), (18, 20));
    }

    #[test]
    fn adjust_within_bounds_reports_old_and_new() {
        let mut player = PlayerState::new();
        player.set_resource(ResourceKind::Energy, 3, 20);
        let (old, new) = player.adjust(ResourceKind::Energy, 5).expect("gain");
        assert_eq!((old, new), (3, 8));
    }

    #[test]
    fn spend_is_negative_adjust() {
        let mut player = PlayerState::new();
        player.set_resource(ResourceKind::Movement, 2, 5);
        let (old, new) = player.spend(ResourceKind::Movement, 1).expect("spend");
        assert_eq!((old, new), (2, 1));
    }

    #[test]
    fn grid_bounds_and_indexing() {
        let grid = HexGrid::new(3, 4);
        assert!(grid.cell(2, 3).is_some());
        assert!(grid.cell(3, 0).is_none());
        assert!(grid.cell(0, 4).is_none());
        let cell = grid.cell(1, 2).expect("in bounds");
        assert_eq!((cell.row, cell.col), (1, 2));
        assert_eq!(cell.kind, CellKind::Normal);
        assert!(!cell.explored);
    }

    #[test]
    fn cell_chaos_shift_clamps() {
        let mut grid = HexGrid::new(1, 1);
        let cell = grid.cell_mut(0, 0).expect("cell");
        let (old, new) = cell.shift_chaos(-0.9);
        assert_eq!(old, DEFAULT_CELL_CHAOS);
        assert_eq!(new, 0.0);
        let (_, new) = cell.shift_chaos(2.0);
        assert_eq!(new, 1.0);
    }

    #[test]
    fn balance_shift_keeps_order_complementary() {
        let mut balance = WorldBalance::new(0.5);
        let (old, new) = balance.shift(-0.02);
        assert_eq!(old, 0.5);
        assert!((new - 0.48).abs() < 1e-9);
        assert!((balance.chaos() + balance.order() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn next_turn_refills_movement_and_recomputes_balance() {
        let mut world = World::new(2, 2);
        world
            .player
            .spend(ResourceKind::Movement, 3)
            .expect("spend");
        if let Some(cell) = world.grid.cell_mut(0, 0) {
            cell.shift_chaos(-0.4);
        }
        let (ended, started) = world.next_turn();
        assert_eq!((ended, started), (1, 2));
        assert_eq!(
            world.player.resource(ResourceKind::Movement),
            world.player.resource_max(ResourceKind::Movement)
        );
        // Mean of [0.1, 0.5, 0.5, 0.5].
        assert!((world.balance.chaos() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn stats_snapshot_mirrors_player() {
        let mut player = PlayerState::new();
        player.step_to(2, 1);
        player.add_trait("resilient");
        let stats = player.stats_snapshot();
        assert_eq!((stats.row, stats.col), (2, 1));
        assert_eq!(stats.moves_made, 1);
        assert_eq!(stats.traits.len(), 1);
        assert_eq!(stats.energy, DEFAULT_ENERGY_MAX);
    }
}
