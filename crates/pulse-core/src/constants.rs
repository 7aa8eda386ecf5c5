// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Tuning constants shared by the bus, the coordinator, and the action layer.

/// Separator that marks an event name as standardized.
///
/// Standardized names are hierarchical (`category:subject:verb`, optionally
/// deeper); legacy names are flat camelCase and never contain this character.
/// Classification happens once, when a name is interned into the
/// [`crate::topic::TopicTable`].
pub const STANDARD_NAME_SEPARATOR: char = ':';

/// Maximum number of deprecation warnings logged per legacy event type.
///
/// Occurrences beyond the cap still count toward the migration statistics;
/// only the log line is withheld.
pub const WARNING_CAP_PER_TYPE: u32 = 3;

/// Maximum number of deprecation warnings logged across all event types.
///
/// Crossing the cap logs a single suppression notice. Counters keep
/// incrementing unbounded so the stats surface stays truthful.
pub const WARNING_CAP_GLOBAL: u64 = 100;

/// Default grace period before a closed transaction record becomes
/// eligible for the advisory sweep, in milliseconds.
///
/// Owners are expected to call [`crate::txn::TransactionCoordinator::release`]
/// themselves; the sweep is a non-authoritative upper bound, not a timer.
pub const DEFAULT_RELEASE_GRACE_MS: u64 = 5_000;

/// Movement points spent by a single hex step.
pub const MOVE_MOVEMENT_COST: i64 = 1;

/// Energy spent by sensing an adjacent tile.
pub const SENSE_ENERGY_COST: i64 = 1;

/// Energy spent by interacting with a tile.
pub const INTERACT_ENERGY_COST: i64 = 2;

/// Energy spent by stabilizing a tile.
pub const STABILIZE_ENERGY_COST: i64 = 2;

/// Evolution points awarded for a successful tile interaction.
pub const INTERACT_EVOLUTION_REWARD: i64 = 2;

/// Chaos removed from a cell by one stabilize action, before clamping.
pub const STABILIZE_CHAOS_REDUCTION: f64 = 0.2;

/// Divisor translating a raw cell chaos delta into a world balance shift
/// for the stabilize action.
pub const STABILIZE_BALANCE_DIVISOR: f64 = 10.0;

/// Divisor translating a raw cell chaos delta into a world balance shift
/// for the interact action.
pub const INTERACT_BALANCE_DIVISOR: f64 = 20.0;

/// Chaos removed from a cell when an interaction mutates its type.
pub const INTERACT_CHAOS_REDUCTION: f64 = 0.1;

/// Default energy capacity for a fresh player.
pub const DEFAULT_ENERGY_MAX: i64 = 20;

/// Default movement-point capacity for a fresh player.
pub const DEFAULT_MOVEMENT_MAX: i64 = 5;

/// Default evolution-point capacity for a fresh player.
pub const DEFAULT_EVOLUTION_MAX: i64 = 100;

/// Chaos level seeded into every cell of a fresh grid.
pub const DEFAULT_CELL_CHAOS: f64 = 0.5;
