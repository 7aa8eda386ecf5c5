// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Legacy↔standardized event-name mappings with deprecation metadata.
//!
//! The registry is the single source of truth for which flat camelCase name
//! corresponds to which hierarchical standardized name. It is static data:
//! built once, never mutated, injectable into the bus so tests can run
//! against a reduced table.

use rustc_hash::FxHashMap;
use serde::Serialize;

/// Standardized name for player energy changes.
pub const PLAYER_ENERGY_CHANGED: &str = "player:resource:changed:energy";
/// Standardized name for player movement-point changes.
pub const PLAYER_MOVEMENT_CHANGED: &str = "player:resource:changed:movement";
/// Standardized name for player evolution-point changes.
pub const PLAYER_EVOLUTION_CHANGED: &str = "player:resource:changed:evolution";
/// Standardized name for the full player stat refresh.
pub const PLAYER_STATS_UPDATED: &str = "player:stats:updated";
/// Standardized name for a gained trait.
pub const PLAYER_TRAIT_ADDED: &str = "player:trait:added";
/// Standardized name for a completed move action.
pub const PLAYER_ACTION_MOVE: &str = "player:action:completed:move";
/// Standardized name for a completed sense action.
pub const PLAYER_ACTION_SENSE: &str = "player:action:completed:sense";
/// Standardized name for a completed interact action.
pub const PLAYER_ACTION_INTERACT: &str = "player:action:completed:interact";
/// Standardized name for a completed stabilize action.
pub const PLAYER_ACTION_STABILIZE: &str = "player:action:completed:stabilize";
/// Standardized name for a newly explored tile.
pub const TILE_EXPLORED: &str = "tile:explored";
/// Standardized name for a tile type mutation.
pub const TILE_TYPE_CHANGED: &str = "tile:type:changed";
/// Standardized name for a tile chaos change.
pub const TILE_CHAOS_CHANGED: &str = "tile:chaos:changed";
/// Standardized name for the start of a turn.
pub const SYSTEM_TURN_STARTED: &str = "system:turn:started";
/// Standardized name for the end of a turn.
pub const SYSTEM_TURN_ENDED: &str = "system:turn:ended";
/// Standardized name for a world chaos/order balance shift.
pub const SYSTEM_BALANCE_CHANGED: &str = "system:balance:changed";
/// Standardized name for an achieved victory condition.
pub const SYSTEM_VICTORY_ACHIEVED: &str = "system:victory:achieved";
/// Standardized name for a lost run.
pub const SYSTEM_GAME_OVER: &str = "system:game:over";
/// Standardized name for a completed level.
pub const SYSTEM_LEVEL_COMPLETED: &str = "system:level:completed";
/// Standardized name for UI readiness.
pub const UI_SCREEN_READY: &str = "ui:screen:ready";
/// Standardized name for a UI screen refresh.
pub const UI_SCREEN_UPDATED: &str = "ui:screen:updated";
/// Standardized name for a transaction rollback notification.
///
/// Born after the migration, so it has no legacy pair and never appears in
/// the mapping table.
pub const SYSTEM_TRANSACTION_ROLLEDBACK: &str = "system:transaction:rolledback";

/// Event family a mapping belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    /// Player resources, traits, stats, and action completions.
    Player,
    /// Grid cell exploration and mutation.
    Tile,
    /// Turn flow, world balance, and run outcomes.
    System,
    /// Screen readiness and refreshes.
    Ui,
}

impl Category {
    /// Lowercase name used in reports and standardized name prefixes.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Tile => "tile",
            Self::System => "system",
            Self::Ui => "ui",
        }
    }
}

/// Deprecation metadata attached to a legacy event name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Deprecation {
    /// Version that introduced the standardized replacement.
    pub since: &'static str,
    /// Version in which the legacy emission is scheduled for removal.
    pub remove_in: &'static str,
    /// Guidance for migrating producers and listeners.
    pub note: &'static str,
}

/// One legacy↔standardized name pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NameMapping {
    /// Flat camelCase name from before the migration.
    pub legacy: &'static str,
    /// Hierarchical standardized replacement.
    pub standard: &'static str,
    /// Family the pair belongs to.
    pub category: Category,
    /// Deprecation metadata for the legacy side.
    pub deprecation: Deprecation,
}

const fn dep(since: &'static str, note: &'static str) -> Deprecation {
    Deprecation {
        since,
        remove_in: "1.0.0",
        note,
    }
}

/// The shipped mapping table.
const BUILTIN_MAPPINGS: &[NameMapping] = &[
    NameMapping {
        legacy: "energyChanged",
        standard: PLAYER_ENERGY_CHANGED,
        category: Category::Player,
        deprecation: dep("0.2.0", "use player:resource:changed:energy instead"),
    },
    NameMapping {
        legacy: "movementPointsChanged",
        standard: PLAYER_MOVEMENT_CHANGED,
        category: Category::Player,
        deprecation: dep("0.2.0", "use player:resource:changed:movement instead"),
    },
    NameMapping {
        legacy: "evolutionPointsChanged",
        standard: PLAYER_EVOLUTION_CHANGED,
        category: Category::Player,
        deprecation: dep("0.2.0", "use player:resource:changed:evolution instead"),
    },
    NameMapping {
        legacy: "playerStatsUpdated",
        standard: PLAYER_STATS_UPDATED,
        category: Category::Player,
        deprecation: dep("0.2.0", "use player:stats:updated instead"),
    },
    NameMapping {
        legacy: "traitAdded",
        standard: PLAYER_TRAIT_ADDED,
        category: Category::Player,
        deprecation: dep("0.3.0", "use player:trait:added instead"),
    },
    NameMapping {
        legacy: "playerMoved",
        standard: PLAYER_ACTION_MOVE,
        category: Category::Player,
        deprecation: dep("0.3.0", "use player:action:completed:move instead"),
    },
    NameMapping {
        legacy: "tileSensed",
        standard: PLAYER_ACTION_SENSE,
        category: Category::Player,
        deprecation: dep("0.3.0", "use player:action:completed:sense instead"),
    },
    NameMapping {
        legacy: "tileInteracted",
        standard: PLAYER_ACTION_INTERACT,
        category: Category::Player,
        deprecation: dep("0.3.0", "use player:action:completed:interact instead"),
    },
    NameMapping {
        legacy: "tileStabilized",
        standard: PLAYER_ACTION_STABILIZE,
        category: Category::Player,
        deprecation: dep("0.3.0", "use player:action:completed:stabilize instead"),
    },
    NameMapping {
        legacy: "tileExplored",
        standard: TILE_EXPLORED,
        category: Category::Tile,
        deprecation: dep("0.3.0", "use tile:explored instead"),
    },
    NameMapping {
        legacy: "tileTypeChanged",
        standard: TILE_TYPE_CHANGED,
        category: Category::Tile,
        deprecation: dep("0.3.0", "use tile:type:changed instead"),
    },
    NameMapping {
        legacy: "tileChaosChanged",
        standard: TILE_CHAOS_CHANGED,
        category: Category::Tile,
        deprecation: dep("0.3.0", "use tile:chaos:changed instead"),
    },
    NameMapping {
        legacy: "turnStarted",
        standard: SYSTEM_TURN_STARTED,
        category: Category::System,
        deprecation: dep("0.3.0", "use system:turn:started instead"),
    },
    NameMapping {
        legacy: "turnEnded",
        standard: SYSTEM_TURN_ENDED,
        category: Category::System,
        deprecation: dep("0.3.0", "use system:turn:ended instead"),
    },
    NameMapping {
        legacy: "balanceChanged",
        standard: SYSTEM_BALANCE_CHANGED,
        category: Category::System,
        deprecation: dep("0.3.0", "use system:balance:changed instead"),
    },
    NameMapping {
        legacy: "victoryAchieved",
        standard: SYSTEM_VICTORY_ACHIEVED,
        category: Category::System,
        deprecation: dep("0.3.0", "use system:victory:achieved instead"),
    },
    NameMapping {
        legacy: "gameOver",
        standard: SYSTEM_GAME_OVER,
        category: Category::System,
        deprecation: dep("0.3.0", "use system:game:over instead"),
    },
    NameMapping {
        legacy: "levelCompleted",
        standard: SYSTEM_LEVEL_COMPLETED,
        category: Category::System,
        deprecation: dep("0.3.0", "use system:level:completed instead"),
    },
    NameMapping {
        legacy: "uiReady",
        standard: UI_SCREEN_READY,
        category: Category::Ui,
        deprecation: dep("0.4.0", "use ui:screen:ready instead"),
    },
    NameMapping {
        legacy: "uiScreenUpdated",
        standard: UI_SCREEN_UPDATED,
        category: Category::Ui,
        deprecation: dep("0.4.0", "use ui:screen:updated instead"),
    },
];

/// Error raised when building a registry from caller-supplied mappings.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Two mappings claim the same legacy name.
    #[error("duplicate legacy name in mapping table: {0}")]
    DuplicateLegacy(&'static str),
    /// Two mappings claim the same standardized name.
    #[error("duplicate standardized name in mapping table: {0}")]
    DuplicateStandard(&'static str),
}

/// Lookup table over [`NameMapping`] entries.
#[derive(Debug, Clone)]
pub struct NameRegistry {
    mappings: Vec<NameMapping>,
    by_legacy: FxHashMap<&'static str, usize>,
    by_standard: FxHashMap<&'static str, usize>,
}

impl NameRegistry {
    /// Returns the shipped table.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self {
            mappings: Vec::with_capacity(BUILTIN_MAPPINGS.len()),
            by_legacy: FxHashMap::default(),
            by_standard: FxHashMap::default(),
        };
        for mapping in BUILTIN_MAPPINGS {
            let inserted = registry.insert(*mapping);
            debug_assert!(inserted, "builtin mapping table contains duplicates");
        }
        registry
    }

    /// Builds a registry from caller-supplied mappings.
    ///
    /// # Errors
    /// Returns [`RegistryError`] if two mappings share a legacy or
    /// standardized name.
    pub fn from_mappings(
        mappings: impl IntoIterator<Item = NameMapping>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self {
            mappings: Vec::new(),
            by_legacy: FxHashMap::default(),
            by_standard: FxHashMap::default(),
        };
        for mapping in mappings {
            if registry.by_legacy.contains_key(mapping.legacy) {
                return Err(RegistryError::DuplicateLegacy(mapping.legacy));
            }
            if registry.by_standard.contains_key(mapping.standard) {
                return Err(RegistryError::DuplicateStandard(mapping.standard));
            }
            registry.insert(mapping);
        }
        Ok(registry)
    }

    fn insert(&mut self, mapping: NameMapping) -> bool {
        let idx = self.mappings.len();
        let fresh_legacy = self.by_legacy.insert(mapping.legacy, idx).is_none();
        let fresh_standard = self.by_standard.insert(mapping.standard, idx).is_none();
        self.mappings.push(mapping);
        fresh_legacy && fresh_standard
    }

    /// Forward lookup: legacy name → mapping.
    #[must_use]
    pub fn standard_for(&self, legacy: &str) -> Option<&NameMapping> {
        self.by_legacy.get(legacy).map(|&idx| &self.mappings[idx])
    }

    /// Reverse lookup: standardized name → mapping.
    #[must_use]
    pub fn legacy_for(&self, standard: &str) -> Option<&NameMapping> {
        self.by_standard
            .get(standard)
            .map(|&idx| &self.mappings[idx])
    }

    /// Deprecation metadata for a legacy name, if mapped.
    #[must_use]
    pub fn deprecation_for(&self, legacy: &str) -> Option<&Deprecation> {
        self.standard_for(legacy).map(|m| &m.deprecation)
    }

    /// Iterates mappings belonging to one family, in definition order.
    pub fn mappings_in(&self, category: Category) -> impl Iterator<Item = &NameMapping> {
        self.mappings.iter().filter(move |m| m.category == category)
    }

    /// Iterates the full table in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &NameMapping> {
        self.mappings.iter()
    }

    /// Number of mapped pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Returns `true` for an empty table.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

impl Default for NameRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::topic::Vocabulary;

    #[test]
    fn builtin_table_has_no_duplicates() {
        let registry = NameRegistry::builtin();
        assert_eq!(registry.len(), BUILTIN_MAPPINGS.len());
        assert_eq!(registry.by_legacy.len(), registry.len());
        assert_eq!(registry.by_standard.len(), registry.len());
    }

    #[test]
    fn builtin_sides_classify_correctly() {
        for mapping in NameRegistry::builtin().iter() {
            assert_eq!(
                Vocabulary::of(mapping.legacy),
                Vocabulary::Legacy,
                "{} should be a legacy name",
                mapping.legacy
            );
            assert_eq!(
                Vocabulary::of(mapping.standard),
                Vocabulary::Standard,
                "{} should be standardized",
                mapping.standard
            );
            assert!(mapping
                .standard
                .starts_with(mapping.category.as_str()));
        }
    }

    #[test]
    fn forward_and_reverse_lookups_agree() {
        let registry = NameRegistry::builtin();
        let forward = registry.standard_for("energyChanged").expect("mapped");
        assert_eq!(forward.standard, PLAYER_ENERGY_CHANGED);
        let reverse = registry.legacy_for(PLAYER_ENERGY_CHANGED).expect("mapped");
        assert_eq!(reverse.legacy, "energyChanged");
        assert!(registry.standard_for("neverMapped").is_none());
        assert!(registry.legacy_for("no:such:event").is_none());
    }

    #[test]
    fn category_listing_filters_families() {
        let registry = NameRegistry::builtin();
        let tiles: Vec<&str> = registry
            .mappings_in(Category::Tile)
            .map(|m| m.standard)
            .collect();
        assert_eq!(
            tiles,
            vec![TILE_EXPLORED, TILE_TYPE_CHANGED, TILE_CHAOS_CHANGED]
        );
        assert!(registry.mappings_in(Category::Ui).count() >= 2);
    }

    #[test]
    fn deprecation_metadata_carries_guidance() {
        let registry = NameRegistry::builtin();
        let dep = registry.deprecation_for("gameOver").expect("mapped");
        assert_eq!(dep.remove_in, "1.0.0");
        assert!(dep.note.contains("system:game:over"));
    }

    #[test]
    fn from_mappings_rejects_duplicates() {
        let dup = BUILTIN_MAPPINGS[0];
        let err = NameRegistry::from_mappings([dup, dup]).expect_err("duplicate");
        assert_eq!(err, RegistryError::DuplicateLegacy("energyChanged"));
    }
}
