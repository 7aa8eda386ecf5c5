// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Event-name vocabulary classification and interning.
//!
//! Every event name the bus sees is interned here once, and classified once:
//! names containing the `':'` separator belong to the standardized
//! hierarchical vocabulary, flat camelCase names to the legacy one. Hot paths
//! (emission, registration, stats) carry [`TopicId`] handles and read the
//! cached [`Vocabulary`] instead of re-inspecting strings per emission.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::constants::STANDARD_NAME_SEPARATOR;

/// Which naming vocabulary an event name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vocabulary {
    /// Flat camelCase names from before the migration, e.g. `energyChanged`.
    Legacy,
    /// Hierarchical segmented names, e.g. `player:resource:changed:energy`.
    Standard,
}

impl Vocabulary {
    /// Classifies a raw event name.
    ///
    /// Called exactly once per distinct name, when [`TopicTable::intern`]
    /// first sees it.
    #[must_use]
    pub fn of(name: &str) -> Self {
        if name.contains(STANDARD_NAME_SEPARATOR) {
            Self::Standard
        } else {
            Self::Legacy
        }
    }

    /// Returns `true` for [`Vocabulary::Standard`].
    #[must_use]
    pub const fn is_standard(self) -> bool {
        matches!(self, Self::Standard)
    }
}

/// Compact, process-local topic identifier used on hot paths.
///
/// The bus maps event names to compact u32 handles at intern time. These
/// handles are never serialized; they are purely an in-process acceleration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct TopicId(u32);

impl TopicId {
    /// Wraps a raw table index.
    ///
    /// Handles are normally minted by [`TopicTable::intern`]; this exists for
    /// fixtures and diagnostics.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw table index.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for TopicId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "topic#{}", self.0)
    }
}

/// Interned record for one event name.
#[derive(Debug, Clone)]
pub struct Topic {
    name: Box<str>,
    vocabulary: Vocabulary,
    category: Option<Box<str>>,
}

impl Topic {
    /// Canonical event name as first interned.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cached vocabulary classification.
    #[must_use]
    pub const fn vocabulary(&self) -> Vocabulary {
        self.vocabulary
    }

    /// Leading category segment for standardized names (`player`, `tile`,
    /// `system`, `ui`, ...); `None` for legacy names.
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}

/// Intern table mapping event names to [`TopicId`] handles.
///
/// Ids are allocated densely in first-intern order, so they double as
/// indices into per-topic side tables.
#[derive(Debug, Default)]
pub struct TopicTable {
    by_name: FxHashMap<Box<str>, TopicId>,
    topics: Vec<Topic>,
}

impl TopicTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `name`, returning its stable handle. Idempotent.
    pub fn intern(&mut self, name: &str) -> TopicId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        debug_assert!(
            self.topics.len() < u32::MAX as usize,
            "too many topics to assign a compact id"
        );
        #[allow(clippy::cast_possible_truncation)]
        let id = TopicId(self.topics.len() as u32);
        let vocabulary = Vocabulary::of(name);
        let category = match vocabulary {
            Vocabulary::Standard => name
                .split(STANDARD_NAME_SEPARATOR)
                .next()
                .map(Box::from),
            Vocabulary::Legacy => None,
        };
        self.topics.push(Topic {
            name: Box::from(name),
            vocabulary,
            category,
        });
        self.by_name.insert(Box::from(name), id);
        id
    }

    /// Looks up an already-interned name without allocating.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<TopicId> {
        self.by_name.get(name).copied()
    }

    /// Resolves a handle to its interned record.
    ///
    /// Unknown handles (from a different table) resolve to `None`.
    #[must_use]
    pub fn resolve(&self, id: TopicId) -> Option<&Topic> {
        self.topics.get(id.0 as usize)
    }

    /// Number of distinct names interned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.topics.len()
    }

    /// Returns `true` if nothing has been interned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Iterates interned topics in id (first-intern) order.
    pub fn iter(&self) -> impl Iterator<Item = (TopicId, &Topic)> {
        self.topics.iter().enumerate().map(|(idx, topic)| {
            #[allow(clippy::cast_possible_truncation)]
            let id = TopicId(idx as u32);
            (id, topic)
        })
    }
}
