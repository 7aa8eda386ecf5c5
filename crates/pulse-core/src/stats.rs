// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Migration bookkeeping: emission and listener counters, warning caps, and
//! the serializable reporting surface.
//!
//! Counters are keyed by [`TopicId`] internally; snapshots resolve them back
//! to names and sort into `BTreeMap`s so rendered reports are deterministic.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::constants::{WARNING_CAP_GLOBAL, WARNING_CAP_PER_TYPE};
use crate::topic::{TopicId, TopicTable, Vocabulary};

/// What the caller should do with one deprecation warning occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WarningDisposition {
    /// Log the warning.
    Log,
    /// Log the one-time suppression notice instead of the warning.
    LogSuppressionNotice,
    /// Count silently.
    Silent,
}

/// Mutable migration counters. Internal to the bus.
#[derive(Debug, Default)]
pub(crate) struct MigrationStats {
    emissions: FxHashMap<TopicId, u64>,
    listeners: FxHashMap<TopicId, u64>,
    warnings_by_type: FxHashMap<TopicId, u64>,
    warnings_total: u64,
    warnings_issued: FxHashMap<TopicId, u64>,
    warnings_issued_total: u64,
    suppression_noted: bool,
    listener_faults: u64,
}

impl MigrationStats {
    pub(crate) fn note_emission(&mut self, topic: TopicId) {
        *self.emissions.entry(topic).or_insert(0) += 1;
    }

    pub(crate) fn note_listener_added(&mut self, topic: TopicId) {
        *self.listeners.entry(topic).or_insert(0) += 1;
    }

    /// Decrements the listener count, flooring at zero.
    pub(crate) fn note_listener_removed(&mut self, topic: TopicId) {
        if let Some(count) = self.listeners.get_mut(&topic) {
            *count = count.saturating_sub(1);
        }
    }

    pub(crate) fn note_listener_fault(&mut self) {
        self.listener_faults += 1;
    }

    /// Records one deprecation warning occurrence and decides its fate.
    ///
    /// Counters always increment. The warning is logged only while the
    /// per-type counter is within [`WARNING_CAP_PER_TYPE`] and the global
    /// counter within [`WARNING_CAP_GLOBAL`]; the first occurrence past the
    /// global cap logs a single suppression notice.
    ///
    /// Occurrence counters keep counting past both caps; the issued counters
    /// track only the warnings that were actually logged.
    pub(crate) fn note_warning(&mut self, topic: TopicId) -> WarningDisposition {
        let per_type = self.warnings_by_type.entry(topic).or_insert(0);
        *per_type += 1;
        let per_type = *per_type;
        self.warnings_total += 1;

        if self.warnings_total > WARNING_CAP_GLOBAL {
            if self.suppression_noted {
                return WarningDisposition::Silent;
            }
            self.suppression_noted = true;
            return WarningDisposition::LogSuppressionNotice;
        }
        if per_type > u64::from(WARNING_CAP_PER_TYPE) {
            return WarningDisposition::Silent;
        }
        *self.warnings_issued.entry(topic).or_insert(0) += 1;
        self.warnings_issued_total += 1;
        WarningDisposition::Log
    }

    pub(crate) fn emissions_for(&self, topic: TopicId) -> u64 {
        self.emissions.get(&topic).copied().unwrap_or(0)
    }

    pub(crate) fn listeners_for(&self, topic: TopicId) -> u64 {
        self.listeners.get(&topic).copied().unwrap_or(0)
    }

    pub(crate) fn warnings_for(&self, topic: TopicId) -> u64 {
        self.warnings_by_type.get(&topic).copied().unwrap_or(0)
    }

    pub(crate) fn warnings_issued_for(&self, topic: TopicId) -> u64 {
        self.warnings_issued.get(&topic).copied().unwrap_or(0)
    }

    pub(crate) fn listener_faults(&self) -> u64 {
        self.listener_faults
    }

    /// Drops every counter. Used by bus teardown.
    pub(crate) fn clear(&mut self) {
        self.emissions.clear();
        self.listeners.clear();
        self.warnings_by_type.clear();
        self.warnings_total = 0;
        self.warnings_issued.clear();
        self.warnings_issued_total = 0;
        self.suppression_noted = false;
        self.listener_faults = 0;
    }

    /// Builds the serializable snapshot, resolving ids through `topics`.
    pub(crate) fn snapshot(
        &self,
        topics: &TopicTable,
        fully_migrated: impl Iterator<Item = String>,
        disabled_legacy: impl Iterator<Item = String>,
    ) -> MigrationSnapshot {
        let mut snapshot = MigrationSnapshot {
            fully_migrated: fully_migrated.collect(),
            disabled_legacy: disabled_legacy.collect(),
            warnings_total: self.warnings_total,
            warnings_issued_total: self.warnings_issued_total,
            listener_faults: self.listener_faults,
            ..MigrationSnapshot::default()
        };

        for (id, topic) in topics.iter() {
            let name = topic.name().to_owned();
            let emissions = self.emissions_for(id);
            let listeners = self.listeners_for(id);
            match topic.vocabulary() {
                Vocabulary::Legacy => {
                    if emissions > 0 {
                        snapshot.legacy_emissions.insert(name.clone(), emissions);
                    }
                    if listeners > 0 {
                        snapshot.legacy_listeners.insert(name.clone(), listeners);
                    }
                    snapshot.legacy_emissions_total += emissions;
                    snapshot.legacy_listeners_total += listeners;
                }
                Vocabulary::Standard => {
                    if emissions > 0 {
                        snapshot.standard_emissions.insert(name.clone(), emissions);
                    }
                    if listeners > 0 {
                        snapshot.standard_listeners.insert(name.clone(), listeners);
                    }
                    snapshot.standard_emissions_total += emissions;
                    snapshot.standard_listeners_total += listeners;
                }
            }
            let warnings = self.warnings_for(id);
            if warnings > 0 {
                snapshot.warnings_by_type.insert(name.clone(), warnings);
            }
            let issued = self.warnings_issued_for(id);
            if issued > 0 {
                snapshot.warnings_issued_by_type.insert(name, issued);
            }
        }

        snapshot.standardized_emission_pct = percentage(
            snapshot.standard_emissions_total,
            snapshot.standard_emissions_total + snapshot.legacy_emissions_total,
        );
        snapshot.listener_migration_pct = percentage(
            snapshot.standard_listeners_total,
            snapshot.standard_listeners_total + snapshot.legacy_listeners_total,
        );
        snapshot
    }
}

/// Share of `part` in `total` as a percentage rounded to one decimal place;
/// `0.0` when `total` is zero.
#[must_use]
fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let raw = part as f64 / total as f64 * 100.0;
    (raw * 10.0).round() / 10.0
}

/// Point-in-time view of the migration, sorted for stable rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MigrationSnapshot {
    /// Emission counts per legacy name (zero-count names omitted).
    pub legacy_emissions: BTreeMap<String, u64>,
    /// Emission counts per standardized name (zero-count names omitted).
    pub standard_emissions: BTreeMap<String, u64>,
    /// Listener counts per legacy name (zero-count names omitted).
    pub legacy_listeners: BTreeMap<String, u64>,
    /// Listener counts per standardized name (zero-count names omitted).
    pub standard_listeners: BTreeMap<String, u64>,
    /// Total legacy emissions.
    pub legacy_emissions_total: u64,
    /// Total standardized emissions.
    pub standard_emissions_total: u64,
    /// Total legacy listeners currently registered.
    pub legacy_listeners_total: u64,
    /// Total standardized listeners currently registered.
    pub standard_listeners_total: u64,
    /// Standardized share of all emissions, percent, one decimal.
    pub standardized_emission_pct: f64,
    /// Standardized share of all listeners, percent, one decimal.
    pub listener_migration_pct: f64,
    /// Legacy names marked fully migrated.
    pub fully_migrated: BTreeSet<String>,
    /// Legacy names with emission disabled individually.
    pub disabled_legacy: BTreeSet<String>,
    /// Deprecation warning occurrences, including unlogged ones.
    pub warnings_total: u64,
    /// Warning occurrences per legacy name (zero-count names omitted).
    pub warnings_by_type: BTreeMap<String, u64>,
    /// Warnings actually logged, after both caps.
    pub warnings_issued_total: u64,
    /// Logged warnings per legacy name, at most three each
    /// (zero-count names omitted).
    pub warnings_issued_by_type: BTreeMap<String, u64>,
    /// Listener callbacks that returned an error.
    pub listener_faults: u64,
}

/// Result of a per-pair migration readiness probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReadiness {
    /// Legacy side of the probed pair.
    pub legacy: String,
    /// Standardized side of the probed pair.
    pub standard: String,
    /// `true` when the pair can be marked fully migrated right now.
    pub ready: bool,
    /// `true` when the pair already is fully migrated.
    pub already_migrated: bool,
    /// Legacy listeners still registered.
    pub legacy_listeners: u64,
    /// Standardized listeners registered.
    pub standard_listeners: u64,
    /// Standardized emissions observed so far.
    pub standard_emissions: u64,
    /// Human-readable reasons the pair is not ready; empty when ready.
    pub blockers: Vec<String>,
}

/// Readiness evaluated across a whole mapping table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationReport {
    /// When the report was generated, milliseconds since the Unix epoch.
    pub generated_at: u64,
    /// Pairs already marked fully migrated.
    pub migrated: u64,
    /// Pairs ready to be marked fully migrated.
    pub ready: u64,
    /// Pairs still blocked.
    pub blocked: u64,
    /// Per-pair detail, table order.
    pub entries: Vec<MigrationReadiness>,
}
