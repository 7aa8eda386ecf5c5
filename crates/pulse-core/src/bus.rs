// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The notification bus: registration, FIFO drain, fault isolation, and the
//! dual-vocabulary migration layer.
//!
//! Publishing enqueues; a single drain loop owns delivery. Re-entrant
//! publishes from inside a listener append to the same queue and are picked
//! up by the active drain, so delivery order is globally FIFO and at most one
//! drain runs at a time. Each delivery works from a snapshot of the topic's
//! listener list taken when the event is popped: registrations and removals
//! made mid-delivery affect subsequent deliveries only.

use std::collections::VecDeque;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use crate::clock::{system_clock, ClockHandle};
use crate::config::BusConfig;
use crate::event::{Event, EventMeta};
use crate::payload::{CombinedState, EventPayload};
use crate::registry::{Deprecation, NameRegistry};
use crate::stats::{
    MigrationReadiness, MigrationReport, MigrationSnapshot, MigrationStats, WarningDisposition,
};
use crate::topic::{Topic, TopicId, TopicTable};
use crate::txn::TxnId;

/// Fault raised by a listener callback.
///
/// Faults are counted and logged by the drain loop; they never reach the
/// publisher and never halt delivery to the rest of the snapshot.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ListenerError(pub Box<str>);

impl ListenerError {
    /// Builds a fault from a message.
    #[must_use]
    pub fn msg(message: &str) -> Self {
        Self(Box::from(message))
    }
}

impl From<&str> for ListenerError {
    fn from(message: &str) -> Self {
        Self::msg(message)
    }
}

impl From<String> for ListenerError {
    fn from(message: String) -> Self {
        Self(message.into_boxed_str())
    }
}

/// Listener callback signature.
///
/// Listeners receive the bus itself so they can publish follow-up events or
/// adjust registrations mid-delivery.
pub type Handler = dyn Fn(&mut EventBus, &Event) -> Result<(), ListenerError>;

/// Handle returned by [`EventBus::register`]; the token for
/// [`EventBus::unregister`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Returns the raw handle value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

#[derive(Clone)]
struct ListenerEntry {
    id: ListenerId,
    handler: Rc<Handler>,
}

impl std::fmt::Debug for ListenerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerEntry")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Per-publish metadata overrides. The default is a plain standalone
/// emission stamped from the bus clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct PublishOpts {
    /// Timestamp override; the bus clock fills it when absent.
    pub timestamp: Option<u64>,
    /// Transaction attribution for commit-path emissions.
    pub txn: Option<TxnId>,
    /// Marks the emission as coordinator-driven.
    pub coordinator_managed: bool,
    /// Merged chaos/balance view for designated aggregate events.
    pub combined: Option<CombinedState>,
}

/// Overrides for one dual-vocabulary emission.
#[derive(Debug, Default, Clone, Copy)]
pub struct DualOpts {
    /// Emit the legacy side even when migration state says not to.
    pub force_legacy: bool,
    /// Deprecation notice to log; falls back to the registry entry.
    pub deprecation: Option<Deprecation>,
    /// Metadata applied to both emitted sides.
    pub publish: PublishOpts,
}

/// In-process publish/subscribe bus with migration tracking.
///
/// Single-threaded by contract: handlers are `Rc`, there is no interior
/// locking, and the host owns the instance outright. Build one with
/// [`EventBus::new`] and drop or [`EventBus::teardown`] it explicitly.
pub struct EventBus {
    topics: TopicTable,
    registry: NameRegistry,
    listeners: FxHashMap<TopicId, Vec<ListenerEntry>>,
    listener_topics: FxHashMap<ListenerId, TopicId>,
    queue: VecDeque<Event>,
    draining: bool,
    next_listener: u64,
    stats: MigrationStats,
    config: BusConfig,
    clock: ClockHandle,
    fully_migrated: FxHashSet<Box<str>>,
    disabled_legacy: FxHashSet<Box<str>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("topics", &self.topics.len())
            .field("queued", &self.queue.len())
            .field("draining", &self.draining)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Bus with the builtin registry, default config, and system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_parts(NameRegistry::builtin(), BusConfig::default(), system_clock())
    }

    /// Fully injected constructor.
    #[must_use]
    pub fn with_parts(registry: NameRegistry, config: BusConfig, clock: ClockHandle) -> Self {
        Self {
            topics: TopicTable::new(),
            registry,
            listeners: FxHashMap::default(),
            listener_topics: FxHashMap::default(),
            queue: VecDeque::new(),
            draining: false,
            next_listener: 0,
            stats: MigrationStats::default(),
            config,
            clock,
            fully_migrated: FxHashSet::default(),
            disabled_legacy: FxHashSet::default(),
        }
    }

    /// Registers a listener for `name`, appending it to the topic's
    /// delivery order.
    pub fn register<F>(&mut self, name: &str, handler: F) -> ListenerId
    where
        F: Fn(&mut EventBus, &Event) -> Result<(), ListenerError> + 'static,
    {
        let topic = self.topics.intern(name);
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.entry(topic).or_default().push(ListenerEntry {
            id,
            handler: Rc::new(handler),
        });
        self.listener_topics.insert(id, topic);
        self.stats.note_listener_added(topic);
        if self.config.debug_logging {
            debug!(name, listener = id.value(), "listener registered");
        }
        id
    }

    /// Removes a listener by handle.
    ///
    /// Unknown handles are a tolerated no-op returning `false`. Removal mid-
    /// delivery affects subsequent deliveries only.
    pub fn unregister(&mut self, id: ListenerId) -> bool {
        let Some(topic) = self.listener_topics.remove(&id) else {
            return false;
        };
        let removed = self.listeners.get_mut(&topic).is_some_and(|entries| {
            let before = entries.len();
            entries.retain(|entry| entry.id != id);
            entries.len() < before
        });
        if removed {
            self.stats.note_listener_removed(topic);
            if self.config.debug_logging {
                debug!(listener = id.value(), "listener removed");
            }
        }
        removed
    }

    /// Publishes one event.
    ///
    /// Outside a drain this delivers synchronously before returning. Inside a
    /// drain (i.e. from a listener) it appends to the active queue and the
    /// running drain delivers it after the current event's snapshot finishes.
    pub fn publish(&mut self, name: &str, payload: EventPayload) -> bool {
        self.publish_with(name, payload, PublishOpts::default())
    }

    /// [`EventBus::publish`] with metadata overrides.
    pub fn publish_with(&mut self, name: &str, payload: EventPayload, opts: PublishOpts) -> bool {
        self.enqueue(name, payload, opts);
        if !self.draining {
            self.drain();
        }
        true
    }

    /// Emits a mapped pair: the standardized side always (normalized
    /// payload), the legacy side gated by migration state (original
    /// payload).
    ///
    /// The legacy side fires iff forced, or none of these hold: the master
    /// switch is off, the name is individually disabled, or the name is
    /// marked fully migrated.
    pub fn publish_dual(
        &mut self,
        legacy: &str,
        standard: &str,
        payload: EventPayload,
        opts: DualOpts,
    ) -> bool {
        let master_disabled = !self.config.legacy_emission_enabled;
        let should_emit_legacy = opts.force_legacy
            || !(master_disabled
                || self.disabled_legacy.contains(legacy)
                || self.fully_migrated.contains(legacy));

        let deprecation = opts
            .deprecation
            .or_else(|| self.registry.deprecation_for(legacy).copied());
        if let Some(dep) = deprecation {
            if self.config.deprecation_warnings {
                self.warn_deprecated(legacy, standard, &dep);
            }
        }

        self.enqueue(standard, payload.normalized(), opts.publish);
        if should_emit_legacy {
            self.enqueue(legacy, payload, opts.publish);
        }
        if !self.draining {
            self.drain();
        }
        true
    }

    /// Resolves `name` through the registry (either side of a mapped pair)
    /// and dual-publishes; unmapped names fall through to a plain publish.
    pub fn emit_standardized(&mut self, name: &str, payload: EventPayload) -> bool {
        self.emit_standardized_with(name, payload, PublishOpts::default())
    }

    /// [`EventBus::emit_standardized`] with metadata overrides.
    pub fn emit_standardized_with(
        &mut self,
        name: &str,
        payload: EventPayload,
        publish: PublishOpts,
    ) -> bool {
        let pair = self
            .registry
            .standard_for(name)
            .or_else(|| self.registry.legacy_for(name))
            .map(|mapping| (mapping.legacy, mapping.standard));
        match pair {
            Some((legacy, standard)) => self.publish_dual(
                legacy,
                standard,
                payload,
                DualOpts {
                    publish,
                    ..DualOpts::default()
                },
            ),
            None => self.publish_with(name, payload, publish),
        }
    }

    fn enqueue(&mut self, name: &str, payload: EventPayload, opts: PublishOpts) {
        let topic = self.topics.intern(name);
        let standardized = self
            .topics
            .resolve(topic)
            .is_some_and(|t| t.vocabulary().is_standard());
        let meta = EventMeta {
            timestamp: opts
                .timestamp
                .unwrap_or_else(|| self.clock.now_millis()),
            standardized,
            txn: opts.txn,
            coordinator_managed: opts.coordinator_managed,
            combined: opts.combined,
        };
        self.stats.note_emission(topic);
        if self.config.debug_logging {
            debug!(
                name,
                payload = payload.label(),
                queued = self.queue.len(),
                "event enqueued"
            );
        }
        self.queue.push_back(Event {
            topic,
            name: Box::from(name),
            payload,
            meta,
        });
    }

    /// Delivers queued events until the queue is empty.
    ///
    /// Exactly one drain is active at a time; `publish` only calls this when
    /// the flag is clear. Teardown from inside a listener empties the queue
    /// and lets this loop unwind; the flag stays set until it does.
    fn drain(&mut self) {
        self.draining = true;
        while let Some(event) = self.queue.pop_front() {
            let snapshot: Vec<ListenerEntry> = self
                .listeners
                .get(&event.topic)
                .cloned()
                .unwrap_or_default();
            for entry in snapshot {
                if let Err(fault) = (entry.handler.as_ref())(self, &event) {
                    self.stats.note_listener_fault();
                    warn!(
                        event = &*event.name,
                        listener = entry.id.value(),
                        %fault,
                        "listener fault isolated"
                    );
                }
            }
        }
        self.draining = false;
    }

    fn warn_deprecated(&mut self, legacy: &str, standard: &str, dep: &Deprecation) {
        let topic = self.topics.intern(legacy);
        match self.stats.note_warning(topic) {
            WarningDisposition::Log => {
                let status = self.legacy_status(legacy);
                warn!(
                    legacy,
                    replacement = standard,
                    since = dep.since,
                    remove_in = dep.remove_in,
                    note = dep.note,
                    status = %status,
                    "deprecated event type emitted"
                );
            }
            WarningDisposition::LogSuppressionNotice => {
                warn!("deprecation warnings suppressed: global cap reached");
            }
            WarningDisposition::Silent => {}
        }
    }

    /// One-line migration status for a legacy name, used in warnings.
    fn legacy_status(&self, legacy: &str) -> String {
        if self.fully_migrated.contains(legacy) {
            return "fully migrated".to_owned();
        }
        if !self.config.legacy_emission_enabled || self.disabled_legacy.contains(legacy) {
            return "emission disabled".to_owned();
        }
        let listeners = self
            .topics
            .get(legacy)
            .map_or(0, |id| self.stats.listeners_for(id));
        format!("{listeners} legacy listeners still active")
    }

    // ── Migration controls ──────────────────────────────────────────

    /// Flips per-emission debug tracing.
    pub fn set_debug_logging(&mut self, enabled: bool) {
        self.config.debug_logging = enabled;
    }

    /// Flips deprecation warning logging. Counting is unaffected.
    pub fn set_deprecation_warnings(&mut self, enabled: bool) {
        self.config.deprecation_warnings = enabled;
    }

    /// Master switch for the legacy side of dual emissions.
    pub fn set_legacy_emission_enabled(&mut self, enabled: bool) {
        self.config.legacy_emission_enabled = enabled;
    }

    /// Disables the legacy side for one name.
    pub fn disable_legacy(&mut self, name: &str) {
        self.disabled_legacy.insert(Box::from(name));
    }

    /// Re-enables the legacy side for one name.
    pub fn enable_legacy(&mut self, name: &str) {
        self.disabled_legacy.remove(name);
    }

    /// Marks a legacy name fully migrated: its legacy side never fires
    /// again except via `force_legacy`.
    pub fn mark_fully_migrated(&mut self, name: &str) {
        self.fully_migrated.insert(Box::from(name));
        debug!(name, "legacy event type marked fully migrated");
    }

    /// Whether a legacy name has been marked fully migrated.
    #[must_use]
    pub fn is_fully_migrated(&self, name: &str) -> bool {
        self.fully_migrated.contains(name)
    }

    // ── Diagnostics ─────────────────────────────────────────────────

    /// Point-in-time migration statistics.
    #[must_use]
    pub fn migration_stats(&self) -> MigrationSnapshot {
        self.stats.snapshot(
            &self.topics,
            self.fully_migrated.iter().map(|s| s.to_string()),
            self.disabled_legacy.iter().map(|s| s.to_string()),
        )
    }

    /// Probes whether a legacy name is ready to be marked fully migrated:
    /// not already migrated, zero legacy listeners, at least one
    /// standardized listener, and at least one standardized emission so far.
    #[must_use]
    pub fn migration_readiness(&self, legacy: &str) -> MigrationReadiness {
        let standard = self.registry.standard_for(legacy).map(|m| m.standard);
        let already = self.fully_migrated.contains(legacy);
        let legacy_listeners = self
            .topics
            .get(legacy)
            .map_or(0, |id| self.stats.listeners_for(id));
        let (standard_listeners, standard_emissions) = standard.map_or((0, 0), |name| {
            self.topics.get(name).map_or((0, 0), |id| {
                (self.stats.listeners_for(id), self.stats.emissions_for(id))
            })
        });

        let mut blockers = Vec::new();
        if standard.is_none() {
            blockers.push("no standardized mapping registered".to_owned());
        }
        if already {
            blockers.push("already fully migrated".to_owned());
        }
        if legacy_listeners > 0 {
            blockers.push(format!("{legacy_listeners} legacy listeners still registered"));
        }
        if standard_listeners == 0 {
            blockers.push("no standardized listeners registered".to_owned());
        }
        if standard_emissions == 0 {
            blockers.push("no standardized emissions observed".to_owned());
        }

        MigrationReadiness {
            legacy: legacy.to_owned(),
            standard: standard.unwrap_or_default().to_owned(),
            ready: blockers.is_empty(),
            already_migrated: already,
            legacy_listeners,
            standard_listeners,
            standard_emissions,
            blockers,
        }
    }

    /// Readiness across every mapped pair, in registry order.
    #[must_use]
    pub fn migration_report(&self) -> MigrationReport {
        let mut entries = Vec::with_capacity(self.registry.len());
        for mapping in self.registry.iter() {
            entries.push(self.migration_readiness(mapping.legacy));
        }
        let mut migrated = 0u64;
        let mut ready = 0u64;
        let mut blocked = 0u64;
        for entry in &entries {
            if entry.already_migrated {
                migrated += 1;
            } else if entry.ready {
                ready += 1;
            } else {
                blocked += 1;
            }
        }
        MigrationReport {
            generated_at: self.clock.now_millis(),
            migrated,
            ready,
            blocked,
            entries,
        }
    }

    /// Current listener count for a name.
    #[must_use]
    pub fn listener_count(&self, name: &str) -> u64 {
        self.topics
            .get(name)
            .map_or(0, |id| self.stats.listeners_for(id))
    }

    /// Events waiting in the queue. Non-zero only when observed from inside
    /// a listener.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Whether a drain loop is currently active.
    #[must_use]
    pub const fn is_draining(&self) -> bool {
        self.draining
    }

    /// Borrows the name registry.
    #[must_use]
    pub const fn registry(&self) -> &NameRegistry {
        &self.registry
    }

    /// Borrows the current config.
    #[must_use]
    pub const fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Resolves an interned topic handle.
    #[must_use]
    pub fn topic(&self, id: TopicId) -> Option<&Topic> {
        self.topics.resolve(id)
    }

    /// Clears listeners, queued events, counters, and migration sets.
    ///
    /// Idempotent. Safe to call from inside a listener: the active drain
    /// unwinds on the now-empty queue and clears its own flag.
    pub fn teardown(&mut self) {
        self.listeners.clear();
        self.listener_topics.clear();
        self.queue.clear();
        self.stats.clear();
        self.fully_migrated.clear();
        self.disabled_legacy.clear();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]

    use std::cell::{Cell, RefCell};

    use super::*;

    fn recording_listener(
        log: &Rc<RefCell<Vec<String>>>,
        tag: &str,
    ) -> impl Fn(&mut EventBus, &Event) -> Result<(), ListenerError> + 'static {
        let log = Rc::clone(log);
        let tag = tag.to_owned();
        move |_bus, event| {
            log.borrow_mut().push(format!("{tag}:{}", event.name));
            Ok(())
        }
    }

    #[test]
    fn listeners_fire_in_registration_order() {
        let mut bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        bus.register("tile:explored", recording_listener(&log, "a"));
        bus.register("tile:explored", recording_listener(&log, "b"));
        bus.publish("tile:explored", EventPayload::Empty);
        assert_eq!(
            *log.borrow(),
            vec!["a:tile:explored".to_owned(), "b:tile:explored".to_owned()]
        );
    }

    #[test]
    fn nested_publish_appends_to_the_active_drain() {
        let mut bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        {
            let log = Rc::clone(&log);
            bus.register("first", move |bus, _event| {
                log.borrow_mut().push("first:1".to_owned());
                // Re-entrant publish: queued, not delivered inline.
                bus.publish("second", EventPayload::Empty);
                assert_eq!(bus.pending_events(), 1);
                assert!(bus.is_draining());
                Ok(())
            });
        }
        bus.register("first", recording_listener(&log, "late"));
        bus.register("second", recording_listener(&log, "nested"));
        bus.publish("first", EventPayload::Empty);
        // The rest of the first event's snapshot runs before the nested event.
        assert_eq!(
            *log.borrow(),
            vec![
                "first:1".to_owned(),
                "late:first".to_owned(),
                "nested:second".to_owned()
            ]
        );
        assert!(!bus.is_draining());
        assert_eq!(bus.pending_events(), 0);
    }

    #[test]
    fn listener_fault_is_isolated_and_counted() {
        let mut bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        bus.register("system:turn:started", |_bus, _event| {
            Err(ListenerError::msg("boom"))
        });
        bus.register("system:turn:started", recording_listener(&log, "after"));
        let delivered = bus.publish("system:turn:started", EventPayload::Empty);
        assert!(delivered);
        assert_eq!(*log.borrow(), vec!["after:system:turn:started".to_owned()]);
        assert_eq!(bus.migration_stats().listener_faults, 1);
    }

    #[test]
    fn unregister_mid_delivery_spares_the_current_snapshot() {
        let mut bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let victim: Rc<Cell<Option<ListenerId>>> = Rc::new(Cell::new(None));
        {
            let victim = Rc::clone(&victim);
            bus.register("e", move |bus, _event| {
                if let Some(id) = victim.take() {
                    assert!(bus.unregister(id));
                }
                Ok(())
            });
        }
        let second = bus.register("e", recording_listener(&log, "victim"));
        victim.set(Some(second));

        bus.publish("e", EventPayload::Empty);
        // Still delivered to the in-flight snapshot.
        assert_eq!(*log.borrow(), vec!["victim:e".to_owned()]);

        bus.publish("e", EventPayload::Empty);
        // Gone for subsequent deliveries.
        assert_eq!(*log.borrow(), vec!["victim:e".to_owned()]);
        assert_eq!(bus.listener_count("e"), 1);
    }

    #[test]
    fn listener_registered_mid_delivery_waits_for_the_next_event() {
        let mut bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let outer_log = Rc::clone(&log);
        bus.register("e", move |bus, _event| {
            let log = Rc::clone(&outer_log);
            bus.register("e", move |_bus, event| {
                log.borrow_mut().push(format!("new:{}", event.name));
                Ok(())
            });
            Ok(())
        });
        bus.publish("e", EventPayload::Empty);
        assert!(log.borrow().is_empty());
        bus.publish("e", EventPayload::Empty);
        assert_eq!(*log.borrow(), vec!["new:e".to_owned()]);
    }

    #[test]
    fn unregister_unknown_handle_is_a_noop() {
        let mut bus = EventBus::new();
        let id = bus.register("e", |_bus, _event| Ok(()));
        assert!(bus.unregister(id));
        assert!(!bus.unregister(id));
    }

    #[test]
    fn dual_publish_emits_standard_before_legacy() {
        let mut bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        bus.register("energyChanged", recording_listener(&log, "l"));
        bus.register("player:resource:changed:energy", recording_listener(&log, "s"));
        bus.publish_dual(
            "energyChanged",
            "player:resource:changed:energy",
            EventPayload::Empty,
            DualOpts::default(),
        );
        assert_eq!(
            *log.borrow(),
            vec![
                "s:player:resource:changed:energy".to_owned(),
                "l:energyChanged".to_owned()
            ]
        );
    }

    #[test]
    fn fully_migrated_names_skip_the_legacy_side_unless_forced() {
        let mut bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        bus.register("energyChanged", recording_listener(&log, "l"));
        bus.mark_fully_migrated("energyChanged");

        bus.publish_dual(
            "energyChanged",
            "player:resource:changed:energy",
            EventPayload::Empty,
            DualOpts::default(),
        );
        assert!(log.borrow().is_empty());

        bus.publish_dual(
            "energyChanged",
            "player:resource:changed:energy",
            EventPayload::Empty,
            DualOpts {
                force_legacy: true,
                ..DualOpts::default()
            },
        );
        assert_eq!(*log.borrow(), vec!["l:energyChanged".to_owned()]);
    }

    #[test]
    fn standard_side_is_normalized_legacy_side_is_not() {
        use crate::payload::ResourceChange;
        use crate::world::ResourceKind;

        let mut bus = EventBus::new();
        let deltas: Rc<RefCell<Vec<Option<i64>>>> = Rc::new(RefCell::new(Vec::new()));
        for name in ["player:resource:changed:energy", "energyChanged"] {
            let deltas = Rc::clone(&deltas);
            bus.register(name, move |_bus, event| {
                let change = event.payload.as_resource_change().ok_or("wrong payload")?;
                deltas.borrow_mut().push(change.delta);
                Ok(())
            });
        }
        bus.publish_dual(
            "energyChanged",
            "player:resource:changed:energy",
            EventPayload::ResourceChanged(ResourceChange::new(ResourceKind::Energy, 3, 8, "test")),
            DualOpts::default(),
        );
        // Standard first (delta filled), then legacy (delta untouched).
        assert_eq!(*deltas.borrow(), vec![Some(5), None]);
    }

    #[test]
    fn teardown_clears_listeners_and_counters() {
        let mut bus = EventBus::new();
        bus.register("e", |_bus, _event| Ok(()));
        bus.publish("e", EventPayload::Empty);
        bus.teardown();
        assert_eq!(bus.listener_count("e"), 0);
        assert_eq!(bus.pending_events(), 0);
        let stats = bus.migration_stats();
        assert_eq!(stats.legacy_emissions_total, 0);
        assert_eq!(stats.standard_emissions_total, 0);
    }

    #[test]
    fn teardown_from_inside_a_listener_unwinds_the_drain() {
        let mut bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        {
            let log = Rc::clone(&log);
            bus.register("e", move |bus, _event| {
                bus.publish("never:delivered", EventPayload::Empty);
                bus.teardown();
                log.borrow_mut().push("tore down".to_owned());
                Ok(())
            });
        }
        bus.register("e", recording_listener(&log, "after"));
        bus.publish("e", EventPayload::Empty);
        // The snapshot still finishes; the queued event is gone.
        assert_eq!(
            *log.borrow(),
            vec!["tore down".to_owned(), "after:e".to_owned()]
        );
        assert!(!bus.is_draining());
        assert_eq!(bus.pending_events(), 0);
    }
}
