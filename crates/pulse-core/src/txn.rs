// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Transactional sequencing over the bus.
//!
//! A transaction batches the payloads produced by one multi-step domain
//! action and emits them at commit in the canonical order declared for its
//! kind, so listeners observe an ordered, complete burst instead of
//! interleaved partial updates. `record` only stages; nothing reaches the
//! bus before `commit`. `rollback` before commit suppresses every staged
//! event and emits a single rollback notification instead.
//!
//! Closed records stay readable until the owner calls
//! [`TransactionCoordinator::release`]; an advisory sweep, run
//! opportunistically on `begin`, bounds worst-case growth for owners that
//! forget. The sweep is a memory bound, not a lifecycle mechanism.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bus::{EventBus, PublishOpts};
use crate::clock::{system_clock, ClockHandle};
use crate::config::CoordinatorConfig;
use crate::payload::{CombinedState, EventPayload, RollbackNotice};
use crate::registry::{
    PLAYER_ACTION_INTERACT, PLAYER_ACTION_MOVE, PLAYER_ACTION_SENSE, PLAYER_ACTION_STABILIZE,
    PLAYER_ENERGY_CHANGED, PLAYER_EVOLUTION_CHANGED, PLAYER_MOVEMENT_CHANGED, PLAYER_STATS_UPDATED,
    SYSTEM_BALANCE_CHANGED, SYSTEM_TRANSACTION_ROLLEDBACK, SYSTEM_TURN_ENDED, SYSTEM_TURN_STARTED,
    TILE_CHAOS_CHANGED, TILE_EXPLORED, TILE_TYPE_CHANGED,
};

/// Transaction kind for a player move.
pub const TXN_MOVE: &str = "move";
/// Transaction kind for sensing a tile.
pub const TXN_SENSE: &str = "sense";
/// Transaction kind for interacting with a tile.
pub const TXN_INTERACT: &str = "interact";
/// Transaction kind for stabilizing a tile.
pub const TXN_STABILIZE: &str = "stabilize";
/// Transaction kind for a standalone energy change.
pub const TXN_ENERGY_CHANGE: &str = "energy:change";
/// Transaction kind for a standalone movement-point change.
pub const TXN_MOVEMENT_CHANGE: &str = "movement:change";
/// Transaction kind for a standalone evolution-point change.
pub const TXN_EVOLUTION_CHANGE: &str = "evolution:change";
/// Transaction kind for advancing the turn.
pub const TXN_TURN_ADVANCE: &str = "turn:advance";

/// Declared emission order per transaction kind.
///
/// Commit walks this order; recording order never matters. Unknown kinds get
/// an empty sequence: the transaction opens normally and commit emits
/// nothing from the sequence loop.
const SEQUENCE_TABLE: &[(&str, &[&str])] = &[
    (
        TXN_MOVE,
        &[PLAYER_ACTION_MOVE, PLAYER_MOVEMENT_CHANGED, PLAYER_STATS_UPDATED],
    ),
    (
        TXN_SENSE,
        &[
            TILE_EXPLORED,
            PLAYER_ACTION_SENSE,
            PLAYER_ENERGY_CHANGED,
            PLAYER_STATS_UPDATED,
        ],
    ),
    (
        TXN_INTERACT,
        &[
            TILE_TYPE_CHANGED,
            PLAYER_ACTION_INTERACT,
            PLAYER_ENERGY_CHANGED,
            PLAYER_EVOLUTION_CHANGED,
            PLAYER_STATS_UPDATED,
        ],
    ),
    (
        TXN_STABILIZE,
        &[
            TILE_CHAOS_CHANGED,
            SYSTEM_BALANCE_CHANGED,
            PLAYER_ACTION_STABILIZE,
            PLAYER_ENERGY_CHANGED,
            PLAYER_STATS_UPDATED,
        ],
    ),
    (
        TXN_ENERGY_CHANGE,
        &[PLAYER_ENERGY_CHANGED, PLAYER_STATS_UPDATED],
    ),
    (
        TXN_MOVEMENT_CHANGE,
        &[PLAYER_MOVEMENT_CHANGED, PLAYER_STATS_UPDATED],
    ),
    (
        TXN_EVOLUTION_CHANGE,
        &[PLAYER_EVOLUTION_CHANGED, PLAYER_STATS_UPDATED],
    ),
    (
        TXN_TURN_ADVANCE,
        &[SYSTEM_TURN_ENDED, SYSTEM_BALANCE_CHANGED, SYSTEM_TURN_STARTED],
    ),
];

/// Declared emission order for `kind`; empty for unknown kinds.
#[must_use]
pub fn sequence_for(kind: &str) -> &'static [&'static str] {
    SEQUENCE_TABLE
        .iter()
        .find(|(k, _)| *k == kind)
        .map_or(&[], |(_, seq)| seq)
}

/// Expected payload variant for the canonical names the sequence table
/// emits, as [`EventPayload::label`] strings. Names outside the canonical
/// families are unconstrained.
fn expected_payload_label(name: &str) -> Option<&'static str> {
    match name {
        PLAYER_ENERGY_CHANGED | PLAYER_MOVEMENT_CHANGED | PLAYER_EVOLUTION_CHANGED => {
            Some("resource-changed")
        }
        PLAYER_STATS_UPDATED => Some("stats-updated"),
        PLAYER_ACTION_MOVE | PLAYER_ACTION_SENSE | PLAYER_ACTION_INTERACT
        | PLAYER_ACTION_STABILIZE => Some("action-completed"),
        TILE_EXPLORED => Some("tile-explored"),
        TILE_TYPE_CHANGED => Some("tile-type-changed"),
        TILE_CHAOS_CHANGED => Some("chaos-changed"),
        SYSTEM_BALANCE_CHANGED => Some("balance-changed"),
        SYSTEM_TURN_STARTED | SYSTEM_TURN_ENDED => Some("turn-changed"),
        _ => None,
    }
}

/// The two event types that carry the merged chaos/balance view at commit.
fn attaches_combined(name: &str) -> bool {
    matches!(name, PLAYER_ACTION_STABILIZE | PLAYER_STATS_UPDATED)
}

/// Thin wrapper around a transaction identifier.
///
/// The coordinator issues monotonically increasing identifiers via
/// [`TransactionCoordinator::begin`].
///
/// # Invariants
/// - The underlying `u64` may wrap at `u64::MAX` (wrapping is intentional).
///   When wrapping occurs, the coordinator resumes at `1` (skipping zero).
/// - Zero is reserved as invalid. [`TransactionCoordinator::begin`] never
///   returns zero; coordinator operations on `TxnId(0)` report
///   [`TxnError::UnknownTxn`].
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TxnId(u64);

impl TxnId {
    /// Constructs a `TxnId` from a raw `u64` value.
    ///
    /// Exists for fixtures and diagnostics; coordinator operations treat
    /// unknown raw values as [`TxnError::UnknownTxn`].
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying raw value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TxnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a transaction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TxnStatus {
    /// Open: recording is allowed, nothing has been emitted.
    Pending,
    /// Commit walked the full sequence.
    Completed,
    /// Commit halted on a fault; earlier events in the sequence were
    /// emitted and are not retracted.
    Failed,
    /// Rolled back before commit; no sequence event was ever emitted.
    RolledBack,
}

impl TxnStatus {
    /// Lowercase name used in logs and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::RolledBack => "rolledback",
        }
    }
}

impl std::fmt::Display for TxnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors emitted by the coordinator.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TxnError {
    /// The supplied transaction identifier did not exist or was already
    /// released.
    #[error("transaction not active: {0}")]
    UnknownTxn(TxnId),
    /// The transaction exists but has already reached a terminal status.
    #[error("transaction {txn} is {status}, not pending")]
    NotPending {
        /// Identifier of the closed transaction.
        txn: TxnId,
        /// Terminal status it reached.
        status: TxnStatus,
    },
    /// A staged payload does not match the canonical family for its event
    /// name. Commit halts on the first mismatch; earlier events in the
    /// sequence stay emitted.
    #[error("staged payload for {event} is {found}, expected {expected}")]
    PayloadShape {
        /// Event name the payload was staged under.
        event: Box<str>,
        /// Canonical payload family for that name.
        expected: &'static str,
        /// Family of the payload actually staged.
        found: &'static str,
    },
}

/// One open or recently closed transaction record.
///
/// Records stay readable after commit until released or swept, so callers
/// can inspect the outcome (`status`, `emitted`, `errors`) briefly after the
/// fact.
#[derive(Debug, Clone)]
pub struct Transaction {
    id: TxnId,
    kind: Box<str>,
    status: TxnStatus,
    sequence: &'static [&'static str],
    recorded: FxHashMap<Box<str>, EventPayload>,
    emitted: Vec<Box<str>>,
    initial: Option<EventPayload>,
    errors: Vec<String>,
    opened_at: u64,
    closed_at: Option<u64>,
}

impl Transaction {
    /// Identifier assigned at begin.
    #[must_use]
    pub const fn id(&self) -> TxnId {
        self.id
    }

    /// Kind the transaction was opened with.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Current lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TxnStatus {
        self.status
    }

    /// Declared emission order for this transaction's kind.
    #[must_use]
    pub const fn sequence(&self) -> &'static [&'static str] {
        self.sequence
    }

    /// Payload staged under `name`, if any.
    #[must_use]
    pub fn recorded(&self, name: &str) -> Option<&EventPayload> {
        self.recorded.get(name)
    }

    /// Whether a payload has been staged under `name`.
    #[must_use]
    pub fn is_recorded(&self, name: &str) -> bool {
        self.recorded.contains_key(name)
    }

    /// Sequence names not yet staged, in declared order.
    pub fn pending_events(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.sequence
            .iter()
            .copied()
            .filter(|name| !self.recorded.contains_key(*name))
    }

    /// Sequence names already staged, in declared order.
    pub fn recorded_events(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.sequence
            .iter()
            .copied()
            .filter(|name| self.recorded.contains_key(*name))
    }

    /// Names emitted by commit so far, in emission order. Empty until
    /// commit; a failed commit leaves the names it managed to emit.
    #[must_use]
    pub fn emitted(&self) -> &[Box<str>] {
        &self.emitted
    }

    /// Snapshot supplied at begin, if any.
    #[must_use]
    pub const fn initial(&self) -> Option<&EventPayload> {
        self.initial.as_ref()
    }

    /// Commit-stage fault messages, oldest first.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// When the transaction was opened, milliseconds since the Unix epoch.
    #[must_use]
    pub const fn opened_at(&self) -> u64 {
        self.opened_at
    }

    /// When the transaction reached a terminal status, if it has.
    #[must_use]
    pub const fn closed_at(&self) -> Option<u64> {
        self.closed_at
    }

    /// Merged chaos/balance view from the payloads staged in this
    /// transaction; `None` unless both sub-payloads are present.
    fn combined_view(&self) -> Option<CombinedState> {
        let cell = self.recorded.get(TILE_CHAOS_CHANGED)?.as_chaos_change()?;
        let balance = self
            .recorded
            .get(SYSTEM_BALANCE_CHANGED)?
            .as_balance_change()?;
        Some(CombinedState::merge(cell, balance))
    }
}

/// Receipt returned by a fully successful commit.
///
/// `emitted` and `skipped` partition the declared sequence: staged names
/// were emitted in declared order, unstaged names were skipped silently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitReceipt {
    /// Committed transaction.
    pub txn: TxnId,
    /// Kind the transaction was opened with.
    pub kind: Box<str>,
    /// Sequence names emitted, in emission (= declared) order.
    pub emitted: Vec<Box<str>>,
    /// Sequence names declared but never staged.
    pub skipped: Vec<Box<str>>,
}

/// Builds ordered, atomic-looking event groups on top of [`EventBus`].
///
/// The coordinator owns the transaction table and borrows the bus per call;
/// the host owns both side by side. Single-threaded by contract, like the
/// bus.
pub struct TransactionCoordinator {
    live: FxHashMap<TxnId, Transaction>,
    txn_counter: u64,
    config: CoordinatorConfig,
    clock: ClockHandle,
}

impl std::fmt::Debug for TransactionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionCoordinator")
            .field("live", &self.live.len())
            .field("txn_counter", &self.txn_counter)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for TransactionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionCoordinator {
    /// Coordinator with the default config and system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_parts(CoordinatorConfig::default(), system_clock())
    }

    /// Fully injected constructor.
    #[must_use]
    pub fn with_parts(config: CoordinatorConfig, clock: ClockHandle) -> Self {
        Self {
            live: FxHashMap::default(),
            txn_counter: 0,
            config,
            clock,
        }
    }

    /// Opens a transaction of `kind` and returns its identifier.
    ///
    /// Runs the advisory sweep first, so records past the grace period are
    /// dropped before the table grows.
    pub fn begin(&mut self, kind: &str) -> TxnId {
        self.begin_inner(kind, None)
    }

    /// [`TransactionCoordinator::begin`] with a pre-action snapshot stored
    /// on the record.
    pub fn begin_with(&mut self, kind: &str, initial: EventPayload) -> TxnId {
        self.begin_inner(kind, Some(initial))
    }

    fn begin_inner(&mut self, kind: &str, initial: Option<EventPayload>) -> TxnId {
        self.sweep_expired();

        // Increment with wrap and ensure we never produce 0 (reserved invalid).
        self.txn_counter = self.txn_counter.wrapping_add(1);
        if self.txn_counter == 0 {
            self.txn_counter = 1;
        }
        let id = TxnId::from_raw(self.txn_counter);

        let sequence = sequence_for(kind);
        if sequence.is_empty() && self.config.debug_logging {
            debug!(kind, "unknown transaction kind, empty sequence");
        }
        self.live.insert(
            id,
            Transaction {
                id,
                kind: Box::from(kind),
                status: TxnStatus::Pending,
                sequence,
                recorded: FxHashMap::default(),
                emitted: Vec::new(),
                initial,
                errors: Vec::new(),
                opened_at: self.clock.now_millis(),
                closed_at: None,
            },
        );
        if self.config.debug_logging {
            debug!(txn = %id, kind, steps = sequence.len(), "transaction opened");
        }
        id
    }

    /// Stages `payload` under `name` for emission at commit.
    ///
    /// Staging order is irrelevant; commit always walks the declared
    /// sequence order. Staging a name twice overwrites the earlier payload.
    /// Names outside the declared sequence are stored and readable at
    /// commit but never emitted by the sequence loop.
    ///
    /// # Errors
    /// [`TxnError::UnknownTxn`] for an id that does not exist (logged, since
    /// callers commonly absorb it); [`TxnError::NotPending`] for a closed
    /// transaction.
    pub fn record(
        &mut self,
        txn: TxnId,
        name: &str,
        payload: EventPayload,
    ) -> Result<(), TxnError> {
        let debug_logging = self.config.debug_logging;
        let Some(tx) = self.live.get_mut(&txn) else {
            warn!(txn = %txn, event = name, "record against unknown transaction");
            return Err(TxnError::UnknownTxn(txn));
        };
        if tx.status != TxnStatus::Pending {
            return Err(TxnError::NotPending {
                txn,
                status: tx.status,
            });
        }
        let in_sequence = tx.sequence.contains(&name);
        tx.recorded.insert(Box::from(name), payload);
        if debug_logging {
            debug!(txn = %txn, event = name, in_sequence, "payload staged");
        }
        Ok(())
    }

    /// Emits the staged payloads in declared sequence order and closes the
    /// transaction.
    ///
    /// Each emission carries the transaction id, a fresh timestamp, and the
    /// coordinator-managed mark; mapped names go through the dual-vocabulary
    /// path so legacy listeners keep working. The two designated aggregate
    /// types additionally carry the merged chaos/balance view when both
    /// sub-payloads were staged in this transaction.
    ///
    /// Listener faults inside the bus are isolated there and never fail the
    /// commit. A staged payload that does not match its name's canonical
    /// family does: the transaction flips to [`TxnStatus::Failed`], the loop
    /// halts, and events already emitted in this commit stay emitted. The
    /// closed record stays readable until released or swept.
    ///
    /// # Errors
    /// [`TxnError::UnknownTxn`], [`TxnError::NotPending`], or the
    /// [`TxnError::PayloadShape`] fault described above.
    pub fn commit(&mut self, txn: TxnId, bus: &mut EventBus) -> Result<CommitReceipt, TxnError> {
        let debug_logging = self.config.debug_logging;
        let Some(tx) = self.live.get_mut(&txn) else {
            warn!(txn = %txn, "commit of unknown transaction");
            return Err(TxnError::UnknownTxn(txn));
        };
        if tx.status != TxnStatus::Pending {
            return Err(TxnError::NotPending {
                txn,
                status: tx.status,
            });
        }

        let combined = tx.combined_view();
        for &name in tx.sequence {
            let Some(payload) = tx.recorded.get(name) else {
                continue;
            };
            if let Some(expected) = expected_payload_label(name) {
                let found = payload.label();
                if found != expected {
                    let fault = TxnError::PayloadShape {
                        event: Box::from(name),
                        expected,
                        found,
                    };
                    tx.errors.push(fault.to_string());
                    tx.status = TxnStatus::Failed;
                    tx.closed_at = Some(self.clock.now_millis());
                    warn!(
                        txn = %txn,
                        event = name,
                        emitted = tx.emitted.len(),
                        %fault,
                        "commit halted; earlier events stay emitted"
                    );
                    return Err(fault);
                }
            }
            let opts = PublishOpts {
                timestamp: Some(self.clock.now_millis()),
                txn: Some(txn),
                coordinator_managed: true,
                combined: if attaches_combined(name) { combined } else { None },
            };
            bus.emit_standardized_with(name, payload.clone(), opts);
            tx.emitted.push(Box::from(name));
        }

        tx.status = TxnStatus::Completed;
        tx.closed_at = Some(self.clock.now_millis());
        let receipt = CommitReceipt {
            txn,
            kind: tx.kind.clone(),
            emitted: tx.emitted.clone(),
            skipped: tx.pending_events().map(Box::from).collect(),
        };
        if debug_logging {
            debug!(
                txn = %txn,
                kind = &*receipt.kind,
                emitted = receipt.emitted.len(),
                skipped = receipt.skipped.len(),
                "transaction committed"
            );
        }
        Ok(receipt)
    }

    /// Abandons a pending transaction: emits exactly one rollback
    /// notification and removes the record immediately, with no grace
    /// period. None of the staged sequence events ever reach the bus.
    ///
    /// Only pending transactions can roll back; commit closes that window.
    ///
    /// # Errors
    /// [`TxnError::UnknownTxn`] (logged) or [`TxnError::NotPending`].
    pub fn rollback(
        &mut self,
        txn: TxnId,
        bus: &mut EventBus,
        reason: &str,
    ) -> Result<(), TxnError> {
        let Some(tx) = self.live.get(&txn) else {
            warn!(txn = %txn, reason, "rollback of unknown transaction");
            return Err(TxnError::UnknownTxn(txn));
        };
        if tx.status != TxnStatus::Pending {
            return Err(TxnError::NotPending {
                txn,
                status: tx.status,
            });
        }
        let Some(mut tx) = self.live.remove(&txn) else {
            return Err(TxnError::UnknownTxn(txn));
        };
        tx.status = TxnStatus::RolledBack;
        warn!(
            txn = %txn,
            kind = &*tx.kind,
            staged = tx.recorded.len(),
            reason,
            "transaction rolled back"
        );
        bus.publish_with(
            SYSTEM_TRANSACTION_ROLLEDBACK,
            EventPayload::RolledBack(RollbackNotice {
                txn,
                kind: tx.kind,
                reason: Box::from(reason),
            }),
            PublishOpts {
                txn: Some(txn),
                coordinator_managed: true,
                ..PublishOpts::default()
            },
        );
        Ok(())
    }

    /// Drops a closed transaction record once its owner is done reading it.
    ///
    /// Returns `false` for unknown ids (tolerated) and for pending
    /// transactions, which must commit or roll back first.
    pub fn release(&mut self, txn: TxnId) -> bool {
        match self.live.get(&txn) {
            None => false,
            Some(tx) if tx.status == TxnStatus::Pending => {
                warn!(txn = %txn, "release of a pending transaction refused");
                false
            }
            Some(_) => {
                self.live.remove(&txn);
                if self.config.debug_logging {
                    debug!(txn = %txn, "transaction record released");
                }
                true
            }
        }
    }

    /// Drops closed records older than the configured grace period.
    ///
    /// Advisory only: owners release explicitly, and no correctness may
    /// depend on when the sweep runs. Returns the number of records dropped.
    pub fn sweep_expired(&mut self) -> usize {
        let now = self.clock.now_millis();
        let grace = self.config.release_grace_ms;
        let before = self.live.len();
        self.live.retain(|_, tx| match tx.closed_at {
            Some(closed) => now.saturating_sub(closed) <= grace,
            None => true,
        });
        let dropped = before - self.live.len();
        if dropped > 0 && self.config.debug_logging {
            debug!(dropped, "expired transaction records swept");
        }
        dropped
    }

    /// Borrows a transaction record, live or closed-but-unreleased.
    #[must_use]
    pub fn transaction(&self, txn: TxnId) -> Option<&Transaction> {
        self.live.get(&txn)
    }

    /// Number of records in the table, pending and closed alike.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Whether `txn` exists and is still pending.
    #[must_use]
    pub fn is_pending(&self, txn: TxnId) -> bool {
        self.live
            .get(&txn)
            .is_some_and(|tx| tx.status == TxnStatus::Pending)
    }

    /// Flips lifecycle debug tracing.
    pub fn set_debug_logging(&mut self, enabled: bool) {
        self.config.debug_logging = enabled;
    }

    /// Borrows the current config.
    #[must_use]
    pub const fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Rolls back every pending transaction (one notification each, in id
    /// order) and clears the table.
    pub fn teardown(&mut self, bus: &mut EventBus) {
        let mut pending: Vec<TxnId> = self
            .live
            .values()
            .filter(|tx| tx.status == TxnStatus::Pending)
            .map(Transaction::id)
            .collect();
        pending.sort_unstable();
        for txn in pending {
            // Pending by construction; the rollback cannot fail.
            let _ = self.rollback(txn, bus, "coordinator teardown");
        }
        self.live.clear();
    }
}
