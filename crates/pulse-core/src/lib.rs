// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! pulse-core: re-entrancy-safe in-process event bus with dual-vocabulary
//! name migration and transactional sequencing.
//!
//! Three layers, leaves first:
//!
//! - [`registry`] — the static legacy↔standardized name mapping table with
//!   deprecation metadata.
//! - [`bus`] — listener registration, the FIFO drain loop, fault-isolated
//!   dispatch, dual-vocabulary emission, and migration diagnostics.
//! - [`txn`] + [`actions`] — the transaction coordinator that batches
//!   causally related payloads and emits them at commit in a declared
//!   canonical order, plus the named orchestration helpers that drive it.
//!
//! Everything is single-threaded by contract: the host constructs one
//! [`EventBus`], one [`TransactionCoordinator`], and one [`World`], owns
//! them side by side, and tears them down explicitly. There are no global
//! instances, no interior locking, and no async.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]

pub mod actions;
pub mod bus;
pub mod clock;
pub mod config;
pub mod constants;
pub mod event;
pub mod payload;
pub mod registry;
pub mod stats;
pub mod topic;
pub mod txn;
pub mod world;

// Re-exports for the stable public API.
/// Orchestration helpers and their outcome/error types.
pub use actions::{
    advance_turn, change_resource, interact_tile, move_player, sense_tile, stabilize_tile,
    ActionError, InteractOutcome, MoveOutcome, ResourceOutcome, SenseOutcome, StabilizeOutcome,
    TurnOutcome,
};
/// The bus and its registration/emission surface.
pub use bus::{DualOpts, EventBus, Handler, ListenerError, ListenerId, PublishOpts};
/// Clock seam for injectable time.
pub use clock::{system_clock, Clock, ClockHandle, SystemClock};
/// Construction-time settings.
pub use config::{BusConfig, CoordinatorConfig};
/// The event envelope delivered to listeners.
pub use event::{Event, EventMeta};
/// Canonical typed payloads.
pub use payload::{
    ActionKind, ActionReport, BalanceChange, ChaosChange, CombinedState, EventPayload, Outcome,
    ResourceChange, RollbackNotice, RunReport, StatsSnapshot, TileMutation, TileReveal,
    TraitChange, TurnInfo, TurnPhase,
};
/// The name mapping table and its standardized name constants.
pub use registry::{Category, Deprecation, NameMapping, NameRegistry, RegistryError};
/// Migration reporting surface.
pub use stats::{MigrationReadiness, MigrationReport, MigrationSnapshot};
/// Vocabulary classification and topic interning.
pub use topic::{Topic, TopicId, TopicTable, Vocabulary};
/// Transactional sequencing.
pub use txn::{
    sequence_for, CommitReceipt, Transaction, TransactionCoordinator, TxnError, TxnId, TxnStatus,
};
/// Domain collaborators the helpers mutate.
pub use world::{
    CellKind, GridCell, HexGrid, PlayerState, ResourceError, ResourceKind, World, WorldBalance,
};
