// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The event envelope delivered to listeners.

use serde::{Deserialize, Serialize};

use crate::payload::{CombinedState, EventPayload};
use crate::topic::TopicId;
use crate::txn::TxnId;

/// Delivery metadata stamped on every event at enqueue time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventMeta {
    /// Milliseconds since the Unix epoch. Producers may supply one; the bus
    /// fills it from its clock when absent.
    pub timestamp: u64,
    /// Cached vocabulary of the topic: `true` for standardized names.
    pub standardized: bool,
    /// Transaction that emitted this event, for commit-path emissions.
    pub txn: Option<TxnId>,
    /// `true` when the coordinator, not a direct publisher, emitted this.
    pub coordinator_managed: bool,
    /// Merged chaos/balance view, attached to designated aggregate events.
    pub combined: Option<CombinedState>,
}

impl Default for EventMeta {
    fn default() -> Self {
        Self {
            timestamp: 0,
            standardized: false,
            txn: None,
            coordinator_managed: false,
            combined: None,
        }
    }
}

/// One notification, queued exactly once and never mutated after enqueue.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Interned topic handle.
    pub topic: TopicId,
    /// Canonical event name.
    pub name: Box<str>,
    /// Typed payload.
    pub payload: EventPayload,
    /// Delivery metadata.
    pub meta: EventMeta,
}
