// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Recording listener for delivery assertions.

use std::cell::RefCell;
use std::rc::Rc;

use pulse_core::bus::{EventBus, ListenerId};
use pulse_core::event::Event;

/// Listener double that records every event delivered to it.
///
/// One probe can subscribe to any number of topics on any number of buses;
/// all deliveries land in the same log, in delivery order, which is what
/// ordering assertions want.
#[derive(Debug, Default, Clone)]
pub struct EventProbe {
    events: Rc<RefCell<Vec<Event>>>,
}

impl EventProbe {
    /// Probe with an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers this probe for `name` on `bus`.
    pub fn subscribe(&self, bus: &mut EventBus, name: &str) -> ListenerId {
        let events = Rc::clone(&self.events);
        bus.register(name, move |_bus, event| {
            events.borrow_mut().push(event.clone());
            Ok(())
        })
    }

    /// Registers this probe for every name in `names`, in order.
    pub fn subscribe_all(&self, bus: &mut EventBus, names: &[&str]) -> Vec<ListenerId> {
        names
            .iter()
            .map(|name| self.subscribe(bus, name))
            .collect()
    }

    /// Delivered event names, in delivery order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .map(|event| event.name.to_string())
            .collect()
    }

    /// Clones of the delivered events, in delivery order.
    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Number of deliveries recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    /// `true` until the first delivery.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}
