// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Subscriber records and the ordered registry that owns them.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use super::{Event, EventBus, EventKind};

/// The callable stored for every registration.
///
/// The callback receives the event and the bus that is dispatching it, so it
/// may subscribe, unsubscribe or dispatch further events from inside the call.
pub type EventCallback = dyn Fn(&Event, &mut EventBus) + Send + Sync;

static NEXT_REGISTRY_ID: AtomicU32 = AtomicU32::new(1);

/// A non-owning reference to one registration, used only for removal.
///
/// Handles compare by identity: registering the same callback twice yields
/// two different handles. A handle issued by one bus never matches an entry
/// of another bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberHandle {
    registry: u32,
    serial: u64,
}

struct Subscriber {
    handle: SubscriberHandle,
    kind: EventKind,
    callback: Arc<EventCallback>,
}

/// Insertion-ordered storage of subscribers.
pub(crate) struct SubscriberRegistry {
    id: u32,
    next_serial: u64,
    entries: Vec<Subscriber>,
    // Mirrors the handles in `entries`.
    live: HashSet<SubscriberHandle>,
}

impl SubscriberRegistry {
    pub(crate) fn new() -> Self {
        Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            next_serial: 0,
            entries: Vec::new(),
            live: HashSet::new(),
        }
    }

    pub(crate) fn insert(&mut self, kind: EventKind, callback: Arc<EventCallback>) -> SubscriberHandle {
        let handle = SubscriberHandle {
            registry: self.id,
            serial: self.next_serial,
        };
        self.next_serial += 1;
        self.live.insert(handle);
        self.entries.push(Subscriber {
            handle,
            kind,
            callback,
        });
        handle
    }

    /// Removes the entry with this exact handle, keeping the order of the rest.
    pub(crate) fn remove(&mut self, handle: SubscriberHandle) -> bool {
        if !self.live.remove(&handle) {
            return false;
        }
        match self.entries.iter().position(|s| s.handle == handle) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn contains(&self, handle: SubscriberHandle) -> bool {
        self.live.contains(&handle)
    }

    /// Snapshots the subscribers of `kind`, in registration order.
    pub(crate) fn matching(&self, kind: EventKind) -> Vec<(SubscriberHandle, Arc<EventCallback>)> {
        self.entries
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| (s.handle, Arc::clone(&s.callback)))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn count_for(&self, kind: EventKind) -> usize {
        self.entries.iter().filter(|s| s.kind == kind).count()
    }
}
