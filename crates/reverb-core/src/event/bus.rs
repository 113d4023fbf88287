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

use std::collections::VecDeque;
use std::sync::Arc;

use super::subscriber::SubscriberRegistry;
use super::{Event, EventCallback, EventKind, SubscriberHandle};

/// Owns the subscriber registry and the queue of pending events.
///
/// The bus is constructed once by the owning runtime and handed to whoever
/// needs it by reference. Every mutating operation takes `&mut self`, so
/// callers sharing it across threads must serialize access themselves. The
/// only exception is [`QueuedSender`], which appends through a channel.
///
/// Dropping the bus discards any event still queued without delivering it.
pub struct EventBus {
    registry: SubscriberRegistry,
    queue: VecDeque<Event>,
    // Empty outside of update(); swapped in as the next queue.
    spare: VecDeque<Event>,
    inbox_tx: flume::Sender<Event>,
    inbox_rx: flume::Receiver<Event>,
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        let (inbox_tx, inbox_rx) = flume::unbounded();
        log::info!("EventBus initialized.");
        Self {
            registry: SubscriberRegistry::new(),
            queue: VecDeque::new(),
            spare: VecDeque::new(),
            inbox_tx,
            inbox_rx,
        }
    }

    /// Registers `callback` for every event of `kind`.
    ///
    /// Registrations are never deduplicated. Each one is invoked once per
    /// matching event, in registration order.
    ///
    /// ## Returns
    /// A handle to pass to [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe<F>(&mut self, kind: EventKind, callback: F) -> SubscriberHandle
    where
        F: Fn(&Event, &mut EventBus) + Send + Sync + 'static,
    {
        let callback: Arc<EventCallback> = Arc::new(callback);
        let handle = self.registry.insert(kind, callback);
        log::trace!("Subscribed {handle:?} to {kind}.");
        handle
    }

    /// Registers a plain function together with a context value that is
    /// passed back on every call.
    pub fn subscribe_with<T>(
        &mut self,
        kind: EventKind,
        user_data: Arc<T>,
        callback: fn(&Event, &T, &mut EventBus),
    ) -> SubscriberHandle
    where
        T: Send + Sync + 'static,
    {
        self.subscribe(kind, move |event, bus| callback(event, &user_data, bus))
    }

    /// Removes the registration behind `handle`.
    ///
    /// Unknown handles, including ones already removed or issued by another
    /// bus, are ignored.
    ///
    /// ## Returns
    /// `true` if a registration was removed.
    pub fn unsubscribe(&mut self, handle: SubscriberHandle) -> bool {
        let removed = self.registry.remove(handle);
        if removed {
            log::trace!("Unsubscribed {handle:?}.");
        } else {
            log::debug!("Ignoring unsubscribe of unknown handle {handle:?}.");
        }
        removed
    }

    /// Returns `true` while `handle` refers to a live registration.
    pub fn is_subscribed(&self, handle: SubscriberHandle) -> bool {
        self.registry.contains(handle)
    }

    /// Returns the total number of registrations.
    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    /// Returns the number of registrations listening for `kind`.
    pub fn subscriber_count_for(&self, kind: EventKind) -> usize {
        self.registry.count_for(kind)
    }

    /// Delivers `event` to every matching subscriber before returning.
    ///
    /// Subscribers run in registration order. The set of subscribers is fixed
    /// when the call starts: ones registered by a callback during this
    /// dispatch are not invoked, and ones removed before their turn are
    /// skipped.
    pub fn dispatch_immediate(&mut self, event: Event) {
        self.deliver(&event);
    }

    /// Appends `event` to the back of the queue for the next [`update`](Self::update).
    ///
    /// Events already sent through a [`QueuedSender`] are queued ahead of it,
    /// so delivery follows arrival order across both paths.
    pub fn dispatch_queued(&mut self, event: Event) {
        log::trace!("Queueing {} event.", event.kind());
        self.collect_inbox();
        self.queue.push_back(event);
    }

    /// Returns a cloneable handle for queueing events from other threads.
    pub fn queued_sender(&self) -> QueuedSender {
        QueuedSender {
            sender: self.inbox_tx.clone(),
        }
    }

    /// Returns the number of events waiting for the next update.
    ///
    /// Events sent through a [`QueuedSender`] but not yet collected are counted.
    pub fn pending_count(&self) -> usize {
        self.queue.len() + self.inbox_rx.len()
    }

    /// Drops every pending event without delivering it.
    ///
    /// ## Returns
    /// The number of events discarded.
    pub fn clear_queue(&mut self) -> usize {
        let discarded = self.queue.len() + self.inbox_rx.drain().count();
        self.queue.clear();
        discarded
    }

    /// Drains the queue. Meant to be called once per tick.
    ///
    /// Every event pending when the call starts, including ones sent through
    /// a [`QueuedSender`], is handed to its subscribers in arrival order.
    /// Events queued by subscribers while this runs are left for the next call.
    ///
    /// ## Returns
    /// The number of events processed, whether or not any subscriber matched.
    pub fn update(&mut self) -> usize {
        self.collect_inbox();
        if self.queue.is_empty() {
            return 0;
        }

        let mut batch = std::mem::replace(&mut self.queue, std::mem::take(&mut self.spare));
        let processed = batch.len();
        log::trace!("Draining {processed} queued event(s).");

        while let Some(event) = batch.pop_front() {
            self.deliver(&event);
        }

        self.spare = batch;
        processed
    }

    fn collect_inbox(&mut self) {
        self.queue.extend(self.inbox_rx.try_iter());
    }

    fn deliver(&mut self, event: &Event) {
        let kind = event.kind();
        let targets = self.registry.matching(kind);
        if targets.is_empty() {
            log::trace!("No subscribers for {kind} event.");
            return;
        }

        log::trace!("Dispatching {kind} event to {} subscriber(s).", targets.len());
        for (handle, callback) in targets {
            if !self.registry.contains(handle) {
                continue;
            }
            callback(event, self);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        let discarded = self.clear_queue();
        if discarded > 0 {
            log::debug!("EventBus dropped with {discarded} undelivered event(s).");
        }
    }
}

/// A cloneable, thread-safe handle for queueing events.
///
/// Events sent here join the bus queue in arrival order, no later than the
/// next [`EventBus::update`].
#[derive(Debug, Clone)]
pub struct QueuedSender {
    sender: flume::Sender<Event>,
}

impl QueuedSender {
    /// Queues an event, logging an error if the bus has been dropped.
    pub fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event) {
            log::error!("Failed to queue event: {e}. EventBus likely dropped.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ThemeId;
    use std::sync::Mutex;
    use std::thread;

    const THEME: ThemeId = ThemeId::new(1);

    type Log = Arc<Mutex<Vec<String>>>;

    fn new_log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    /// Subscribes a callback that records `label:audio_id` for each event.
    fn record(bus: &mut EventBus, kind: EventKind, log: &Log, label: &'static str) -> SubscriberHandle {
        let log = Arc::clone(log);
        bus.subscribe(kind, move |event, _bus| {
            log.lock()
                .unwrap()
                .push(format!("{label}:{}", event.audio_id()));
        })
    }

    #[test]
    fn event_bus_creation() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn immediate_dispatch_follows_registration_order() {
        let mut bus = EventBus::new();
        let log = new_log();
        record(&mut bus, EventKind::MusicEnd, &log, "s1");
        record(&mut bus, EventKind::MusicEnd, &log, "s2");
        record(&mut bus, EventKind::MusicEnd, &log, "s3");

        bus.dispatch_immediate(Event::music_end(THEME, "t"));

        assert_eq!(entries(&log), vec!["s1:t", "s2:t", "s3:t"]);
    }

    #[test]
    fn subscribers_only_see_their_kind() {
        let mut bus = EventBus::new();
        let log = new_log();
        record(&mut bus, EventKind::MusicEnd, &log, "end");
        record(&mut bus, EventKind::MusicChange, &log, "change");

        bus.dispatch_immediate(Event::music_change(THEME, "next"));
        bus.dispatch_immediate(Event::music_transition(THEME, "fade", 0.5));

        assert_eq!(entries(&log), vec!["change:next"]);
    }

    #[test]
    fn duplicate_registrations_each_receive_the_event() {
        let mut bus = EventBus::new();
        let log = new_log();
        let first = record(&mut bus, EventKind::MusicEnd, &log, "dup");
        let second = record(&mut bus, EventKind::MusicEnd, &log, "dup");
        assert_ne!(first, second);

        bus.dispatch_immediate(Event::music_end(THEME, "t"));
        assert_eq!(entries(&log).len(), 2);

        bus.unsubscribe(first);
        bus.dispatch_immediate(Event::music_end(THEME, "t"));
        assert_eq!(entries(&log).len(), 3);
    }

    #[test]
    fn dispatch_without_subscribers_is_a_no_op() {
        let mut bus = EventBus::new();
        bus.dispatch_immediate(Event::music_end(THEME, "nobody"));
        assert_eq!(bus.update(), 0);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let mut bus = EventBus::new();
        let log = new_log();
        let gone = record(&mut bus, EventKind::MusicEnd, &log, "gone");
        record(&mut bus, EventKind::MusicEnd, &log, "kept");

        assert!(bus.unsubscribe(gone));
        assert!(!bus.unsubscribe(gone));
        assert!(!bus.is_subscribed(gone));

        let mut other = EventBus::new();
        let foreign = record(&mut other, EventKind::MusicEnd, &log, "foreign");
        assert!(!bus.unsubscribe(foreign));

        bus.dispatch_immediate(Event::music_end(THEME, "t"));
        assert_eq!(entries(&log), vec!["kept:t"]);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn queued_events_wait_for_update() {
        let mut bus = EventBus::new();
        let log = new_log();
        record(&mut bus, EventKind::MusicEnd, &log, "end");
        record(&mut bus, EventKind::MusicChange, &log, "change");

        bus.dispatch_queued(Event::music_end(THEME, "a"));
        bus.dispatch_queued(Event::music_change(THEME, "b"));
        assert!(entries(&log).is_empty());
        assert_eq!(bus.pending_count(), 2);

        assert_eq!(bus.update(), 2);
        assert_eq!(entries(&log), vec!["end:a", "change:b"]);
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn update_defers_events_queued_during_drain() {
        let mut bus = EventBus::new();
        let count = Arc::new(Mutex::new(0u32));
        let seen = Arc::clone(&count);
        bus.subscribe(EventKind::MusicTransition, move |event, bus| {
            *seen.lock().unwrap() += 1;
            bus.dispatch_queued(event.clone());
        });

        bus.dispatch_queued(Event::music_transition(THEME, "loop", 1.0));

        assert_eq!(bus.update(), 1);
        assert_eq!(*count.lock().unwrap(), 1);
        assert_eq!(bus.pending_count(), 1);

        assert_eq!(bus.update(), 1);
        assert_eq!(*count.lock().unwrap(), 2);
        assert_eq!(bus.pending_count(), 1);
    }

    #[test]
    fn unsubscribing_unvisited_subscriber_mid_dispatch_skips_it() {
        let mut bus = EventBus::new();
        let log = new_log();
        let victim: Arc<Mutex<Option<SubscriberHandle>>> = Arc::new(Mutex::new(None));

        let target = Arc::clone(&victim);
        let first_log = Arc::clone(&log);
        bus.subscribe(EventKind::MusicEnd, move |_event, bus| {
            first_log.lock().unwrap().push("first".to_string());
            if let Some(handle) = target.lock().unwrap().take() {
                bus.unsubscribe(handle);
            }
        });
        let second = record(&mut bus, EventKind::MusicEnd, &log, "second");
        record(&mut bus, EventKind::MusicEnd, &log, "third");
        *victim.lock().unwrap() = Some(second);

        bus.dispatch_immediate(Event::music_end(THEME, "t"));

        assert_eq!(entries(&log), vec!["first", "third:t"]);
        assert!(!bus.is_subscribed(second));
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn subscriber_removing_itself_mid_dispatch_runs_once() {
        let mut bus = EventBus::new();
        let log = new_log();
        let own: Arc<Mutex<Option<SubscriberHandle>>> = Arc::new(Mutex::new(None));

        let slot = Arc::clone(&own);
        let once_log = Arc::clone(&log);
        let handle = bus.subscribe(EventKind::MusicEnd, move |event, bus| {
            once_log
                .lock()
                .unwrap()
                .push(format!("once:{}", event.audio_id()));
            if let Some(handle) = *slot.lock().unwrap() {
                bus.unsubscribe(handle);
            }
        });
        *own.lock().unwrap() = Some(handle);
        record(&mut bus, EventKind::MusicEnd, &log, "after");

        bus.dispatch_immediate(Event::music_end(THEME, "a"));
        bus.dispatch_immediate(Event::music_end(THEME, "b"));

        assert_eq!(entries(&log), vec!["once:a", "after:a", "after:b"]);
        assert!(!bus.is_subscribed(handle));
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn unsubscribing_visited_subscriber_mid_dispatch_keeps_its_call() {
        let mut bus = EventBus::new();
        let log = new_log();
        let first = record(&mut bus, EventKind::MusicEnd, &log, "first");

        let remover_log = Arc::clone(&log);
        bus.subscribe(EventKind::MusicEnd, move |_event, bus| {
            remover_log.lock().unwrap().push("remover".to_string());
            bus.unsubscribe(first);
        });
        record(&mut bus, EventKind::MusicEnd, &log, "last");

        bus.dispatch_immediate(Event::music_end(THEME, "a"));
        assert_eq!(entries(&log), vec!["first:a", "remover", "last:a"]);

        bus.dispatch_immediate(Event::music_end(THEME, "b"));
        assert_eq!(
            entries(&log),
            vec!["first:a", "remover", "last:a", "remover", "last:b"]
        );
        assert!(!bus.is_subscribed(first));
    }

    #[test]
    fn subscriber_added_mid_dispatch_runs_from_next_dispatch() {
        let mut bus = EventBus::new();
        let log = new_log();
        let added = Arc::new(Mutex::new(false));

        let flag = Arc::clone(&added);
        let late_log = Arc::clone(&log);
        bus.subscribe(EventKind::MusicChange, move |_event, bus| {
            let mut done = flag.lock().unwrap();
            if !*done {
                *done = true;
                let log = Arc::clone(&late_log);
                bus.subscribe(EventKind::MusicChange, move |event, _bus| {
                    log.lock().unwrap().push(format!("late:{}", event.audio_id()));
                });
            }
        });

        bus.dispatch_immediate(Event::music_change(THEME, "one"));
        assert!(entries(&log).is_empty());

        bus.dispatch_immediate(Event::music_change(THEME, "two"));
        assert_eq!(entries(&log), vec!["late:two"]);
    }

    #[test]
    fn nested_immediate_dispatch_completes_before_outer_continues() {
        let mut bus = EventBus::new();
        let log = new_log();
        let outer_log = Arc::clone(&log);
        bus.subscribe(EventKind::MusicEnd, move |event, bus| {
            outer_log.lock().unwrap().push("end".to_string());
            bus.dispatch_immediate(Event::music_change(event.theme(), "next"));
        });
        record(&mut bus, EventKind::MusicChange, &log, "change");
        record(&mut bus, EventKind::MusicEnd, &log, "end-after");

        bus.dispatch_immediate(Event::music_end(THEME, "prev"));

        assert_eq!(entries(&log), vec!["end", "change:next", "end-after:prev"]);
    }

    #[test]
    fn subscribe_with_forwards_user_data() {
        struct Counter {
            hits: Mutex<Vec<f32>>,
        }

        fn on_transition(event: &Event, counter: &Counter, _bus: &mut EventBus) {
            if let Event::MusicTransition(payload) = event {
                counter.hits.lock().unwrap().push(payload.time_left);
            }
        }

        let mut bus = EventBus::new();
        let counter = Arc::new(Counter {
            hits: Mutex::new(Vec::new()),
        });
        bus.subscribe_with(EventKind::MusicTransition, Arc::clone(&counter), on_transition);

        bus.dispatch_immediate(Event::music_transition(THEME, "t", 3.0));
        assert_eq!(*counter.hits.lock().unwrap(), vec![3.0]);
    }

    #[test]
    fn queued_sender_from_thread_is_delivered_on_update() {
        let mut bus = EventBus::new();
        let log = new_log();
        record(&mut bus, EventKind::MusicEnd, &log, "end");
        let sender = bus.queued_sender();

        let handle = thread::spawn(move || {
            sender.send(Event::music_end(THEME, "from-thread"));
        });
        handle.join().expect("Thread join failed");

        assert!(entries(&log).is_empty());
        assert_eq!(bus.pending_count(), 1);
        assert_eq!(bus.update(), 1);
        assert_eq!(entries(&log), vec!["end:from-thread"]);
    }

    #[test]
    fn local_then_sender_events_keep_arrival_order() {
        let mut bus = EventBus::new();
        let log = new_log();
        record(&mut bus, EventKind::MusicEnd, &log, "end");
        let sender = bus.queued_sender();

        bus.dispatch_queued(Event::music_end(THEME, "local"));
        sender.send(Event::music_end(THEME, "remote"));
        bus.update();

        assert_eq!(entries(&log), vec!["end:local", "end:remote"]);
    }

    #[test]
    fn sender_then_local_events_keep_arrival_order() {
        let mut bus = EventBus::new();
        let log = new_log();
        record(&mut bus, EventKind::MusicEnd, &log, "end");
        record(&mut bus, EventKind::MusicChange, &log, "change");
        let sender = bus.queued_sender();

        sender.send(Event::music_end(THEME, "first"));
        bus.dispatch_queued(Event::music_change(THEME, "second"));
        sender.send(Event::music_end(THEME, "third"));
        bus.dispatch_queued(Event::music_change(THEME, "fourth"));
        assert_eq!(bus.pending_count(), 4);
        assert_eq!(bus.update(), 4);

        assert_eq!(
            entries(&log),
            vec!["end:first", "change:second", "end:third", "change:fourth"]
        );
    }

    #[test]
    fn update_counts_events_without_subscribers() {
        let mut bus = EventBus::new();
        bus.dispatch_queued(Event::music_end(THEME, "unheard"));
        bus.dispatch_queued(Event::music_change(THEME, "unheard"));

        assert_eq!(bus.update(), 2);
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn clear_queue_discards_pending_events() {
        let mut bus = EventBus::new();
        let log = new_log();
        record(&mut bus, EventKind::MusicEnd, &log, "end");
        bus.dispatch_queued(Event::music_end(THEME, "a"));
        bus.queued_sender().send(Event::music_end(THEME, "b"));

        assert_eq!(bus.clear_queue(), 2);
        assert_eq!(bus.update(), 0);
        assert!(entries(&log).is_empty());
    }

    #[test]
    fn send_after_bus_drop_does_not_panic() {
        let mut bus = EventBus::new();
        bus.dispatch_queued(Event::music_end(THEME, "never"));
        let sender = bus.queued_sender();

        drop(bus);
        sender.send(Event::music_end(THEME, "late"));
    }
}
