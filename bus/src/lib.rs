#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Synchronous publish/subscribe bus connecting the Skirmish components.
//!
//! A single [`EventBus`] is constructed when the process starts and handed to
//! every component that needs to talk to the others. Subscriptions are keyed
//! by a [`Topic`]: the [`EventKind`] of the event plus an optional filter
//! string, which the state store uses to address per-character listeners.
//!
//! Delivery is synchronous and ordered. [`EventBus::publish`] invokes the
//! subscribers of the unfiltered topic in registration order, then those of
//! the filtered topic, and returns once all of them ran. Every subscriber
//! receives its own clone of the event. A subscriber that fails or panics is
//! logged and skipped; the remaining subscribers still run.

mod reactor;

use std::{
    cell::RefCell,
    collections::HashMap,
    fmt,
    panic::{self, AssertUnwindSafe},
    rc::Rc,
};

use skirmish_core::{Event, EventKind};
use thiserror::Error;

pub use reactor::{attach, Outbound, Reactor};

/// Identity of a component owning subscriptions.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(String);

impl SubscriberId {
    /// Wraps the provided identity.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrowed string form of the identity.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubscriberId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Subscription key made of an event kind and an optional filter.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Topic {
    kind: EventKind,
    filter: Option<String>,
}

impl Topic {
    /// Topic receiving every event of `kind`.
    #[must_use]
    pub const fn new(kind: EventKind) -> Self {
        Self { kind, filter: None }
    }

    /// Topic receiving events of `kind` published with `filter`.
    #[must_use]
    pub fn filtered(kind: EventKind, filter: impl Into<String>) -> Self {
        Self {
            kind,
            filter: Some(filter.into()),
        }
    }

    /// Event kind of the topic.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// Filter of the topic, if any.
    #[must_use]
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }
}

impl From<EventKind> for Topic {
    fn from(kind: EventKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.filter {
            Some(filter) => write!(f, "{}+{filter}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Errors reported by the bus.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BusError {
    /// The subscriber already holds a registration for the topic.
    #[error("subscriber `{subscriber}` is already registered on `{topic}`")]
    DuplicateSubscription {
        /// Identity that attempted to register twice.
        subscriber: SubscriberId,
        /// Topic of the existing registration.
        topic: Topic,
    },
}

type Handler = Rc<dyn Fn(Event) -> anyhow::Result<()>>;

struct Subscription {
    subscriber: SubscriberId,
    handler: Handler,
}

/// Synchronous, single-threaded publish/subscribe bus.
#[derive(Default)]
pub struct EventBus {
    registry: RefCell<HashMap<Topic, Vec<Subscription>>>,
}

impl EventBus {
    /// Creates a bus without subscriptions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `topic` on behalf of `subscriber`.
    ///
    /// Fails when the subscriber already listens on the exact same topic, so
    /// re-initialised components cannot silently double-register.
    pub fn subscribe<F>(
        &self,
        topic: impl Into<Topic>,
        subscriber: &SubscriberId,
        handler: F,
    ) -> Result<(), BusError>
    where
        F: Fn(Event) -> anyhow::Result<()> + 'static,
    {
        let topic = topic.into();
        let mut registry = self.registry.borrow_mut();
        let subscriptions = registry.entry(topic.clone()).or_default();
        if subscriptions
            .iter()
            .any(|subscription| &subscription.subscriber == subscriber)
        {
            return Err(BusError::DuplicateSubscription {
                subscriber: subscriber.clone(),
                topic,
            });
        }

        tracing::trace!(%topic, %subscriber, "subscribed");
        subscriptions.push(Subscription {
            subscriber: subscriber.clone(),
            handler: Rc::new(handler),
        });
        Ok(())
    }

    /// Reports whether `subscriber` holds a registration for `topic`.
    #[must_use]
    pub fn is_subscribed(&self, topic: &Topic, subscriber: &SubscriberId) -> bool {
        self.registry.borrow().get(topic).is_some_and(|subscriptions| {
            subscriptions
                .iter()
                .any(|subscription| &subscription.subscriber == subscriber)
        })
    }

    /// Delivers `event` to the unfiltered topic and, when `filter` is given,
    /// to the matching filtered topic.
    ///
    /// Returns after every matching subscriber ran. Subscriptions added while
    /// the event is being delivered do not receive it.
    pub fn publish(&self, event: Event, filter: Option<&str>) {
        let kind = event.kind();
        let recipients = self.recipients(kind, filter);
        if recipients.is_empty() {
            tracing::debug!(topic = %kind, ?filter, "no subscribers for event");
            return;
        }

        for (subscriber, handler) in recipients {
            let copy = event.clone();
            match panic::catch_unwind(AssertUnwindSafe(|| handler(copy))) {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    tracing::error!(
                        topic = %kind,
                        ?filter,
                        %subscriber,
                        error = %format!("{error:#}"),
                        "listener failed"
                    );
                }
                Err(_) => {
                    tracing::error!(topic = %kind, ?filter, %subscriber, "listener panicked");
                }
            }
        }
    }

    /// Removes every registration held by `subscriber`.
    ///
    /// Returns the number of registrations removed.
    pub fn unsubscribe(&self, subscriber: &SubscriberId) -> usize {
        let mut registry = self.registry.borrow_mut();
        let mut removed = 0;
        for subscriptions in registry.values_mut() {
            let before = subscriptions.len();
            subscriptions.retain(|subscription| &subscription.subscriber != subscriber);
            removed += before - subscriptions.len();
        }
        registry.retain(|_, subscriptions| !subscriptions.is_empty());
        tracing::trace!(%subscriber, removed, "unsubscribed");
        removed
    }

    /// Drops every registration.
    pub fn reset(&self) {
        self.registry.borrow_mut().clear();
    }

    /// Total number of registrations across all topics.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.registry.borrow().values().map(Vec::len).sum()
    }

    fn recipients(&self, kind: EventKind, filter: Option<&str>) -> Vec<(SubscriberId, Handler)> {
        let registry = self.registry.borrow();
        let unfiltered = registry.get(&Topic::new(kind));
        let filtered = filter.and_then(|filter| registry.get(&Topic::filtered(kind, filter)));

        unfiltered
            .into_iter()
            .chain(filtered)
            .flatten()
            .map(|subscription| {
                (
                    subscription.subscriber.clone(),
                    Rc::clone(&subscription.handler),
                )
            })
            .collect()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<String>>>, Rc<RefCell<Vec<String>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        (Rc::clone(&log), log)
    }

    #[test]
    fn duplicate_subscription_fails_on_second_call() {
        let bus = EventBus::new();
        let store = SubscriberId::from("store");

        bus.subscribe(EventKind::TurnEnd, &store, |_| Ok(()))
            .expect("first registration");
        let error = bus
            .subscribe(EventKind::TurnEnd, &store, |_| Ok(()))
            .expect_err("second registration");

        assert_eq!(
            error,
            BusError::DuplicateSubscription {
                subscriber: store.clone(),
                topic: Topic::new(EventKind::TurnEnd),
            }
        );
        assert_eq!(bus.subscription_count(), 1);
    }

    #[test]
    fn distinct_filters_are_distinct_keys() {
        let bus = EventBus::new();
        let view = SubscriberId::from("view");

        bus.subscribe(EventKind::PositionChanged, &view, |_| Ok(()))
            .expect("unfiltered");
        bus.subscribe(
            Topic::filtered(EventKind::PositionChanged, "Rook"),
            &view,
            |_| Ok(()),
        )
        .expect("filtered");
        bus.subscribe(EventKind::PositionChanged, &SubscriberId::from("other"), |_| {
            Ok(())
        })
        .expect("other identity");

        assert_eq!(bus.subscription_count(), 3);
        assert!(bus.is_subscribed(&Topic::filtered(EventKind::PositionChanged, "Rook"), &view));
    }

    #[test]
    fn unfiltered_subscribers_run_before_filtered_ones() {
        let bus = EventBus::new();
        let (log, sink) = recorder();

        for (name, topic) in [
            ("filtered", Topic::filtered(EventKind::TurnEnd, "x")),
            ("first", Topic::new(EventKind::TurnEnd)),
            ("second", Topic::new(EventKind::TurnEnd)),
            ("ignored", Topic::filtered(EventKind::TurnEnd, "y")),
        ] {
            let sink = Rc::clone(&sink);
            bus.subscribe(topic, &SubscriberId::from(name), move |_| {
                sink.borrow_mut().push(name.to_owned());
                Ok(())
            })
            .expect("subscribe");
        }

        bus.publish(Event::TurnEnd, Some("x"));

        assert_eq!(*log.borrow(), vec!["first", "second", "filtered"]);
    }

    #[test]
    fn failing_listeners_do_not_stop_delivery() {
        let bus = EventBus::new();
        let (log, sink) = recorder();

        bus.subscribe(EventKind::TurnEnd, &SubscriberId::from("broken"), |_| {
            anyhow::bail!("listener rejected the event")
        })
        .expect("subscribe");
        bus.subscribe(EventKind::TurnEnd, &SubscriberId::from("panicky"), |_| {
            panic!("listener exploded")
        })
        .expect("subscribe");
        let tail = Rc::clone(&sink);
        bus.subscribe(EventKind::TurnEnd, &SubscriberId::from("tail"), move |_| {
            tail.borrow_mut().push("tail".to_owned());
            Ok(())
        })
        .expect("subscribe");

        bus.publish(Event::TurnEnd, None);

        assert_eq!(*log.borrow(), vec!["tail"]);
    }

    #[test]
    fn unsubscribe_removes_every_registration() {
        let bus = EventBus::new();
        let view = SubscriberId::from("view");
        bus.subscribe(EventKind::TurnEnd, &view, |_| Ok(()))
            .expect("subscribe");
        bus.subscribe(Topic::filtered(EventKind::TurnEnd, "a"), &view, |_| Ok(()))
            .expect("subscribe");
        bus.subscribe(EventKind::TurnEnd, &SubscriberId::from("other"), |_| Ok(()))
            .expect("subscribe");

        assert_eq!(bus.unsubscribe(&view), 2);
        assert_eq!(bus.subscription_count(), 1);
        bus.subscribe(EventKind::TurnEnd, &view, |_| Ok(()))
            .expect("re-registration after teardown");
    }

    #[test]
    fn reset_clears_the_registry() {
        let bus = EventBus::new();
        bus.subscribe(EventKind::TurnEnd, &SubscriberId::from("a"), |_| Ok(()))
            .expect("subscribe");
        bus.reset();
        assert_eq!(bus.subscription_count(), 0);
        bus.publish(Event::TurnEnd, None);
    }
}
