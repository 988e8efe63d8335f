use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use anyhow::anyhow;
use skirmish_core::Event;

use crate::{BusError, EventBus, SubscriberId, Topic};

/// Event emitted by a [`Reactor`] together with the filter to publish it on.
#[derive(Clone, Debug, PartialEq)]
pub struct Outbound {
    /// Event to publish.
    pub event: Event,
    /// Optional filter selecting the per-entity topic.
    pub filter: Option<String>,
}

impl Outbound {
    /// Publishes to unfiltered subscribers only.
    #[must_use]
    pub const fn broadcast(event: Event) -> Self {
        Self {
            event,
            filter: None,
        }
    }

    /// Publishes to unfiltered subscribers and those listening on `filter`.
    #[must_use]
    pub fn filtered(event: Event, filter: impl Into<String>) -> Self {
        Self {
            event,
            filter: Some(filter.into()),
        }
    }

    /// Publishes filtered by the character the event concerns, if any.
    #[must_use]
    pub fn for_subject(event: Event) -> Self {
        let filter = event.subject().map(|name| name.as_str().to_owned());
        Self { event, filter }
    }
}

/// Component that turns received events into outbound events.
///
/// Reactors never see the bus. [`attach`] borrows the reactor for the length
/// of a single call, releases it, then publishes whatever the reactor pushed
/// into `out`. Events a reactor emits may therefore loop back into it.
pub trait Reactor {
    /// Consumes a delivered event and records the events it causes.
    fn react(&mut self, event: Event, out: &mut Vec<Outbound>) -> anyhow::Result<()>;
}

/// Subscribes `reactor` to every topic in `topics` under `subscriber`.
///
/// Registers nothing when any of the topics is already held by `subscriber`.
/// A topic listed more than once is subscribed once. The subscriptions keep
/// only a weak reference to the bus.
pub fn attach<R>(
    bus: &Rc<EventBus>,
    subscriber: &SubscriberId,
    topics: &[Topic],
    reactor: &Rc<RefCell<R>>,
) -> Result<(), BusError>
where
    R: Reactor + 'static,
{
    let mut unique: Vec<&Topic> = Vec::with_capacity(topics.len());
    for topic in topics {
        if !unique.contains(&topic) {
            unique.push(topic);
        }
    }

    if let Some(topic) = unique
        .iter()
        .copied()
        .find(|topic| bus.is_subscribed(topic, subscriber))
    {
        return Err(BusError::DuplicateSubscription {
            subscriber: subscriber.clone(),
            topic: topic.clone(),
        });
    }

    for topic in unique {
        let weak: Weak<EventBus> = Rc::downgrade(bus);
        let reactor = Rc::clone(reactor);
        let owner = subscriber.clone();
        bus.subscribe(topic.clone(), subscriber, move |event| {
            let mut out = Vec::new();
            reactor
                .try_borrow_mut()
                .map_err(|_| anyhow!("`{owner}` is already handling an event"))?
                .react(event, &mut out)?;

            if let Some(bus) = weak.upgrade() {
                for outbound in out {
                    bus.publish(outbound.event, outbound.filter.as_deref());
                }
            }
            Ok(())
        })?;
    }
    Ok(())
}
