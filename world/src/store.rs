use std::{cell::RefCell, rc::Rc};

use skirmish_bus::{attach, BusError, EventBus, Outbound, Reactor, SubscriberId, Topic};
use skirmish_core::{Event, EventKind};

use crate::{apply, World};

const SUBSCRIBER: &str = "state-store";

/// Binds a [`World`] to the event bus.
///
/// The store listens on every update topic and republishes the resulting
/// change events filtered by character name, so per-character listeners only
/// see their own record. Turn changes are published unfiltered.
#[derive(Debug)]
pub struct StateStore {
    world: World,
}

impl StateStore {
    /// Wraps the world without subscribing it anywhere.
    #[must_use]
    pub const fn new(world: World) -> Self {
        Self { world }
    }

    /// Subscribes a store owning `world` to every update topic of `bus`.
    pub fn attach(bus: &Rc<EventBus>, world: World) -> Result<Rc<RefCell<Self>>, BusError> {
        let store = Rc::new(RefCell::new(Self::new(world)));
        let topics: Vec<Topic> = EventKind::UPDATES.into_iter().map(Topic::new).collect();
        attach(bus, &SubscriberId::from(SUBSCRIBER), &topics, &store)?;
        Ok(store)
    }

    /// Read-only view of the authoritative state.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }
}

impl Reactor for StateStore {
    fn react(&mut self, event: Event, out: &mut Vec<Outbound>) -> anyhow::Result<()> {
        let mut changes = Vec::new();
        apply(&mut self.world, event, &mut changes)?;
        out.extend(changes.into_iter().map(Outbound::for_subject));
        Ok(())
    }
}
