//! Wires the state store and the systems onto one bus and replays a scenario.

use std::{cell::RefCell, rc::Rc};

use anyhow::{Context, Result};
use skirmish_bus::EventBus;
use skirmish_core::{CellCoord, Character, Event, PlayerId, Route};
use skirmish_system_movement::MovementStepper;
use skirmish_system_pathfinding::{self as pathfinding, Pathfinder};
use skirmish_world::{query, StateStore, World};

use crate::scenario::Scenario;

/// Final state of a replayed scenario.
#[derive(Debug)]
pub(crate) struct Outcome {
    pub(crate) roster: Vec<Character>,
    pub(crate) turn_holder: Option<PlayerId>,
    pub(crate) published: usize,
}

/// Builds the table described by `scenario`, publishes its script, and
/// reports the resulting roster.
pub(crate) fn run(scenario: &Scenario) -> Result<Outcome> {
    let bus = Rc::new(EventBus::new());
    let world = World::new(scenario.store_config(), scenario.players());
    let store = StateStore::attach(&bus, world).context("failed to attach state store")?;
    let _pathfinder: Rc<RefCell<Pathfinder>> =
        Pathfinder::attach(&bus, scenario.pathfinding_config())
            .context("failed to attach pathfinder")?;
    let _movement = MovementStepper::attach(&bus, scenario.movement_config())
        .context("failed to attach movement")?;
    tracing::debug!(subscriptions = bus.subscription_count(), "session wired");

    let mut setup = vec![Event::MapLoaded {
        grid: scenario.grid()?,
    }];
    if let Some(symbols) = scenario.valid_symbols() {
        setup.push(Event::ValidCellsSet { symbols });
    }
    setup.extend(
        scenario
            .characters()
            .into_iter()
            .map(|character| Event::CharacterAdd { character }),
    );

    let mut published = 0;
    for event in setup
        .into_iter()
        .chain(scenario.script().iter().flat_map(|step| step.events()))
    {
        bus.publish(event, None);
        published += 1;
    }
    tracing::info!(published, "scenario replayed");

    let store = store.borrow();
    Ok(Outcome {
        roster: query::characters(store.world()).to_vec(),
        turn_holder: query::turn_holder(store.world()).cloned(),
        published,
    })
}

/// Shortest route between two cells of the scenario map, ignoring characters.
pub(crate) fn route(scenario: &Scenario, from: CellCoord, to: CellCoord) -> Result<Route> {
    let grid = scenario.grid()?;
    let rules = scenario.walk_rules();
    Ok(pathfinding::shortest_path(&grid, from, to, |cell| {
        rules.is_walkable(&grid, cell)
    }))
}
