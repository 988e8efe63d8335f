#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Route planning system for Skirmish characters.
//!
//! The pathfinder keeps its own read-only copy of the map, the walkable
//! symbol set, and the latest snapshot of every character, all rebuilt from
//! bus events. Route requests resolve a named target to a cell, run a
//! breadth-first search from the requesting character, and turn the result
//! into path, direction, and action updates for the state store.

mod search;

use std::{
    cell::RefCell,
    collections::BTreeMap,
    rc::Rc,
};

use skirmish_bus::{attach, BusError, EventBus, Outbound, Reactor, SubscriberId, Topic};
use skirmish_core::{
    Action, CellCoord, Character, CharacterName, Direction, Event, EventKind, Grid, Origin, Route,
};
use thiserror::Error;

pub use search::{passable_step, route_in_direction, shortest_path, WalkRules, NEIGHBOUR_ORDER};

const SUBSCRIBER: &str = "pathfinder";

/// Configuration parameters of the pathfinding system.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Config {
    unrestricted_player: Option<CharacterName>,
}

impl Config {
    /// Creates a configuration; `unrestricted_player` may walk on every
    /// in-bounds cell regardless of symbols and blockers.
    #[must_use]
    pub const fn new(unrestricted_player: Option<CharacterName>) -> Self {
        Self {
            unrestricted_player,
        }
    }

    /// Character exempt from walkability checks, if any.
    #[must_use]
    pub const fn unrestricted_player(&self) -> Option<&CharacterName> {
        self.unrestricted_player.as_ref()
    }
}

/// Contract violations reported while handling route requests.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PathfinderError {
    /// The route source is not a known character.
    #[error("route source `{name}` is not a known character")]
    UnknownCharacter {
        /// Name carried by the request.
        name: CharacterName,
    },
}

/// Pure system that answers route requests from tracked state.
#[derive(Debug, Default)]
pub struct Pathfinder {
    config: Config,
    grid: Option<Grid>,
    rules: WalkRules,
    characters: BTreeMap<CharacterName, Character>,
}

impl Pathfinder {
    /// Creates a pathfinder without a map.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Subscribes a new pathfinder to the map, walkability, route-request and
    /// character change topics of `bus`.
    pub fn attach(bus: &Rc<EventBus>, config: Config) -> Result<Rc<RefCell<Self>>, BusError> {
        let pathfinder = Rc::new(RefCell::new(Self::new(config)));
        let topics: Vec<Topic> = [
            EventKind::MapLoaded,
            EventKind::ValidCellsSet,
            EventKind::RequestRoute,
        ]
        .into_iter()
        .chain(EventKind::CHARACTER_CHANGES)
        .map(Topic::new)
        .collect();
        attach(bus, &SubscriberId::from(SUBSCRIBER), &topics, &pathfinder)?;
        Ok(pathfinder)
    }

    /// Map the pathfinder currently plans on.
    #[must_use]
    pub const fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    /// Active walkability rules.
    #[must_use]
    pub const fn rules(&self) -> &WalkRules {
        &self.rules
    }

    /// Latest snapshot of the named character.
    #[must_use]
    pub fn character(&self, name: &str) -> Option<&Character> {
        self.characters.get(name)
    }

    /// Reports whether `walker` may stand on `cell`.
    ///
    /// The configured unrestricted player only needs the cell to be in bounds.
    #[must_use]
    pub fn is_walkable_for(&self, walker: &CharacterName, cell: CellCoord) -> bool {
        let Some(grid) = &self.grid else {
            return false;
        };
        if self.config.unrestricted_player.as_ref() == Some(walker) {
            return grid.contains(cell);
        }
        self.rules.is_walkable(grid, cell)
    }

    /// Shortest route for `walker` from `start` to `goal`.
    #[must_use]
    pub fn route_for(&self, walker: &CharacterName, start: CellCoord, goal: CellCoord) -> Route {
        match &self.grid {
            Some(grid) => shortest_path(grid, start, goal, |cell| self.is_walkable_for(walker, cell)),
            None => Route::empty(),
        }
    }

    /// Resolves a character name or location tag to a target cell.
    ///
    /// A living character resolves to its first walkable neighbour in
    /// [`NEIGHBOUR_ORDER`]. Otherwise the first walkable cell carrying the tag
    /// wins, then the first tagged cell at all. Unknown names fall back to the
    /// first walkable cell in row-major order.
    #[must_use]
    pub fn resolve_location(&self, name: &str) -> Option<CellCoord> {
        let Some(grid) = &self.grid else {
            tracing::warn!(location = name, "cannot resolve a location before a map is loaded");
            return None;
        };
        let walkable = |cell: CellCoord| self.rules.is_walkable(grid, cell);

        if let Some(character) = self.characters.get(name).filter(|character| character.is_alive()) {
            let origin = character.cell();
            let adjacent = NEIGHBOUR_ORDER
                .into_iter()
                .filter_map(|direction| origin.step(direction))
                .find(|cell| walkable(*cell));
            if adjacent.is_some() {
                return adjacent;
            }
        }

        let tagged: Vec<CellCoord> = grid.cells_tagged(name).collect();
        if let Some(cell) = tagged
            .iter()
            .copied()
            .find(|cell| walkable(*cell))
            .or_else(|| tagged.first().copied())
        {
            return Some(cell);
        }

        let fallback = grid.iter().map(|(cell, _)| cell).find(|cell| walkable(*cell));
        match fallback {
            Some(cell) => {
                tracing::warn!(location = name, %cell, "unknown location; using first walkable cell");
            }
            None => tracing::warn!(location = name, "map has no walkable cell"),
        }
        fallback
    }

    /// Plans a route from `source` toward `target`, recording the updates
    /// that set the character walking.
    ///
    /// An unresolvable target or an unreachable goal is not an error; nothing
    /// is recorded in that case.
    pub fn request_route(
        &self,
        source: &str,
        target: &str,
        out_events: &mut Vec<Event>,
    ) -> Result<(), PathfinderError> {
        let Some(character) = self.characters.get(source) else {
            return Err(PathfinderError::UnknownCharacter {
                name: CharacterName::from(source),
            });
        };
        let Some(goal) = self.resolve_location(target) else {
            return Ok(());
        };

        let start = character.cell();
        let route = self.route_for(&character.name, start, goal);
        let Some(first) = route.front() else {
            tracing::info!(source, location = target, %start, %goal, "no route found");
            return Ok(());
        };
        tracing::debug!(source, location = target, %goal, steps = route.len(), "route planned");

        let direction = Direction::between(start, first).unwrap_or(character.direction);
        out_events.push(Event::PathUpdate {
            name: character.name.clone(),
            route,
            origin: Origin::Local,
        });
        out_events.push(Event::DirectionUpdate {
            name: character.name.clone(),
            direction,
            origin: Origin::Local,
        });
        out_events.push(Event::ActionUpdate {
            name: character.name.clone(),
            action: Action::Walk,
            origin: Origin::Local,
        });
        Ok(())
    }

    fn track(&mut self, event: Event) {
        match event {
            Event::MapLoaded { grid } => {
                tracing::debug!(columns = grid.columns(), rows = grid.rows(), "map loaded");
                self.grid = Some(grid);
            }
            Event::ValidCellsSet { symbols } => self.rules = WalkRules::new(symbols),
            Event::CharacterRemoved { character } => {
                let _ = self.characters.remove(&character.name);
            }
            other => {
                if let Some(character) = other.changed_character() {
                    let _ = self
                        .characters
                        .insert(character.name.clone(), character.clone());
                }
            }
        }
    }
}

impl Reactor for Pathfinder {
    fn react(&mut self, event: Event, out: &mut Vec<Outbound>) -> anyhow::Result<()> {
        if let Event::RequestRoute { source, target } = &event {
            let mut updates = Vec::new();
            self.request_route(source, target, &mut updates)?;
            out.extend(updates.into_iter().map(Outbound::broadcast));
            return Ok(());
        }
        self.track(event);
        Ok(())
    }
}
