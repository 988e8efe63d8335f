#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic movement system that interpolates walking characters.
//!
//! Every frame tick advances each walking character along its facing by
//! `speed × elapsed`, snaps it onto the next waypoint once the waypoint's
//! center is crossed, and proposes the new position to the state store. The
//! controlled player additionally walks in a held direction: the route is
//! extended a few cells at a time while movement input stays active.
//!
//! Once a `state.changed.turn` has been seen, only characters owned by the
//! turn holder are stepped. Before that every walker is stepped and the state
//! store decides.

use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
    time::Duration,
};

use glam::Vec2;
use skirmish_bus::{attach, BusError, EventBus, Outbound, Reactor, SubscriberId, Topic};
use skirmish_core::{
    Action, CellCoord, Character, CharacterName, Direction, Event, EventKind, Grid, Origin,
    PlayerId, Route,
};
use skirmish_system_pathfinding::{route_in_direction, WalkRules};

const SUBSCRIBER: &str = "movement";
const DEFAULT_CONTINUATION_CELLS: u32 = 3;

/// Configuration parameters required to construct the movement system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    player: Option<CharacterName>,
    continuation_cells: u32,
    unrestricted_player: bool,
}

impl Config {
    /// Creates a configuration for the provided controlled character.
    #[must_use]
    pub const fn new(
        player: Option<CharacterName>,
        continuation_cells: u32,
        unrestricted_player: bool,
    ) -> Self {
        Self {
            player,
            continuation_cells,
            unrestricted_player,
        }
    }

    /// Character steered by movement input.
    #[must_use]
    pub const fn player(&self) -> Option<&CharacterName> {
        self.player.as_ref()
    }

    /// Cells extrapolated per directional route.
    #[must_use]
    pub const fn continuation_cells(&self) -> u32 {
        self.continuation_cells
    }

    /// Whether the controlled character ignores walkability.
    #[must_use]
    pub const fn unrestricted_player(&self) -> bool {
        self.unrestricted_player
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(None, DEFAULT_CONTINUATION_CELLS, false)
    }
}

/// Pure system that reacts to frame ticks and movement input.
#[derive(Debug, Default)]
pub struct MovementStepper {
    config: Config,
    grid: Option<Grid>,
    rules: WalkRules,
    characters: BTreeMap<CharacterName, Character>,
    input_held: bool,
    pending_idle: BTreeSet<CharacterName>,
    turn_holder: Option<PlayerId>,
}

impl MovementStepper {
    /// Creates a movement system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Subscribes a new movement system to the tick, input, map and
    /// character change topics of `bus`.
    pub fn attach(bus: &Rc<EventBus>, config: Config) -> Result<Rc<RefCell<Self>>, BusError> {
        let stepper = Rc::new(RefCell::new(Self::new(config)));
        let topics: Vec<Topic> = [
            EventKind::FrameTick,
            EventKind::MovementDirection,
            EventKind::MovementStop,
            EventKind::MapLoaded,
            EventKind::ValidCellsSet,
            EventKind::TurnChanged,
        ]
        .into_iter()
        .chain(EventKind::CHARACTER_CHANGES)
        .map(Topic::new)
        .collect();
        attach(bus, &SubscriberId::from(SUBSCRIBER), &topics, &stepper)?;
        Ok(stepper)
    }

    /// Reports whether directional input is currently held.
    #[must_use]
    pub const fn input_held(&self) -> bool {
        self.input_held
    }

    /// Consumes a single event and records the updates it causes.
    pub fn handle(&mut self, event: Event, out: &mut Vec<Event>) {
        match event {
            Event::FrameTick { elapsed } => self.advance(elapsed, out),
            Event::MovementDirection { direction } => self.steer(direction, out),
            Event::MovementStop => self.stop(out),
            Event::MapLoaded { grid } => self.grid = Some(grid),
            Event::ValidCellsSet { symbols } => self.rules = WalkRules::new(symbols),
            Event::TurnChanged { player } => {
                // Idle requests refused off-turn are asked again.
                self.pending_idle.clear();
                self.turn_holder = Some(player);
            }
            Event::CharacterRemoved { character } => {
                let _ = self.pending_idle.remove(&character.name);
                let _ = self.characters.remove(&character.name);
            }
            other => self.track(&other),
        }
    }

    fn track(&mut self, event: &Event) {
        let Some(character) = event.changed_character() else {
            return;
        };
        if matches!(event, Event::ActionChanged { .. }) {
            let _ = self.pending_idle.remove(&character.name);
        }
        let _ = self
            .characters
            .insert(character.name.clone(), character.clone());
    }

    fn is_player(&self, name: &CharacterName) -> bool {
        self.config.player.as_ref() == Some(name)
    }

    fn directional_route(&self, walker: &CharacterName, start: CellCoord, direction: Direction) -> Route {
        let Some(grid) = &self.grid else {
            return Route::empty();
        };
        let unrestricted = self.config.unrestricted_player && self.is_player(walker);
        route_in_direction(grid, start, direction, self.config.continuation_cells, |cell| {
            if unrestricted {
                grid.contains(cell)
            } else {
                self.rules.is_walkable(grid, cell)
            }
        })
    }

    fn continuation(&self, character: &Character, from: CellCoord, direction: Direction) -> Route {
        if self.input_held && self.is_player(&character.name) {
            self.directional_route(&character.name, from, direction)
        } else {
            Route::empty()
        }
    }

    fn may_act(&self, character: &Character) -> bool {
        self.turn_holder
            .as_ref()
            .map_or(true, |holder| holder == &character.owner)
    }

    fn advance(&mut self, elapsed: Duration, out: &mut Vec<Event>) {
        let walking: Vec<Character> = self
            .characters
            .values()
            .filter(|character| character.action == Action::Walk)
            .filter(|character| self.may_act(character))
            .cloned()
            .collect();

        for character in walking {
            self.step(&character, elapsed.as_secs_f32(), out);
        }
    }

    fn step(&mut self, character: &Character, seconds: f32, out: &mut Vec<Event>) {
        let mut route = character.route.clone();
        let mut route_changed = false;

        if route.is_empty() {
            route = self.continuation(character, character.cell(), character.direction);
            route_changed = !route.is_empty();
        }
        let Some(target) = route.front() else {
            self.request_idle(&character.name, out);
            return;
        };

        let mut direction =
            Direction::snap(target.center() - character.position).unwrap_or(character.direction);
        let velocity = direction.unit_step() * character.speed.cells_per_second();
        let mut position = character.position + velocity * seconds;

        if crossed(position, velocity, target.center()) {
            position = target.center();
            let _ = route.advance();
            route_changed = true;

            match route.front() {
                Some(next) => direction = Direction::between(target, next).unwrap_or(direction),
                None => route = self.continuation(character, target, direction),
            }
        }

        out.push(Event::PositionUpdate {
            name: character.name.clone(),
            position,
            direction,
            origin: Origin::Local,
        });
        if route_changed {
            out.push(Event::PathUpdate {
                name: character.name.clone(),
                route,
                origin: Origin::Local,
            });
        }
    }

    fn request_idle(&mut self, name: &CharacterName, out: &mut Vec<Event>) {
        if !self.pending_idle.insert(name.clone()) {
            return;
        }
        tracing::debug!(character = %name, "route exhausted; going idle");
        out.push(Event::ActionUpdate {
            name: name.clone(),
            action: Action::Idle,
            origin: Origin::Local,
        });
    }

    fn steer(&mut self, direction: Direction, out: &mut Vec<Event>) {
        let Some(player) = self.config.player.clone() else {
            tracing::warn!(?direction, "movement input without a controlled character");
            return;
        };
        let Some(character) = self.characters.get(&player) else {
            tracing::warn!(character = %player, "controlled character is not on the map");
            return;
        };

        let route = self.directional_route(&player, character.cell(), direction);
        if route.is_empty() {
            tracing::warn!(character = %player, ?direction, "no walkable cell in that direction");
            return;
        }

        self.input_held = true;
        out.push(Event::DirectionUpdate {
            name: player.clone(),
            direction,
            origin: Origin::Local,
        });
        out.push(Event::PathUpdate {
            name: player.clone(),
            route,
            origin: Origin::Local,
        });
        out.push(Event::ActionUpdate {
            name: player,
            action: Action::Walk,
            origin: Origin::Local,
        });
    }

    fn stop(&mut self, out: &mut Vec<Event>) {
        self.input_held = false;
        let Some(player) = self.config.player.clone() else {
            tracing::debug!("movement stop without a controlled character");
            return;
        };
        if !self.characters.contains_key(&player) {
            tracing::debug!(character = %player, "controlled character is not on the map");
            return;
        }

        out.push(Event::PathUpdate {
            name: player.clone(),
            route: Route::empty(),
            origin: Origin::Local,
        });
        out.push(Event::ActionUpdate {
            name: player,
            action: Action::Idle,
            origin: Origin::Local,
        });
    }
}

/// Reports whether moving to `position` with `velocity` passed `target`
/// along the dominant axis of motion.
fn crossed(position: Vec2, velocity: Vec2, target: Vec2) -> bool {
    let (remaining, heading) = if velocity.x.abs() >= velocity.y.abs() {
        (target.x - position.x, velocity.x)
    } else {
        (target.y - position.y, velocity.y)
    };
    remaining * heading.signum() <= 0.0
}

impl Reactor for MovementStepper {
    fn react(&mut self, event: Event, out: &mut Vec<Outbound>) -> anyhow::Result<()> {
        let mut updates = Vec::new();
        self.handle(event, &mut updates);
        out.extend(updates.into_iter().map(Outbound::broadcast));
        Ok(())
    }
}
