use std::{cell::RefCell, collections::BTreeSet, rc::Rc, time::Duration};

use glam::Vec2;
use skirmish_bus::EventBus;
use skirmish_core::{Action, CellCoord, Character, CharacterName, Direction, Event, Grid, PlayerId};
use skirmish_system_movement::{Config, MovementStepper};
use skirmish_system_pathfinding::{self as pathfinding, Pathfinder};
use skirmish_world::{query, Config as StoreConfig, StateStore, World};

struct Table {
    bus: Rc<EventBus>,
    store: Rc<RefCell<StateStore>>,
}

impl Table {
    fn new(rows: &[&str], tags: &[(u32, u32, &str)], movement: Config) -> Self {
        let bus = Rc::new(EventBus::new());
        let world = World::new(
            StoreConfig::default(),
            vec![PlayerId::from("p1"), PlayerId::from("p2")],
        );
        let store = StateStore::attach(&bus, world).expect("store");
        let _pathfinder: Rc<RefCell<Pathfinder>> =
            Pathfinder::attach(&bus, pathfinding::Config::default()).expect("pathfinder");
        let _movement = MovementStepper::attach(&bus, movement).expect("movement");

        let mut grid = Grid::from_symbols(rows).expect("grid");
        for &(column, row, tag) in tags {
            grid.tag(CellCoord::new(column, row), tag).expect("tag");
        }
        bus.publish(Event::MapLoaded { grid }, None);
        bus.publish(
            Event::ValidCellsSet {
                symbols: BTreeSet::from(['.']),
            },
            None,
        );
        bus.publish(
            Event::CharacterAdd {
                character: Character::new("Rook", "p1", CellCoord::new(0, 0)),
            },
            None,
        );
        Self { bus, store }
    }

    fn tick(&self, frames: usize) {
        for _ in 0..frames {
            self.bus.publish(
                Event::FrameTick {
                    elapsed: Duration::from_millis(100),
                },
                None,
            );
        }
    }

    fn rook(&self) -> Character {
        let store = self.store.borrow();
        query::character(store.world(), &CharacterName::from("Rook"))
            .cloned()
            .expect("rook is seated")
    }
}

#[test]
fn requested_routes_are_walked_to_the_exact_goal_center() {
    let table = Table::new(
        &["......", "......", "......", "......"],
        &[(4, 2, "gate")],
        Config::default(),
    );

    table.bus.publish(
        Event::RequestRoute {
            source: "Rook".to_owned(),
            target: "gate".to_owned(),
        },
        None,
    );
    assert_eq!(table.rook().action, Action::Walk);
    assert_eq!(table.rook().route.len(), 4);

    table.tick(40);

    let rook = table.rook();
    assert_eq!(rook.position, Vec2::new(4.0, 2.0));
    assert_eq!(rook.cell(), CellCoord::new(4, 2));
    assert!(rook.route.is_empty());
    assert_eq!(rook.action, Action::Idle);
}

#[test]
fn held_direction_keeps_walking_until_the_edge() {
    let config = Config::new(Some(CharacterName::from("Rook")), 3, false);
    let table = Table::new(&["........"], &[], config);

    table.bus.publish(
        Event::MovementDirection {
            direction: Direction::Right,
        },
        None,
    );
    assert_eq!(table.rook().direction, Direction::Right);
    assert_eq!(table.rook().route.len(), 3);

    table.tick(60);

    let rook = table.rook();
    assert_eq!(rook.position, Vec2::new(7.0, 0.0));
    assert_eq!(rook.action, Action::Idle);
}

#[test]
fn stop_halts_the_player_mid_route() {
    let config = Config::new(Some(CharacterName::from("Rook")), 3, false);
    let table = Table::new(&["........"], &[], config);

    table.bus.publish(
        Event::MovementDirection {
            direction: Direction::Right,
        },
        None,
    );
    table.tick(3);
    table.bus.publish(Event::MovementStop, None);
    let halted = table.rook();
    table.tick(10);

    let rook = table.rook();
    assert_eq!(rook.action, Action::Idle);
    assert!(rook.route.is_empty());
    assert_eq!(rook.position, halted.position);
    assert!(rook.position.x > 0.0 && rook.position.x < 7.0);
}

#[test]
fn off_turn_walkers_do_not_move() {
    let table = Table::new(&["....."], &[(4, 0, "gate")], Config::default());
    table.bus.publish(
        Event::RequestRoute {
            source: "Rook".to_owned(),
            target: "gate".to_owned(),
        },
        None,
    );
    table.bus.publish(Event::TurnEnd, None);

    table.tick(10);

    assert_eq!(table.rook().position, Vec2::ZERO);
    assert_eq!(table.rook().action, Action::Walk);
}

#[test]
fn walkers_stranded_by_a_turn_change_idle_once_the_turn_returns() {
    let table = Table::new(&["....."], &[(1, 0, "gate")], Config::default());
    table.bus.publish(
        Event::RequestRoute {
            source: "Rook".to_owned(),
            target: "gate".to_owned(),
        },
        None,
    );
    table.bus.publish(
        Event::FrameTick {
            elapsed: Duration::from_millis(300),
        },
        None,
    );
    assert_eq!(table.rook().position, Vec2::new(1.0, 0.0));
    assert!(table.rook().route.is_empty());
    assert_eq!(table.rook().action, Action::Walk);

    table.bus.publish(Event::TurnEnd, None);
    table.tick(1);
    assert_eq!(table.rook().action, Action::Walk);

    table.bus.publish(Event::TurnEnd, None);
    table.tick(20);

    assert_eq!(table.rook().action, Action::Idle);
}
