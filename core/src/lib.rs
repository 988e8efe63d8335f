#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Skirmish grid simulation.
//!
//! This crate defines the message surface that connects input adapters, the
//! authoritative state store, and the pathfinding and movement systems.
//! Callers publish update [`Event`] values describing desired mutations, the
//! store validates turn ownership before applying them, and then broadcasts
//! change events that every other component consumes as read-only snapshots.
//! All payloads are plain owned values so the bus can hand every subscriber
//! an independent copy.

mod character;
mod grid;

use std::{
    collections::{BTreeSet, VecDeque},
    fmt,
    time::Duration,
};

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub use character::{
    Action, Character, CharacterName, EquipError, Equipment, Handedness, Health, Item, ItemKind,
    PlayerId, Slot, SpeedTier, DEFAULT_MAX_HEALTH,
};
pub use grid::{Cell, Grid, GridError};

/// Describes where an update request originated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    /// Issued by this process, subject to turn validation.
    #[default]
    Local,
    /// Replayed from a remote peer that already validated the turn.
    Network,
}

impl Origin {
    /// Reports whether the update arrived from the network transport.
    #[must_use]
    pub const fn is_network(self) -> bool {
        matches!(self, Self::Network)
    }
}

/// Messages exchanged over the event bus.
///
/// Inputs describe requested mutations or external stimuli; the
/// `*Changed` variants are published exclusively by the state store after a
/// mutation was applied and carry a clone of the full character record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// Replaces the active map.
    MapLoaded {
        /// Grid describing every cell of the level.
        grid: Grid,
    },
    /// Replaces the set of symbols considered walkable.
    ValidCellsSet {
        /// Symbols that may be walked on when not blocked.
        symbols: BTreeSet<char>,
    },
    /// Introduces a new character into the roster.
    CharacterAdd {
        /// Initial record of the character.
        character: Character,
    },
    /// Removes a character from the roster.
    CharacterRemove {
        /// Character that leaves the game.
        name: CharacterName,
        /// Where the request originated.
        origin: Origin,
    },
    /// Moves a character to a new fractional position.
    PositionUpdate {
        /// Character being moved.
        name: CharacterName,
        /// New fractional position measured in cells.
        position: Vec2,
        /// Facing after the move.
        direction: Direction,
        /// Where the request originated.
        origin: Origin,
    },
    /// Replaces the route a character follows.
    PathUpdate {
        /// Character receiving the route.
        name: CharacterName,
        /// Remaining waypoints, exclusive of the current cell.
        route: Route,
        /// Where the request originated.
        origin: Origin,
    },
    /// Changes the facing of a character.
    DirectionUpdate {
        /// Character being turned.
        name: CharacterName,
        /// New facing.
        direction: Direction,
        /// Where the request originated.
        origin: Origin,
    },
    /// Changes the current action of a character.
    ActionUpdate {
        /// Character whose action changes.
        name: CharacterName,
        /// New action.
        action: Action,
        /// Where the request originated.
        origin: Origin,
    },
    /// Adds an item to a character's inventory.
    InventoryAdd {
        /// Character receiving the item.
        name: CharacterName,
        /// Item being added.
        item: Item,
        /// Where the request originated.
        origin: Origin,
    },
    /// Removes an item from a character's inventory.
    InventoryRemove {
        /// Character losing the item.
        name: CharacterName,
        /// Name of the item being removed.
        item: String,
        /// Where the request originated.
        origin: Origin,
    },
    /// Equips an inventory weapon into a hand slot.
    Equip {
        /// Character equipping the weapon.
        name: CharacterName,
        /// Slot receiving the weapon.
        slot: Slot,
        /// Name of the inventory item to equip.
        item: String,
        /// Where the request originated.
        origin: Origin,
    },
    /// Clears a hand slot.
    Unequip {
        /// Character clearing the slot.
        name: CharacterName,
        /// Slot being cleared.
        slot: Slot,
        /// Where the request originated.
        origin: Origin,
    },
    /// Applies damage (or healing, when negative) to a character.
    Damage {
        /// Character receiving the damage.
        target: CharacterName,
        /// Health removed; negative values heal.
        amount: i32,
        /// Character dealing the damage, if any.
        attacker: Option<CharacterName>,
        /// Where the request originated.
        origin: Origin,
    },
    /// Spends action points of a character.
    DeductActionPoints {
        /// Character spending the points.
        name: CharacterName,
        /// Number of points spent.
        cost: u32,
        /// Where the request originated.
        origin: Origin,
    },
    /// Restores the action points of every character owned by a player.
    TurnReset {
        /// Player starting their turn.
        player: PlayerId,
    },
    /// Passes the turn token to the next player.
    TurnEnd,
    /// Continuous movement request for the controlled character.
    MovementDirection {
        /// Direction of travel held by the input layer.
        direction: Direction,
    },
    /// Cancels the controlled character's movement.
    MovementStop,
    /// Requests a route between a character and a named location.
    RequestRoute {
        /// Character that will walk the route.
        source: String,
        /// Character name or location tag to walk toward.
        target: String,
    },
    /// Advances the simulation clock by one frame.
    FrameTick {
        /// Time elapsed since the previous frame.
        elapsed: Duration,
    },
    /// Confirms a character was added.
    CharacterAdded {
        /// Snapshot of the record.
        character: Character,
    },
    /// Confirms a character was removed.
    CharacterRemoved {
        /// Last snapshot of the record.
        character: Character,
    },
    /// Confirms a position (and facing) change.
    PositionChanged {
        /// Snapshot of the record.
        character: Character,
    },
    /// Confirms a route change.
    PathChanged {
        /// Snapshot of the record.
        character: Character,
    },
    /// Confirms a facing change.
    DirectionChanged {
        /// Snapshot of the record.
        character: Character,
    },
    /// Confirms an action change.
    ActionChanged {
        /// Snapshot of the record.
        character: Character,
    },
    /// Confirms a health change.
    HealthChanged {
        /// Snapshot of the record.
        character: Character,
    },
    /// Announces that a character's health reached zero.
    Defeated {
        /// Snapshot of the record.
        character: Character,
        /// Character that dealt the final blow, if known.
        attacker: Option<CharacterName>,
    },
    /// Confirms an action point change.
    ActionPointsChanged {
        /// Snapshot of the record.
        character: Character,
    },
    /// Confirms an inventory change.
    InventoryChanged {
        /// Snapshot of the record.
        character: Character,
    },
    /// Confirms an equipment change.
    EquipmentChanged {
        /// Snapshot of the record.
        character: Character,
    },
    /// Announces the player now holding the turn token.
    TurnChanged {
        /// Player allowed to issue local mutations.
        player: PlayerId,
    },
}

impl Event {
    /// Topic under which the event is delivered.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::MapLoaded { .. } => EventKind::MapLoaded,
            Self::ValidCellsSet { .. } => EventKind::ValidCellsSet,
            Self::CharacterAdd { .. } => EventKind::CharacterAdd,
            Self::CharacterRemove { .. } => EventKind::CharacterRemove,
            Self::PositionUpdate { .. } => EventKind::PositionUpdate,
            Self::PathUpdate { .. } => EventKind::PathUpdate,
            Self::DirectionUpdate { .. } => EventKind::DirectionUpdate,
            Self::ActionUpdate { .. } => EventKind::ActionUpdate,
            Self::InventoryAdd { .. } => EventKind::InventoryAdd,
            Self::InventoryRemove { .. } => EventKind::InventoryRemove,
            Self::Equip { .. } => EventKind::Equip,
            Self::Unequip { .. } => EventKind::Unequip,
            Self::Damage { .. } => EventKind::Damage,
            Self::DeductActionPoints { .. } => EventKind::DeductActionPoints,
            Self::TurnReset { .. } => EventKind::TurnReset,
            Self::TurnEnd => EventKind::TurnEnd,
            Self::MovementDirection { .. } => EventKind::MovementDirection,
            Self::MovementStop => EventKind::MovementStop,
            Self::RequestRoute { .. } => EventKind::RequestRoute,
            Self::FrameTick { .. } => EventKind::FrameTick,
            Self::CharacterAdded { .. } => EventKind::CharacterAdded,
            Self::CharacterRemoved { .. } => EventKind::CharacterRemoved,
            Self::PositionChanged { .. } => EventKind::PositionChanged,
            Self::PathChanged { .. } => EventKind::PathChanged,
            Self::DirectionChanged { .. } => EventKind::DirectionChanged,
            Self::ActionChanged { .. } => EventKind::ActionChanged,
            Self::HealthChanged { .. } => EventKind::HealthChanged,
            Self::Defeated { .. } => EventKind::Defeated,
            Self::ActionPointsChanged { .. } => EventKind::ActionPointsChanged,
            Self::InventoryChanged { .. } => EventKind::InventoryChanged,
            Self::EquipmentChanged { .. } => EventKind::EquipmentChanged,
            Self::TurnChanged { .. } => EventKind::TurnChanged,
        }
    }

    /// Character record carried by a change event, if any.
    #[must_use]
    pub const fn changed_character(&self) -> Option<&Character> {
        match self {
            Self::CharacterAdded { character }
            | Self::CharacterRemoved { character }
            | Self::PositionChanged { character }
            | Self::PathChanged { character }
            | Self::DirectionChanged { character }
            | Self::ActionChanged { character }
            | Self::HealthChanged { character }
            | Self::Defeated { character, .. }
            | Self::ActionPointsChanged { character }
            | Self::InventoryChanged { character }
            | Self::EquipmentChanged { character } => Some(character),
            _ => None,
        }
    }

    /// Name used as the per-entity delivery filter for change events.
    #[must_use]
    pub fn subject(&self) -> Option<&CharacterName> {
        self.changed_character().map(|character| &character.name)
    }
}

/// Field-less discriminant of [`Event`], used as the subscription topic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// `map.loaded`
    MapLoaded,
    /// `validCells.set`
    ValidCellsSet,
    /// `character.add`
    CharacterAdd,
    /// `character.remove`
    CharacterRemove,
    /// `character.positionUpdate`
    PositionUpdate,
    /// `character.pathUpdate`
    PathUpdate,
    /// `character.directionUpdate`
    DirectionUpdate,
    /// `character.actionUpdate`
    ActionUpdate,
    /// `character.inventoryAdd`
    InventoryAdd,
    /// `character.inventoryRemove`
    InventoryRemove,
    /// `character.equip`
    Equip,
    /// `character.unequip`
    Unequip,
    /// `character.damage`
    Damage,
    /// `character.deductActionPoints`
    DeductActionPoints,
    /// `turn.reset`
    TurnReset,
    /// `turn.end`
    TurnEnd,
    /// `movement.direction`
    MovementDirection,
    /// `movement.stop`
    MovementStop,
    /// `movement.requestRoute`
    RequestRoute,
    /// `frame.tick`
    FrameTick,
    /// `state.changed.added`
    CharacterAdded,
    /// `state.changed.removed`
    CharacterRemoved,
    /// `state.changed.position`
    PositionChanged,
    /// `state.changed.path`
    PathChanged,
    /// `state.changed.direction`
    DirectionChanged,
    /// `state.changed.action`
    ActionChanged,
    /// `state.changed.health`
    HealthChanged,
    /// `state.changed.defeated`
    Defeated,
    /// `state.changed.actions`
    ActionPointsChanged,
    /// `state.changed.inventory`
    InventoryChanged,
    /// `state.changed.equipment`
    EquipmentChanged,
    /// `state.changed.turn`
    TurnChanged,
}

impl EventKind {
    /// Mutation requests handled by the state store.
    pub const UPDATES: [EventKind; 14] = [
        EventKind::CharacterAdd,
        EventKind::CharacterRemove,
        EventKind::PositionUpdate,
        EventKind::PathUpdate,
        EventKind::DirectionUpdate,
        EventKind::ActionUpdate,
        EventKind::InventoryAdd,
        EventKind::InventoryRemove,
        EventKind::Equip,
        EventKind::Unequip,
        EventKind::Damage,
        EventKind::DeductActionPoints,
        EventKind::TurnReset,
        EventKind::TurnEnd,
    ];

    /// Change events that carry a character snapshot.
    pub const CHARACTER_CHANGES: [EventKind; 11] = [
        EventKind::CharacterAdded,
        EventKind::CharacterRemoved,
        EventKind::PositionChanged,
        EventKind::PathChanged,
        EventKind::DirectionChanged,
        EventKind::ActionChanged,
        EventKind::HealthChanged,
        EventKind::Defeated,
        EventKind::ActionPointsChanged,
        EventKind::InventoryChanged,
        EventKind::EquipmentChanged,
    ];

    /// Protocol name of the topic.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::MapLoaded => "map.loaded",
            Self::ValidCellsSet => "validCells.set",
            Self::CharacterAdd => "character.add",
            Self::CharacterRemove => "character.remove",
            Self::PositionUpdate => "character.positionUpdate",
            Self::PathUpdate => "character.pathUpdate",
            Self::DirectionUpdate => "character.directionUpdate",
            Self::ActionUpdate => "character.actionUpdate",
            Self::InventoryAdd => "character.inventoryAdd",
            Self::InventoryRemove => "character.inventoryRemove",
            Self::Equip => "character.equip",
            Self::Unequip => "character.unequip",
            Self::Damage => "character.damage",
            Self::DeductActionPoints => "character.deductActionPoints",
            Self::TurnReset => "turn.reset",
            Self::TurnEnd => "turn.end",
            Self::MovementDirection => "movement.direction",
            Self::MovementStop => "movement.stop",
            Self::RequestRoute => "movement.requestRoute",
            Self::FrameTick => "frame.tick",
            Self::CharacterAdded => "state.changed.added",
            Self::CharacterRemoved => "state.changed.removed",
            Self::PositionChanged => "state.changed.position",
            Self::PathChanged => "state.changed.path",
            Self::DirectionChanged => "state.changed.direction",
            Self::ActionChanged => "state.changed.action",
            Self::HealthChanged => "state.changed.health",
            Self::Defeated => "state.changed.defeated",
            Self::ActionPointsChanged => "state.changed.actions",
            Self::InventoryChanged => "state.changed.inventory",
            Self::EquipmentChanged => "state.changed.equipment",
            Self::TurnChanged => "state.changed.turn",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compass directions available to characters.
///
/// Every direction owns a fixed angle, a fixed `(sine, cosine)` pair and a
/// fixed grid offset. Rows grow downward, so `Up` decreases the row index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Toward decreasing row indices.
    Up,
    /// Toward decreasing rows and increasing columns.
    UpRight,
    /// Toward increasing column indices.
    Right,
    /// Toward increasing rows and columns.
    DownRight,
    /// Toward increasing row indices.
    #[default]
    Down,
    /// Toward increasing rows and decreasing columns.
    DownLeft,
    /// Toward decreasing column indices.
    Left,
    /// Toward decreasing rows and columns.
    UpLeft,
}

const DIAGONAL: f32 = std::f32::consts::FRAC_1_SQRT_2;

impl Direction {
    /// All directions ordered clockwise from `Up`.
    pub const ALL: [Direction; 8] = [
        Direction::Up,
        Direction::UpRight,
        Direction::Right,
        Direction::DownRight,
        Direction::Down,
        Direction::DownLeft,
        Direction::Left,
        Direction::UpLeft,
    ];

    /// Clockwise angle from `Up`, in degrees.
    #[must_use]
    pub const fn angle_degrees(self) -> u16 {
        match self {
            Self::Up => 0,
            Self::UpRight => 45,
            Self::Right => 90,
            Self::DownRight => 135,
            Self::Down => 180,
            Self::DownLeft => 225,
            Self::Left => 270,
            Self::UpLeft => 315,
        }
    }

    /// Fixed `(sine, cosine)` pair of [`Direction::angle_degrees`].
    #[must_use]
    pub const fn sin_cos(self) -> (f32, f32) {
        match self {
            Self::Up => (0.0, 1.0),
            Self::UpRight => (DIAGONAL, DIAGONAL),
            Self::Right => (1.0, 0.0),
            Self::DownRight => (DIAGONAL, -DIAGONAL),
            Self::Down => (0.0, -1.0),
            Self::DownLeft => (-DIAGONAL, -DIAGONAL),
            Self::Left => (-1.0, 0.0),
            Self::UpLeft => (-DIAGONAL, DIAGONAL),
        }
    }

    /// Unit movement vector in row-down grid space.
    #[must_use]
    pub fn unit_step(self) -> Vec2 {
        let (sine, cosine) = self.sin_cos();
        Vec2::new(sine, -cosine)
    }

    /// Whole-cell column and row offset of a single step.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::UpRight => (1, -1),
            Self::Right => (1, 0),
            Self::DownRight => (1, 1),
            Self::Down => (0, 1),
            Self::DownLeft => (-1, 1),
            Self::Left => (-1, 0),
            Self::UpLeft => (-1, -1),
        }
    }

    /// Reports whether the direction moves along both axes.
    #[must_use]
    pub const fn is_diagonal(self) -> bool {
        matches!(
            self,
            Self::UpRight | Self::DownRight | Self::DownLeft | Self::UpLeft
        )
    }

    /// Snaps an arbitrary vector onto the nearest of the eight directions.
    ///
    /// Returns `None` for the zero vector. Exact half-way angles round toward
    /// the next direction clockwise.
    #[must_use]
    pub fn snap(vector: Vec2) -> Option<Direction> {
        if vector.x == 0.0 && vector.y == 0.0 {
            return None;
        }

        let degrees = vector.x.atan2(-vector.y).to_degrees().rem_euclid(360.0);
        let index = (degrees / 45.0).round() as usize % Self::ALL.len();
        Some(Self::ALL[index])
    }

    /// Direction of travel between two cell centers.
    #[must_use]
    pub fn between(from: CellCoord, to: CellCoord) -> Option<Direction> {
        Self::snap(to.center() - from.center())
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Computes the 8-connected step distance between two cell coordinates.
    #[must_use]
    pub fn chebyshev_distance(self, other: CellCoord) -> u32 {
        self.column()
            .abs_diff(other.column())
            .max(self.row().abs_diff(other.row()))
    }

    /// Fractional position of the cell center.
    #[must_use]
    pub fn center(self) -> Vec2 {
        Vec2::new(self.column as f32, self.row as f32)
    }

    /// Cell whose center lies nearest to the provided position.
    ///
    /// Negative components clamp to the first row or column.
    #[must_use]
    pub fn containing(position: Vec2) -> Self {
        Self::new(
            position.x.round().max(0.0) as u32,
            position.y.round().max(0.0) as u32,
        )
    }

    /// Neighbouring cell one step away in `direction`, if representable.
    ///
    /// Only underflow is checked here; grid bounds are the caller's concern.
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<Self> {
        let (columns, rows) = direction.offset();
        let column = self.column.checked_add_signed(columns)?;
        let row = self.row.checked_add_signed(rows)?;
        Some(Self::new(column, row))
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// Ordered waypoints from a character's current cell to its goal.
///
/// The starting cell is excluded and the goal included.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    cells: VecDeque<CellCoord>,
}

impl Route {
    /// Creates a route visiting the provided cells in order.
    #[must_use]
    pub fn new(cells: Vec<CellCoord>) -> Self {
        Self {
            cells: cells.into(),
        }
    }

    /// Route without waypoints.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Next waypoint to reach, if any.
    #[must_use]
    pub fn front(&self) -> Option<CellCoord> {
        self.cells.front().copied()
    }

    /// Final waypoint of the route, if any.
    #[must_use]
    pub fn goal(&self) -> Option<CellCoord> {
        self.cells.back().copied()
    }

    /// Removes and returns the next waypoint.
    pub fn advance(&mut self) -> Option<CellCoord> {
        self.cells.pop_front()
    }

    /// Number of remaining waypoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether no waypoint remains.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterator over the remaining waypoints in travel order.
    pub fn iter(&self) -> impl Iterator<Item = &CellCoord> {
        self.cells.iter()
    }

    /// Copies the remaining waypoints into a vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<CellCoord> {
        self.cells.iter().copied().collect()
    }
}

impl FromIterator<CellCoord> for Route {
    fn from_iter<I: IntoIterator<Item = CellCoord>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = CellCoord::new(1, 1);
        let destination = CellCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(origin.chebyshev_distance(destination), 3);
    }

    #[test]
    fn unit_steps_follow_the_fixed_table() {
        assert_eq!(Direction::Up.unit_step(), Vec2::new(0.0, -1.0));
        assert_eq!(Direction::Right.unit_step().x, 1.0);
        assert_eq!(Direction::Down.unit_step(), Vec2::new(0.0, 1.0));
        let diagonal = Direction::DownLeft.unit_step();
        assert!((diagonal.length() - 1.0).abs() < 1e-6);
        assert!(diagonal.x < 0.0 && diagonal.y > 0.0);
    }

    #[test]
    fn unit_steps_agree_with_grid_offsets() {
        for direction in Direction::ALL {
            let step = direction.unit_step();
            let (columns, rows) = direction.offset();
            assert_eq!(step.x.signum() as i32 * i32::from(step.x != 0.0), columns);
            assert_eq!(step.y.signum() as i32 * i32::from(step.y != 0.0), rows);
        }
    }

    #[test]
    fn snap_picks_the_nearest_direction() {
        assert_eq!(Direction::snap(Vec2::new(0.0, -3.0)), Some(Direction::Up));
        assert_eq!(Direction::snap(Vec2::new(2.0, -1.9)), Some(Direction::UpRight));
        assert_eq!(Direction::snap(Vec2::new(-5.0, 0.4)), Some(Direction::Left));
        assert_eq!(Direction::snap(Vec2::new(-1.0, -1.0)), Some(Direction::UpLeft));
        assert_eq!(Direction::snap(Vec2::ZERO), None);
    }

    #[test]
    fn snap_round_trips_every_unit_step() {
        for direction in Direction::ALL {
            assert_eq!(Direction::snap(direction.unit_step()), Some(direction));
        }
    }

    #[test]
    fn between_adjacent_cells_matches_offsets() {
        let origin = CellCoord::new(3, 3);
        for direction in Direction::ALL {
            let neighbour = origin.step(direction).expect("neighbour inside grid");
            assert_eq!(Direction::between(origin, neighbour), Some(direction));
        }
        assert_eq!(Direction::between(origin, origin), None);
    }

    #[test]
    fn step_refuses_to_underflow() {
        let corner = CellCoord::new(0, 0);
        assert_eq!(corner.step(Direction::Up), None);
        assert_eq!(corner.step(Direction::Left), None);
        assert_eq!(corner.step(Direction::DownRight), Some(CellCoord::new(1, 1)));
    }

    #[test]
    fn containing_rounds_to_nearest_center() {
        assert_eq!(
            CellCoord::containing(Vec2::new(2.4, 0.6)),
            CellCoord::new(2, 1)
        );
        assert_eq!(
            CellCoord::containing(Vec2::new(-0.7, 3.0)),
            CellCoord::new(0, 3)
        );
    }

    #[test]
    fn route_advances_front_to_back() {
        let mut route = Route::new(vec![CellCoord::new(1, 0), CellCoord::new(2, 0)]);
        assert_eq!(route.goal(), Some(CellCoord::new(2, 0)));
        assert_eq!(route.advance(), Some(CellCoord::new(1, 0)));
        assert_eq!(route.front(), Some(CellCoord::new(2, 0)));
        assert_eq!(route.len(), 1);
        let _ = route.advance();
        assert!(route.is_empty());
    }

    #[test]
    fn change_events_expose_their_subject() {
        let character = Character::new("Rook", "A", CellCoord::new(0, 0));
        let event = Event::PositionChanged {
            character: character.clone(),
        };
        assert_eq!(event.kind(), EventKind::PositionChanged);
        assert_eq!(event.subject(), Some(&character.name));
        assert_eq!(Event::TurnEnd.subject(), None);
    }

    #[test]
    fn topic_names_follow_the_protocol() {
        assert_eq!(EventKind::PositionUpdate.name(), "character.positionUpdate");
        assert_eq!(EventKind::ActionPointsChanged.to_string(), "state.changed.actions");
        for kind in EventKind::CHARACTER_CHANGES {
            assert!(kind.name().starts_with("state.changed."));
        }
    }

    #[test]
    fn network_update_round_trips_through_bincode() {
        let event = Event::PositionUpdate {
            name: CharacterName::from("Rook"),
            position: Vec2::new(2.0, 3.0),
            direction: Direction::UpLeft,
            origin: Origin::Network,
        };
        let bytes = bincode::serialize(&event).expect("serialize");
        let restored: Event = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, event);
    }
}
