use std::{borrow::Borrow, fmt};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CellCoord, Direction, Route};

/// Unique name identifying a character.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CharacterName(String);

impl CharacterName {
    /// Wraps the provided name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrowed string form of the name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CharacterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CharacterName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CharacterName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for CharacterName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Identifier of a player owning characters and holding turns.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(String);

impl PlayerId {
    /// Wraps the provided identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrowed string form of the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Discrete movement speed levels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedTier {
    /// Two cells per second.
    Slow,
    /// Four cells per second.
    #[default]
    Normal,
    /// Six cells per second.
    Fast,
    /// Eight cells per second.
    Sprint,
}

impl SpeedTier {
    /// Travel speed of the tier measured in cells per second.
    #[must_use]
    pub const fn cells_per_second(self) -> f32 {
        match self {
            Self::Slow => 2.0,
            Self::Normal => 4.0,
            Self::Fast => 6.0,
            Self::Sprint => 8.0,
        }
    }
}

/// Activity a character is currently performing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Standing still.
    #[default]
    Idle,
    /// Following a route.
    Walk,
    /// Performing an attack.
    Attacking,
    /// Reacting to a hit.
    Hurt,
    /// Defeated; health reached zero.
    Dead,
}

/// Current and maximum hit points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Health {
    current: u32,
    max: u32,
}

impl Health {
    /// Full health with the provided maximum.
    #[must_use]
    pub const fn full(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Remaining hit points.
    #[must_use]
    pub const fn current(&self) -> u32 {
        self.current
    }

    /// Maximum hit points.
    #[must_use]
    pub const fn max(&self) -> u32 {
        self.max
    }

    /// Reports whether no hit point remains.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.current == 0
    }

    /// Health after removing `amount` points, clamped to `[0, max]`.
    ///
    /// Negative amounts heal.
    #[must_use]
    pub fn after_damage(self, amount: i32) -> Self {
        let remaining = i64::from(self.current) - i64::from(amount);
        let clamped = remaining.clamp(0, i64::from(self.max));
        Self {
            current: u32::try_from(clamped).unwrap_or(0),
            max: self.max,
        }
    }
}

/// How many hands a weapon occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handedness {
    /// Fits in a single slot.
    OneHanded,
    /// Occupies both slots.
    TwoHanded,
}

/// Category of an inventory item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Weapon that can be equipped into a hand slot.
    Weapon(Handedness),
    /// Protective gear.
    Armor,
    /// Single-use item.
    Consumable,
}

/// Item carried in a character's inventory.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    /// Display name, unique within an inventory.
    pub name: String,
    /// Category of the item.
    pub kind: ItemKind,
}

impl Item {
    /// Creates a new item.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Creates a weapon with the provided handedness.
    #[must_use]
    pub fn weapon(name: impl Into<String>, handedness: Handedness) -> Self {
        Self::new(name, ItemKind::Weapon(handedness))
    }

    /// Handedness of the item when it is a weapon.
    #[must_use]
    pub const fn handedness(&self) -> Option<Handedness> {
        match self.kind {
            ItemKind::Weapon(handedness) => Some(handedness),
            ItemKind::Armor | ItemKind::Consumable => None,
        }
    }

    fn is_two_handed(&self) -> bool {
        self.handedness() == Some(Handedness::TwoHanded)
    }
}

/// Hand slot able to hold a weapon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    /// Main hand.
    Primary,
    /// Off hand.
    Secondary,
}

impl Slot {
    /// The other hand.
    #[must_use]
    pub const fn paired(self) -> Self {
        match self {
            Self::Primary => Self::Secondary,
            Self::Secondary => Self::Primary,
        }
    }
}

/// Reasons an equip request cannot be honoured.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EquipError {
    /// Only weapons fit into hand slots.
    #[error("item `{item}` is not a weapon")]
    NotAWeapon {
        /// Name of the rejected item.
        item: String,
    },
}

/// Weapons held in the two hand slots.
///
/// A two-handed weapon always leaves the paired slot empty; the type never
/// represents a two-handed weapon next to any other weapon.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Equipment {
    primary: Option<Item>,
    secondary: Option<Item>,
}

impl Equipment {
    /// Weapon held in `slot`, if any.
    #[must_use]
    pub const fn get(&self, slot: Slot) -> Option<&Item> {
        match slot {
            Slot::Primary => self.primary.as_ref(),
            Slot::Secondary => self.secondary.as_ref(),
        }
    }

    /// Number of weapons currently held.
    #[must_use]
    pub fn weapon_count(&self) -> usize {
        usize::from(self.primary.is_some()) + usize::from(self.secondary.is_some())
    }

    /// Places a weapon into `slot`, keeping the two-handed invariant.
    ///
    /// A two-handed weapon clears the paired slot. A one-handed weapon clears
    /// both slots first when either currently holds a two-handed weapon.
    pub fn equip(&mut self, slot: Slot, item: Item) -> Result<(), EquipError> {
        let Some(handedness) = item.handedness() else {
            return Err(EquipError::NotAWeapon { item: item.name });
        };

        match handedness {
            Handedness::TwoHanded => *self.slot_mut(slot.paired()) = None,
            Handedness::OneHanded => {
                if self.holds_two_handed() {
                    self.primary = None;
                    self.secondary = None;
                }
            }
        }

        *self.slot_mut(slot) = Some(item);
        Ok(())
    }

    /// Empties `slot`, returning the weapon it held.
    pub fn unequip(&mut self, slot: Slot) -> Option<Item> {
        self.slot_mut(slot).take()
    }

    /// Empties every slot holding the named item. Returns whether any did.
    pub fn release(&mut self, item: &str) -> bool {
        let mut released = false;
        for slot in [Slot::Primary, Slot::Secondary] {
            let holder = self.slot_mut(slot);
            if holder.as_ref().is_some_and(|held| held.name == item) {
                *holder = None;
                released = true;
            }
        }
        released
    }

    fn holds_two_handed(&self) -> bool {
        [&self.primary, &self.secondary]
            .into_iter()
            .flatten()
            .any(Item::is_two_handed)
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Option<Item> {
        match slot {
            Slot::Primary => &mut self.primary,
            Slot::Secondary => &mut self.secondary,
        }
    }
}

/// Authoritative record of a single character.
///
/// Only the state store mutates these; every other component works on clones
/// delivered through change events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Unique name of the character.
    pub name: CharacterName,
    /// Player allowed to command the character on their turn.
    pub owner: PlayerId,
    /// Fractional position measured in cells; integers are cell centers.
    pub position: Vec2,
    /// Current facing.
    pub direction: Direction,
    /// Current activity.
    pub action: Action,
    /// Remaining waypoints.
    pub route: Route,
    /// Movement speed tier.
    pub speed: SpeedTier,
    /// Action points left this turn.
    pub action_points: u32,
    /// Hit points.
    pub health: Health,
    /// Carried items.
    pub inventory: Vec<Item>,
    /// Weapons held in hand.
    pub equipment: Equipment,
}

/// Hit points assigned by [`Character::new`].
pub const DEFAULT_MAX_HEALTH: u32 = 10;

impl Character {
    /// Creates an idle character standing on the center of `cell`.
    #[must_use]
    pub fn new(
        name: impl Into<CharacterName>,
        owner: impl Into<PlayerId>,
        cell: CellCoord,
    ) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            position: cell.center(),
            direction: Direction::default(),
            action: Action::Idle,
            route: Route::empty(),
            speed: SpeedTier::default(),
            action_points: 0,
            health: Health::full(DEFAULT_MAX_HEALTH),
            inventory: Vec::new(),
            equipment: Equipment::default(),
        }
    }

    /// Replaces the hit points with full health of `max`.
    #[must_use]
    pub fn with_health(mut self, max: u32) -> Self {
        self.health = Health::full(max);
        self
    }

    /// Replaces the speed tier.
    #[must_use]
    pub fn with_speed(mut self, speed: SpeedTier) -> Self {
        self.speed = speed;
        self
    }

    /// Replaces the action points.
    #[must_use]
    pub fn with_action_points(mut self, points: u32) -> Self {
        self.action_points = points;
        self
    }

    /// Adds an item to the inventory.
    #[must_use]
    pub fn with_item(mut self, item: Item) -> Self {
        self.inventory.push(item);
        self
    }

    /// Cell whose center lies nearest to the character.
    #[must_use]
    pub fn cell(&self) -> CellCoord {
        CellCoord::containing(self.position)
    }

    /// Reports whether the character still has hit points.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        !self.health.is_depleted()
    }

    /// Inventory item with the provided name.
    #[must_use]
    pub fn item(&self, name: &str) -> Option<&Item> {
        self.inventory.iter().find(|item| item.name == name)
    }
}
