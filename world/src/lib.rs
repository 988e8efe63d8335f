#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative, turn-gated character state for Skirmish.
//!
//! [`World`] is the single writable owner of the character roster. Every
//! mutation flows through [`apply`], which validates that the acting
//! character belongs to the player holding the turn token before touching
//! the roster, and records one change event per successful mutation. Other
//! components read the state through [`query`] or the change events.

mod store;

use skirmish_core::{
    Action, Character, CharacterName, Event, EventKind, Origin, PlayerId, Route,
};
use thiserror::Error;

pub use store::StateStore;

const DEFAULT_ACTION_POINT_CEILING: u32 = 6;

/// Configuration parameters of the state store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    action_point_ceiling: u32,
}

impl Config {
    /// Creates a configuration restoring `action_point_ceiling` points per turn.
    #[must_use]
    pub const fn new(action_point_ceiling: u32) -> Self {
        Self {
            action_point_ceiling,
        }
    }

    /// Action points every character receives when its owner's turn starts.
    #[must_use]
    pub const fn action_point_ceiling(&self) -> u32 {
        self.action_point_ceiling
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_ACTION_POINT_CEILING)
    }
}

/// Contract violations reported by [`apply`].
///
/// These indicate a programming error in the caller; game-rule violations
/// such as acting out of turn are logged and dropped instead.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum WorldError {
    /// The update names a character that is not on the roster.
    #[error("character `{name}` does not exist")]
    UnknownCharacter {
        /// Name carried by the update.
        name: CharacterName,
    },
    /// A character with the same name is already on the roster.
    #[error("character `{name}` already exists")]
    DuplicateCharacter {
        /// Name carried by the update.
        name: CharacterName,
    },
    /// The player is not part of the turn order.
    #[error("player `{player}` is not seated at the table")]
    UnknownPlayer {
        /// Player carried by the update.
        player: PlayerId,
    },
    /// The attacker of a damage update is not on the roster.
    #[error("attacker `{name}` does not exist")]
    UnknownAttacker {
        /// Attacker carried by the update.
        name: CharacterName,
    },
}

/// Represents the authoritative Skirmish game state.
#[derive(Clone, Debug)]
pub struct World {
    config: Config,
    players: Vec<PlayerId>,
    turn: Option<usize>,
    roster: Vec<Character>,
}

impl World {
    /// Creates an empty roster; the first player holds the turn token.
    #[must_use]
    pub fn new(config: Config, players: Vec<PlayerId>) -> Self {
        let turn = if players.is_empty() { None } else { Some(0) };
        Self {
            config,
            players,
            turn,
            roster: Vec::new(),
        }
    }

    fn turn_holder(&self) -> Option<&PlayerId> {
        self.turn.and_then(|index| self.players.get(index))
    }

    fn index_of(&self, name: &CharacterName) -> Result<usize, WorldError> {
        self.roster
            .iter()
            .position(|character| &character.name == name)
            .ok_or_else(|| WorldError::UnknownCharacter { name: name.clone() })
    }

    fn permits(&self, acting: usize, origin: Origin, kind: EventKind) -> bool {
        let Some(character) = self.roster.get(acting) else {
            return false;
        };
        if origin.is_network() || self.turn_holder() == Some(&character.owner) {
            return true;
        }

        tracing::warn!(
            event = %kind,
            character = %character.name,
            owner = %character.owner,
            turn_holder = ?self.turn_holder().map(PlayerId::as_str),
            "dropping update issued outside the owner's turn"
        );
        false
    }

    /// Resolves and turn-checks the named character for mutation.
    ///
    /// `Ok(None)` means the update was dropped by the turn check.
    fn authorize(
        &mut self,
        name: &CharacterName,
        origin: Origin,
        kind: EventKind,
    ) -> Result<Option<&mut Character>, WorldError> {
        let index = self.index_of(name)?;
        if !self.permits(index, origin, kind) {
            return Ok(None);
        }
        Ok(self.roster.get_mut(index))
    }
}

/// Applies the provided update to the world, recording change events.
///
/// Events other than the update variants are ignored. Contract violations
/// leave the world untouched and surface as [`WorldError`].
///
/// Local updates are dropped unless the acting character's owner holds the
/// turn. For [`Event::Damage`] the acting character is the attacker when one
/// is named, so a player may wound an opponent's character on their own
/// turn; only attacker-less damage is gated on the target's owner.
///
/// Equipping a weapon into one hand moves it out of the other hand unless
/// the inventory carries a second copy of it.
pub fn apply(world: &mut World, event: Event, out_events: &mut Vec<Event>) -> Result<(), WorldError> {
    let kind = event.kind();
    match event {
        Event::CharacterAdd { character } => {
            if world.index_of(&character.name).is_ok() {
                return Err(WorldError::DuplicateCharacter {
                    name: character.name,
                });
            }
            out_events.push(Event::CharacterAdded {
                character: character.clone(),
            });
            world.roster.push(character);
        }
        Event::CharacterRemove { name, origin } => {
            let index = world.index_of(&name)?;
            if world.permits(index, origin, kind) {
                let character = world.roster.remove(index);
                out_events.push(Event::CharacterRemoved { character });
            }
        }
        Event::PositionUpdate {
            name,
            position,
            direction,
            origin,
        } => {
            if let Some(character) = world.authorize(&name, origin, kind)? {
                character.position = position;
                character.direction = direction;
                out_events.push(Event::PositionChanged {
                    character: character.clone(),
                });
            }
        }
        Event::PathUpdate {
            name,
            route,
            origin,
        } => {
            if let Some(character) = world.authorize(&name, origin, kind)? {
                character.route = route;
                out_events.push(Event::PathChanged {
                    character: character.clone(),
                });
            }
        }
        Event::DirectionUpdate {
            name,
            direction,
            origin,
        } => {
            if let Some(character) = world.authorize(&name, origin, kind)? {
                character.direction = direction;
                out_events.push(Event::DirectionChanged {
                    character: character.clone(),
                });
            }
        }
        Event::ActionUpdate {
            name,
            action,
            origin,
        } => {
            if let Some(character) = world.authorize(&name, origin, kind)? {
                if character.action == Action::Dead && action != Action::Dead {
                    tracing::warn!(character = %name, ?action, "defeated characters cannot act");
                    return Ok(());
                }
                character.action = action;
                out_events.push(Event::ActionChanged {
                    character: character.clone(),
                });
            }
        }
        Event::InventoryAdd { name, item, origin } => {
            if let Some(character) = world.authorize(&name, origin, kind)? {
                character.inventory.push(item);
                out_events.push(Event::InventoryChanged {
                    character: character.clone(),
                });
            }
        }
        Event::InventoryRemove { name, item, origin } => {
            if let Some(character) = world.authorize(&name, origin, kind)? {
                remove_item(character, &item, out_events);
            }
        }
        Event::Equip {
            name,
            slot,
            item,
            origin,
        } => {
            if let Some(character) = world.authorize(&name, origin, kind)? {
                let Some(carried) = character.item(&item).cloned() else {
                    tracing::warn!(character = %name, item = %item, "cannot equip an item that is not carried");
                    return Ok(());
                };
                let copies = character
                    .inventory
                    .iter()
                    .filter(|candidate| candidate.name == item)
                    .count();
                let held_opposite = character
                    .equipment
                    .get(slot.paired())
                    .is_some_and(|held| held.name == item);
                if held_opposite && copies < 2 {
                    let _ = character.equipment.unequip(slot.paired());
                }
                if let Err(error) = character.equipment.equip(slot, carried) {
                    tracing::warn!(character = %name, %error, "equip rejected");
                    return Ok(());
                }
                out_events.push(Event::EquipmentChanged {
                    character: character.clone(),
                });
            }
        }
        Event::Unequip { name, slot, origin } => {
            if let Some(character) = world.authorize(&name, origin, kind)? {
                if character.equipment.unequip(slot).is_none() {
                    tracing::debug!(character = %name, ?slot, "slot already empty");
                    return Ok(());
                }
                out_events.push(Event::EquipmentChanged {
                    character: character.clone(),
                });
            }
        }
        Event::Damage {
            target,
            amount,
            attacker,
            origin,
        } => apply_damage(world, target, amount, attacker, origin, out_events)?,
        Event::DeductActionPoints { name, cost, origin } => {
            if let Some(character) = world.authorize(&name, origin, kind)? {
                if cost > character.action_points {
                    tracing::warn!(
                        character = %name,
                        cost,
                        remaining = character.action_points,
                        "not enough action points"
                    );
                    return Ok(());
                }
                character.action_points -= cost;
                out_events.push(Event::ActionPointsChanged {
                    character: character.clone(),
                });
            }
        }
        Event::TurnReset { player } => {
            if !world.players.contains(&player) {
                return Err(WorldError::UnknownPlayer { player });
            }
            let ceiling = world.config.action_point_ceiling;
            for character in world
                .roster
                .iter_mut()
                .filter(|character| character.owner == player)
            {
                character.action_points = ceiling;
                out_events.push(Event::ActionPointsChanged {
                    character: character.clone(),
                });
            }
        }
        Event::TurnEnd => {
            let Some(current) = world.turn else {
                tracing::warn!("no players seated; turn token stays unassigned");
                return Ok(());
            };
            let next = (current + 1) % world.players.len();
            world.turn = Some(next);
            if let Some(player) = world.players.get(next) {
                tracing::info!(%player, "turn passed");
                out_events.push(Event::TurnChanged {
                    player: player.clone(),
                });
            }
        }
        _ => {}
    }
    Ok(())
}

fn remove_item(character: &mut Character, item: &str, out_events: &mut Vec<Event>) {
    let Some(index) = character
        .inventory
        .iter()
        .position(|carried| carried.name == item)
    else {
        tracing::warn!(character = %character.name, item, "cannot remove an item that is not carried");
        return;
    };

    let _ = character.inventory.remove(index);
    out_events.push(Event::InventoryChanged {
        character: character.clone(),
    });

    if character.item(item).is_none() && character.equipment.release(item) {
        out_events.push(Event::EquipmentChanged {
            character: character.clone(),
        });
    }
}

fn apply_damage(
    world: &mut World,
    target: CharacterName,
    amount: i32,
    attacker: Option<CharacterName>,
    origin: Origin,
    out_events: &mut Vec<Event>,
) -> Result<(), WorldError> {
    let target_index = world.index_of(&target)?;
    let acting = match &attacker {
        Some(name) => world
            .index_of(name)
            .map_err(|_| WorldError::UnknownAttacker { name: name.clone() })?,
        None => target_index,
    };
    if !world.permits(acting, origin, EventKind::Damage) {
        return Ok(());
    }
    let Some(character) = world.roster.get_mut(target_index) else {
        return Ok(());
    };

    let was_alive = !character.health.is_depleted();
    character.health = character.health.after_damage(amount);
    out_events.push(Event::HealthChanged {
        character: character.clone(),
    });

    if was_alive && character.health.is_depleted() {
        character.action = Action::Dead;
        character.route = Route::empty();
        tracing::info!(character = %target, attacker = ?attacker.as_ref().map(CharacterName::as_str), "character defeated");
        out_events.push(Event::Defeated {
            character: character.clone(),
            attacker,
        });
    }
    Ok(())
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::{Config, World};
    use skirmish_core::{Character, CharacterName, PlayerId};

    /// Looks up a character by name.
    #[must_use]
    pub fn character<'a>(world: &'a World, name: &CharacterName) -> Option<&'a Character> {
        world
            .roster
            .iter()
            .find(|character| &character.name == name)
    }

    /// Every character in roster order.
    #[must_use]
    pub fn characters(world: &World) -> &[Character] {
        &world.roster
    }

    /// Player currently holding the turn token.
    #[must_use]
    pub fn turn_holder(world: &World) -> Option<&PlayerId> {
        world.turn_holder()
    }

    /// Players in turn order.
    #[must_use]
    pub fn players(world: &World) -> &[PlayerId] {
        &world.players
    }

    /// Configuration the world was created with.
    #[must_use]
    pub fn config(world: &World) -> Config {
        world.config
    }
}
