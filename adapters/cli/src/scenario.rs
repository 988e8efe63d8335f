//! TOML scenario files describing a map, a roster, and a scripted session.

use std::{collections::BTreeSet, fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use skirmish_core::{
    CellCoord, Character, CharacterName, Direction, Event, Grid, Item, Origin, PlayerId, Slot,
    SpeedTier,
};
use skirmish_system_movement as movement;
use skirmish_system_pathfinding as pathfinding;

/// Parsed scenario file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    players: Vec<String>,
    map: MapSection,
    #[serde(default)]
    characters: Vec<CharacterEntry>,
    #[serde(default)]
    store: StoreSection,
    #[serde(default)]
    movement: MovementSection,
    #[serde(default)]
    script: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MapSection {
    rows: Vec<String>,
    valid: Option<Vec<char>>,
    #[serde(default)]
    blocked: Vec<[u32; 2]>,
    #[serde(default)]
    locations: Vec<LocationEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LocationEntry {
    name: String,
    cells: Vec<[u32; 2]>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CharacterEntry {
    name: String,
    owner: String,
    cell: [u32; 2],
    #[serde(default)]
    speed: SpeedTier,
    health: Option<u32>,
    #[serde(default)]
    inventory: Vec<Item>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoreSection {
    action_point_ceiling: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct MovementSection {
    player: Option<String>,
    continuation_cells: Option<u32>,
    #[serde(default)]
    unrestricted_player: bool,
}

/// Single scripted action, published in file order.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case", deny_unknown_fields)]
pub(crate) enum Step {
    RequestRoute {
        source: String,
        target: String,
    },
    Direction {
        direction: Direction,
    },
    Stop,
    Tick {
        millis: u64,
        #[serde(default = "one")]
        frames: u32,
    },
    EndTurn,
    ResetTurn {
        player: String,
    },
    Damage {
        target: String,
        amount: i32,
        attacker: Option<String>,
        #[serde(default)]
        network: bool,
    },
    Equip {
        character: String,
        slot: Slot,
        item: String,
        #[serde(default)]
        network: bool,
    },
    Position {
        character: String,
        cell: [u32; 2],
        direction: Option<Direction>,
        #[serde(default)]
        network: bool,
    },
}

const fn one() -> u32 {
    1
}

const fn origin(network: bool) -> Origin {
    if network {
        Origin::Network
    } else {
        Origin::Local
    }
}

fn cell([column, row]: [u32; 2]) -> CellCoord {
    CellCoord::new(column, row)
}

impl Step {
    /// Events published for the step, in order.
    pub(crate) fn events(&self) -> Vec<Event> {
        match self {
            Self::RequestRoute { source, target } => vec![Event::RequestRoute {
                source: source.clone(),
                target: target.clone(),
            }],
            Self::Direction { direction } => vec![Event::MovementDirection {
                direction: *direction,
            }],
            Self::Stop => vec![Event::MovementStop],
            Self::Tick { millis, frames } => (0..*frames)
                .map(|_| Event::FrameTick {
                    elapsed: Duration::from_millis(*millis),
                })
                .collect(),
            Self::EndTurn => vec![Event::TurnEnd],
            Self::ResetTurn { player } => vec![Event::TurnReset {
                player: PlayerId::from(player.as_str()),
            }],
            Self::Damage {
                target,
                amount,
                attacker,
                network,
            } => vec![Event::Damage {
                target: CharacterName::from(target.as_str()),
                amount: *amount,
                attacker: attacker.as_deref().map(CharacterName::from),
                origin: origin(*network),
            }],
            Self::Equip {
                character,
                slot,
                item,
                network,
            } => vec![Event::Equip {
                name: CharacterName::from(character.as_str()),
                slot: *slot,
                item: item.clone(),
                origin: origin(*network),
            }],
            Self::Position {
                character,
                cell: target,
                direction,
                network,
            } => vec![Event::PositionUpdate {
                name: CharacterName::from(character.as_str()),
                position: cell(*target).center(),
                direction: direction.unwrap_or_default(),
                origin: origin(*network),
            }],
        }
    }
}

impl Scenario {
    /// Reads and parses a scenario file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid scenario at {}", path.display()))
    }

    /// Parses scenario TOML contents.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let scenario: Self =
            toml::from_str(contents).context("failed to parse scenario toml contents")?;
        if scenario.players.is_empty() {
            bail!("scenario must seat at least one player");
        }
        for character in &scenario.characters {
            if !scenario.players.contains(&character.owner) {
                bail!(
                    "character `{}` belongs to unknown player `{}`",
                    character.name,
                    character.owner
                );
            }
        }
        Ok(scenario)
    }

    /// Builds the grid with blockers and location tags applied.
    pub(crate) fn grid(&self) -> Result<Grid> {
        let mut grid = Grid::from_symbols(&self.map.rows).context("malformed map rows")?;
        for &blocked in &self.map.blocked {
            grid.block(cell(blocked))
                .with_context(|| format!("cannot block cell {:?}", blocked))?;
        }
        for location in &self.map.locations {
            for &tagged in &location.cells {
                grid.tag(cell(tagged), location.name.as_str())
                    .with_context(|| format!("cannot tag location `{}`", location.name))?;
            }
        }
        Ok(grid)
    }

    /// Walkable symbols, when the scenario restricts them.
    pub(crate) fn valid_symbols(&self) -> Option<BTreeSet<char>> {
        self.map
            .valid
            .as_ref()
            .map(|symbols| symbols.iter().copied().collect())
    }

    /// Walkability rules matching [`Scenario::valid_symbols`].
    pub(crate) fn walk_rules(&self) -> pathfinding::WalkRules {
        self.valid_symbols()
            .map_or_else(pathfinding::WalkRules::permissive, pathfinding::WalkRules::new)
    }

    /// Players in turn order.
    pub(crate) fn players(&self) -> Vec<PlayerId> {
        self.players
            .iter()
            .map(|player| PlayerId::from(player.as_str()))
            .collect()
    }

    /// Initial character records.
    pub(crate) fn characters(&self) -> Vec<Character> {
        self.characters
            .iter()
            .map(|entry| {
                let mut character =
                    Character::new(entry.name.as_str(), entry.owner.as_str(), cell(entry.cell))
                        .with_speed(entry.speed);
                if let Some(max) = entry.health {
                    character = character.with_health(max);
                }
                character.inventory = entry.inventory.clone();
                character
            })
            .collect()
    }

    /// Configuration of the state store.
    pub(crate) fn store_config(&self) -> skirmish_world::Config {
        self.store
            .action_point_ceiling
            .map_or_else(skirmish_world::Config::default, skirmish_world::Config::new)
    }

    /// Configuration of the pathfinding system.
    pub(crate) fn pathfinding_config(&self) -> pathfinding::Config {
        let unrestricted = self
            .movement
            .player
            .as_deref()
            .filter(|_| self.movement.unrestricted_player)
            .map(CharacterName::from);
        pathfinding::Config::new(unrestricted)
    }

    /// Configuration of the movement system.
    pub(crate) fn movement_config(&self) -> movement::Config {
        let defaults = movement::Config::default();
        movement::Config::new(
            self.movement.player.as_deref().map(CharacterName::from),
            self.movement
                .continuation_cells
                .unwrap_or(defaults.continuation_cells()),
            self.movement.unrestricted_player,
        )
    }

    /// Scripted steps in file order.
    pub(crate) fn script(&self) -> &[Step] {
        &self.script
    }
}
