#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that replays Skirmish scenarios headlessly.

mod scenario;
mod session;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use skirmish_core::CellCoord;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::scenario::Scenario;

/// Replays turn-based skirmish scenarios without a renderer.
#[derive(Debug, Parser)]
#[command(name = "skirmish", version, about)]
struct Cli {
    /// Log filter overriding `RUST_LOG` (for example `debug` or `skirmish_world=trace`).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replays a scenario script and prints the final roster.
    Run {
        /// Path to the scenario TOML file.
        scenario: PathBuf,
    },
    /// Prints the shortest route between two cells of a scenario map.
    Route {
        /// Path to the scenario TOML file.
        scenario: PathBuf,
        /// Starting cell as `column,row`.
        #[arg(long, value_parser = parse_cell)]
        from: CellCoord,
        /// Goal cell as `column,row`.
        #[arg(long, value_parser = parse_cell)]
        to: CellCoord,
    },
}

fn parse_cell(value: &str) -> Result<CellCoord, String> {
    let (column, row) = value
        .split_once(',')
        .ok_or_else(|| format!("expected `column,row`, got `{value}`"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<u32>()
            .map_err(|error| format!("invalid coordinate `{part}`: {error}"))
    };
    Ok(CellCoord::new(parse(column)?, parse(row)?))
}

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

/// Entry point for the Skirmish command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match cli.command {
        Command::Run { scenario } => {
            let loaded = Scenario::load(&scenario)?;
            let outcome = session::run(&loaded)
                .with_context(|| format!("failed to replay {}", scenario.display()))?;

            for character in &outcome.roster {
                println!(
                    "{} ({}) at ({:.2}, {:.2}) facing {:?}, {:?}, health {}/{}, ap {}",
                    character.name,
                    character.owner,
                    character.position.x,
                    character.position.y,
                    character.direction,
                    character.action,
                    character.health.current(),
                    character.health.max(),
                    character.action_points,
                );
            }
            println!("{} events published", outcome.published);
            match outcome.turn_holder {
                Some(player) => println!("turn: {player}"),
                None => println!("turn: unassigned"),
            }
        }
        Command::Route { scenario, from, to } => {
            let loaded = Scenario::load(&scenario)?;
            let route = session::route(&loaded, from, to)?;
            if route.is_empty() {
                println!("no route from {from} to {to}");
            } else {
                let cells: Vec<String> = route.iter().map(ToString::to_string).collect();
                println!("{} steps: {}", route.len(), cells.join(" "));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_parse_from_column_row_pairs() {
        assert_eq!(parse_cell("3,4"), Ok(CellCoord::new(3, 4)));
        assert_eq!(parse_cell(" 0 , 7 "), Ok(CellCoord::new(0, 7)));
        assert!(parse_cell("3").is_err());
        assert!(parse_cell("-1,2").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
