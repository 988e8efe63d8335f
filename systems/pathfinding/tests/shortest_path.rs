use std::collections::BTreeSet;

use proptest::prelude::*;
use skirmish_core::{CellCoord, Grid};
use skirmish_system_pathfinding::{shortest_path, WalkRules};

const OPEN: char = '.';
const WALL: char = '#';

fn grid_from(columns: usize, rows: usize, walls: &[bool]) -> Grid {
    let rows: Vec<String> = (0..rows)
        .map(|row| {
            (0..columns)
                .map(|column| if walls[row * columns + column] { WALL } else { OPEN })
                .collect()
        })
        .collect();
    Grid::from_symbols(&rows).expect("rectangular grid")
}

fn open_only() -> WalkRules {
    WalkRules::new(BTreeSet::from([OPEN]))
}

fn open_at(grid: &Grid, column: i64, row: i64) -> bool {
    if column < 0 || row < 0 {
        return false;
    }
    let cell = CellCoord::new(column as u32, row as u32);
    open_only().is_walkable(grid, cell)
}

/// Legal single step under 8-connectivity with the corner rule, computed
/// without the crate's own neighbour helpers.
fn legal_step(grid: &Grid, from: CellCoord, to: CellCoord) -> bool {
    let (fx, fy) = (i64::from(from.column()), i64::from(from.row()));
    let (tx, ty) = (i64::from(to.column()), i64::from(to.row()));
    let (dx, dy) = (tx - fx, ty - fy);
    if (dx, dy) == (0, 0) || dx.abs() > 1 || dy.abs() > 1 {
        return false;
    }
    if !open_at(grid, tx, ty) {
        return false;
    }
    dx == 0 || dy == 0 || (open_at(grid, fx + dx, fy) && open_at(grid, fx, fy + dy))
}

/// Bellman-style relaxation until no distance improves.
fn brute_force_distance(grid: &Grid, start: CellCoord, goal: CellCoord) -> Option<usize> {
    let cells: Vec<CellCoord> = grid.iter().map(|(cell, _)| cell).collect();
    let mut distance = vec![usize::MAX; cells.len()];
    let position = |cell: CellCoord| cells.iter().position(|candidate| *candidate == cell);
    distance[position(start)?] = 0;

    loop {
        let mut improved = false;
        for (from_index, from) in cells.iter().enumerate() {
            if distance[from_index] == usize::MAX {
                continue;
            }
            for (to_index, to) in cells.iter().enumerate() {
                if legal_step(grid, *from, *to) && distance[from_index] + 1 < distance[to_index] {
                    distance[to_index] = distance[from_index] + 1;
                    improved = true;
                }
            }
        }
        if !improved {
            break;
        }
    }

    let reached = distance[position(goal)?];
    (reached != usize::MAX).then_some(reached)
}

fn route_for(grid: &Grid, start: CellCoord, goal: CellCoord) -> Vec<CellCoord> {
    let rules = open_only();
    shortest_path(grid, start, goal, |cell| rules.is_walkable(grid, cell)).to_vec()
}

#[test]
fn detours_around_a_blocked_center() {
    let mut walls = vec![false; 25];
    walls[2 * 5 + 2] = true;
    let grid = grid_from(5, 5, &walls);
    let start = CellCoord::new(0, 0);
    let goal = CellCoord::new(4, 4);

    let route = route_for(&grid, start, goal);

    assert_eq!(route.len(), 6);
    assert_eq!(Some(route.len()), brute_force_distance(&grid, start, goal));
    assert!(!route.contains(&CellCoord::new(2, 2)));
    assert_eq!(
        route,
        vec![
            CellCoord::new(1, 0),
            CellCoord::new(2, 0),
            CellCoord::new(3, 1),
            CellCoord::new(3, 2),
            CellCoord::new(3, 3),
            CellCoord::new(4, 4),
        ]
    );
}

#[test]
fn repeated_searches_return_identical_routes() {
    let walls: Vec<bool> = (0..64).map(|index| index % 7 == 3).collect();
    let grid = grid_from(8, 8, &walls);
    let start = CellCoord::new(0, 0);
    let goal = CellCoord::new(7, 7);

    let first = route_for(&grid, start, goal);
    for _ in 0..10 {
        assert_eq!(route_for(&grid, start, goal), first);
    }
}

proptest! {
    #[test]
    fn bfs_matches_brute_force_and_never_cuts_corners(
        columns in 2_usize..7,
        rows in 2_usize..7,
        walls in prop::collection::vec(prop::bool::weighted(0.3), 36),
        start_seed in 0_usize..36,
        goal_seed in 0_usize..36,
    ) {
        let grid = grid_from(columns, rows, &walls);
        let cell_at = |seed: usize| {
            let index = seed % (columns * rows);
            CellCoord::new((index % columns) as u32, (index / columns) as u32)
        };
        let start = cell_at(start_seed);
        let goal = cell_at(goal_seed);

        let route = route_for(&grid, start, goal);
        let expected = if start == goal {
            None
        } else {
            brute_force_distance(&grid, start, goal)
                .filter(|_| open_at(&grid, i64::from(start.column()), i64::from(start.row())))
        };

        match expected {
            Some(length) => prop_assert_eq!(route.len(), length),
            None => prop_assert!(route.is_empty()),
        }

        let mut previous = start;
        for step in &route {
            prop_assert!(legal_step(&grid, previous, *step));
            previous = *step;
        }
        if let Some(last) = route.last() {
            prop_assert_eq!(*last, goal);
        }
    }
}
