//! Breadth-first route search over the cell grid.

use std::collections::{BTreeSet, VecDeque};

use skirmish_core::{CellCoord, Direction, Grid, Route};

/// Order in which neighbours are explored: orthogonals first, then diagonals.
///
/// Ties between equally short routes are broken by this order.
pub const NEIGHBOUR_ORDER: [Direction; 8] = [
    Direction::Up,
    Direction::Right,
    Direction::Down,
    Direction::Left,
    Direction::UpRight,
    Direction::DownRight,
    Direction::DownLeft,
    Direction::UpLeft,
];

/// Symbol-based walkability of grid cells.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WalkRules {
    valid: Option<BTreeSet<char>>,
}

impl WalkRules {
    /// Rules under which every unblocked cell is walkable.
    #[must_use]
    pub const fn permissive() -> Self {
        Self { valid: None }
    }

    /// Rules restricting walking to cells whose symbol is in `valid`.
    #[must_use]
    pub fn new(valid: BTreeSet<char>) -> Self {
        Self { valid: Some(valid) }
    }

    /// Symbols considered walkable, or `None` when every symbol is.
    #[must_use]
    pub fn valid_symbols(&self) -> Option<&BTreeSet<char>> {
        self.valid.as_ref()
    }

    /// Reports whether `cell` lies inside `grid`, carries a valid symbol, and
    /// is not blocked.
    #[must_use]
    pub fn is_walkable(&self, grid: &Grid, cell: CellCoord) -> bool {
        grid.cell(cell).is_some_and(|candidate| {
            !candidate.is_blocked()
                && self
                    .valid
                    .as_ref()
                    .map_or(true, |valid| valid.contains(&candidate.symbol()))
        })
    }
}

const fn flanks(direction: Direction) -> Option<(Direction, Direction)> {
    match direction {
        Direction::UpRight => Some((Direction::Up, Direction::Right)),
        Direction::DownRight => Some((Direction::Down, Direction::Right)),
        Direction::DownLeft => Some((Direction::Down, Direction::Left)),
        Direction::UpLeft => Some((Direction::Up, Direction::Left)),
        _ => None,
    }
}

/// Cell reached by a single step from `cell`, if the step is passable.
///
/// Diagonal steps additionally require both flanking orthogonal cells to be
/// walkable, so routes never squeeze between two blocked corners.
pub fn passable_step<F>(
    grid: &Grid,
    cell: CellCoord,
    direction: Direction,
    is_walkable: &F,
) -> Option<CellCoord>
where
    F: Fn(CellCoord) -> bool,
{
    let walkable = |candidate: CellCoord| grid.contains(candidate) && is_walkable(candidate);

    let next = cell.step(direction).filter(|next| walkable(*next))?;
    if let Some((vertical, horizontal)) = flanks(direction) {
        let vertical = cell.step(vertical).filter(|flank| walkable(*flank));
        let horizontal = cell.step(horizontal).filter(|flank| walkable(*flank));
        if vertical.is_none() || horizontal.is_none() {
            return None;
        }
    }
    Some(next)
}

/// Computes a shortest 8-connected route from `start` to `goal`.
///
/// The route excludes `start` and includes `goal`. It is empty when either
/// endpoint is not walkable, when the goal cannot be reached, or when both
/// endpoints coincide.
pub fn shortest_path<F>(grid: &Grid, start: CellCoord, goal: CellCoord, is_walkable: F) -> Route
where
    F: Fn(CellCoord) -> bool,
{
    let walkable = |cell: CellCoord| grid.contains(cell) && is_walkable(cell);
    if start == goal || !walkable(start) || !walkable(goal) {
        return Route::empty();
    }

    let width = grid.columns() as usize;
    let index = |cell: CellCoord| cell.row() as usize * width + cell.column() as usize;
    let mut came_from: Vec<Option<CellCoord>> = vec![None; width * grid.rows() as usize];
    let mut visited = vec![false; came_from.len()];
    visited[index(start)] = true;

    let mut frontier = VecDeque::from([start]);
    while let Some(cell) = frontier.pop_front() {
        for direction in NEIGHBOUR_ORDER {
            let Some(next) = passable_step(grid, cell, direction, &is_walkable) else {
                continue;
            };
            if visited[index(next)] {
                continue;
            }
            visited[index(next)] = true;
            came_from[index(next)] = Some(cell);

            if next == goal {
                return unwind(&came_from, index, start, goal);
            }
            frontier.push_back(next);
        }
    }

    Route::empty()
}

fn unwind<I>(came_from: &[Option<CellCoord>], index: I, start: CellCoord, goal: CellCoord) -> Route
where
    I: Fn(CellCoord) -> usize,
{
    let mut cells = vec![goal];
    let mut cursor = goal;
    while let Some(previous) = came_from[index(cursor)] {
        if previous == start {
            break;
        }
        cells.push(previous);
        cursor = previous;
    }
    cells.reverse();
    Route::new(cells)
}

/// Extrapolates up to `cells` steps from `start` in a fixed direction.
///
/// Stops before the first impassable step, using the same diagonal rule as
/// [`shortest_path`].
pub fn route_in_direction<F>(
    grid: &Grid,
    start: CellCoord,
    direction: Direction,
    cells: u32,
    is_walkable: F,
) -> Route
where
    F: Fn(CellCoord) -> bool,
{
    let mut route = Vec::new();
    let mut cursor = start;
    for _ in 0..cells {
        let Some(next) = passable_step(grid, cursor, direction, &is_walkable) else {
            break;
        };
        route.push(next);
        cursor = next;
    }
    Route::new(route)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(rows: &[&str]) -> Grid {
        Grid::from_symbols(rows).expect("rectangular grid")
    }

    fn walls(grid: &Grid) -> impl Fn(CellCoord) -> bool + '_ {
        let rules = WalkRules::new(BTreeSet::from(['.']));
        move |cell| rules.is_walkable(grid, cell)
    }

    #[test]
    fn straight_corridor_is_walked_cell_by_cell() {
        let grid = open(&["....."]);
        let route = shortest_path(&grid, CellCoord::new(0, 0), CellCoord::new(4, 0), walls(&grid));
        assert_eq!(
            route.to_vec(),
            (1..=4).map(|column| CellCoord::new(column, 0)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn orthogonal_neighbours_win_ties() {
        let grid = open(&["...", "...", "..."]);
        let route = shortest_path(&grid, CellCoord::new(1, 1), CellCoord::new(1, 0), walls(&grid));
        assert_eq!(route.to_vec(), vec![CellCoord::new(1, 0)]);

        let diagonal = shortest_path(&grid, CellCoord::new(0, 0), CellCoord::new(2, 2), walls(&grid));
        assert_eq!(
            diagonal.to_vec(),
            vec![CellCoord::new(1, 1), CellCoord::new(2, 2)]
        );
    }

    #[test]
    fn diagonals_never_cut_blocked_corners() {
        let grid = open(&[".#", "#."]);
        let route = shortest_path(&grid, CellCoord::new(0, 0), CellCoord::new(1, 1), walls(&grid));
        assert!(route.is_empty());

        let half_open = open(&["..", "#."]);
        let route = shortest_path(
            &half_open,
            CellCoord::new(0, 0),
            CellCoord::new(1, 1),
            walls(&half_open),
        );
        assert_eq!(
            route.to_vec(),
            vec![CellCoord::new(1, 0), CellCoord::new(1, 1)]
        );
    }

    #[test]
    fn unwalkable_endpoints_yield_empty_routes() {
        let grid = open(&["..#"]);
        let to_wall = shortest_path(&grid, CellCoord::new(0, 0), CellCoord::new(2, 0), walls(&grid));
        let from_wall = shortest_path(&grid, CellCoord::new(2, 0), CellCoord::new(0, 0), walls(&grid));
        let outside = shortest_path(&grid, CellCoord::new(0, 0), CellCoord::new(9, 0), walls(&grid));
        let same = shortest_path(&grid, CellCoord::new(1, 0), CellCoord::new(1, 0), walls(&grid));
        assert!(to_wall.is_empty());
        assert!(from_wall.is_empty());
        assert!(outside.is_empty());
        assert!(same.is_empty());
    }

    #[test]
    fn blockers_veto_valid_symbols() {
        let mut grid = open(&["..."]);
        grid.block(CellCoord::new(1, 0)).expect("in bounds");
        let rules = WalkRules::permissive();
        assert!(!rules.is_walkable(&grid, CellCoord::new(1, 0)));
        assert!(rules.is_walkable(&grid, CellCoord::new(2, 0)));
    }

    #[test]
    fn directional_routes_stop_at_obstacles() {
        let grid = open(&["....#."]);
        let route = route_in_direction(&grid, CellCoord::new(0, 0), Direction::Right, 6, walls(&grid));
        assert_eq!(
            route.to_vec(),
            vec![
                CellCoord::new(1, 0),
                CellCoord::new(2, 0),
                CellCoord::new(3, 0)
            ]
        );

        let capped = route_in_direction(&grid, CellCoord::new(0, 0), Direction::Right, 2, walls(&grid));
        assert_eq!(capped.len(), 2);

        let edge = route_in_direction(&grid, CellCoord::new(0, 0), Direction::Up, 3, walls(&grid));
        assert!(edge.is_empty());
    }
}
