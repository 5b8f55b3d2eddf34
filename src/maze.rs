use crate::config::{self, RANDOM_CELL_ATTEMPTS, SPAWN_ZONE_SIZE};
use crate::error::GameError;
use crate::types::{GridPos, Point};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::VecDeque;

// Smallest arena that still fits two spawn zones and a carved passage
const MIN_DIMENSION: usize = 5;

// Carving moves two cells at a time so passages stay one wall apart
const CARVE_DIRECTIONS: [(i32, i32); 4] = [(0, -2), (2, 0), (0, 2), (-2, 0)];
const NEIGHBORS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Wall,
    Open,
}

/// The arena: a grid of walls and open cells, generated once per level and
/// mutated in place when walls are destroyed.
#[derive(Debug, Clone)]
pub struct Maze {
    pub width: usize,
    pub height: usize,
    pub level: u32,
    grid: Vec<Cell>, // Row-major
}

impl Maze {
    /// Builds a maze with every cell open. Handy for tests and scripted arenas.
    pub fn open(width: usize, height: usize, level: u32) -> Self {
        Maze {
            width,
            height,
            level,
            grid: vec![Cell::Open; width * height],
        }
    }

    /// Generates a connected maze for a level.
    ///
    /// Order matters: carve the spanning maze, sprinkle noise walls outside the
    /// spawn zones, then force both spawn zones open so the corner clears win.
    pub fn generate<R: Rng + ?Sized>(
        width: usize,
        height: usize,
        level: u32,
        rng: &mut R,
    ) -> Result<Self, GameError> {
        if width < MIN_DIMENSION || height < MIN_DIMENSION {
            return Err(GameError::InvalidSettings(format!(
                "maze must be at least {}x{}, got {}x{}",
                MIN_DIMENSION, MIN_DIMENSION, width, height
            )));
        }

        let mut maze = Maze {
            width,
            height,
            level,
            grid: vec![Cell::Wall; width * height],
        };

        maze.carve_passages(rng);
        maze.add_noise_walls(rng);
        maze.clear_spawn_zones();

        log::info!(
            "Generated {}x{} maze for level {} ({} walls).",
            width,
            height,
            level,
            maze.wall_count()
        );
        Ok(maze)
    }

    /// Iterative recursive-backtracker starting at (1, 1).
    fn carve_passages<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let start = GridPos::new(1, 1);
        self.set(start, Cell::Open);
        let mut stack = vec![start];

        while let Some(&current) = stack.last() {
            let mut directions = CARVE_DIRECTIONS;
            directions.shuffle(rng);

            let next = directions.iter().find_map(|&(dx, dy)| {
                let candidate = current.offset(dx, dy);
                (self.is_carvable(candidate) && self.cell(candidate) == Some(Cell::Wall))
                    .then_some((candidate, current.offset(dx / 2, dy / 2)))
            });

            match next {
                Some((candidate, between)) => {
                    self.set(between, Cell::Open);
                    self.set(candidate, Cell::Open);
                    stack.push(candidate);
                }
                None => {
                    stack.pop();
                }
            }
        }
    }

    // Carving stays off the outer ring
    fn is_carvable(&self, pos: GridPos) -> bool {
        pos.x > 0 && pos.y > 0 && (pos.x as usize) < self.width - 1 && (pos.y as usize) < self.height - 1
    }

    fn add_noise_walls<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let density = config::noise_density_for_level(self.level);
        let attempts = ((self.width * self.height) as f64 * density).floor() as usize;
        let (player_spawn, opponent_spawn) = self.spawn_cells();
        let mut placed = 0;

        for _ in 0..attempts {
            let pos = GridPos::new(
                rng.gen_range(0..self.width as i32),
                rng.gen_range(0..self.height as i32),
            );
            if self.in_spawn_zone(pos) || self.cell(pos) != Some(Cell::Open) {
                continue;
            }

            self.set(pos, Cell::Wall);
            // Spawn zones are cleared afterwards, so they count as open here
            if self.reachable_through(player_spawn, opponent_spawn, |maze, cell| {
                maze.in_spawn_zone(cell) || maze.cell(cell) == Some(Cell::Open)
            }) {
                placed += 1;
            } else {
                // Never let noise split the arena in two
                self.set(pos, Cell::Open);
            }
        }

        crate::debug_maze!("Placed {} of {} noise walls", placed, attempts);
    }

    fn clear_spawn_zones(&mut self) {
        let zone = SPAWN_ZONE_SIZE as i32;
        let (w, h) = (self.width as i32, self.height as i32);
        for dy in 0..zone {
            for dx in 0..zone {
                self.set(GridPos::new(dx, dy), Cell::Open);
                self.set(GridPos::new(w - 1 - dx, h - 1 - dy), Cell::Open);
            }
        }
    }

    /// True if the cell lies in either 3x3 corner spawn zone.
    pub fn in_spawn_zone(&self, pos: GridPos) -> bool {
        let zone = SPAWN_ZONE_SIZE as i32;
        let (w, h) = (self.width as i32, self.height as i32);
        let top_left = pos.x < zone && pos.y < zone && pos.x >= 0 && pos.y >= 0;
        let bottom_right = pos.x >= w - zone && pos.y >= h - zone && pos.x < w && pos.y < h;
        top_left || bottom_right
    }

    /// Starting cells for the player (top-left) and opponent (bottom-right).
    pub fn spawn_cells(&self) -> (GridPos, GridPos) {
        (
            GridPos::new(1, 1),
            GridPos::new(self.width as i32 - 2, self.height as i32 - 2),
        )
    }

    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as usize) < self.width && (pos.y as usize) < self.height
    }

    fn index(&self, pos: GridPos) -> Option<usize> {
        self.in_bounds(pos)
            .then(|| pos.y as usize * self.width + pos.x as usize)
    }

    pub fn cell(&self, pos: GridPos) -> Option<Cell> {
        self.index(pos).map(|i| self.grid[i])
    }

    /// Overwrites a cell. Out-of-bounds writes are ignored.
    pub fn set(&mut self, pos: GridPos, cell: Cell) {
        if let Some(i) = self.index(pos) {
            self.grid[i] = cell;
        }
    }

    /// Out-of-bounds counts as wall.
    pub fn is_wall(&self, pos: GridPos) -> bool {
        self.cell(pos) != Some(Cell::Open)
    }

    /// Wall check for a continuous position (floored to its cell).
    pub fn is_wall_at(&self, point: Point) -> bool {
        self.is_wall(point.cell())
    }

    /// A cell a tank may enter: open, and not in `occupied` when given.
    pub fn is_valid_position(&self, pos: GridPos, occupied: &[GridPos]) -> bool {
        !self.is_wall(pos) && !occupied.contains(&pos)
    }

    /// Opens a wall cell. Returns true only if a wall was actually removed.
    pub fn destroy_wall(&mut self, pos: GridPos) -> bool {
        if self.cell(pos) == Some(Cell::Wall) {
            self.set(pos, Cell::Open);
            crate::debug_maze!("Wall destroyed at {}", pos);
            true
        } else {
            false
        }
    }

    /// Approximate line of sight between two points, sampled along the segment.
    ///
    /// This is visibility, not reachability: see [`Maze::is_reachable`].
    pub fn has_path(&self, from: Point, to: Point) -> bool {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        let distance = (dx * dx + dy * dy).sqrt();

        if distance < 1.0 {
            return true;
        }

        let steps = (distance * 2.0).ceil() as usize;
        (0..=steps).all(|i| {
            let t = i as f64 / steps as f64;
            !self.is_wall_at(Point::new(from.x + dx * t, from.y + dy * t))
        })
    }

    /// Breadth-first reachability over open cells (4-neighbour moves).
    pub fn is_reachable(&self, from: GridPos, to: GridPos) -> bool {
        self.reachable_through(from, to, |maze, cell| !maze.is_wall(cell))
    }

    fn reachable_through<F>(&self, from: GridPos, to: GridPos, passable: F) -> bool
    where
        F: Fn(&Maze, GridPos) -> bool,
    {
        if !passable(self, from) || !passable(self, to) {
            return false;
        }

        let mut visited = vec![false; self.grid.len()];
        let mut queue = VecDeque::new();
        if let Some(i) = self.index(from) {
            visited[i] = true;
            queue.push_back(from);
        }

        while let Some(current) = queue.pop_front() {
            if current == to {
                return true;
            }
            for &(dx, dy) in &NEIGHBORS {
                let next = current.offset(dx, dy);
                let Some(i) = self.index(next) else {
                    continue;
                };
                if visited[i] || !passable(self, next) {
                    continue;
                }
                visited[i] = true;
                queue.push_back(next);
            }
        }
        false
    }

    /// Bounded best-effort search for a random open interior cell.
    pub fn random_open_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<GridPos> {
        if self.width < 3 || self.height < 3 {
            return None;
        }
        (0..RANDOM_CELL_ATTEMPTS)
            .map(|_| {
                GridPos::new(
                    rng.gen_range(1..self.width as i32 - 1),
                    rng.gen_range(1..self.height as i32 - 1),
                )
            })
            .find(|&pos| !self.is_wall(pos))
    }

    pub fn wall_count(&self) -> usize {
        self.grid.iter().filter(|&&c| c == Cell::Wall).count()
    }

    pub fn wall_density(&self) -> f64 {
        self.wall_count() as f64 / self.grid.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn seeded_maze(size: usize, level: u32, seed: u64) -> Maze {
        let mut rng = StdRng::seed_from_u64(seed);
        Maze::generate(size, size, level, &mut rng).unwrap()
    }

    #[test]
    fn test_rejects_tiny_arena() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(Maze::generate(4, 10, 1, &mut rng).is_err());
    }

    #[test]
    fn test_spawn_zones_are_open() {
        for seed in 0..20 {
            let maze = seeded_maze(10, 5, seed);
            for y in 0..10 {
                for x in 0..10 {
                    let pos = GridPos::new(x, y);
                    if maze.in_spawn_zone(pos) {
                        assert!(!maze.is_wall(pos), "seed {} left a wall at {}", seed, pos);
                    }
                }
            }
        }
    }

    #[test]
    fn test_spawns_connected() {
        for seed in 0..20 {
            let maze = seeded_maze(13, 12, seed);
            let (player, opponent) = maze.spawn_cells();
            assert!(maze.is_reachable(player, opponent), "seed {}", seed);
        }
    }

    #[test]
    fn test_out_of_bounds_is_wall() {
        let maze = Maze::open(5, 5, 1);
        assert!(maze.is_wall(GridPos::new(-1, 0)));
        assert!(maze.is_wall(GridPos::new(0, 5)));
        assert!(!maze.is_wall(GridPos::new(4, 4)));
    }

    #[test]
    fn test_valid_position_respects_occupants() {
        let maze = Maze::open(5, 5, 1);
        let tank = GridPos::new(2, 2);
        assert!(maze.is_valid_position(tank, &[]));
        assert!(!maze.is_valid_position(tank, &[tank]));
    }

    #[test]
    fn test_destroy_wall_is_idempotent() {
        let mut maze = Maze::open(5, 5, 1);
        let pos = GridPos::new(2, 3);
        maze.set(pos, Cell::Wall);
        assert!(maze.destroy_wall(pos));
        assert!(!maze.is_wall(pos));
        assert!(!maze.destroy_wall(pos));
        assert!(!maze.destroy_wall(GridPos::new(-3, 0)));
    }

    #[test]
    fn test_has_path_is_line_of_sight() {
        let mut maze = Maze::open(7, 7, 1);
        // A wall between the two points blocks sight even though they are connected
        maze.set(GridPos::new(3, 3), Cell::Wall);
        let a = Point::new(1.5, 3.5);
        let b = Point::new(5.5, 3.5);
        assert!(!maze.has_path(a, b));
        assert!(maze.is_reachable(GridPos::new(1, 3), GridPos::new(5, 3)));
        assert!(maze.has_path(Point::new(1.5, 1.5), Point::new(5.5, 1.5)));
    }

    #[test]
    fn test_reachability_blocked_by_wall_line() {
        let mut maze = Maze::open(5, 5, 1);
        for y in 0..5 {
            maze.set(GridPos::new(2, y), Cell::Wall);
        }
        assert!(!maze.is_reachable(GridPos::new(0, 0), GridPos::new(4, 4)));
    }

    #[test]
    fn test_random_open_cell_gives_up() {
        let mut maze = Maze::open(5, 5, 1);
        for y in 0..5 {
            for x in 0..5 {
                maze.set(GridPos::new(x, y), Cell::Wall);
            }
        }
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(maze.random_open_cell(&mut rng), None);

        let open = Maze::open(5, 5, 1);
        assert!(open.random_open_cell(&mut rng).is_some());
    }
}
