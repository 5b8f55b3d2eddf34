use crate::config;
use crate::maze::Maze;
use crate::tank::Tank;
use crate::types::*;
use crate::utils;

// A shell in flight. Moves in whole-cell hops on a fixed timer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    pub position: Point,
    pub angle: f64, // Travel direction in degrees
    pub damage: u32,
    pub max_range: f64, // Cells before expiry
    pub owner: Side,
    pub can_destroy_walls: bool,
    pub can_pierce_walls: bool,
    pub distance_traveled: f64,
}

impl Projectile {
    pub fn new(
        position: Point,
        angle: f64,
        damage: u32,
        max_range: f64,
        owner: Side,
        can_destroy_walls: bool,
        can_pierce_walls: bool,
    ) -> Self {
        Projectile {
            position,
            angle: utils::normalize_angle(angle),
            damage,
            max_range,
            owner,
            can_destroy_walls,
            can_pierce_walls,
            distance_traveled: 0.0,
        }
    }

    pub fn cell(&self) -> GridPos {
        self.position.cell()
    }

    fn advance(&mut self) {
        let (dx, dy) = utils::heading_vector(self.angle);
        self.position.x += dx * config::PROJECTILE_STEP_DISTANCE;
        self.position.y += dy * config::PROJECTILE_STEP_DISTANCE;
        self.distance_traveled += config::PROJECTILE_STEP_DISTANCE;
    }
}

/// What happened to a projectile during an advancement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImpactEvent {
    WallHit {
        owner: Side,
        cell: GridPos,
        destroyed: bool,
    },
    TankHit {
        owner: Side,
        target: Side,
        cell: GridPos,
        damage: u32,
        destroyed: bool,
    },
    /// Left the arena or ran out of range.
    Expired { owner: Side, position: Point },
}

impl ImpactEvent {
    /// Where an explosion belongs, if the impact warrants one.
    pub fn explosion_at(&self) -> Option<GridPos> {
        match self {
            ImpactEvent::WallHit { cell, .. } | ImpactEvent::TankHit { cell, .. } => Some(*cell),
            ImpactEvent::Expired { .. } => None,
        }
    }
}

/// Live projectiles plus the timer that paces their advancement.
#[derive(Debug, Clone, Default)]
pub struct ProjectileSystem {
    projectiles: Vec<Projectile>,
    step_timer: f64,
}

impl ProjectileSystem {
    pub fn new() -> Self {
        ProjectileSystem::default()
    }

    pub fn spawn(&mut self, projectile: Projectile) {
        crate::debug_projectile!(
            projectile.owner,
            "Spawned at ({:.1}, {:.1}) heading {:.0}, range {:.0}",
            projectile.position.x,
            projectile.position.y,
            projectile.angle,
            projectile.max_range
        );
        self.projectiles.push(projectile);
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.projectiles.len()
    }

    pub fn clear(&mut self) {
        self.projectiles.clear();
        self.step_timer = 0.0;
    }

    /// Accumulates frame time and runs one advancement per elapsed interval.
    pub fn update(
        &mut self,
        dt: f64,
        maze: &mut Maze,
        player: &mut Tank,
        opponent: &mut Tank,
    ) -> Vec<ImpactEvent> {
        let mut events = Vec::new();
        if self.projectiles.is_empty() {
            self.step_timer = 0.0;
            return events;
        }

        self.step_timer += dt;
        while self.step_timer >= config::PROJECTILE_STEP_INTERVAL {
            self.step_timer -= config::PROJECTILE_STEP_INTERVAL;
            events.extend(self.advance_all(maze, player, opponent));
            if self.projectiles.is_empty() {
                self.step_timer = 0.0;
                break;
            }
        }
        events
    }

    /// One advancement for every live projectile.
    ///
    /// The current cell is resolved before the projectile moves: bounds, then
    /// walls, then tanks. A wall in the cell always wins over a tank, so a shell
    /// can never pass through a wall to reach a tank behind it.
    pub fn advance_all(
        &mut self,
        maze: &mut Maze,
        player: &mut Tank,
        opponent: &mut Tank,
    ) -> Vec<ImpactEvent> {
        let mut events = Vec::new();
        let mut i = 0;

        while i < self.projectiles.len() {
            let projectile = self.projectiles[i];
            let cell = projectile.cell();

            let event = if projectile.max_range <= 0.0 || !maze.in_bounds(cell) {
                Some(ImpactEvent::Expired {
                    owner: projectile.owner,
                    position: projectile.position,
                })
            } else if !projectile.can_pierce_walls && maze.is_wall(cell) {
                let destroyed = projectile.can_destroy_walls && maze.destroy_wall(cell);
                crate::debug_projectile!(
                    projectile.owner,
                    "Hit wall at {}{}",
                    cell,
                    if destroyed { ", wall destroyed" } else { "" }
                );
                Some(ImpactEvent::WallHit {
                    owner: projectile.owner,
                    cell,
                    destroyed,
                })
            } else {
                Self::check_tank_hit(&projectile, cell, player, opponent)
            };

            let event = match event {
                Some(event) => Some(event),
                None => {
                    self.projectiles[i].advance();
                    let moved = self.projectiles[i];
                    if !maze.in_bounds(moved.cell()) || moved.distance_traveled > moved.max_range
                    {
                        Some(ImpactEvent::Expired {
                            owner: moved.owner,
                            position: moved.position,
                        })
                    } else {
                        None
                    }
                }
            };

            match event {
                Some(event) => {
                    events.push(event);
                    // Order is irrelevant here, so removal is O(1)
                    self.projectiles.swap_remove(i);
                }
                None => i += 1,
            }
        }
        events
    }

    fn check_tank_hit(
        projectile: &Projectile,
        cell: GridPos,
        player: &mut Tank,
        opponent: &mut Tank,
    ) -> Option<ImpactEvent> {
        for tank in [player, opponent] {
            // A shell never hits its own tank
            if tank.side == projectile.owner || !tank.is_alive() || tank.grid_position() != cell {
                continue;
            }
            let damage = tank.receive_hit(projectile.damage);
            let destroyed = !tank.is_alive();
            crate::debug_projectile!(
                projectile.owner,
                "Hit {} at {} for {} damage, health remaining {}",
                tank.side,
                cell,
                damage,
                tank.health()
            );
            if destroyed {
                log::info!("{} tank destroyed at {}", tank.side, cell);
            }
            return Some(ImpactEvent::TankHit {
                owner: projectile.owner,
                target: tank.side,
                cell,
                damage,
                destroyed,
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maze::Cell;
    use assert_approx_eq::assert_approx_eq;

    fn shell(x: f64, y: f64, angle: f64, owner: Side) -> Projectile {
        Projectile::new(Point::new(x, y), angle, 1, 5.0, owner, true, false)
    }

    fn tanks() -> (Tank, Tank) {
        (
            Tank::new(Side::Player, GridPos::new(1, 1), 0.0),
            Tank::new(Side::Opponent, GridPos::new(8, 8), 180.0),
        )
    }

    #[test]
    fn test_projectile_moves_one_cell_per_advancement() {
        let mut maze = Maze::open(10, 10, 1);
        let (mut player, mut opponent) = tanks();
        let mut system = ProjectileSystem::new();
        system.spawn(shell(2.0, 3.0, 0.0, Side::Player));

        let events = system.advance_all(&mut maze, &mut player, &mut opponent);
        assert!(events.is_empty());
        assert_eq!(system.len(), 1);
        assert_approx_eq!(system.projectiles()[0].position.x, 3.0);
        assert_approx_eq!(system.projectiles()[0].distance_traveled, 1.0);
    }

    #[test]
    fn test_update_paces_advancements() {
        let mut maze = Maze::open(10, 10, 1);
        let (mut player, mut opponent) = tanks();
        let mut system = ProjectileSystem::new();
        system.spawn(shell(2.0, 3.0, 0.0, Side::Player));

        system.update(0.1, &mut maze, &mut player, &mut opponent);
        assert_approx_eq!(system.projectiles()[0].position.x, 2.0);
        system.update(0.1, &mut maze, &mut player, &mut opponent);
        assert_approx_eq!(system.projectiles()[0].position.x, 3.0);
    }

    #[test]
    fn test_wall_destroyed_once() {
        let mut maze = Maze::open(10, 10, 1);
        maze.set(GridPos::new(4, 3), Cell::Wall);
        let (mut player, mut opponent) = tanks();
        let mut system = ProjectileSystem::new();
        system.spawn(shell(4.0, 3.0, 0.0, Side::Player));

        let events = system.advance_all(&mut maze, &mut player, &mut opponent);
        assert_eq!(
            events,
            vec![ImpactEvent::WallHit {
                owner: Side::Player,
                cell: GridPos::new(4, 3),
                destroyed: true,
            }]
        );
        assert!(!maze.is_wall(GridPos::new(4, 3)));
        assert!(system.is_empty());
    }

    #[test]
    fn test_indestructible_wall_stops_shell() {
        let mut maze = Maze::open(10, 10, 1);
        maze.set(GridPos::new(4, 3), Cell::Wall);
        let (mut player, mut opponent) = tanks();
        let mut system = ProjectileSystem::new();
        let mut laser = shell(4.0, 3.0, 0.0, Side::Player);
        laser.can_destroy_walls = false;
        system.spawn(laser);

        let events = system.advance_all(&mut maze, &mut player, &mut opponent);
        assert!(matches!(events[0], ImpactEvent::WallHit { destroyed: false, .. }));
        assert!(maze.is_wall(GridPos::new(4, 3)));
        assert!(system.is_empty());
    }

    #[test]
    fn test_piercing_shell_passes_walls() {
        let mut maze = Maze::open(10, 10, 1);
        maze.set(GridPos::new(4, 3), Cell::Wall);
        let (mut player, mut opponent) = tanks();
        let mut system = ProjectileSystem::new();
        let mut missile = shell(4.0, 3.0, 0.0, Side::Player);
        missile.can_pierce_walls = true;
        system.spawn(missile);

        let events = system.advance_all(&mut maze, &mut player, &mut opponent);
        assert!(events.is_empty());
        assert!(maze.is_wall(GridPos::new(4, 3)));
        assert_eq!(system.len(), 1);
    }

    #[test]
    fn test_tank_hit_applies_damage() {
        let mut maze = Maze::open(10, 10, 1);
        let (mut player, mut opponent) = tanks();
        let mut system = ProjectileSystem::new();
        system.spawn(shell(7.0, 8.0, 0.0, Side::Player));

        system.advance_all(&mut maze, &mut player, &mut opponent);
        let events = system.advance_all(&mut maze, &mut player, &mut opponent);
        assert!(matches!(
            events[0],
            ImpactEvent::TankHit { target: Side::Opponent, damage: 1, destroyed: false, .. }
        ));
        assert_eq!(opponent.health(), 2);
        assert!(system.is_empty());
    }

    #[test]
    fn test_shell_ignores_its_owner() {
        let mut maze = Maze::open(10, 10, 1);
        let (mut player, mut opponent) = tanks();
        let mut system = ProjectileSystem::new();
        system.spawn(shell(1.0, 1.0, 0.0, Side::Player));

        let events = system.advance_all(&mut maze, &mut player, &mut opponent);
        assert!(events.is_empty());
        assert_eq!(player.health(), config::BASE_MAX_HEALTH);
    }

    #[test]
    fn test_wall_checked_before_tank() {
        let mut maze = Maze::open(10, 10, 1);
        maze.set(GridPos::new(5, 5), Cell::Wall);
        let (mut player, mut opponent) = tanks();
        opponent.teleport_to(GridPos::new(5, 5));
        let mut system = ProjectileSystem::new();
        system.spawn(shell(5.0, 5.0, 0.0, Side::Player));

        let events = system.advance_all(&mut maze, &mut player, &mut opponent);
        assert!(matches!(events[0], ImpactEvent::WallHit { .. }));
        assert_eq!(opponent.health(), config::BASE_MAX_HEALTH);
    }

    #[test]
    fn test_range_and_bounds_expiry() {
        let mut maze = Maze::open(20, 10, 1);
        let (mut player, mut opponent) = tanks();
        let mut system = ProjectileSystem::new();
        system.spawn(shell(2.0, 4.0, 0.0, Side::Player)); // Range 5
        system.spawn(shell(1.0, 4.0, 180.0, Side::Opponent)); // Leaves on the west edge

        let mut expired = 0;
        for _ in 0..6 {
            expired += system
                .advance_all(&mut maze, &mut player, &mut opponent)
                .iter()
                .filter(|e| matches!(e, ImpactEvent::Expired { .. }))
                .count();
        }
        assert_eq!(expired, 2);
        assert!(system.is_empty());
    }

    #[test]
    fn test_zero_range_expires_without_effect() {
        let mut maze = Maze::open(10, 10, 1);
        maze.set(GridPos::new(4, 3), Cell::Wall);
        let (mut player, mut opponent) = tanks();
        let mut system = ProjectileSystem::new();
        let mut dud = shell(4.0, 3.0, 0.0, Side::Player);
        dud.max_range = 0.0;
        system.spawn(dud);

        let events = system.advance_all(&mut maze, &mut player, &mut opponent);
        assert!(matches!(events[0], ImpactEvent::Expired { .. }));
        assert!(maze.is_wall(GridPos::new(4, 3)));
    }
}
