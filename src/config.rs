//! Configuration constants for the tank maze game.

use crate::error::GameError;
use crate::opponent::Difficulty;

// Maze generation
pub const MIN_MAZE_SIZE: usize = 10; // Level 1 arena is 10x10
pub const MAX_MAZE_SIZE: usize = 20; // Arena stops growing at 20x20
pub const SPAWN_ZONE_SIZE: usize = 3; // Corner zones kept wall-free
pub const BASE_NOISE_DENSITY: f64 = 0.01; // Extra walls per cell at level 1
pub const NOISE_DENSITY_PER_LEVEL: f64 = 0.002;
pub const MAX_NOISE_DENSITY: f64 = 0.04;
pub const RANDOM_CELL_ATTEMPTS: usize = 100; // Bounded search for a random open cell

// Tank
pub const BASE_MAX_HEALTH: u32 = 3;
pub const CRITICAL_HEALTH: u32 = 1; // At or below this a hit stuns the tank
pub const STUN_DURATION: f64 = 2.0; // Seconds
pub const MOVE_SPEED: f64 = 4.0; // Cells per second
pub const ROTATE_SPEED: f64 = 360.0; // Degrees per second
pub const POSITION_EPSILON: f64 = 0.01; // Snap to target within this many cells
pub const ANGLE_EPSILON: f64 = 1.0; // Snap to target heading within this many degrees
pub const PLAYER_START_ANGLE: f64 = 0.0; // Facing east
pub const OPPONENT_START_ANGLE: f64 = 180.0; // Facing west

// Cards
pub const HAND_SIZE: usize = 6;
pub const PROGRAM_LENGTH: usize = 4;
pub const MAX_MOVE_STEPS: u32 = 3;
pub const TELEPORT_DISTANCE: i32 = 2; // Manhattan distance from the rival
pub const TELEPORT_CARD_COST: u32 = 100;

// Special actions
pub const MAX_SPECIAL_ACTIONS: usize = 4;
pub const REPAIR_AMOUNT: u32 = 2;
pub const OVERCHARGE_BONUS: u32 = 1; // Extra damage on the next projectile

// Projectiles
pub const PROJECTILE_STEP_INTERVAL: f64 = 0.2; // Seconds between advancements
pub const PROJECTILE_STEP_DISTANCE: f64 = 1.0; // Cells per advancement
pub const EXPLOSION_DURATION: f64 = 0.5; // Seconds

// Rounds and scoring
pub const DEFAULT_STEP_DELAY: f64 = 2.5; // Seconds between program steps
pub const MAX_TURNS: u32 = 50; // Rounds per level before the time limit fires
pub const WALL_DESTROY_REWARD: u32 = 50;
pub const LEVEL_BASE_SCORE: u32 = 1000;
pub const TURN_BONUS: u32 = 10; // Per round left under the cap
pub const LEVEL_BONUS: u32 = 100; // Per level number
pub const HEALTH_BONUS: u32 = 50; // Per remaining player health point

// Opponent memory
pub const MEMORY_CAPACITY: usize = 10;
pub const MEMORY_RETENTION: f64 = 10.0; // Seconds, scaled by the difficulty's decay
pub const OPTIMAL_RANGE_FACTOR: f64 = 0.8;
pub const APPROACH_RANGE_FACTOR: f64 = 1.5;
pub const FACING_TOLERANCE: f64 = 45.0; // Degrees of aim error tolerated
pub const TOP_CHOICES: usize = 3; // Pool size for inaccurate picks

// Headless runner
pub const FRAME_RATE: u32 = 60;

/// Runtime settings for one game, usually built from command line arguments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameSettings {
    /// Seed for every random decision. `None` draws one from entropy.
    pub seed: Option<u64>,
    pub difficulty: Difficulty,
    pub max_turns: u32,
    /// Seconds between program steps.
    pub step_delay: f64,
    pub starting_level: u32,
}

impl GameSettings {
    /// Seconds a full program takes to run. An EMP lasts this long.
    pub fn round_duration(&self) -> f64 {
        PROGRAM_LENGTH as f64 * self.step_delay
    }

    pub fn validate(&self) -> Result<(), GameError> {
        if self.max_turns == 0 {
            return Err(GameError::InvalidSettings(
                "turn limit must be at least 1".to_string(),
            ));
        }
        if !self.step_delay.is_finite() || self.step_delay < 0.0 {
            return Err(GameError::InvalidSettings(format!(
                "step delay must be a non-negative number of seconds, got {}",
                self.step_delay
            )));
        }
        if self.starting_level == 0 {
            return Err(GameError::InvalidSettings(
                "levels start at 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        GameSettings {
            seed: None,
            difficulty: Difficulty::Easy,
            max_turns: MAX_TURNS,
            step_delay: DEFAULT_STEP_DELAY,
            starting_level: 1,
        }
    }
}

/// Side length of the square arena for a level.
pub fn maze_size_for_level(level: u32) -> usize {
    (MIN_MAZE_SIZE + (level / 2) as usize).min(MAX_MAZE_SIZE)
}

/// Fraction of cells that receive an extra wall after carving.
pub fn noise_density_for_level(level: u32) -> f64 {
    let extra = f64::from(level.saturating_sub(1)) * NOISE_DENSITY_PER_LEVEL;
    (BASE_NOISE_DENSITY + extra).min(MAX_NOISE_DENSITY)
}
