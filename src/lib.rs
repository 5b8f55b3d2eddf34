//! Turn-based tank duels in a procedurally generated maze.
//!
//! Both sides commit a four-card program each round; the programs run in
//! lockstep, one card per side per step, while projectiles, wall destruction
//! and scoring play out between steps. [`game::Game`] owns the simulation and
//! is driven by calling [`game::Game::tick`] with elapsed time.

pub mod card;
pub mod config;
pub mod economy;
pub mod effects;
pub mod equipment;
pub mod error;
pub mod game;
pub mod logging;
pub mod maze;
pub mod opponent;
pub mod projectile;
pub mod render;
pub mod tank;
pub mod types;
pub mod utils;

pub use error::GameError;
pub use game::{Game, GameSnapshot, Phase};
