//! Action cards and the persistent special actions.
//!
//! A card is a plain value. `Card::apply` is the only place its effect is
//! defined; the round machine calls it once per program step.

use crate::config;
use crate::error::GameError;
use crate::maze::Maze;
use crate::projectile::ProjectileSystem;
use crate::tank::{EffectTimer, StatusEffect, Tank};
use crate::types::*;
use crate::utils;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveDirection {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    /// Heading change in degrees. Screen space: y grows downwards, so left is counter-clockwise.
    pub fn degrees(self) -> f64 {
        match self {
            TurnDirection::Left => -90.0,
            TurnDirection::Right => 90.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Card {
    Move { direction: MoveDirection, steps: u32 },
    Turn(TurnDirection),
    Fire,
    Teleport,
}

impl Card {
    pub const fn forward(steps: u32) -> Card {
        Card::Move {
            direction: MoveDirection::Forward,
            steps,
        }
    }

    pub const fn backward(steps: u32) -> Card {
        Card::Move {
            direction: MoveDirection::Backward,
            steps,
        }
    }

    pub fn is_movement(&self) -> bool {
        matches!(self, Card::Move { .. } | Card::Turn(_))
    }

    /// Rejects descriptors that have no defined effect.
    pub fn validate(&self) -> Result<(), GameError> {
        match self {
            Card::Move { steps, .. } if *steps == 0 || *steps > config::MAX_MOVE_STEPS => {
                Err(GameError::MalformedCard {
                    card: self.to_string(),
                    reason: format!("move steps must be 1-{}", config::MAX_MOVE_STEPS),
                })
            }
            _ => Ok(()),
        }
    }

    /// Applies the card to `tank`. Anything with no legal effect is a no-op
    /// reported as `ActionOutcome::NoEffect`; only a malformed card is an error.
    pub fn apply(&self, tank: &mut Tank, ctx: &mut ActionContext<'_>) -> Result<ActionOutcome, GameError> {
        self.validate()?;

        let outcome = match *self {
            Card::Move { direction, steps } => apply_move(tank, ctx, direction, steps),
            Card::Turn(turn) => {
                if tank.status.has(StatusEffect::Stunned) {
                    ActionOutcome::NoEffect("stunned")
                } else {
                    tank.rotate_to(tank.heading() + turn.degrees());
                    ActionOutcome::Turned {
                        heading: tank.target_angle,
                    }
                }
            }
            Card::Fire => match tank.fire() {
                Some(projectile) => {
                    ctx.projectiles.spawn(projectile);
                    ActionOutcome::Fired
                }
                None => ActionOutcome::NoEffect("weapon disabled"),
            },
            Card::Teleport => apply_teleport(tank, ctx),
        };

        crate::debug_card!(tank.side, "{} -> {:?}", self, outcome);
        Ok(outcome)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Card::Move {
                direction: MoveDirection::Forward,
                steps,
            } => write!(f, "Move Forward {}", steps),
            Card::Move {
                direction: MoveDirection::Backward,
                steps,
            } => write!(f, "Move Backward {}", steps),
            Card::Turn(TurnDirection::Left) => write!(f, "Turn Left"),
            Card::Turn(TurnDirection::Right) => write!(f, "Turn Right"),
            Card::Fire => write!(f, "Fire"),
            Card::Teleport => write!(f, "Teleport"),
        }
    }
}

/// World state a card may read or extend while it executes.
pub struct ActionContext<'a> {
    pub maze: &'a Maze,
    pub rival: &'a Tank,
    pub projectiles: &'a mut ProjectileSystem,
    pub rng: &'a mut dyn RngCore,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionOutcome {
    Moved { to: GridPos, steps_taken: u32 },
    Turned { heading: f64 },
    Fired,
    Teleported { to: GridPos },
    Special(SpecialAction),
    NoEffect(&'static str),
}

// Grid step for a heading, rounded to the nearest axis
fn grid_step(heading: f64) -> (i32, i32) {
    let (dx, dy) = utils::heading_vector(heading);
    (dx.round() as i32, dy.round() as i32)
}

fn apply_move(
    tank: &mut Tank,
    ctx: &mut ActionContext<'_>,
    direction: MoveDirection,
    steps: u32,
) -> ActionOutcome {
    if tank.status.has(StatusEffect::Stunned) {
        return ActionOutcome::NoEffect("stunned");
    }

    let steps = if tank.status.consume(StatusEffect::DoubleMove) {
        steps * 2
    } else {
        steps
    };

    let (mut dx, mut dy) = grid_step(tank.heading());
    if direction == MoveDirection::Backward {
        dx = -dx;
        dy = -dy;
    }

    let occupied = ctx.rival.occupied_cells();
    let mut current = tank.destination_cell();
    let mut steps_taken = 0;
    for _ in 0..steps {
        let next = current.offset(dx, dy);
        // Blocked: the remaining steps are forfeited
        if !ctx.maze.is_valid_position(next, &occupied) {
            break;
        }
        current = next;
        steps_taken += 1;
    }

    if steps_taken == 0 {
        return ActionOutcome::NoEffect("blocked");
    }
    tank.move_to(current);
    ActionOutcome::Moved {
        to: current,
        steps_taken,
    }
}

/// Open cells at exactly the teleport distance from `around`, excluding `occupied`.
pub fn teleport_candidates(maze: &Maze, around: GridPos, occupied: &[GridPos]) -> Vec<GridPos> {
    let d = config::TELEPORT_DISTANCE;
    let mut candidates = Vec::new();
    for dx in -d..=d {
        for dy in -d..=d {
            if dx.abs() + dy.abs() != d {
                continue;
            }
            let cell = around.offset(dx, dy);
            if maze.is_valid_position(cell, occupied) {
                candidates.push(cell);
            }
        }
    }
    candidates
}

fn apply_teleport(tank: &mut Tank, ctx: &mut ActionContext<'_>) -> ActionOutcome {
    let candidates = teleport_candidates(
        ctx.maze,
        ctx.rival.grid_position(),
        &ctx.rival.occupied_cells(),
    );
    match candidates.choose(&mut *ctx.rng) {
        Some(&cell) => {
            tank.teleport_to(cell);
            ActionOutcome::Teleported { to: cell }
        }
        None => ActionOutcome::NoEffect("no teleport destination"),
    }
}

// Every hand contains these
const BASELINE_HAND: [Card; 4] = [
    Card::Turn(TurnDirection::Left),
    Card::Turn(TurnDirection::Right),
    Card::forward(1),
    Card::Fire,
];

// The remaining slots are drawn from here
const RANDOM_POOL: [Card; 6] = [
    Card::forward(1),
    Card::forward(2),
    Card::backward(1),
    Card::Turn(TurnDirection::Left),
    Card::Turn(TurnDirection::Right),
    Card::Fire,
];

/// Deals a shuffled hand: the baseline cards plus random draws.
pub fn deal_hand<R: Rng + ?Sized>(rng: &mut R) -> Vec<Card> {
    let mut hand: Vec<Card> = BASELINE_HAND.to_vec();
    while hand.len() < config::HAND_SIZE {
        if let Some(&card) = RANDOM_POOL.choose(rng) {
            hand.push(card);
        }
    }
    hand.shuffle(rng);
    hand
}

/// One-shot effects bought in the store and used outside the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpecialAction {
    Shield,
    Repair,
    DoubleMove,
    QuickShot,
    Emp,
    Overcharge,
}

impl SpecialAction {
    pub const ALL: [SpecialAction; 6] = [
        SpecialAction::Shield,
        SpecialAction::Repair,
        SpecialAction::DoubleMove,
        SpecialAction::QuickShot,
        SpecialAction::Emp,
        SpecialAction::Overcharge,
    ];

    pub fn id(self) -> &'static str {
        match self {
            SpecialAction::Shield => "shield",
            SpecialAction::Repair => "repair",
            SpecialAction::DoubleMove => "doubleMove",
            SpecialAction::QuickShot => "quickShot",
            SpecialAction::Emp => "emp",
            SpecialAction::Overcharge => "overcharge",
        }
    }

    pub fn from_id(id: &str) -> Option<SpecialAction> {
        Self::ALL.into_iter().find(|action| action.id() == id)
    }

    /// Applies the action for `tank`. `emp_duration` is how long an EMP keeps
    /// the rival's weapon offline, one full round at the current pacing.
    pub fn apply(
        self,
        tank: &mut Tank,
        rival: &mut Tank,
        projectiles: &mut ProjectileSystem,
        emp_duration: f64,
    ) -> ActionOutcome {
        match self {
            SpecialAction::Shield => tank.status.apply(StatusEffect::Shielded, EffectTimer::UntilUsed),
            SpecialAction::Repair => tank.heal(config::REPAIR_AMOUNT),
            SpecialAction::DoubleMove => {
                tank.status.apply(StatusEffect::DoubleMove, EffectTimer::UntilUsed)
            }
            SpecialAction::QuickShot => match tank.fire() {
                Some(projectile) => projectiles.spawn(projectile),
                None => return ActionOutcome::NoEffect("weapon disabled"),
            },
            SpecialAction::Emp => rival
                .status
                .apply(StatusEffect::EmpDisabled, EffectTimer::Timed(emp_duration)),
            SpecialAction::Overcharge => {
                tank.status.apply(StatusEffect::Overcharged, EffectTimer::UntilUsed)
            }
        }
        crate::debug_card!(tank.side, "Special {} used", self);
        ActionOutcome::Special(self)
    }
}

impl fmt::Display for SpecialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}
