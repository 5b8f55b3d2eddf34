//! Heuristic card-selection policy for a computer-controlled tank.
//!
//! There is no persistent mode. Every decision reclassifies the tactical
//! situation into a [`Strategy`], scores each hand card against that strategy's
//! table and fills the four program slots greedily, with difficulty-dependent
//! noise.

use crate::card::{Card, MoveDirection};
use crate::config;
use crate::maze::Maze;
use crate::tank::Tank;
use crate::types::*;
use crate::utils;
use rand::prelude::*;
use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

/// Tuning knobs fixed by a difficulty preset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BehaviorParams {
    pub reaction_time: f64, // Minimum seconds between recorded observations
    pub accuracy: f64,      // Chance of taking the best-scored card
    pub aggressiveness: f64,
    pub memory_decay: f64,
}

impl BehaviorParams {
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => BehaviorParams {
                reaction_time: 2.0,
                accuracy: 0.3,
                aggressiveness: 0.4,
                memory_decay: 0.1,
            },
            Difficulty::Medium => BehaviorParams {
                reaction_time: 1.5,
                accuracy: 0.6,
                aggressiveness: 0.7,
                memory_decay: 0.05,
            },
            Difficulty::Hard => BehaviorParams {
                reaction_time: 1.0,
                accuracy: 0.9,
                aggressiveness: 0.9,
                memory_decay: 0.02,
            },
        }
    }

    /// How long an observation stays in memory.
    pub fn memory_retention(&self) -> f64 {
        config::MEMORY_RETENTION * (1.0 - self.memory_decay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Retreat,
    Approach,
    Finish,
    Attack,
    Explore,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Retreat => "retreat",
            Strategy::Approach => "approach",
            Strategy::Finish => "finish",
            Strategy::Attack => "attack",
            Strategy::Explore => "explore",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub target_position: Point,
    pub target_health: u32,
    pub own_position: Point,
    pub own_health: u32,
    pub timestamp: f64,
}

/// Short rolling memory of recent observations.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    observations: VecDeque<Observation>,
}

impl Memory {
    pub fn record(&mut self, observation: Observation) {
        self.observations.push_back(observation);
        while self.observations.len() > config::MEMORY_CAPACITY {
            self.observations.pop_front();
        }
    }

    /// Drops observations older than `retention` seconds.
    pub fn prune(&mut self, now: f64, retention: f64) {
        self.observations
            .retain(|o| now - o.timestamp < retention);
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn clear(&mut self) {
        self.observations.clear();
    }

    /// Linear extrapolation of the target from its last two sightings.
    pub fn predict_target(&self) -> Option<Point> {
        let n = self.observations.len();
        if n < 2 {
            return None;
        }
        let prev = self.observations[n - 2].target_position;
        let last = self.observations[n - 1].target_position;
        Some(Point::new(
            last.x + (last.x - prev.x),
            last.y + (last.y - prev.y),
        ))
    }
}

/// Facts about the engagement that every card score reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Situation {
    pub strategy: Strategy,
    pub distance: f64,
    pub angle_error: f64, // Degrees between own heading and the aim point
    pub weapon_range: f64,
}

impl Situation {
    fn facing_away(&self) -> bool {
        self.angle_error > config::FACING_TOLERANCE
    }
}

#[derive(Debug, Clone)]
pub struct OpponentPolicy {
    pub side: Side, // The side this policy plays
    pub difficulty: Difficulty,
    params: BehaviorParams,
    memory: Memory,
    clock: f64,
    last_observed: Option<f64>,
}

impl OpponentPolicy {
    pub fn new(side: Side, difficulty: Difficulty) -> Self {
        Self::with_params(side, difficulty, BehaviorParams::for_difficulty(difficulty))
    }

    pub fn with_params(side: Side, difficulty: Difficulty, params: BehaviorParams) -> Self {
        OpponentPolicy {
            side,
            difficulty,
            params,
            memory: Memory::default(),
            clock: 0.0,
            last_observed: None,
        }
    }

    pub fn params(&self) -> &BehaviorParams {
        &self.params
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Forgets everything, as at the start of a level.
    pub fn reset(&mut self) {
        self.memory.clear();
        self.clock = 0.0;
        self.last_observed = None;
    }

    /// Advances the policy clock and records an observation once the reaction
    /// interval has passed.
    pub fn observe(&mut self, dt: f64, own: &Tank, target: &Tank) {
        self.clock += dt;
        let due = self
            .last_observed
            .is_none_or(|t| self.clock - t >= self.params.reaction_time);
        if due {
            self.memory.record(Observation {
                target_position: target.position,
                target_health: target.health(),
                own_position: own.position,
                own_health: own.health(),
                timestamp: self.clock,
            });
            self.last_observed = Some(self.clock);
        }
        self.memory
            .prune(self.clock, self.params.memory_retention());
    }

    /// Classifies the situation. Checks run in a fixed order and the first match wins.
    pub fn determine_strategy(&self, own: &Tank, target: &Tank, maze: &Maze) -> Strategy {
        let range = f64::from(own.loadout.weapon.range);
        let distance = own.distance_to(target);

        if own.health() <= config::CRITICAL_HEALTH {
            return Strategy::Retreat;
        }
        if distance > range * config::APPROACH_RANGE_FACTOR {
            return Strategy::Approach;
        }
        if own.in_range(target) && own.can_see(target, maze) {
            if target.health() <= config::CRITICAL_HEALTH {
                return Strategy::Finish;
            }
            return Strategy::Attack;
        }
        Strategy::Explore
    }

    /// Where to aim: the predicted position when the target is in sight.
    fn aim_point(&self, own: &Tank, target: &Tank, maze: &Maze) -> Point {
        if own.can_see(target, maze) {
            if let Some(predicted) = self.memory.predict_target() {
                return predicted;
            }
        }
        target.position
    }

    pub fn assess(&self, own: &Tank, target: &Tank, maze: &Maze) -> Situation {
        let aim = self.aim_point(own, target, maze);
        Situation {
            strategy: self.determine_strategy(own, target, maze),
            distance: own.distance_to(target),
            angle_error: utils::angle_difference(own.heading(), own.angle_to(aim)),
            weapon_range: f64::from(own.loadout.weapon.range),
        }
    }

    /// Heuristic value of playing `card` in program slot `slot`.
    pub fn evaluate_card(&self, card: &Card, slot: usize, situation: &Situation) -> i32 {
        strategy_score(card, situation) + slot_score(card, slot)
    }

    /// Picks program slots from `hand`, returning hand indices in program order.
    /// A card is never picked twice.
    pub fn select_program<R: Rng + ?Sized>(
        &self,
        hand: &[Card],
        own: &Tank,
        target: &Tank,
        maze: &Maze,
        rng: &mut R,
    ) -> Vec<usize> {
        let situation = self.assess(own, target, maze);
        let mut remaining: Vec<usize> = (0..hand.len()).collect();
        let mut program = Vec::with_capacity(config::PROGRAM_LENGTH);

        for slot in 0..config::PROGRAM_LENGTH {
            if remaining.is_empty() {
                break;
            }
            let mut scored: Vec<(usize, i32)> = remaining
                .iter()
                .map(|&i| (i, self.evaluate_card(&hand[i], slot, &situation)))
                .collect();
            // Stable, so equal scores keep hand order
            scored.sort_by(|a, b| b.1.cmp(&a.1));

            let pick = if rng.r#gen::<f64>() < 1.0 - self.params.accuracy {
                rng.gen_range(0..scored.len().min(config::TOP_CHOICES))
            } else {
                0
            };
            let chosen = scored[pick].0;
            program.push(chosen);
            remaining.retain(|&i| i != chosen);
        }

        crate::debug_ai!(
            "[{}] {} strategy (distance {:.1}, aim error {:.0}), program: {}",
            self.side.tag(),
            situation.strategy,
            situation.distance,
            situation.angle_error,
            program
                .iter()
                .map(|&i| hand[i].to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        program
    }

    /// Best open cell within three cells of `own`, scored by range,
    /// line of sight and not being too close.
    pub fn find_optimal_position(&self, own: &Tank, target: &Tank, maze: &Maze) -> Option<GridPos> {
        let origin = own.grid_position();
        let occupied = target.occupied_cells();
        let range = f64::from(own.loadout.weapon.range);
        let target_center = target.center();

        let mut best: Option<(GridPos, i32)> = None;
        for dx in -3..=3 {
            for dy in -3..=3 {
                let cell = origin.offset(dx, dy);
                if !maze.is_valid_position(cell, &occupied) {
                    continue;
                }
                let center = Point::new(f64::from(cell.x) + 0.5, f64::from(cell.y) + 0.5);
                let distance = center.distance(&target_center);

                let mut score = 0;
                if distance <= range {
                    score += 50;
                }
                if maze.has_path(center, target_center) {
                    score += 100;
                }
                if distance < 2.0 {
                    score -= 30;
                }
                if best.is_none_or(|(_, s)| score > s) {
                    best = Some((cell, score));
                }
            }
        }
        best.map(|(cell, _)| cell)
    }
}

fn strategy_score(card: &Card, situation: &Situation) -> i32 {
    match situation.strategy {
        Strategy::Attack => match card {
            Card::Fire => 100,
            Card::Turn(_) if situation.facing_away() => 50,
            Card::Move { direction, .. } => {
                let optimal = situation.weapon_range * config::OPTIMAL_RANGE_FACTOR;
                match direction {
                    MoveDirection::Backward if situation.distance < optimal => 30,
                    MoveDirection::Forward if situation.distance > optimal => 30,
                    _ => 0,
                }
            }
            _ => 0,
        },
        Strategy::Approach => match card {
            Card::Move {
                direction: MoveDirection::Forward,
                ..
            } => 80,
            Card::Teleport => 70,
            Card::Turn(_) if situation.facing_away() => 60,
            Card::Fire => 20,
            _ => 0,
        },
        Strategy::Retreat => match card {
            Card::Move {
                direction: MoveDirection::Backward,
                ..
            } => 100,
            Card::Move {
                direction: MoveDirection::Forward,
                ..
            } => -50,
            // Turning away only helps while still facing the target
            Card::Turn(_) if situation.angle_error < config::FACING_TOLERANCE => 40,
            _ => 0,
        },
        Strategy::Finish => match card {
            Card::Fire => 150,
            Card::Turn(_) if situation.facing_away() => 80,
            _ => 0,
        },
        Strategy::Explore => match card {
            Card::Move { .. } => 60,
            Card::Turn(_) => 40,
            Card::Fire => 10,
            Card::Teleport => 0,
        },
    }
}

// First slot favors positioning, last slot favors shooting
fn slot_score(card: &Card, slot: usize) -> i32 {
    match slot {
        0 if card.is_movement() => 20,
        s if s == config::PROGRAM_LENGTH - 1 && *card == Card::Fire => 30,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::TurnDirection;
    use rand::rngs::StdRng;

    fn precise(side: Side) -> OpponentPolicy {
        let params = BehaviorParams {
            accuracy: 1.0,
            ..BehaviorParams::for_difficulty(Difficulty::Hard)
        };
        OpponentPolicy::with_params(side, Difficulty::Hard, params)
    }

    fn duel(own_cell: GridPos, own_angle: f64, target_cell: GridPos) -> (Tank, Tank) {
        (
            Tank::new(Side::Opponent, own_cell, own_angle),
            Tank::new(Side::Player, target_cell, 0.0),
        )
    }

    #[test]
    fn test_strategy_precedence() {
        let maze = Maze::open(20, 20, 1);
        let policy = precise(Side::Opponent);

        let (mut own, target) = duel(GridPos::new(5, 5), 180.0, GridPos::new(2, 5));
        assert_eq!(policy.determine_strategy(&own, &target, &maze), Strategy::Attack);

        own.take_damage(2);
        assert_eq!(policy.determine_strategy(&own, &target, &maze), Strategy::Retreat);

        let (own, target) = duel(GridPos::new(18, 18), 180.0, GridPos::new(1, 1));
        assert_eq!(policy.determine_strategy(&own, &target, &maze), Strategy::Approach);

        let (own, mut target) = duel(GridPos::new(5, 5), 180.0, GridPos::new(2, 5));
        target.take_damage(2);
        assert_eq!(policy.determine_strategy(&own, &target, &maze), Strategy::Finish);
    }

    #[test]
    fn test_explore_without_line_of_sight() {
        let mut maze = Maze::open(20, 20, 1);
        for y in 0..20 {
            maze.set(GridPos::new(4, y), crate::maze::Cell::Wall);
        }
        let policy = precise(Side::Opponent);
        let (own, target) = duel(GridPos::new(6, 5), 180.0, GridPos::new(2, 5));
        assert_eq!(policy.determine_strategy(&own, &target, &maze), Strategy::Explore);
    }

    #[test]
    fn test_finish_prefers_fire() {
        let policy = precise(Side::Opponent);
        let situation = Situation {
            strategy: Strategy::Finish,
            distance: 3.0,
            angle_error: 0.0,
            weapon_range: 5.0,
        };
        let fire = policy.evaluate_card(&Card::Fire, 1, &situation);
        for card in [Card::forward(1), Card::backward(1), Card::Turn(TurnDirection::Left), Card::Teleport] {
            assert!(fire > policy.evaluate_card(&card, 1, &situation));
        }
        assert_eq!(fire, 150);
    }

    #[test]
    fn test_scores_follow_tables() {
        let policy = precise(Side::Opponent);
        let mut situation = Situation {
            strategy: Strategy::Attack,
            distance: 2.0,
            angle_error: 90.0,
            weapon_range: 5.0,
        };
        assert_eq!(policy.evaluate_card(&Card::Turn(TurnDirection::Left), 1, &situation), 50);
        assert_eq!(policy.evaluate_card(&Card::backward(1), 1, &situation), 30);
        assert_eq!(policy.evaluate_card(&Card::forward(1), 1, &situation), 0);
        assert_eq!(policy.evaluate_card(&Card::Fire, 3, &situation), 130);

        situation.strategy = Strategy::Retreat;
        assert_eq!(policy.evaluate_card(&Card::forward(2), 0, &situation), -30);
        assert_eq!(policy.evaluate_card(&Card::Turn(TurnDirection::Right), 1, &situation), 0);

        situation.strategy = Strategy::Approach;
        assert_eq!(policy.evaluate_card(&Card::Teleport, 0, &situation), 70);
    }

    #[test]
    fn test_program_has_no_repeats() {
        let maze = Maze::open(20, 20, 1);
        let policy = OpponentPolicy::new(Side::Opponent, Difficulty::Easy);
        let (own, target) = duel(GridPos::new(5, 5), 180.0, GridPos::new(2, 5));
        let hand = vec![
            Card::Fire,
            Card::Fire,
            Card::forward(1),
            Card::Turn(TurnDirection::Left),
            Card::Turn(TurnDirection::Right),
            Card::backward(1),
        ];
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let mut program = policy.select_program(&hand, &own, &target, &maze, &mut rng);
            assert_eq!(program.len(), config::PROGRAM_LENGTH);
            program.sort_unstable();
            program.dedup();
            assert_eq!(program.len(), config::PROGRAM_LENGTH);
        }
    }

    #[test]
    fn test_precise_policy_fires_when_attacking() {
        let maze = Maze::open(20, 20, 1);
        let policy = precise(Side::Opponent);
        let (own, target) = duel(GridPos::new(5, 5), 180.0, GridPos::new(2, 5));
        let hand = vec![
            Card::forward(1),
            Card::Turn(TurnDirection::Left),
            Card::Fire,
            Card::Turn(TurnDirection::Right),
            Card::Fire,
            Card::backward(1),
        ];
        let mut rng = StdRng::seed_from_u64(1);
        let program = policy.select_program(&hand, &own, &target, &maze, &mut rng);
        assert_eq!(hand[program[0]], Card::Fire);
        assert_eq!(hand[program[1]], Card::Fire);
    }

    #[test]
    fn test_memory_is_gated_and_bounded() {
        let mut policy = precise(Side::Opponent);
        let (own, mut target) = duel(GridPos::new(5, 5), 180.0, GridPos::new(2, 5));

        policy.observe(0.1, &own, &target);
        policy.observe(0.1, &own, &target);
        assert_eq!(policy.memory().len(), 1);

        target.teleport_to(GridPos::new(3, 5));
        policy.observe(1.0, &own, &target);
        assert_eq!(policy.memory().len(), 2);
        let predicted = policy.memory().predict_target().unwrap();
        assert_eq!(predicted.cell(), GridPos::new(4, 5));

        for _ in 0..100 {
            policy.observe(1.0, &own, &target);
            assert!(policy.memory().len() <= config::MEMORY_CAPACITY);
        }
        let retention = policy.params().memory_retention();
        assert!(policy.memory().len() as f64 <= retention + 1.0);
    }

    #[test]
    fn test_optimal_position_has_line_of_sight() {
        let maze = Maze::open(20, 20, 1);
        let policy = precise(Side::Opponent);
        let (own, target) = duel(GridPos::new(10, 10), 180.0, GridPos::new(8, 10));
        let cell = policy.find_optimal_position(&own, &target, &maze).unwrap();
        assert!(maze.is_valid_position(cell, &target.occupied_cells()));
        assert!(cell.manhattan(&own.grid_position()) <= 6);
    }
}
