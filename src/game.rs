use crate::card::{self, ActionContext, Card, SpecialAction};
use crate::config::{self, GameSettings};
use crate::economy::{self, Economy, PurchaseResult};
use crate::effects::ExplosionSystem;
use crate::error::GameError;
use crate::maze::Maze;
use crate::opponent::OpponentPolicy;
use crate::projectile::{ImpactEvent, ProjectileSystem};
use crate::tank::{Tank, TankSnapshot};
use crate::types::*;
use log::{error, info};
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOverReason {
    Destroyed,
    TimeLimit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    Planning,
    /// `step` is the next program index to run once `delay_remaining` reaches zero.
    /// `step == PROGRAM_LENGTH` means the program is done and the round closes.
    Executing { step: usize, delay_remaining: f64 },
    LevelComplete,
    GameOver(GameOverReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionResult {
    Selected,
    Deselected,
    Rejected,
}

/// Persisted progress: counters and the player tank, never a round in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub level: u32,
    pub score: u32,
    pub points: u32,
    pub special_actions: Vec<SpecialAction>,
    pub player: TankSnapshot,
}

/// Owns the whole simulation and sequences everything that mutates it.
pub struct Game {
    pub settings: GameSettings,
    pub seed: u64,
    pub level: u32,
    pub turn_number: u32,
    pub maze: Maze,
    pub player: Tank,
    pub opponent: Tank,
    pub projectiles: ProjectileSystem,
    pub explosions: ExplosionSystem,
    pub economy: Economy,
    phase: Phase,
    policy: OpponentPolicy,
    player_hand: Vec<Card>,
    opponent_hand: Vec<Card>,
    selected: Vec<usize>,
    opponent_selection: Vec<usize>,
    player_program: Vec<Card>,
    opponent_program: Vec<Card>,
    rng: StdRng,
}

impl Game {
    /// Creates a game at the configured starting level with hands dealt.
    pub fn new(settings: GameSettings) -> Result<Self, GameError> {
        settings.validate()?;
        let seed = settings.seed.unwrap_or_else(rand::random);
        info!(
            "New game: seed {}, difficulty {}, {} turns per level",
            seed, settings.difficulty, settings.max_turns
        );

        let mut rng = StdRng::seed_from_u64(seed);
        let level = settings.starting_level;
        let maze = Self::build_maze(level, &mut rng)?;
        let (player, opponent) = Self::spawn_tanks(&maze);

        let mut game = Game {
            settings,
            seed,
            level,
            turn_number: 0,
            maze,
            player,
            opponent,
            projectiles: ProjectileSystem::new(),
            explosions: ExplosionSystem::new(),
            economy: Economy::new(),
            phase: Phase::Planning,
            policy: OpponentPolicy::new(Side::Opponent, settings.difficulty),
            player_hand: Vec::new(),
            opponent_hand: Vec::new(),
            selected: Vec::new(),
            opponent_selection: Vec::new(),
            player_program: Vec::new(),
            opponent_program: Vec::new(),
            rng,
        };
        game.deal_hands();
        Ok(game)
    }

    /// Rebuilds a game from saved progress. The arena is generated fresh.
    pub fn restore(settings: GameSettings, snapshot: &GameSnapshot) -> Result<Self, GameError> {
        if snapshot.level == 0 {
            return Err(GameError::InvalidSnapshot("level must be at least 1".to_string()));
        }
        if snapshot.special_actions.len() > config::MAX_SPECIAL_ACTIONS {
            return Err(GameError::InvalidSnapshot(format!(
                "{} special actions held, at most {} allowed",
                snapshot.special_actions.len(),
                config::MAX_SPECIAL_ACTIONS
            )));
        }
        if snapshot.player.side != Side::Player {
            return Err(GameError::InvalidSnapshot("saved tank is not the player".to_string()));
        }
        let mut player = Tank::from_snapshot(&snapshot.player)?;

        let settings = GameSettings {
            starting_level: snapshot.level,
            ..settings
        };
        let mut game = Game::new(settings)?;

        // The saved cell may be a wall in the regenerated arena
        let saved_cell = player.grid_position();
        if !game.maze.is_valid_position(saved_cell, &game.opponent.occupied_cells()) {
            player.teleport_to(game.maze.spawn_cells().0);
        }
        game.player = player;
        game.economy = Economy::with_balance(
            snapshot.points,
            snapshot.score,
            snapshot.special_actions.clone(),
        );
        game.deal_hands();
        info!("Restored game at level {} with {} points", game.level, game.economy.points);
        Ok(game)
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            level: self.level,
            score: self.economy.score,
            points: self.economy.points,
            special_actions: self.economy.special_actions().to_vec(),
            player: self.player.to_snapshot(),
        }
    }

    fn build_maze(level: u32, rng: &mut StdRng) -> Result<Maze, GameError> {
        let size = config::maze_size_for_level(level);
        Maze::generate(size, size, level, rng)
    }

    fn spawn_tanks(maze: &Maze) -> (Tank, Tank) {
        let (player_cell, opponent_cell) = maze.spawn_cells();
        (
            Tank::new(Side::Player, player_cell, config::PLAYER_START_ANGLE),
            Tank::new(Side::Opponent, opponent_cell, config::OPPONENT_START_ANGLE),
        )
    }

    /// Fresh arena, tanks and round state for the current level.
    /// Anything in flight is discarded.
    fn setup_level(&mut self) -> Result<(), GameError> {
        self.maze = Self::build_maze(self.level, &mut self.rng)?;
        let (player, opponent) = Self::spawn_tanks(&self.maze);
        self.player = player;
        self.opponent = opponent;
        self.projectiles.clear();
        self.explosions.clear();
        self.policy.reset();
        self.economy.start_level();
        self.turn_number = 0;
        info!("Level {} started", self.level);
        self.deal_hands();
        Ok(())
    }

    /// Starts over from the configured level with an empty wallet.
    pub fn new_game(&mut self) -> Result<(), GameError> {
        self.level = self.settings.starting_level;
        self.economy = Economy::new();
        self.setup_level()
    }

    /// Moves on after a won level. Points, score and special actions carry over;
    /// equipment does not.
    pub fn start_next_level(&mut self) -> Result<bool, GameError> {
        if self.phase != Phase::LevelComplete {
            return Ok(false);
        }
        self.level += 1;
        self.setup_level()?;
        Ok(true)
    }

    fn deal_hands(&mut self) {
        self.player_hand = card::deal_hand(&mut self.rng);
        self.opponent_hand = card::deal_hand(&mut self.rng);
        self.selected.clear();
        self.player_program.clear();
        self.opponent_program.clear();
        // The policy decides now, before it can see anything the player picks
        self.opponent_selection = self.policy.select_program(
            &self.opponent_hand,
            &self.opponent,
            &self.player,
            &self.maze,
            &mut self.rng,
        );
        self.phase = Phase::Planning;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, Phase::GameOver(_))
    }

    pub fn player_hand(&self) -> &[Card] {
        &self.player_hand
    }

    pub fn opponent_hand(&self) -> &[Card] {
        &self.opponent_hand
    }

    /// Selected hand indices in program order.
    pub fn selected(&self) -> &[usize] {
        &self.selected
    }

    pub fn player_program(&self) -> &[Card] {
        &self.player_program
    }

    pub fn opponent_program(&self) -> &[Card] {
        &self.opponent_program
    }

    /// Selects or deselects a hand card. A fifth selection is ignored.
    pub fn toggle_selection(&mut self, index: usize) -> SelectionResult {
        if self.phase != Phase::Planning || index >= self.player_hand.len() {
            return SelectionResult::Rejected;
        }
        if let Some(pos) = self.selected.iter().position(|&i| i == index) {
            self.selected.remove(pos);
            return SelectionResult::Deselected;
        }
        if self.selected.len() >= config::PROGRAM_LENGTH {
            crate::debug_card!(Side::Player, "Selection of card {} ignored, program full", index);
            return SelectionResult::Rejected;
        }
        self.selected.push(index);
        SelectionResult::Selected
    }

    /// Locks both programs and starts execution. Needs exactly four selected cards.
    pub fn confirm_program(&mut self) -> bool {
        if self.phase != Phase::Planning || self.selected.len() != config::PROGRAM_LENGTH {
            return false;
        }
        self.player_program = self.selected.iter().map(|&i| self.player_hand[i]).collect();
        self.opponent_program = self
            .opponent_selection
            .iter()
            .map(|&i| self.opponent_hand[i])
            .collect();

        info!(
            "Turn {}: player [{}] vs opponent [{}]",
            self.turn_number + 1,
            program_text(&self.player_program),
            program_text(&self.opponent_program)
        );
        self.phase = Phase::Executing {
            step: 0,
            delay_remaining: 0.0,
        };
        true
    }

    /// Uses a held special action on the player tank.
    pub fn use_special(&mut self, action: SpecialAction) -> bool {
        if !matches!(self.phase, Phase::Planning | Phase::Executing { .. }) {
            return false;
        }
        if !self.economy.take_special(action) {
            return false;
        }
        let emp_duration = self.settings.round_duration();
        action.apply(&mut self.player, &mut self.opponent, &mut self.projectiles, emp_duration);
        true
    }

    /// Buys a weapon or armor for this level.
    pub fn buy_item(&mut self, id: &str) -> PurchaseResult {
        if self.phase != Phase::Planning {
            return PurchaseResult::NotAvailableNow;
        }
        self.economy.buy_item(id, self.level, &mut self.player)
    }

    pub fn buy_special(&mut self, id: &str) -> PurchaseResult {
        if !matches!(self.phase, Phase::Planning | Phase::LevelComplete) {
            return PurchaseResult::NotAvailableNow;
        }
        self.economy.buy_special(id, self.level)
    }

    pub fn buy_teleport_card(&mut self) -> PurchaseResult {
        if self.phase != Phase::Planning {
            return PurchaseResult::NotAvailableNow;
        }
        self.economy.buy_teleport_card(&mut self.player_hand)
    }

    /// Advances the simulation by `dt` seconds.
    pub fn tick(&mut self, dt: f64) {
        self.player.update(dt);
        self.opponent.update(dt);
        self.explosions.update(dt);

        if !matches!(self.phase, Phase::Planning | Phase::Executing { .. }) {
            return;
        }

        self.policy.observe(dt, &self.opponent, &self.player);

        let events = self
            .projectiles
            .update(dt, &mut self.maze, &mut self.player, &mut self.opponent);
        self.handle_impacts(&events);
        if self.check_termination() {
            return;
        }

        if let Phase::Executing { .. } = self.phase {
            self.advance_execution(dt);
        }
    }

    fn handle_impacts(&mut self, events: &[ImpactEvent]) {
        for event in events {
            self.explosions.spawn_for(event);
            if let ImpactEvent::WallHit {
                owner: Side::Player,
                destroyed: true,
                ..
            } = event
            {
                self.economy.award_wall_destroyed();
            }
        }
    }

    fn advance_execution(&mut self, dt: f64) {
        let Phase::Executing {
            step,
            delay_remaining,
        } = self.phase
        else {
            return;
        };

        let delay_remaining = delay_remaining - dt;
        if delay_remaining > 0.0 {
            self.phase = Phase::Executing {
                step,
                delay_remaining,
            };
            return;
        }

        if step >= config::PROGRAM_LENGTH {
            self.end_round();
            return;
        }

        match self.execute_step(step) {
            Ok(()) => {
                self.phase = Phase::Executing {
                    step: step + 1,
                    delay_remaining: self.settings.step_delay,
                };
                self.check_termination();
            }
            Err(err) => self.abort_round(err),
        }
    }

    /// Applies both sides' cards for one program step, player first.
    fn execute_step(&mut self, step: usize) -> Result<(), GameError> {
        let player_card = program_card(&self.player_program, step)?;
        let opponent_card = program_card(&self.opponent_program, step)?;
        // Validate both so a bad card never leaves the step half applied
        player_card.validate()?;
        opponent_card.validate()?;

        crate::debug_round!(
            self.turn_number + 1,
            step + 1,
            "player {} / opponent {}",
            player_card,
            opponent_card
        );

        if self.player.is_alive() {
            let mut ctx = ActionContext {
                maze: &self.maze,
                rival: &self.opponent,
                projectiles: &mut self.projectiles,
                rng: &mut self.rng,
            };
            player_card.apply(&mut self.player, &mut ctx)?;
        }
        if self.opponent.is_alive() {
            let mut ctx = ActionContext {
                maze: &self.maze,
                rival: &self.player,
                projectiles: &mut self.projectiles,
                rng: &mut self.rng,
            };
            opponent_card.apply(&mut self.opponent, &mut ctx)?;
        }
        Ok(())
    }

    fn abort_round(&mut self, err: GameError) {
        error!(
            "Turn {}: {}, round aborted",
            self.turn_number + 1,
            err
        );
        self.deal_hands();
    }

    fn end_round(&mut self) {
        self.turn_number += 1;
        info!(
            "Turn {} complete: player {}/{}, opponent {}/{}",
            self.turn_number,
            self.player.health(),
            self.player.max_health(),
            self.opponent.health(),
            self.opponent.max_health()
        );
        if self.check_termination() {
            return;
        }
        if self.turn_number >= self.settings.max_turns {
            info!("Time limit of {} turns reached", self.settings.max_turns);
            self.phase = Phase::GameOver(GameOverReason::TimeLimit);
            return;
        }
        self.deal_hands();
    }

    /// Ends the level or the game if a tank is destroyed. Returns whether it did.
    pub fn check_termination(&mut self) -> bool {
        if !matches!(self.phase, Phase::Planning | Phase::Executing { .. }) {
            return false;
        }
        if !self.player.is_alive() {
            info!("Player destroyed on level {}", self.level);
            self.phase = Phase::GameOver(GameOverReason::Destroyed);
            return true;
        }
        if !self.opponent.is_alive() {
            let earned = economy::level_score(
                self.level,
                self.turn_number,
                self.settings.max_turns,
                self.player.health(),
            );
            self.economy.award_level(earned);
            info!(
                "Level {} complete, {} points earned (score {})",
                self.level, earned, self.economy.score
            );
            self.phase = Phase::LevelComplete;
            return true;
        }
        false
    }
}

fn program_card(program: &[Card], step: usize) -> Result<Card, GameError> {
    program.get(step).copied().ok_or_else(|| GameError::MalformedCard {
        card: format!("slot {}", step + 1),
        reason: "program has no card for this step".to_string(),
    })
}

fn program_text(program: &[Card]) -> String {
    program
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
