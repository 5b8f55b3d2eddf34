use clap::Parser;
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs;
use std::path::PathBuf;
use tankmaze::card::SpecialAction;
use tankmaze::config::{self, GameSettings};
use tankmaze::game::{Game, GameOverReason, GameSnapshot, Phase};
use tankmaze::logging;
use tankmaze::opponent::{Difficulty, OpponentPolicy};
use tankmaze::render::Renderer;
use tankmaze::types::Side;

// --- Command Line Arguments ---
#[derive(Parser, Debug)]
#[command(author, version, about = "Headless tank maze duel", long_about = None)]
struct Args {
    /// Seed for maze generation, hands and both policies. Random if omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Opponent difficulty (the autopilot plays at the same level).
    #[arg(long, value_enum, default_value_t = Difficulty::Easy)]
    difficulty: Difficulty,

    /// Turn limit per level.
    #[arg(long, default_value_t = config::MAX_TURNS)]
    turns: u32,

    /// Level to start on.
    #[arg(long, default_value_t = 1)]
    level: u32,

    /// Stop after this many level wins.
    #[arg(long, default_value_t = 1)]
    levels: u32,

    /// Seconds between program steps.
    #[arg(long, default_value_t = config::DEFAULT_STEP_DELAY)]
    step_delay: f64,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Debug topics to show (e.g., "maze,tank,card,projectile,ai,round,shop")
    #[arg(long)]
    debug_filter: Option<String>,

    /// Print the arena at the start of every round.
    #[arg(long)]
    render: bool,

    /// Write the final progress snapshot as JSON.
    #[arg(long)]
    save: Option<PathBuf>,

    /// Resume from a saved JSON snapshot.
    #[arg(long)]
    load: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if let Err(e) = logging::init_logger(logging::parse_level(&args.log_level), args.debug_filter.clone()) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }

    let settings = GameSettings {
        seed: args.seed,
        difficulty: args.difficulty,
        max_turns: args.turns,
        step_delay: args.step_delay,
        starting_level: args.level,
    };

    let mut game = match &args.load {
        Some(path) => {
            info!("Loading snapshot from {}", path.display());
            let snapshot: GameSnapshot = serde_json::from_str(&fs::read_to_string(path)?)?;
            Game::restore(settings, &snapshot)?
        }
        None => Game::new(settings)?,
    };

    let mut autopilot = OpponentPolicy::new(Side::Player, args.difficulty);
    let mut pilot_rng = StdRng::seed_from_u64(game.seed.wrapping_add(1));
    let renderer = Renderer::default();
    let dt = 1.0 / f64::from(config::FRAME_RATE);
    let mut wins = 0;

    loop {
        match game.phase() {
            Phase::Planning => {
                if args.render {
                    print!("{}", renderer.draw_frame(&game, None));
                }
                use_specials(&mut game);
                let picks = autopilot.select_program(
                    game.player_hand(),
                    &game.player,
                    &game.opponent,
                    &game.maze,
                    &mut pilot_rng,
                );
                for index in picks {
                    game.toggle_selection(index);
                }
                if !game.confirm_program() {
                    warn!("Autopilot could not fill a program, stopping");
                    break;
                }
            }
            Phase::Executing { .. } => {
                autopilot.observe(dt, &game.player, &game.opponent);
                game.tick(dt);
            }
            Phase::LevelComplete => {
                wins += 1;
                if wins >= args.levels {
                    break;
                }
                stock_up(&mut game);
                game.start_next_level()?;
                autopilot.reset();
            }
            Phase::GameOver(_) => break,
        }
    }

    let announcement = match game.phase() {
        Phase::LevelComplete => format!("Victory! {} level(s) cleared", wins),
        Phase::GameOver(GameOverReason::Destroyed) => "Destroyed!".to_string(),
        Phase::GameOver(GameOverReason::TimeLimit) => "Time limit reached!".to_string(),
        _ => "Stopped".to_string(),
    };
    if args.render {
        print!("{}", renderer.draw_frame(&game, Some(&announcement)));
    }
    info!(
        "{} Level {}, score {}, points {}",
        announcement, game.level, game.economy.score, game.economy.points
    );
    println!(
        "{}: level {}, score {}, points {}",
        announcement, game.level, game.economy.score, game.economy.points
    );

    if let Some(path) = &args.save {
        fs::write(path, serde_json::to_string_pretty(&game.snapshot())?)?;
        info!("Snapshot written to {}", path.display());
    }
    Ok(())
}

// Patch up before committing a program when badly hurt
fn use_specials(game: &mut Game) {
    if game.player.health() > config::CRITICAL_HEALTH {
        return;
    }
    for action in [SpecialAction::Repair, SpecialAction::Shield] {
        if game.use_special(action) {
            info!("Autopilot used {}", action);
            return;
        }
    }
}

// Spend winnings on specials between levels
fn stock_up(game: &mut Game) {
    for id in ["repair", "shield"] {
        if game.buy_special(id).is_success() {
            info!("Autopilot bought {}", id);
        }
    }
}
