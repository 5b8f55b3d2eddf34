//! Plain-text view of the simulation. Reads game state, never changes it.

use crate::equipment;
use crate::game::{Game, GameOverReason, Phase};
use crate::maze::Cell;
use crate::tank::{EffectTimer, StatusEffect, Tank};
use crate::types::*;
use std::fmt::Write;

const WALL: char = '#';
const FLOOR: char = '.';
const PROJECTILE: char = '*';
const BLAST_FRESH: char = '@';
const BLAST_FADING: char = '+';

pub struct Renderer {
    pub show_hud: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Renderer { show_hud: true }
    }
}

impl Renderer {
    /// Draws the arena, followed by the status panel when enabled and an
    /// optional announcement line.
    pub fn draw_frame(&self, game: &Game, announcement: Option<&str>) -> String {
        let mut out = self.draw_arena(game);
        if self.show_hud {
            out.push_str(&self.draw_hud(game));
        }
        if let Some(text) = announcement {
            let _ = writeln!(out, "*** {} ***", text);
        }
        out
    }

    pub fn draw_arena(&self, game: &Game) -> String {
        let maze = &game.maze;
        let mut rows: Vec<Vec<char>> = (0..maze.height)
            .map(|y| {
                (0..maze.width)
                    .map(|x| match maze.cell(GridPos::new(x as i32, y as i32)) {
                        Some(Cell::Wall) | None => WALL,
                        Some(Cell::Open) => FLOOR,
                    })
                    .collect()
            })
            .collect();

        let mut plot = |pos: GridPos, glyph: char| {
            if pos.x < 0 || pos.y < 0 {
                return;
            }
            if let Some(cell) = rows
                .get_mut(pos.y as usize)
                .and_then(|row| row.get_mut(pos.x as usize))
            {
                *cell = glyph;
            }
        };

        // Later layers draw over earlier ones
        for explosion in game.explosions.iter() {
            let glyph = if explosion.intensity() > 0.5 {
                BLAST_FRESH
            } else {
                BLAST_FADING
            };
            plot(explosion.cell, glyph);
        }
        for projectile in game.projectiles.projectiles() {
            plot(projectile.cell(), PROJECTILE);
        }
        for tank in [&game.opponent, &game.player] {
            if tank.is_alive() {
                plot(tank.grid_position(), tank_glyph(tank));
            }
        }

        let mut out = String::with_capacity((maze.width + 1) * maze.height);
        for row in rows {
            out.extend(row);
            out.push('\n');
        }
        out
    }

    pub fn draw_hud(&self, game: &Game) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Level {}  Turn {}/{}  Score {}  Points {}  [{}]",
            game.level,
            game.turn_number,
            game.settings.max_turns,
            game.economy.score,
            game.economy.points,
            phase_label(game.phase())
        );
        let _ = writeln!(out, "{}", tank_line("Player", &game.player));
        let _ = writeln!(out, "{}", tank_line("Opponent", &game.opponent));

        if game.phase() == Phase::Planning {
            let hand: Vec<String> = game
                .player_hand()
                .iter()
                .enumerate()
                .map(|(i, card)| match game.selected().iter().position(|&s| s == i) {
                    Some(slot) => format!("{}:{} <{}>", i, card, slot + 1),
                    None => format!("{}:{}", i, card),
                })
                .collect();
            let _ = writeln!(out, "Hand: {}", hand.join(" | "));

            let (weapons, armors) = equipment::shop_items(game.level);
            let stock: Vec<String> = weapons
                .iter()
                .map(|w| format!("{} {}", w.id, w.cost))
                .chain(armors.iter().map(|a| format!("{} {}", a.id, a.cost)))
                .collect();
            if !stock.is_empty() {
                let _ = writeln!(out, "Shop: {}", stock.join(", "));
            }
        }
        if !game.economy.special_actions().is_empty() {
            let held: Vec<String> = game
                .economy
                .special_actions()
                .iter()
                .map(|a| a.to_string())
                .collect();
            let _ = writeln!(out, "Specials: {}", held.join(", "));
        }
        out
    }
}

// Player tanks are arrows, the opponent uses letters
fn tank_glyph(tank: &Tank) -> char {
    let quadrant = ((tank.angle + 45.0) / 90.0).floor() as i32 % 4;
    match (tank.side, quadrant) {
        (Side::Player, 0) => '>',
        (Side::Player, 1) => 'v',
        (Side::Player, 2) => '<',
        (Side::Player, _) => '^',
        (Side::Opponent, 0) => 'E',
        (Side::Opponent, 1) => 'S',
        (Side::Opponent, 2) => 'W',
        (Side::Opponent, _) => 'N',
    }
}

fn tank_line(label: &str, tank: &Tank) -> String {
    let effects: Vec<String> = tank
        .status
        .iter()
        .map(|effect| {
            let name = match effect {
                StatusEffect::Stunned => "stunned",
                StatusEffect::Shielded => "shield",
                StatusEffect::DoubleMove => "double-move",
                StatusEffect::Overcharged => "overcharged",
                StatusEffect::EmpDisabled => "emp",
            };
            match tank.status.remaining(effect) {
                Some(EffectTimer::Timed(left)) => format!("{} {:.1}s", name, left),
                _ => name.to_string(),
            }
        })
        .collect();
    let mut line = format!(
        "{:<8} {}/{} hp  {}  {}  {}",
        label,
        tank.health(),
        tank.max_health(),
        tank.grid_position(),
        tank.loadout.weapon.name,
        tank.loadout.armor.map_or("no armor", |a| a.name)
    );
    if !effects.is_empty() {
        let _ = write!(line, "  ({})", effects.join(", "));
    }
    line
}

fn phase_label(phase: Phase) -> String {
    match phase {
        Phase::Planning => "planning".to_string(),
        Phase::Executing { step, .. } => format!("executing step {}", step.min(4)),
        Phase::LevelComplete => "level complete".to_string(),
        Phase::GameOver(GameOverReason::Destroyed) => "game over: destroyed".to_string(),
        Phase::GameOver(GameOverReason::TimeLimit) => "game over: time limit".to_string(),
    }
}
