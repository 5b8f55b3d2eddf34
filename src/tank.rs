use crate::config;
use crate::equipment::{self, Armor, Weapon};
use crate::error::GameError;
use crate::maze::Maze;
use crate::projectile::Projectile;
use crate::types::*;
use crate::utils;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status effects a tank can carry. Each one is independent of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatusEffect {
    Stunned,
    Shielded,
    DoubleMove,
    Overcharged,
    EmpDisabled,
}

/// How long an effect lasts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectTimer {
    Timed(f64), // Seconds remaining
    UntilUsed,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusEffects {
    active: BTreeMap<StatusEffect, EffectTimer>,
}

impl StatusEffects {
    /// Applies or refreshes an effect.
    pub fn apply(&mut self, effect: StatusEffect, timer: EffectTimer) {
        self.active.insert(effect, timer);
    }

    pub fn has(&self, effect: StatusEffect) -> bool {
        self.active.contains_key(&effect)
    }

    /// Removes an effect, returning whether it was active.
    pub fn consume(&mut self, effect: StatusEffect) -> bool {
        self.active.remove(&effect).is_some()
    }

    pub fn remaining(&self, effect: StatusEffect) -> Option<EffectTimer> {
        self.active.get(&effect).copied()
    }

    /// Counts timed effects down; anything that reaches zero is cleared.
    pub fn tick(&mut self, dt: f64) {
        self.active.retain(|_, timer| match timer {
            EffectTimer::Timed(left) => {
                *left -= dt;
                *left > 0.0
            }
            EffectTimer::UntilUsed => true,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = StatusEffect> + '_ {
        self.active.keys().copied()
    }
}

/// Weapon and armor currently fitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Loadout {
    pub weapon: &'static Weapon,
    pub armor: Option<&'static Armor>,
}

impl Default for Loadout {
    fn default() -> Self {
        Loadout {
            weapon: equipment::basic_cannon(),
            armor: None,
        }
    }
}

/// Persisted form of a tank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TankSnapshot {
    pub side: Side,
    pub position: Point,
    pub angle: f64,
    pub health: u32,
    pub max_health: u32,
    pub weapon: String,
    pub armor: Option<String>,
}

// Represents a tank in the maze
#[derive(Debug, Clone)]
pub struct Tank {
    pub side: Side,
    pub position: Point,    // Animated position, cell units
    pub target: Point,      // Where the last move intent ends
    pub angle: f64,         // Animated heading, degrees [0, 360)
    pub target_angle: f64,  // Committed heading
    health: u32,
    max_health: u32,
    pub loadout: Loadout,
    pub status: StatusEffects,
}

impl Tank {
    // Creates a tank with the base loadout at a grid cell
    pub fn new(side: Side, cell: GridPos, angle: f64) -> Self {
        let position = cell.to_point();
        let angle = utils::normalize_angle(angle);
        Tank {
            side,
            position,
            target: position,
            angle,
            target_angle: angle,
            health: config::BASE_MAX_HEALTH,
            max_health: config::BASE_MAX_HEALTH,
            loadout: Loadout::default(),
            status: StatusEffects::default(),
        }
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn max_health(&self) -> u32 {
        self.max_health
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Cell the tank currently occupies, derived from the animated position.
    pub fn grid_position(&self) -> GridPos {
        self.position.cell()
    }

    /// Cell the tank is heading for. Card intents start from here.
    pub fn destination_cell(&self) -> GridPos {
        self.target.cell()
    }

    /// Committed facing, a multiple of 90 during normal play.
    pub fn heading(&self) -> f64 {
        self.target_angle
    }

    /// Cells this tank blocks for the other tank's movement.
    pub fn occupied_cells(&self) -> [GridPos; 2] {
        [self.grid_position(), self.destination_cell()]
    }

    pub fn move_to(&mut self, cell: GridPos) {
        self.target = cell.to_point();
    }

    pub fn rotate_to(&mut self, angle: f64) {
        self.target_angle = utils::normalize_angle(angle);
    }

    /// Instant relocation, no animation.
    pub fn teleport_to(&mut self, cell: GridPos) {
        self.position = cell.to_point();
        self.target = self.position;
    }

    /// Advances movement and rotation towards their targets and ticks status timers.
    pub fn update(&mut self, dt: f64) {
        self.update_movement(dt);
        self.update_rotation(dt);
        self.status.tick(dt);
    }

    fn move_speed(&self) -> f64 {
        let penalty = self.loadout.armor.map_or(0.0, |a| a.speed_penalty);
        config::MOVE_SPEED * (1.0 - penalty)
    }

    fn update_movement(&mut self, dt: f64) {
        let distance = self.position.distance(&self.target);
        if distance <= config::POSITION_EPSILON {
            // Snap so floating point error never leaves the tank between cells
            self.position = self.target;
            return;
        }
        let ratio = (self.move_speed() * dt / distance).min(1.0);
        self.position = utils::lerp_point(self.position, self.target, ratio);
        if self.position.distance(&self.target) <= config::POSITION_EPSILON {
            self.position = self.target;
        }
    }

    fn update_rotation(&mut self, dt: f64) {
        let delta = utils::shortest_angle_delta(self.angle, self.target_angle);
        if delta.abs() <= config::ANGLE_EPSILON {
            self.angle = self.target_angle;
            return;
        }
        let step = (config::ROTATE_SPEED * dt).min(delta.abs());
        self.angle = utils::normalize_angle(self.angle + step * delta.signum());
        if utils::angle_difference(self.angle, self.target_angle) <= config::ANGLE_EPSILON {
            self.angle = self.target_angle;
        }
    }

    /// Removes health, clamped at zero. Crossing into critical health stuns the tank.
    pub fn take_damage(&mut self, amount: u32) {
        let before = self.health;
        self.health = self.health.saturating_sub(amount);
        if before > config::CRITICAL_HEALTH && self.health <= config::CRITICAL_HEALTH {
            self.status
                .apply(StatusEffect::Stunned, EffectTimer::Timed(config::STUN_DURATION));
            crate::debug_tank!(self.side, "Stunned at {} health", self.health);
        }
    }

    /// Resolves a projectile hit: a shield soaks it, otherwise armor reduces it.
    /// Returns the damage actually taken.
    pub fn receive_hit(&mut self, base_damage: u32) -> u32 {
        if self.status.consume(StatusEffect::Shielded) {
            crate::debug_tank!(self.side, "Shield absorbed {} damage", base_damage);
            return 0;
        }
        let damage = equipment::calculate_damage(base_damage, self.loadout.armor);
        self.take_damage(damage);
        damage
    }

    pub fn heal(&mut self, amount: u32) {
        self.health = self.health.saturating_add(amount).min(self.max_health);
    }

    pub fn equip_weapon(&mut self, weapon: &'static Weapon) {
        self.loadout.weapon = weapon;
    }

    /// Swaps armor, undoing the old armor's health bonus before adding the new one.
    pub fn equip_armor(&mut self, armor: Option<&'static Armor>) {
        let old_bonus = self.loadout.armor.map_or(0, |a| a.health_bonus);
        let new_bonus = armor.map_or(0, |a| a.health_bonus);

        let base_max = self.max_health.saturating_sub(old_bonus).max(1);
        // Taking armor off never kills a living tank
        let floor = self.health.min(1);
        let base_health = self.health.saturating_sub(old_bonus).max(floor);

        self.max_health = base_max + new_bonus;
        if self.is_alive() {
            self.health = (base_health + new_bonus).min(self.max_health);
        }
        self.loadout.armor = armor;
    }

    /// Spawns a projectile one cell ahead along the heading, or nothing when
    /// the weapon is disabled by an EMP.
    pub fn fire(&mut self) -> Option<Projectile> {
        if self.status.has(StatusEffect::EmpDisabled) {
            crate::debug_tank!(self.side, "Weapon disabled, shot fizzled");
            return None;
        }

        let weapon = self.loadout.weapon;
        let mut damage = weapon.damage;
        if self.status.consume(StatusEffect::Overcharged) {
            damage += config::OVERCHARGE_BONUS;
        }

        let (dx, dy) = utils::heading_vector(self.heading());
        let origin = self.destination_cell().to_point();
        let start = Point::new(origin.x + dx, origin.y + dy);

        crate::debug_tank!(
            self.side,
            "Fired {} from ({:.1}, {:.1}) heading {:.0} (damage {})",
            weapon.name,
            start.x,
            start.y,
            self.heading(),
            damage
        );

        Some(Projectile::new(
            start,
            self.heading(),
            damage,
            f64::from(weapon.range),
            self.side,
            weapon.can_destroy_walls,
            weapon.can_pierce_walls,
        ))
    }

    /// Center of the occupied cell, used for sight lines and aiming.
    pub fn center(&self) -> Point {
        Point::new(self.position.x + 0.5, self.position.y + 0.5)
    }

    pub fn distance_to(&self, other: &Tank) -> f64 {
        self.position.distance(&other.position)
    }

    pub fn angle_to(&self, point: Point) -> f64 {
        utils::angle_between(self.position, point)
    }

    pub fn can_see(&self, other: &Tank, maze: &Maze) -> bool {
        maze.has_path(self.center(), other.center())
    }

    pub fn in_range(&self, other: &Tank) -> bool {
        self.distance_to(other) <= f64::from(self.loadout.weapon.range)
    }

    pub fn to_snapshot(&self) -> TankSnapshot {
        TankSnapshot {
            side: self.side,
            position: self.target,
            angle: self.target_angle,
            health: self.health,
            max_health: self.max_health,
            weapon: self.loadout.weapon.id.to_string(),
            armor: self.loadout.armor.map(|a| a.id.to_string()),
        }
    }

    pub fn from_snapshot(snapshot: &TankSnapshot) -> Result<Self, GameError> {
        let weapon = equipment::get_weapon(&snapshot.weapon)
            .ok_or_else(|| GameError::UnknownItem(snapshot.weapon.clone()))?;
        let armor = snapshot
            .armor
            .as_deref()
            .map(|id| equipment::get_armor(id).ok_or_else(|| GameError::UnknownItem(id.to_string())))
            .transpose()?;

        if snapshot.max_health == 0 || snapshot.health > snapshot.max_health {
            return Err(GameError::InvalidSnapshot(format!(
                "health {}/{} out of bounds",
                snapshot.health, snapshot.max_health
            )));
        }
        if !snapshot.position.x.is_finite() || !snapshot.position.y.is_finite() {
            return Err(GameError::InvalidSnapshot("non-finite position".to_string()));
        }

        if !snapshot.angle.is_finite() {
            return Err(GameError::InvalidSnapshot("non-finite angle".to_string()));
        }

        // Headings are always axis-aligned in play
        let angle = (utils::normalize_angle(snapshot.angle) / 90.0).round() * 90.0;
        let mut tank = Tank::new(snapshot.side, snapshot.position.cell(), angle);
        tank.health = snapshot.health;
        tank.max_health = snapshot.max_health;
        tank.loadout = Loadout { weapon, armor };
        Ok(tank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn tank_at(x: i32, y: i32, angle: f64) -> Tank {
        Tank::new(Side::Player, GridPos::new(x, y), angle)
    }

    #[test]
    fn test_new_tank_defaults() {
        let tank = tank_at(1, 1, 0.0);
        assert_eq!(tank.health(), config::BASE_MAX_HEALTH);
        assert_eq!(tank.max_health(), config::BASE_MAX_HEALTH);
        assert_eq!(tank.loadout.weapon.id, equipment::BASIC_CANNON);
        assert!(tank.loadout.armor.is_none());
        assert_eq!(tank.grid_position(), GridPos::new(1, 1));
    }

    #[test]
    fn test_movement_interpolates_then_snaps() {
        let mut tank = tank_at(1, 1, 0.0);
        tank.move_to(GridPos::new(3, 1));

        tank.update(0.25); // One cell at 4 cells/s
        assert_approx_eq!(tank.position.x, 2.0);
        assert_eq!(tank.grid_position(), GridPos::new(2, 1));

        tank.update(1.0);
        assert_eq!(tank.position, tank.target);
        assert_eq!(tank.grid_position(), GridPos::new(3, 1));
    }

    #[test]
    fn test_rotation_takes_short_way() {
        let mut tank = tank_at(1, 1, 0.0);
        tank.rotate_to(270.0);
        tank.update(0.125); // 45 degrees at 360 deg/s
        assert_approx_eq!(tank.angle, 315.0);
        tank.update(1.0);
        assert_approx_eq!(tank.angle, 270.0);
    }

    #[test]
    fn test_damage_clamps_and_stuns() {
        let mut tank = tank_at(1, 1, 0.0);
        tank.take_damage(1);
        assert_eq!(tank.health(), 2);
        assert!(!tank.status.has(StatusEffect::Stunned));

        tank.take_damage(1);
        assert_eq!(tank.health(), 1);
        assert!(tank.status.has(StatusEffect::Stunned));

        tank.take_damage(10);
        assert_eq!(tank.health(), 0);
        assert!(!tank.is_alive());
    }

    #[test]
    fn test_stun_only_on_crossing_critical() {
        let mut tank = tank_at(1, 1, 0.0);
        tank.take_damage(2);
        assert!(tank.status.has(StatusEffect::Stunned));
        tank.update(config::STUN_DURATION + 0.1);
        assert!(!tank.status.has(StatusEffect::Stunned));

        tank.take_damage(0);
        assert!(!tank.status.has(StatusEffect::Stunned));
        assert_eq!(tank.health(), 1);

        tank.take_damage(1);
        assert!(!tank.is_alive());
        assert!(!tank.status.has(StatusEffect::Stunned));
    }

    #[test]
    fn test_stun_expires() {
        let mut tank = tank_at(1, 1, 0.0);
        tank.take_damage(2);
        assert!(tank.status.has(StatusEffect::Stunned));
        tank.update(config::STUN_DURATION / 2.0);
        assert!(tank.status.has(StatusEffect::Stunned));
        tank.update(config::STUN_DURATION);
        assert!(!tank.status.has(StatusEffect::Stunned));
    }

    #[test]
    fn test_heal_clamps_to_max() {
        let mut tank = tank_at(1, 1, 0.0);
        tank.take_damage(2);
        tank.heal(10);
        assert_eq!(tank.health(), tank.max_health());
    }

    #[test]
    fn test_armor_swap_does_not_compound() {
        let mut tank = tank_at(1, 1, 0.0);
        let heavy = equipment::get_armor("heavyArmor");
        let light = equipment::get_armor("lightArmor");

        tank.equip_armor(heavy);
        assert_eq!(tank.max_health(), 5);
        assert_eq!(tank.health(), 5);

        tank.equip_armor(heavy);
        assert_eq!(tank.max_health(), 5);

        tank.equip_armor(light);
        assert_eq!(tank.max_health(), 4);
        assert_eq!(tank.health(), 4);

        tank.equip_armor(None);
        assert_eq!(tank.max_health(), config::BASE_MAX_HEALTH);
        assert_eq!(tank.health(), config::BASE_MAX_HEALTH);
    }

    #[test]
    fn test_removing_armor_keeps_wounded_tank_alive() {
        let mut tank = tank_at(1, 1, 0.0);
        tank.equip_armor(equipment::get_armor("heavyArmor"));
        tank.take_damage(4); // 1 of 5 left
        tank.equip_armor(None);
        assert_eq!(tank.health(), 1);
        assert!(tank.health() <= tank.max_health());
    }

    #[test]
    fn test_shield_absorbs_one_hit() {
        let mut tank = tank_at(1, 1, 0.0);
        tank.status.apply(StatusEffect::Shielded, EffectTimer::UntilUsed);
        assert_eq!(tank.receive_hit(2), 0);
        assert_eq!(tank.health(), 3);
        assert_eq!(tank.receive_hit(1), 1);
        assert_eq!(tank.health(), 2);
    }

    #[test]
    fn test_fire_spawns_one_cell_ahead() {
        let mut tank = tank_at(2, 2, 90.0);
        let projectile = tank.fire().unwrap();
        assert_eq!(projectile.position.cell(), GridPos::new(2, 3));
        assert_eq!(projectile.damage, 1);
        assert_eq!(projectile.owner, Side::Player);
        assert!(projectile.can_destroy_walls);
    }

    #[test]
    fn test_overcharge_and_emp() {
        let mut tank = tank_at(2, 2, 0.0);
        tank.status.apply(StatusEffect::Overcharged, EffectTimer::UntilUsed);
        assert_eq!(tank.fire().unwrap().damage, 2);
        assert_eq!(tank.fire().unwrap().damage, 1);

        tank.status.apply(StatusEffect::EmpDisabled, EffectTimer::Timed(1.0));
        assert!(tank.fire().is_none());
        tank.update(1.5);
        assert!(tank.fire().is_some());
    }

    #[test]
    fn test_snapshot_restores_loadout() {
        let mut tank = tank_at(4, 2, 90.0);
        tank.equip_weapon(equipment::get_weapon("heavyCannon").unwrap());
        tank.equip_armor(equipment::get_armor("lightArmor"));
        tank.take_damage(1);

        let snapshot = tank.to_snapshot();
        let restored = Tank::from_snapshot(&snapshot).unwrap();
        assert_eq!(restored.health(), 3);
        assert_eq!(restored.max_health(), 4);
        assert_eq!(restored.loadout, tank.loadout);
        assert_eq!(restored.grid_position(), GridPos::new(4, 2));
        assert_approx_eq!(restored.heading(), 90.0);
    }

    #[test]
    fn test_snapshot_snaps_heading_to_axis() {
        let mut snapshot = tank_at(3, 3, 0.0).to_snapshot();
        snapshot.angle = 47.0;
        let mut tank = Tank::from_snapshot(&snapshot).unwrap();
        assert_approx_eq!(tank.heading(), 90.0);
        assert_approx_eq!(tank.angle, 90.0);

        snapshot.angle = -100.0; // 260 normalized
        let restored = Tank::from_snapshot(&snapshot).unwrap();
        assert_approx_eq!(restored.heading(), 270.0);

        snapshot.angle = 350.0;
        assert_approx_eq!(Tank::from_snapshot(&snapshot).unwrap().heading(), 0.0);

        let projectile = tank.fire().unwrap();
        assert_approx_eq!(projectile.position.x, 3.0);
        assert_approx_eq!(projectile.position.y, 4.0);
    }

    #[test]
    fn test_snapshot_rejects_bad_data() {
        let mut snapshot = tank_at(1, 1, 0.0).to_snapshot();
        snapshot.weapon = "spoon".to_string();
        assert_eq!(
            Tank::from_snapshot(&snapshot).unwrap_err(),
            GameError::UnknownItem("spoon".to_string())
        );

        let mut snapshot = tank_at(1, 1, 0.0).to_snapshot();
        snapshot.health = 9;
        assert!(matches!(
            Tank::from_snapshot(&snapshot),
            Err(GameError::InvalidSnapshot(_))
        ));
    }
}
