//! Static equipment catalog: weapons, armor and the special-action store.
//!
//! The core only reads these tables. Items are looked up by their string id,
//! which is also what snapshots persist.

use crate::card::SpecialAction;

pub const BASIC_CANNON: &str = "basicCannon";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weapon {
    pub id: &'static str,
    pub name: &'static str,
    pub damage: u32,
    pub range: u32, // Cells a projectile may travel
    pub can_destroy_walls: bool,
    pub can_pierce_walls: bool,
    pub cost: u32,
    pub level_requirement: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Armor {
    pub id: &'static str,
    pub name: &'static str,
    pub health_bonus: u32,
    pub damage_reduction: f64, // Fraction of incoming damage absorbed
    pub speed_penalty: f64,    // Fraction of movement speed lost
    pub cost: u32,
    pub level_requirement: u32,
}

/// Store entry for a persistent special action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecialItem {
    pub action: SpecialAction,
    pub name: &'static str,
    pub cost: u32,
    pub level_requirement: u32,
}

pub const WEAPONS: &[Weapon] = &[
    Weapon {
        id: BASIC_CANNON,
        name: "Basic Cannon",
        damage: 1,
        range: 5,
        can_destroy_walls: true,
        can_pierce_walls: false,
        cost: 0,
        level_requirement: 1,
    },
    Weapon {
        id: "heavyCannon",
        name: "Heavy Cannon",
        damage: 2,
        range: 8,
        can_destroy_walls: true,
        can_pierce_walls: false,
        cost: 500,
        level_requirement: 1,
    },
    Weapon {
        id: "missileLauncher",
        name: "Missile Launcher",
        damage: 3,
        range: 10,
        can_destroy_walls: true,
        can_pierce_walls: true,
        cost: 1000,
        level_requirement: 3,
    },
    Weapon {
        id: "laserCannon",
        name: "Laser Cannon",
        damage: 2,
        range: 12,
        can_destroy_walls: false,
        can_pierce_walls: false,
        cost: 1500,
        level_requirement: 5,
    },
    Weapon {
        id: "plasmaCannon",
        name: "Plasma Cannon",
        damage: 4,
        range: 6,
        can_destroy_walls: true,
        can_pierce_walls: false,
        cost: 2000,
        level_requirement: 8,
    },
];

pub const ARMORS: &[Armor] = &[
    Armor {
        id: "lightArmor",
        name: "Light Armor",
        health_bonus: 1,
        damage_reduction: 0.1,
        speed_penalty: 0.0,
        cost: 300,
        level_requirement: 1,
    },
    Armor {
        id: "heavyArmor",
        name: "Heavy Armor",
        health_bonus: 2,
        damage_reduction: 0.2,
        speed_penalty: 0.1,
        cost: 800,
        level_requirement: 1,
    },
    Armor {
        id: "reactiveArmor",
        name: "Reactive Armor",
        health_bonus: 1,
        damage_reduction: 0.3,
        speed_penalty: 0.05,
        cost: 1200,
        level_requirement: 4,
    },
];

pub const SPECIAL_ITEMS: &[SpecialItem] = &[
    SpecialItem {
        action: SpecialAction::Repair,
        name: "Repair Kit",
        cost: 200,
        level_requirement: 1,
    },
    SpecialItem {
        action: SpecialAction::QuickShot,
        name: "Quick Shot",
        cost: 250,
        level_requirement: 1,
    },
    SpecialItem {
        action: SpecialAction::DoubleMove,
        name: "Double Move",
        cost: 300,
        level_requirement: 1,
    },
    SpecialItem {
        action: SpecialAction::Overcharge,
        name: "Overcharge",
        cost: 400,
        level_requirement: 2,
    },
    SpecialItem {
        action: SpecialAction::Emp,
        name: "EMP Device",
        cost: 500,
        level_requirement: 3,
    },
    SpecialItem {
        action: SpecialAction::Shield,
        name: "Shield Generator",
        cost: 800,
        level_requirement: 2,
    },
];

pub fn get_weapon(id: &str) -> Option<&'static Weapon> {
    WEAPONS.iter().find(|w| w.id == id)
}

pub fn get_armor(id: &str) -> Option<&'static Armor> {
    ARMORS.iter().find(|a| a.id == id)
}

pub fn get_special(action: SpecialAction) -> &'static SpecialItem {
    let index = match action {
        SpecialAction::Repair => 0,
        SpecialAction::QuickShot => 1,
        SpecialAction::DoubleMove => 2,
        SpecialAction::Overcharge => 3,
        SpecialAction::Emp => 4,
        SpecialAction::Shield => 5,
    };
    &SPECIAL_ITEMS[index]
}

pub fn basic_cannon() -> &'static Weapon {
    &WEAPONS[0]
}

/// Damage left after armor: never below 1 for a nonzero hit.
pub fn calculate_damage(base_damage: u32, armor: Option<&Armor>) -> u32 {
    match armor {
        Some(armor) if base_damage > 0 => {
            let reduced = (f64::from(base_damage) * (1.0 - armor.damage_reduction)).floor();
            (reduced as u32).max(1)
        }
        _ => base_damage,
    }
}

/// Weapons and armor on sale at a level (the free starter cannon is never listed).
pub fn shop_items(level: u32) -> (Vec<&'static Weapon>, Vec<&'static Armor>) {
    let weapons = WEAPONS
        .iter()
        .filter(|w| w.cost > 0 && level >= w.level_requirement)
        .collect();
    let armors = ARMORS
        .iter()
        .filter(|a| level >= a.level_requirement)
        .collect();
    (weapons, armors)
}
