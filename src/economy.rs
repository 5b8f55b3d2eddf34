//! Points, score and everything that spends points.

use crate::card::{Card, SpecialAction};
use crate::config;
use crate::equipment;
use crate::tank::Tank;
use std::fmt;

/// Result of a shop request. Rejections leave every piece of state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseResult {
    Purchased { cost: u32 },
    InsufficientPoints { cost: u32, available: u32 },
    UnknownItem,
    LevelLocked { required: u32 },
    ArmorLimitReached,
    SpecialPoolFull,
    NotAvailableNow,
}

impl PurchaseResult {
    pub fn is_success(&self) -> bool {
        matches!(self, PurchaseResult::Purchased { .. })
    }
}

impl fmt::Display for PurchaseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PurchaseResult::Purchased { cost } => write!(f, "purchased for {} points", cost),
            PurchaseResult::InsufficientPoints { cost, available } => {
                write!(f, "costs {} points, only {} available", cost, available)
            }
            PurchaseResult::UnknownItem => write!(f, "no such item"),
            PurchaseResult::LevelLocked { required } => write!(f, "requires level {}", required),
            PurchaseResult::ArmorLimitReached => write!(f, "armor already bought this level"),
            PurchaseResult::SpecialPoolFull => {
                write!(f, "already holding {} special actions", config::MAX_SPECIAL_ACTIONS)
            }
            PurchaseResult::NotAvailableNow => write!(f, "shop is closed right now"),
        }
    }
}

/// Score for clearing a level.
pub fn level_score(level: u32, turn_number: u32, max_turns: u32, player_health: u32) -> u32 {
    config::LEVEL_BASE_SCORE
        + config::TURN_BONUS * max_turns.saturating_sub(turn_number)
        + config::LEVEL_BONUS * level
        + config::HEALTH_BONUS * player_health
}

/// The player's persistent wallet and special-action pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Economy {
    pub points: u32,
    pub score: u32,
    special_actions: Vec<SpecialAction>,
    armor_bought_this_level: bool,
}

impl Economy {
    pub fn new() -> Self {
        Economy::default()
    }

    pub fn with_balance(points: u32, score: u32, special_actions: Vec<SpecialAction>) -> Self {
        let mut special_actions = special_actions;
        special_actions.truncate(config::MAX_SPECIAL_ACTIONS);
        Economy {
            points,
            score,
            special_actions,
            armor_bought_this_level: false,
        }
    }

    pub fn special_actions(&self) -> &[SpecialAction] {
        &self.special_actions
    }

    /// Called on level change: armor may be bought again.
    pub fn start_level(&mut self) {
        self.armor_bought_this_level = false;
    }

    pub fn award_wall_destroyed(&mut self) {
        self.points += config::WALL_DESTROY_REWARD;
    }

    /// Adds a level's score to both the running score and the wallet.
    pub fn award_level(&mut self, amount: u32) {
        self.score += amount;
        self.points += amount;
    }

    fn charge(&mut self, cost: u32) -> Result<(), PurchaseResult> {
        if self.points < cost {
            return Err(PurchaseResult::InsufficientPoints {
                cost,
                available: self.points,
            });
        }
        self.points -= cost;
        Ok(())
    }

    /// Buys a weapon or armor by catalog id and fits it to `tank`.
    pub fn buy_item(&mut self, id: &str, level: u32, tank: &mut Tank) -> PurchaseResult {
        let result = self.try_buy_item(id, level, tank).unwrap_or_else(|rejected| rejected);
        crate::debug_shop!("Buy {}: {}", id, result);
        result
    }

    fn try_buy_item(&mut self, id: &str, level: u32, tank: &mut Tank) -> Result<PurchaseResult, PurchaseResult> {
        if let Some(weapon) = equipment::get_weapon(id) {
            if level < weapon.level_requirement {
                return Err(PurchaseResult::LevelLocked {
                    required: weapon.level_requirement,
                });
            }
            self.charge(weapon.cost)?;
            tank.equip_weapon(weapon);
            return Ok(PurchaseResult::Purchased { cost: weapon.cost });
        }

        let armor = equipment::get_armor(id).ok_or(PurchaseResult::UnknownItem)?;
        if level < armor.level_requirement {
            return Err(PurchaseResult::LevelLocked {
                required: armor.level_requirement,
            });
        }
        if self.armor_bought_this_level {
            return Err(PurchaseResult::ArmorLimitReached);
        }
        self.charge(armor.cost)?;
        tank.equip_armor(Some(armor));
        self.armor_bought_this_level = true;
        Ok(PurchaseResult::Purchased { cost: armor.cost })
    }

    /// Buys a special action into the persistent pool.
    pub fn buy_special(&mut self, id: &str, level: u32) -> PurchaseResult {
        let result = self.try_buy_special(id, level).unwrap_or_else(|rejected| rejected);
        crate::debug_shop!("Buy special {}: {}", id, result);
        result
    }

    fn try_buy_special(&mut self, id: &str, level: u32) -> Result<PurchaseResult, PurchaseResult> {
        let action = SpecialAction::from_id(id).ok_or(PurchaseResult::UnknownItem)?;
        let item = equipment::get_special(action);
        if level < item.level_requirement {
            return Err(PurchaseResult::LevelLocked {
                required: item.level_requirement,
            });
        }
        if self.special_actions.len() >= config::MAX_SPECIAL_ACTIONS {
            return Err(PurchaseResult::SpecialPoolFull);
        }
        self.charge(item.cost)?;
        self.special_actions.push(action);
        Ok(PurchaseResult::Purchased { cost: item.cost })
    }

    /// Buys a Teleport card straight into the current hand.
    pub fn buy_teleport_card(&mut self, hand: &mut Vec<Card>) -> PurchaseResult {
        let result = match self.charge(config::TELEPORT_CARD_COST) {
            Ok(()) => {
                hand.push(Card::Teleport);
                PurchaseResult::Purchased {
                    cost: config::TELEPORT_CARD_COST,
                }
            }
            Err(rejected) => rejected,
        };
        crate::debug_shop!("Buy teleport card: {}", result);
        result
    }

    /// Removes one held special action, returning whether it was held.
    pub fn take_special(&mut self, action: SpecialAction) -> bool {
        match self.special_actions.iter().position(|&a| a == action) {
            Some(index) => {
                self.special_actions.remove(index);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GridPos, Side};

    fn tank() -> Tank {
        Tank::new(Side::Player, GridPos::new(1, 1), 0.0)
    }

    #[test]
    fn test_level_score() {
        assert_eq!(level_score(1, 10, 50, 3), 1000 + 400 + 100 + 150);
        assert_eq!(level_score(2, 60, 50, 0), 1000 + 200);
    }

    #[test]
    fn test_award_level_is_cumulative() {
        let mut economy = Economy::new();
        economy.award_level(1500);
        economy.award_level(1200);
        assert_eq!(economy.score, 2700);
        assert_eq!(economy.points, 2700);
    }

    #[test]
    fn test_buy_weapon() {
        let mut economy = Economy::with_balance(600, 0, vec![]);
        let mut tank = tank();
        assert_eq!(
            economy.buy_item("heavyCannon", 1, &mut tank),
            PurchaseResult::Purchased { cost: 500 }
        );
        assert_eq!(economy.points, 100);
        assert_eq!(tank.loadout.weapon.id, "heavyCannon");
    }

    #[test]
    fn test_rejections_change_nothing() {
        let mut economy = Economy::with_balance(100, 0, vec![]);
        let mut tank = tank();
        let before = economy.clone();

        assert_eq!(economy.buy_item("bfg", 1, &mut tank), PurchaseResult::UnknownItem);
        assert_eq!(
            economy.buy_item("heavyCannon", 1, &mut tank),
            PurchaseResult::InsufficientPoints { cost: 500, available: 100 }
        );
        assert_eq!(
            economy.buy_item("plasmaCannon", 1, &mut tank),
            PurchaseResult::LevelLocked { required: 8 }
        );
        assert_eq!(economy, before);
        assert_eq!(tank.loadout.weapon.id, equipment::BASIC_CANNON);
    }

    #[test]
    fn test_one_armor_per_level() {
        let mut economy = Economy::with_balance(5000, 0, vec![]);
        let mut tank = tank();
        assert!(economy.buy_item("lightArmor", 1, &mut tank).is_success());
        assert_eq!(
            economy.buy_item("heavyArmor", 1, &mut tank),
            PurchaseResult::ArmorLimitReached
        );
        assert_eq!(tank.max_health(), 4);

        economy.start_level();
        assert!(economy.buy_item("heavyArmor", 1, &mut tank).is_success());
        assert_eq!(tank.max_health(), 5);
    }

    #[test]
    fn test_special_pool_cap() {
        let mut economy = Economy::with_balance(10_000, 0, vec![]);
        for _ in 0..config::MAX_SPECIAL_ACTIONS {
            assert!(economy.buy_special("repair", 1).is_success());
        }
        assert_eq!(economy.buy_special("repair", 1), PurchaseResult::SpecialPoolFull);
        assert_eq!(economy.special_actions().len(), config::MAX_SPECIAL_ACTIONS);

        assert!(economy.take_special(SpecialAction::Repair));
        assert!(!economy.take_special(SpecialAction::Shield));
        assert_eq!(economy.special_actions().len(), config::MAX_SPECIAL_ACTIONS - 1);
    }

    #[test]
    fn test_special_level_lock() {
        let mut economy = Economy::with_balance(10_000, 0, vec![]);
        assert_eq!(
            economy.buy_special("emp", 1),
            PurchaseResult::LevelLocked { required: 3 }
        );
        assert_eq!(economy.buy_special("warp", 1), PurchaseResult::UnknownItem);
    }

    #[test]
    fn test_teleport_card() {
        let mut economy = Economy::with_balance(150, 0, vec![]);
        let mut hand = vec![Card::Fire];
        assert!(economy.buy_teleport_card(&mut hand).is_success());
        assert_eq!(hand, vec![Card::Fire, Card::Teleport]);
        assert!(!economy.buy_teleport_card(&mut hand).is_success());
        assert_eq!(hand.len(), 2);
        assert_eq!(economy.points, 50);
    }

    #[test]
    fn test_wall_reward() {
        let mut economy = Economy::new();
        economy.award_wall_destroyed();
        assert_eq!(economy.points, config::WALL_DESTROY_REWARD);
        assert_eq!(economy.score, 0);
    }
}
