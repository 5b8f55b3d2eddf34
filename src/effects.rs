use crate::config;
use crate::projectile::ImpactEvent;
use crate::types::GridPos;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplosionKind {
    Wall,
    Tank,
}

// A short-lived blast marker. Presentation only, the simulation never reads it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Explosion {
    pub cell: GridPos,
    pub kind: ExplosionKind,
    lifetime: f64, // Seconds remaining
    initial_lifetime: f64,
}

impl Explosion {
    fn new(cell: GridPos, kind: ExplosionKind, lifetime: f64) -> Self {
        Explosion {
            cell,
            kind,
            lifetime,
            initial_lifetime: lifetime,
        }
    }

    fn update(&mut self, dt: f64) {
        self.lifetime -= dt;
    }

    pub fn is_alive(&self) -> bool {
        self.lifetime > 0.0
    }

    /// 1.0 when fresh, fading to 0.0 at expiry.
    pub fn intensity(&self) -> f64 {
        if self.initial_lifetime <= 0.0 {
            return 0.0;
        }
        (self.lifetime / self.initial_lifetime).clamp(0.0, 1.0)
    }
}

// Manages the active explosions
#[derive(Debug, Clone, Default)]
pub struct ExplosionSystem {
    explosions: Vec<Explosion>,
}

impl ExplosionSystem {
    pub fn new() -> Self {
        ExplosionSystem::default()
    }

    pub fn spawn(&mut self, cell: GridPos, kind: ExplosionKind) {
        self.explosions
            .push(Explosion::new(cell, kind, config::EXPLOSION_DURATION));
    }

    /// Spawns whatever blast an impact calls for.
    pub fn spawn_for(&mut self, event: &ImpactEvent) {
        let kind = match event {
            ImpactEvent::WallHit { .. } => ExplosionKind::Wall,
            ImpactEvent::TankHit { .. } => ExplosionKind::Tank,
            ImpactEvent::Expired { .. } => return,
        };
        if let Some(cell) = event.explosion_at() {
            self.spawn(cell, kind);
        }
    }

    pub fn update(&mut self, dt: f64) {
        self.explosions.retain_mut(|e| {
            e.update(dt);
            e.is_alive()
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Explosion> {
        self.explosions.iter()
    }

    pub fn len(&self) -> usize {
        self.explosions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.explosions.is_empty()
    }

    pub fn clear(&mut self) {
        self.explosions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_explosion_fades_and_expires() {
        let mut system = ExplosionSystem::new();
        system.spawn(GridPos::new(2, 2), ExplosionKind::Wall);
        assert_eq!(system.len(), 1);

        system.update(config::EXPLOSION_DURATION / 2.0);
        let explosion = system.iter().next().unwrap();
        assert_approx_eq!(explosion.intensity(), 0.5);

        system.update(config::EXPLOSION_DURATION);
        assert!(system.is_empty());
    }

    #[test]
    fn test_spawn_for_impacts() {
        let mut system = ExplosionSystem::new();
        system.spawn_for(&ImpactEvent::TankHit {
            owner: Side::Player,
            target: Side::Opponent,
            cell: GridPos::new(3, 4),
            damage: 1,
            destroyed: false,
        });
        system.spawn_for(&ImpactEvent::Expired {
            owner: Side::Player,
            position: crate::types::Point::new(0.0, 0.0),
        });
        assert_eq!(system.len(), 1);
        assert_eq!(system.iter().next().unwrap().kind, ExplosionKind::Tank);
    }
}
