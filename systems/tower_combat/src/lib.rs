#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! System that resolves tower attacks against the targets chosen for a tick.

use critter_defence_core::{AttackOutcome, Effect, Result, TowerKind, TowerTarget};
use critter_defence_world::{Critter, CritterManager, Tower, TowerManager};

/// Speed left to a critter hit by a slowing tower, in percent.
pub const SLOW_SPEED_PERCENT: u32 = 50;

/// Ticks a slow lasts.
pub const SLOW_DURATION_TICKS: u32 = 120;

/// Radius in cells hit by a splash attack.
pub const SPLASH_RADIUS: u32 = 1;

/// Capability that turns an attack on a live target into an [`Effect`].
pub trait ResolveAttack {
    /// Computes the effect `tower` has on `target`.
    fn resolve_attack(&self, tower: &Tower, target: &Critter) -> Effect;
}

impl ResolveAttack for TowerKind {
    fn resolve_attack(&self, tower: &Tower, target: &Critter) -> Effect {
        match self {
            TowerKind::Basic => Effect::Damage {
                target: target.id(),
                amount: tower.power(),
            },
            TowerKind::Slow => Effect::Slow {
                target: target.id(),
                amount: tower.power(),
                speed_percent: SLOW_SPEED_PERCENT,
                duration_ticks: SLOW_DURATION_TICKS,
            },
            TowerKind::Splash => Effect::Splash {
                target: target.id(),
                center: target.cell(),
                amount: tower.power(),
                radius: SPLASH_RADIUS,
            },
        }
    }
}

/// Tower combat system that resolves one attack per assigned target.
#[derive(Debug, Default)]
pub struct TowerCombat;

impl TowerCombat {
    /// Creates a new tower combat system.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Counts one tick off every tower's cooldown.
    pub fn cool_down(&mut self, towers: &TowerManager) -> Result<()> {
        for id in towers.ids() {
            towers.modify(id, Tower::cool_down)?;
        }
        Ok(())
    }

    /// Resolves the attacks in `targets` in order.
    ///
    /// Each effect is handed to `apply` before the next attack resolves, so a
    /// critter removed by an earlier attack yields
    /// [`AttackOutcome::TargetGone`] for later ones. A tower whose target is
    /// gone keeps its readiness. Attacks of towers that no longer exist are
    /// skipped.
    pub fn handle<F>(
        &mut self,
        targets: &[TowerTarget],
        towers: &TowerManager,
        critters: &CritterManager,
        mut apply: F,
        out: &mut Vec<AttackOutcome>,
    ) -> Result<()>
    where
        F: FnMut(&Effect) -> Result<()>,
    {
        for target in targets {
            let Some(tower) = towers.find(target.tower) else {
                continue;
            };
            let live = critters
                .find(target.critter)
                .filter(|critter| !critter.state().is_terminal());
            let Some(critter) = live else {
                log::debug!(
                    "tower {} lost critter {} before firing",
                    target.tower.get(),
                    target.critter.get()
                );
                out.push(AttackOutcome::TargetGone {
                    tower: target.tower,
                    critter: target.critter,
                });
                continue;
            };

            let effect = tower.kind().resolve_attack(&tower, &critter);
            apply(&effect)?;
            towers.modify(tower.id(), Tower::reset_cooldown)?;
            out.push(AttackOutcome::Hit {
                tower: tower.id(),
                effect,
            });
        }
        Ok(())
    }
}
