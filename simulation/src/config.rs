//! Session configuration loaded from TOML.

use critter_defence_core::{Amount, CellCoord, Error, GridSize, Result, SpecViolation, TowerKind};
use critter_defence_system_spawning::Config as SpawningConfig;
use serde::Deserialize;

/// Settings for one game session.
///
/// Every field has a default, so an empty TOML document is a valid
/// configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Number of map columns.
    pub columns: u32,
    /// Number of map rows.
    pub rows: u32,
    /// Currency available before the first purchase.
    pub starting_balance: Amount,
    /// Health of the base at the exit.
    pub base_health: u32,
    /// Simulation ticks per second of game time.
    pub ticks_per_second: u32,
    /// Follow-up notification passes allowed per commit.
    pub follow_up_limit: usize,
    /// Wave schedule.
    pub waves: WaveConfig,
    /// Towers placed before the first tick.
    pub towers: Vec<TowerPlacement>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            columns: 12,
            rows: 7,
            starting_balance: 200,
            base_health: 20,
            ticks_per_second: 60,
            follow_up_limit: 16,
            waves: WaveConfig::default(),
            towers: Vec::new(),
        }
    }
}

impl Config {
    /// Map dimensions.
    #[must_use]
    pub const fn grid_size(&self) -> GridSize {
        GridSize::new(self.columns, self.rows)
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            (self.columns >= 2, "columns"),
            (self.rows >= 1, "rows"),
            (self.base_health > 0, "base_health"),
            (self.ticks_per_second > 0, "ticks_per_second"),
            (self.follow_up_limit > 0, "follow_up_limit"),
            (self.waves.count > 0, "waves.count"),
            (self.waves.critters_per_wave > 0, "waves.critters_per_wave"),
            (self.waves.spawn_interval > 0, "waves.spawn_interval"),
        ];
        match checks.iter().find(|(valid, _)| !valid) {
            Some(&(_, field)) => Err(Error::InvalidSpec(SpecViolation::Config(field))),
            None => Ok(()),
        }
    }
}

/// Wave schedule settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WaveConfig {
    /// Number of waves in the session.
    pub count: u32,
    /// Critters in the first wave.
    pub critters_per_wave: u32,
    /// Extra critters added by every later wave.
    pub growth: u32,
    /// Ticks between two spawns of a wave.
    pub spawn_interval: u32,
    /// Ticks between a cleared field and the next wave.
    pub pause: u32,
    /// Seed for the critter kind draw.
    pub seed: u64,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            count: 5,
            critters_per_wave: 5,
            growth: 2,
            spawn_interval: 120,
            pause: 180,
            seed: 0x5eed,
        }
    }
}

impl From<WaveConfig> for SpawningConfig {
    fn from(waves: WaveConfig) -> Self {
        SpawningConfig::new(
            waves.count,
            waves.critters_per_wave,
            waves.growth,
            waves.spawn_interval,
            waves.pause,
            waves.seed,
        )
    }
}

/// Tower requested by the configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TowerPlacement {
    /// Kind of tower.
    pub kind: TowerKind,
    /// Cell that hosts the tower.
    pub cell: CellCoord,
}
