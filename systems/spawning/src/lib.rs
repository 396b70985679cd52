#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic wave scheduler emitting critter spawn commands.

use critter_defence_core::CritterKind;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const SPAWN_KINDS: [CritterKind; 3] = [CritterKind::Speedy, CritterKind::Tanky, CritterKind::Strong];

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    waves: u32,
    critters_per_wave: u32,
    growth_per_wave: u32,
    spawn_interval: u32,
    wave_pause: u32,
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration.
    ///
    /// Wave `n` spawns `critters_per_wave + growth_per_wave * (n - 1)`
    /// critters of level `n`, one every `spawn_interval` ticks. The next wave
    /// starts `wave_pause` ticks after the field is clear.
    #[must_use]
    pub const fn new(
        waves: u32,
        critters_per_wave: u32,
        growth_per_wave: u32,
        spawn_interval: u32,
        wave_pause: u32,
        rng_seed: u64,
    ) -> Self {
        Self {
            waves,
            critters_per_wave,
            growth_per_wave,
            spawn_interval,
            wave_pause,
            rng_seed,
        }
    }

    /// Number of critters wave `wave` consists of.
    #[must_use]
    pub const fn wave_size(&self, wave: u32) -> u32 {
        self.growth_per_wave
            .saturating_mul(wave.saturating_sub(1))
            .saturating_add(self.critters_per_wave)
    }
}

/// Instructions produced by the scheduler for the current tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpawnCommand {
    /// A new wave begins.
    StartWave {
        /// One-based wave number.
        wave: u32,
    },
    /// Spawn one critter at the entry.
    Spawn {
        /// Kind drawn for the critter.
        kind: CritterKind,
        /// Level of the critter, equal to the wave number.
        level: u32,
    },
    /// The wave's last critter has been requested.
    WaveSpawned {
        /// One-based wave number.
        wave: u32,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Pause { remaining: u32 },
    Spawning { remaining: u32 },
    AwaitClear,
    Finished,
}

/// Wave scheduler driven once per tick.
#[derive(Debug)]
pub struct Spawning {
    config: Config,
    phase: Phase,
    wave: u32,
    accumulator: u32,
    rng: ChaCha8Rng,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            phase: Phase::Pause {
                remaining: config.wave_pause,
            },
            wave: 0,
            accumulator: 0,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Latest wave number, zero before the first wave.
    #[must_use]
    pub const fn wave(&self) -> u32 {
        self.wave
    }

    /// Reports whether every configured wave has been spawned and cleared.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Advances the schedule by one tick.
    ///
    /// `field_clear` tells whether no critter is left on the map; the next
    /// wave is only scheduled once the previous one is gone.
    pub fn handle(&mut self, field_clear: bool, out: &mut Vec<SpawnCommand>) {
        match self.phase {
            Phase::Pause { remaining: 0 } => self.start_wave(out),
            Phase::Pause { remaining } => {
                self.phase = Phase::Pause {
                    remaining: remaining - 1,
                };
            }
            Phase::Spawning { remaining } => self.spawn(remaining, out),
            Phase::AwaitClear => {
                if !field_clear {
                    return;
                }
                self.phase = if self.wave >= self.config.waves {
                    Phase::Finished
                } else {
                    Phase::Pause {
                        remaining: self.config.wave_pause,
                    }
                };
            }
            Phase::Finished => {}
        }
    }

    fn start_wave(&mut self, out: &mut Vec<SpawnCommand>) {
        if self.wave >= self.config.waves {
            self.phase = Phase::Finished;
            return;
        }
        self.wave += 1;
        log::debug!(
            "scheduling wave {} with {} critters",
            self.wave,
            self.config.wave_size(self.wave)
        );
        out.push(SpawnCommand::StartWave { wave: self.wave });
        self.accumulator = self.interval() - 1;
        self.spawn(self.config.wave_size(self.wave), out);
    }

    fn spawn(&mut self, mut remaining: u32, out: &mut Vec<SpawnCommand>) {
        let interval = self.interval();
        self.accumulator = self.accumulator.saturating_add(1);
        while self.accumulator >= interval && remaining > 0 {
            self.accumulator -= interval;
            remaining -= 1;
            let kind = SPAWN_KINDS[self.rng.gen_range(0..SPAWN_KINDS.len())];
            out.push(SpawnCommand::Spawn {
                kind,
                level: self.wave,
            });
        }
        if remaining == 0 {
            out.push(SpawnCommand::WaveSpawned { wave: self.wave });
            self.phase = Phase::AwaitClear;
        } else {
            self.phase = Phase::Spawning { remaining };
        }
    }

    fn interval(&self) -> u32 {
        self.config.spawn_interval.max(1)
    }
}
