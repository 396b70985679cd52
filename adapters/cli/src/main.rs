#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Critter Defence session.

mod headless;

use std::{
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};

use anyhow::{Context, Result};
use clap::Parser;
use critter_defence_core::AttackOutcome;
use critter_defence_presentation::{Layout, PanelCommand, PanelEvent, PanelInput, PanelOutcome};
use critter_defence_simulation::{Config, Simulation};
use env_logger::{Builder, Env};

use crate::headless::{LogRenderer, Outcome, Summary, Views};

/// Runs a Critter Defence session on the straight corridor without a window.
#[derive(Debug, Parser)]
#[command(name = "critter-defence", version, about)]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Maximum number of ticks to simulate.
    #[arg(long, default_value_t = 20_000)]
    ticks: u64,
    /// Log a frame every this many ticks.
    #[arg(long, default_value_t = 600)]
    frame_every: u64,
    /// Print the summary as JSON.
    #[arg(long)]
    json: bool,
}

/// Entry point for the Critter Defence command-line interface.
fn main() -> Result<()> {
    Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let summary = run(&config, args.ticks, args.frame_every.max(1))?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("failed to encode the summary")?
        );
    } else {
        println!("{summary}");
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn run(config: &Config, ticks: u64, frame_every: u64) -> Result<Summary> {
    let mut simulation =
        Simulation::corridor(config).context("failed to set up the simulation")?;

    let views = Views::attach(&simulation, Layout::default(), config.base_health)?;

    let mut panel = PanelInput::new(Rc::clone(simulation.towers()));
    for placement in &config.towers {
        panel.push(PanelEvent::new(
            PanelCommand::Select(placement.kind),
            placement.cell,
        ));
        panel.push(PanelEvent::new(PanelCommand::Place, placement.cell));
    }
    let placed = panel
        .process()
        .iter()
        .filter(|result| matches!(result, Ok(PanelOutcome::Placed(_))))
        .count();
    log::info!(
        "placed {placed} of {} configured towers, balance {}",
        config.towers.len(),
        simulation.balance()
    );

    let mut renderer = LogRenderer::default();
    let mut summary = Summary::default();
    while !simulation.is_over() && simulation.tick() < ticks {
        let report = simulation
            .step()
            .with_context(|| format!("tick {} failed", simulation.tick()))?;
        summary.spawned += report.spawned;
        for outcome in &report.outcomes {
            match outcome {
                AttackOutcome::Hit { .. } => summary.hits += 1,
                AttackOutcome::TargetGone { .. } => summary.fizzled += 1,
            }
        }

        views.refresh(&simulation);
        if report.tick % frame_every == 0 {
            views.draw(&mut renderer)?;
        }
    }
    views.draw(&mut renderer)?;

    let map_logic = simulation.map_logic().borrow();
    summary.ticks = simulation.tick();
    summary.waves = simulation.wave();
    summary.base_health = map_logic.base_health();
    summary.max_base_health = map_logic.max_base_health();
    summary.balance = simulation.balance();
    summary.towers = simulation.towers().len();
    summary.critters_left = simulation.critters().len();
    summary.outcome = if map_logic.is_breached() {
        Outcome::Breached
    } else if simulation.is_over() {
        Outcome::Survived
    } else {
        Outcome::Unfinished
    };
    drop(map_logic);

    views.detach(&simulation)?;
    Ok(summary)
}
