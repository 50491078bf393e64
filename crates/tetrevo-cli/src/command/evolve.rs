use std::{path::PathBuf, sync::Arc};

use chrono::Utc;
use tetrevo_coordinator::{
    Coordinator, EvolutionConfig, MemoryStore, PoolExecutor, RoundSink, RoundSummary, RunContext,
    SharedStore, StopSignal, UnitLayout,
};
use tetrevo_engine::Engine;
use tetrevo_evolution::NeuralPolicy;

use super::{config::ConfigArg, interrupt};
use crate::{model::GenomeModel, util::Output};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct EvolveArg {
    #[clap(flatten)]
    config: ConfigArg,
    /// Number of rounds to run; runs until interrupted when omitted
    #[arg(long)]
    rounds: Option<u64>,
    /// Output file path for the best genome
    #[arg(long)]
    output: Option<PathBuf>,
}

/// Prints one progress line per completed round.
struct ProgressSink;

impl RoundSink for ProgressSink {
    fn round_completed(&mut self, summary: &RoundSummary) {
        eprintln!("{summary}");
    }
}

pub(crate) fn run(arg: &EvolveArg) -> anyhow::Result<()> {
    let EvolveArg {
        config,
        rounds,
        output,
    } = arg;
    let config = config.load()?;
    let stop = interrupt::stop_on_ctrl_c()?;
    run_unit(
        &config,
        UnitLayout::single(),
        Arc::new(MemoryStore::new()),
        *rounds,
        output.clone(),
        stop,
    )
}

/// Runs one unit for `rounds` rounds, or until `stop` is raised, and saves its
/// best genome to `output`.
pub(crate) fn run_unit(
    config: &EvolutionConfig,
    layout: UnitLayout,
    store: Arc<dyn SharedStore>,
    rounds: Option<u64>,
    output: Option<PathBuf>,
    stop: StopSignal,
) -> anyhow::Result<()> {
    let ctx = RunContext::from_config(config, layout, stop);
    eprintln!(
        "Evolving {} agents on a {}x{} board (unit {} of {}, {} workers, seed {})",
        config.population,
        config.width,
        config.height,
        layout.unit(),
        layout.units(),
        ctx.workers,
        ctx.seed,
    );
    let executor = PoolExecutor::new(ctx.workers)?;
    let mut coordinator: Coordinator<Engine, _> =
        Coordinator::new(config, ctx.clone(), store, Arc::new(NeuralPolicy), executor)?;
    coordinator.add_sink(ProgressSink);

    let completed = coordinator.run(rounds)?;
    eprintln!("Completed {completed} rounds");

    let Some((agent, fitness, genome)) = coordinator.champion().cloned() else {
        eprintln!("No agent evaluated; nothing to save");
        return Ok(());
    };
    let model = GenomeModel {
        name: format!("tetrevo-{}-unit{}", ctx.seed, layout.unit()),
        trained_at: Utc::now(),
        rounds: completed,
        agent,
        fitness,
        config: config.clone(),
        genome,
    };
    Output::save_json(&model, output)?;
    eprintln!("Best genome (agent {agent}, fitness {fitness}) saved successfully");
    Ok(())
}
