use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use tetrevo_coordinator::{DirStore, StoreClient};

use crate::util::Output;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct StatesArg {
    /// Store directory of a running or finished evolution
    #[arg(long)]
    dir: PathBuf,
    /// Agents across all units
    #[arg(long, default_value_t = 16)]
    population: usize,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &StatesArg) -> anyhow::Result<()> {
    let StatesArg {
        dir,
        population,
        output,
    } = arg;
    let store = DirStore::open(dir.clone())
        .with_context(|| format!("Failed to open store directory: {}", dir.display()))?;
    let states = StoreClient::new(Arc::new(store))
        .load_render_states(*population)
        .context("Failed to read render states")?;
    let published = states.iter().filter(|s| s.is_some()).count();
    eprintln!("{published} of {population} agents have published a state");
    Output::save_json(&states, output.clone())
}
