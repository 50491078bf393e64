use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use tetrevo_coordinator::{DirStore, UnitLayout};

use super::{config::ConfigArg, evolve, interrupt};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct PeerArg {
    #[clap(flatten)]
    config: ConfigArg,
    /// Store directory shared by every unit
    #[arg(long)]
    dir: PathBuf,
    /// Name of the run; every unit of one run passes the same name, and a
    /// directory already claimed by another run is refused
    #[arg(long)]
    run: String,
    /// This unit's index
    #[arg(long)]
    unit: usize,
    /// Number of units taking part
    #[arg(long)]
    units: usize,
    /// Number of rounds to run; runs until interrupted when omitted
    #[arg(long)]
    rounds: Option<u64>,
    /// Output file path for this unit's best genome
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &PeerArg) -> anyhow::Result<()> {
    let PeerArg {
        config,
        dir,
        run,
        unit,
        units,
        rounds,
        output,
    } = arg;
    let config = config.load()?;
    let layout = UnitLayout::new(*unit, *units)?;
    let store = DirStore::open_run(dir.clone(), run).with_context(|| {
        format!(
            "Failed to open store directory {} for run `{run}`",
            dir.display()
        )
    })?;
    let stop = interrupt::stop_on_ctrl_c()?;
    evolve::run_unit(
        &config,
        layout,
        Arc::new(store),
        *rounds,
        output.clone(),
        stop,
    )
}

#[cfg(test)]
mod tests {
    use tetrevo_coordinator::StoreError;

    use super::*;

    #[test]
    fn test_peer_refuses_directory_of_another_run() {
        let dir = tempfile::tempdir().unwrap();
        DirStore::open_run(dir.path(), "first").unwrap();
        let arg = PeerArg {
            dir: dir.path().to_owned(),
            run: "second".to_owned(),
            unit: 0,
            units: 1,
            rounds: Some(1),
            ..PeerArg::default()
        };
        let err = run(&arg).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::ForeignRun { .. })
        ));
    }
}
