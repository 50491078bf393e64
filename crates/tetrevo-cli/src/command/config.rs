use std::path::PathBuf;

use tetrevo_coordinator::EvolutionConfig;

use crate::util;

/// Run settings: an optional JSON file, then flag overrides.
#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct ConfigArg {
    /// JSON file with evolution settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// Agents across all units
    #[arg(long)]
    population: Option<usize>,
    #[arg(long)]
    width: Option<usize>,
    #[arg(long)]
    height: Option<usize>,
    /// Width of the network's hidden layer
    #[arg(long)]
    hidden: Option<usize>,
    /// Per-scalar mutation probability
    #[arg(long)]
    mutation_rate: Option<f64>,
    /// Publish render states every this many events
    #[arg(long)]
    render_interval: Option<u64>,
    /// Barrier polling interval in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,
    /// Give up waiting at a barrier after this many milliseconds
    #[arg(long)]
    barrier_timeout_ms: Option<u64>,
    /// Cap on event cycles per round
    #[arg(long)]
    cycle_limit: Option<u64>,
    /// Evaluation threads
    #[arg(long)]
    workers: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
}

impl ConfigArg {
    pub(crate) fn load(&self) -> anyhow::Result<EvolutionConfig> {
        let mut config = match &self.config {
            Some(path) => util::read_json_file("config", path)?,
            None => EvolutionConfig::default(),
        };
        self.apply(&mut config);
        config.validate()?;
        log::debug!("evolution config: {config:?}");
        Ok(config)
    }

    fn apply(&self, config: &mut EvolutionConfig) {
        fn set<T: Copy>(field: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *field = value;
            }
        }
        fn set_opt<T: Copy>(field: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *field = value;
            }
        }
        set(&mut config.population, self.population);
        set(&mut config.width, self.width);
        set(&mut config.height, self.height);
        set(&mut config.hidden, self.hidden);
        set(&mut config.mutation_rate, self.mutation_rate);
        set(&mut config.poll_interval_ms, self.poll_interval_ms);
        set_opt(&mut config.render_interval, self.render_interval);
        set_opt(&mut config.barrier_timeout_ms, self.barrier_timeout_ms);
        set_opt(&mut config.cycle_limit, self.cycle_limit);
        set_opt(&mut config.workers, self.workers);
        set_opt(&mut config.seed, self.seed);
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"population": 8, "width": 6, "seed": 3}"#).unwrap();
        let arg = ConfigArg {
            config: Some(path),
            width: Some(8),
            workers: Some(2),
            ..ConfigArg::default()
        };
        let config = arg.load().unwrap();
        assert_eq!(config.population, 8);
        assert_eq!(config.width, 8);
        assert_eq!(config.height, 10);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.workers, Some(2));
    }

    #[test]
    fn test_invalid_overrides_are_rejected() {
        let arg = ConfigArg {
            mutation_rate: Some(1.5),
            ..ConfigArg::default()
        };
        assert!(arg.load().is_err());
    }
}
