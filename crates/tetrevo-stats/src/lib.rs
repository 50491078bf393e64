//! Statistics used to summarize populations and genome tensors.
//!
//! - [`descriptive`]: min/max/mean/median/spread of a dataset, used for the
//!   per-round fitness summary.
//! - [`dispersion`]: sample standard deviation, used to scale mutations.
//!
//! # Example
//!
//! ```
//! use tetrevo_stats::descriptive::DescriptiveStats;
//!
//! let fitness = [12.0, 40.0, 8.0, 20.0];
//! let stats = DescriptiveStats::new(fitness).unwrap();
//! assert_eq!(stats.max, 40.0);
//! assert_eq!(stats.mean, 20.0);
//! ```

pub mod descriptive;
pub mod dispersion;
