//! Genomes, variation operators and parent selection.
//!
//! An agent's genome is the parameter set of a small feed-forward network that
//! maps the observed board to one of the seven [`Move`](tetrevo_engine::Move)s.
//! Each generation, parents are drawn in proportion to fitness
//! ([`selection`]), recombined with per-scalar uniform crossover and perturbed
//! by Gaussian mutation scaled to each tensor's own spread ([`genome`]).
//!
//! # Example
//!
//! ```
//! use rand::SeedableRng as _;
//! use rand_pcg::Pcg32;
//! use tetrevo_evolution::{Genome, GenomeShape, NeuralPolicy, Policy as _};
//!
//! let mut rng = Pcg32::seed_from_u64(0);
//! let shape = GenomeShape::for_board(10, 20, 16);
//! let a = Genome::random(shape, &mut rng);
//! let b = Genome::random(shape, &mut rng);
//! let child = a.crossover(&b, &mut rng).unwrap().mutate(0.01, &mut rng);
//!
//! let inputs = vec![0.0; 200];
//! let _mv = NeuralPolicy.choose_move(&child, &inputs);
//! ```

pub use self::{genome::*, policy::*, selection::*};

pub mod genome;
pub mod policy;
pub mod selection;
