use tetrevo_engine::Move;

use crate::genome::Genome;

/// Chooses the next move of an agent from its genome and observation.
pub trait Policy: Send + Sync {
    fn choose_move(&self, genome: &Genome, inputs: &[f32]) -> Move;
}

/// Runs the genome's network and plays the most probable move.
///
/// Ties go to the move listed first in [`Move::ALL`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NeuralPolicy;

impl Policy for NeuralPolicy {
    fn choose_move(&self, genome: &Genome, inputs: &[f32]) -> Move {
        let probs = genome.forward(inputs);
        let mut best = 0;
        for (i, &p) in probs.iter().enumerate() {
            if p > probs[best] {
                best = i;
            }
        }
        Move::from_index(best).unwrap_or(Move::Noop)
    }
}

/// Always plays the same move, whatever the genome.
#[derive(Debug, Clone, Copy)]
pub struct FixedPolicy(pub Move);

impl Policy for FixedPolicy {
    fn choose_move(&self, _genome: &Genome, _inputs: &[f32]) -> Move {
        self.0
    }
}
