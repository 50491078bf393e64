//! Network parameters and the variation operators acting on them.
//!
//! A [`Genome`] holds four tensors, in this order:
//!
//! | tensor | shape               | role                    |
//! |--------|---------------------|-------------------------|
//! | `w1`   | `hidden x inputs`   | input -> hidden weights |
//! | `b1`   | `hidden`            | hidden bias             |
//! | `w2`   | `outputs x hidden`  | hidden -> output weights|
//! | `b2`   | `outputs`           | output bias             |
//!
//! # Variation
//!
//! - [`Genome::crossover`]: every scalar is copied bit-for-bit from one parent,
//!   picked by an independent fair coin.
//! - [`Genome::mutate`]: every scalar, with probability `rate`, gets
//!   `N(0, 1) * std(tensor)` added, where `std` is the sample standard deviation
//!   of the tensor it belongs to. Values are not clamped.

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tetrevo_engine::Move;
use tetrevo_stats::dispersion::sample_std_dev;

/// Layer sizes of the network a genome parameterizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[display("{inputs}-{hidden}-{outputs}")]
pub struct GenomeShape {
    pub inputs: usize,
    pub hidden: usize,
    pub outputs: usize,
}

impl GenomeShape {
    /// Shape for a board of `width * height` inputs and one output per [`Move`].
    #[must_use]
    pub fn for_board(width: usize, height: usize, hidden: usize) -> Self {
        Self {
            inputs: width * height,
            hidden,
            outputs: Move::LEN,
        }
    }

    fn tensor_shapes(self) -> [Vec<usize>; 4] {
        [
            vec![self.hidden, self.inputs],
            vec![self.hidden],
            vec![self.outputs, self.hidden],
            vec![self.outputs],
        ]
    }

    /// Total number of scalars.
    #[must_use]
    pub fn len(self) -> usize {
        self.tensor_shapes()
            .iter()
            .map(|shape| shape.iter().product::<usize>())
            .sum()
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }
}

/// Dense row-major tensor of `f32` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    shape: Vec<usize>,
    values: Vec<f32>,
}

impl Tensor {
    fn from_fn<F>(shape: Vec<usize>, f: F) -> Self
    where
        F: FnMut(usize) -> f32,
    {
        let len = shape.iter().product();
        Self {
            shape,
            values: (0..len).map(f).collect(),
        }
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    fn is_consistent(&self) -> bool {
        self.shape.iter().product::<usize>() == self.values.len()
    }
}

/// Crossing two genomes whose layer sizes differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("cannot cross genomes of shapes {left} and {right}")]
pub struct ShapeMismatchError {
    pub left: GenomeShape,
    pub right: GenomeShape,
}

/// Deserialized tensors that do not match the declared shape.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("tensor `{tensor}` does not match genome shape {shape}")]
pub struct InvalidGenomeError {
    pub tensor: &'static str,
    pub shape: GenomeShape,
}

/// Evolvable parameters of one agent's network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGenome")]
pub struct Genome {
    shape: GenomeShape,
    w1: Tensor,
    b1: Tensor,
    w2: Tensor,
    b2: Tensor,
}

#[derive(Deserialize)]
struct RawGenome {
    shape: GenomeShape,
    w1: Tensor,
    b1: Tensor,
    w2: Tensor,
    b2: Tensor,
}

impl TryFrom<RawGenome> for Genome {
    type Error = InvalidGenomeError;

    fn try_from(raw: RawGenome) -> Result<Self, Self::Error> {
        let RawGenome {
            shape,
            w1,
            b1,
            w2,
            b2,
        } = raw;
        let expected = shape.tensor_shapes();
        for (tensor, (name, want)) in [&w1, &b1, &w2, &b2]
            .into_iter()
            .zip(["w1", "b1", "w2", "b2"].into_iter().zip(&expected))
        {
            if tensor.shape != *want || !tensor.is_consistent() {
                return Err(InvalidGenomeError {
                    tensor: name,
                    shape,
                });
            }
        }
        Ok(Self {
            shape,
            w1,
            b1,
            w2,
            b2,
        })
    }
}

impl Genome {
    /// Samples every tensor uniformly from `[-1/sqrt(fan_in), 1/sqrt(fan_in)]`.
    ///
    /// `fan_in` is the number of inputs of the layer the tensor belongs to.
    pub fn random<R>(shape: GenomeShape, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        #[expect(clippy::cast_precision_loss)]
        let bound = |fan_in: usize| 1.0 / (fan_in.max(1) as f32).sqrt();
        let [w1, b1, w2, b2] = shape.tensor_shapes();
        let mut sample = |tensor_shape: Vec<usize>, fan_in: usize| {
            let b = bound(fan_in);
            Tensor::from_fn(tensor_shape, |_| rng.random_range(-b..=b))
        };
        Self {
            shape,
            w1: sample(w1, shape.inputs),
            b1: sample(b1, shape.inputs),
            w2: sample(w2, shape.hidden),
            b2: sample(b2, shape.hidden),
        }
    }

    #[must_use]
    pub fn shape(&self) -> GenomeShape {
        self.shape
    }

    /// The four tensors in `w1, b1, w2, b2` order.
    #[must_use]
    pub fn tensors(&self) -> [&Tensor; 4] {
        [&self.w1, &self.b1, &self.w2, &self.b2]
    }

    /// Every scalar, tensor by tensor.
    pub fn scalars(&self) -> impl Iterator<Item = f32> + '_ {
        self.tensors()
            .into_iter()
            .flat_map(|t| t.values.iter().copied())
    }

    fn map_tensors<F>(&self, mut f: F) -> Self
    where
        F: FnMut(usize, &Tensor) -> Tensor,
    {
        Self {
            shape: self.shape,
            w1: f(0, &self.w1),
            b1: f(1, &self.b1),
            w2: f(2, &self.w2),
            b2: f(3, &self.b2),
        }
    }

    /// Uniform crossover: each scalar is taken from `self` or `other` by a fair coin.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeMismatchError`] if the two genomes have different shapes.
    pub fn crossover<R>(&self, other: &Self, rng: &mut R) -> Result<Self, ShapeMismatchError>
    where
        R: Rng + ?Sized,
    {
        if self.shape != other.shape {
            return Err(ShapeMismatchError {
                left: self.shape,
                right: other.shape,
            });
        }
        let others = other.tensors();
        Ok(self.map_tensors(|i, mine| {
            let theirs = &others[i].values;
            Tensor::from_fn(mine.shape.clone(), |j| {
                if rng.random::<bool>() {
                    mine.values[j]
                } else {
                    theirs[j]
                }
            })
        }))
    }

    /// Gaussian mutation scaled by each tensor's sample standard deviation.
    ///
    /// `rate` is the per-scalar mutation probability; `0.0` returns an identical
    /// genome and `1.0` perturbs every scalar of every tensor with nonzero spread.
    #[must_use]
    pub fn mutate<R>(&self, rate: f64, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        self.map_tensors(|_, tensor| {
            let std_dev = sample_std_dev(&tensor.values);
            Tensor::from_fn(tensor.shape.clone(), |j| {
                let value = tensor.values[j];
                if rng.random::<f64>() < rate {
                    let noise: f32 = rng.sample(StandardNormal);
                    value + noise * std_dev
                } else {
                    value
                }
            })
        })
    }

    /// Evaluates the network: `softmax(w2 · relu(w1 · x + b1) + b2)`.
    ///
    /// Missing inputs are read as `0.0`; extra inputs are ignored.
    #[must_use]
    pub fn forward(&self, inputs: &[f32]) -> Vec<f32> {
        let hidden = affine(&self.w1, &self.b1, inputs)
            .into_iter()
            .map(|v| v.max(0.0))
            .collect::<Vec<_>>();
        softmax(affine(&self.w2, &self.b2, &hidden))
    }
}

fn affine(weights: &Tensor, bias: &Tensor, inputs: &[f32]) -> Vec<f32> {
    let columns = weights.shape.get(1).copied().unwrap_or(0);
    bias.values
        .iter()
        .enumerate()
        .map(|(row, b)| {
            let start = row * columns;
            weights.values[start..start + columns]
                .iter()
                .zip(inputs.iter().chain(std::iter::repeat(&0.0)))
                .map(|(w, x)| w * x)
                .sum::<f32>()
                + b
        })
        .collect()
}

fn softmax(mut logits: Vec<f32>) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for v in &mut logits {
        *v = (*v - max).exp();
        sum += *v;
    }
    for v in &mut logits {
        *v /= sum;
    }
    logits
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    fn shape() -> GenomeShape {
        GenomeShape::for_board(4, 5, 6)
    }

    fn pair(seed: u64) -> (Genome, Genome) {
        let mut rng = Pcg32::seed_from_u64(seed);
        (Genome::random(shape(), &mut rng), Genome::random(shape(), &mut rng))
    }

    #[test]
    fn test_random_respects_fan_in_bounds() {
        let (genome, _) = pair(1);
        let [w1, b1, w2, b2] = genome.tensors();
        let in_bound = 1.0 / 20.0_f32.sqrt();
        let hidden_bound = 1.0 / 6.0_f32.sqrt();
        assert!(w1.values().iter().chain(b1.values()).all(|v| v.abs() <= in_bound));
        assert!(w2.values().iter().chain(b2.values()).all(|v| v.abs() <= hidden_bound));
        assert_eq!(w1.shape(), [6, 20]);
        assert_eq!(w2.shape(), [7, 6]);
        assert_eq!(genome.scalars().count(), shape().len());
    }

    #[test]
    fn test_crossover_is_reproducible() {
        let (a, b) = pair(2);
        let child1 = a.crossover(&b, &mut Pcg32::seed_from_u64(7)).unwrap();
        let child2 = a.crossover(&b, &mut Pcg32::seed_from_u64(7)).unwrap();
        assert_eq!(child1, child2);
    }

    #[test]
    fn test_crossover_copies_parent_scalars_bitwise() {
        let (a, b) = pair(3);
        let child = a.crossover(&b, &mut Pcg32::seed_from_u64(8)).unwrap();
        let mut from_a = 0;
        let mut from_b = 0;
        for ((c, x), y) in child.scalars().zip(a.scalars()).zip(b.scalars()) {
            assert!(c.to_bits() == x.to_bits() || c.to_bits() == y.to_bits());
            if c.to_bits() == x.to_bits() {
                from_a += 1;
            } else {
                from_b += 1;
            }
        }
        assert!(from_a > 0 && from_b > 0);
    }

    #[test]
    fn test_crossover_rejects_shape_mismatch() {
        let mut rng = Pcg32::seed_from_u64(4);
        let a = Genome::random(shape(), &mut rng);
        let b = Genome::random(GenomeShape::for_board(4, 5, 8), &mut rng);
        let err = a.crossover(&b, &mut rng).unwrap_err();
        assert_eq!(err.left, shape());
        assert_eq!(err.to_string(), "cannot cross genomes of shapes 20-6-7 and 20-8-7");
    }

    #[test]
    fn test_mutate_rate_zero_is_identity() {
        let (a, _) = pair(5);
        let mutated = a.mutate(0.0, &mut Pcg32::seed_from_u64(1));
        assert_eq!(mutated, a);
    }

    #[test]
    fn test_mutate_rate_one_changes_every_scalar() {
        let (a, _) = pair(6);
        let mutated = a.mutate(1.0, &mut Pcg32::seed_from_u64(1));
        assert!(mutated.scalars().zip(a.scalars()).all(|(m, o)| m != o));
    }

    #[test]
    fn test_mutate_leaves_constant_tensors_alone() {
        let (mut a, _) = pair(7);
        a.b2 = Tensor::from_fn(vec![Move::LEN], |_| 0.5);
        let mutated = a.mutate(1.0, &mut Pcg32::seed_from_u64(1));
        assert_eq!(mutated.b2, a.b2);
    }

    #[test]
    fn test_forward_is_a_distribution() {
        let (a, _) = pair(8);
        let probs = a.forward(&[1.0; 20]);
        assert_eq!(probs.len(), Move::LEN);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!(probs.iter().all(|&p| p > 0.0));
    }

    #[test]
    fn test_serialization_validates_shape() {
        let (a, _) = pair(9);
        let json = serde_json::to_value(&a).unwrap();
        let back: Genome = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back, a);

        let mut broken = json;
        broken["shape"]["hidden"] = serde_json::json!(5);
        let err = serde_json::from_value::<Genome>(broken).unwrap_err();
        assert!(err.to_string().contains("w1"));
    }
}
