//! Fitness-proportionate ("roulette wheel") parent selection.

use rand::Rng;

/// Total fitness that cannot weight a selection (zero, negative or not finite).
#[derive(Debug, Clone, Copy, PartialEq, derive_more::Display, derive_more::Error)]
#[display("total fitness {total} cannot weight a parent selection")]
pub struct DegenerateFitnessError {
    pub total: f64,
}

/// Checks that `total` can serve as the denominator of a roulette draw.
///
/// # Errors
///
/// Returns [`DegenerateFitnessError`] unless `total` is finite and positive.
pub fn check_total(total: f64) -> Result<(), DegenerateFitnessError> {
    if total.is_finite() && total > 0.0 {
        Ok(())
    } else {
        Err(DegenerateFitnessError { total })
    }
}

/// Draws one id with probability `fitness[id] / total`.
///
/// A uniform draw `u` is walked through the ids in order, subtracting each
/// share until it is used up. Ids with zero fitness are never returned. If
/// rounding leaves `u` positive after the walk, the last id with positive
/// fitness wins.
///
/// # Errors
///
/// Returns [`DegenerateFitnessError`] if `total` is not finite and positive, or
/// if no id has positive fitness.
///
/// # Example
///
/// ```
/// use rand::SeedableRng as _;
/// use rand_pcg::Pcg32;
/// use tetrevo_evolution::weighted_selection;
///
/// let mut rng = Pcg32::seed_from_u64(1);
/// let id = weighted_selection(&[0.0, 5.0, 0.0], 5.0, &mut rng).unwrap();
/// assert_eq!(id, 1);
/// assert!(weighted_selection(&[0.0, 0.0], 0.0, &mut rng).is_err());
/// ```
pub fn weighted_selection<R>(
    fitness: &[f64],
    total: f64,
    rng: &mut R,
) -> Result<usize, DegenerateFitnessError>
where
    R: Rng + ?Sized,
{
    check_total(total)?;
    let mut remaining = rng.random::<f64>();
    let mut last_positive = None;
    for (id, &f) in fitness.iter().enumerate() {
        if f <= 0.0 {
            continue;
        }
        last_positive = Some(id);
        remaining -= f / total;
        if remaining <= 0.0 {
            return Ok(id);
        }
    }
    last_positive.ok_or(DegenerateFitnessError { total })
}

/// Like [`weighted_selection`], but falls back to a uniform draw when fitness
/// cannot weight the selection.
///
/// Returns `None` only for an empty population.
pub fn select_parent<R>(fitness: &[f64], total: f64, rng: &mut R) -> Option<usize>
where
    R: Rng + ?Sized,
{
    if fitness.is_empty() {
        return None;
    }
    match weighted_selection(fitness, total, rng) {
        Ok(id) => Some(id),
        Err(e) => {
            log::trace!("{e}, selecting uniformly");
            Some(rng.random_range(0..fitness.len()))
        }
    }
}
