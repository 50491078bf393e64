use crate::{agent::AgentId, context::UnitLayout};

/// Splits `items` into `n` stride chunks: item `i` goes to chunk `i % n`.
///
/// Order is kept inside each chunk. Trailing chunks are empty when there are
/// fewer items than chunks.
///
/// # Panics
///
/// Panics if `n` is zero.
pub fn stride_chunks<T, I>(items: I, n: usize) -> Vec<Vec<T>>
where
    I: IntoIterator<Item = T>,
{
    assert!(n > 0, "cannot split into zero chunks");
    let mut chunks: Vec<Vec<T>> = (0..n).map(|_| Vec::new()).collect();
    for (i, item) in items.into_iter().enumerate() {
        chunks[i % n].push(item);
    }
    chunks
}

/// Ids owned by the unit at `layout` in a population of `population` agents.
#[must_use]
pub fn unit_agent_ids(population: usize, layout: UnitLayout) -> Vec<AgentId> {
    (layout.unit()..population)
        .step_by(layout.units())
        .map(AgentId)
        .collect()
}
