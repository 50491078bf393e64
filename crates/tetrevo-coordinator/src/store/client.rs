use std::{collections::BTreeMap, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};
use tetrevo_engine::Simulation;
use tetrevo_evolution::Genome;

use super::{SharedStore, StoreError};
use crate::{
    agent::{Agent, AgentId},
    record::{AgentRecord, FitnessRecord, Namespace},
};

/// Typed access to the agent records in a [`SharedStore`].
///
/// Every method issues exactly one store round trip, whatever the number of
/// agents involved.
#[derive(Clone)]
pub struct StoreClient {
    store: Arc<dyn SharedStore>,
}

fn encode<T>(key: String, value: &T) -> Result<(String, String), StoreError>
where
    T: Serialize,
{
    match serde_json::to_string(value) {
        Ok(json) => Ok((key, json)),
        Err(source) => Err(StoreError::Serde { key, source }),
    }
}

fn decode<T>(key: &str, value: Option<String>) -> Result<T, StoreError>
where
    T: DeserializeOwned,
{
    let value = value.ok_or_else(|| StoreError::Missing {
        key: key.to_owned(),
    })?;
    serde_json::from_str(&value).map_err(|source| StoreError::Serde {
        key: key.to_owned(),
        source,
    })
}

impl StoreClient {
    #[must_use]
    pub fn new(store: Arc<dyn SharedStore>) -> Self {
        Self { store }
    }

    /// Writes render records of `agents`.
    pub fn publish_render<'a, E, I>(&self, agents: I) -> Result<(), StoreError>
    where
        E: Simulation + 'a,
        I: IntoIterator<Item = &'a Agent<E>>,
    {
        let entries = agents
            .into_iter()
            .map(|a| encode(Namespace::RenderBot.key(a.id()), &a.render_record()))
            .collect::<Result<Vec<_>, _>>()?;
        self.store.set_many(&entries)
    }

    /// Writes full, render and fitness records of `agents` in one batch.
    pub fn publish_round<E>(&self, agents: &[Agent<E>], round: u64) -> Result<(), StoreError>
    where
        E: Simulation,
    {
        let mut entries = Vec::with_capacity(agents.len() * 3);
        for a in agents {
            entries.push(encode(Namespace::Bot.key(a.id()), &a.full_record())?);
            entries.push(encode(
                Namespace::RenderBot.key(a.id()),
                &a.render_record(),
            )?);
            entries.push(encode(
                Namespace::Fitness.key(a.id()),
                &a.fitness_record(round),
            )?);
        }
        self.store.set_many(&entries)
    }

    /// Reads the fitness of agents `0..population` for `round`.
    ///
    /// Records left over from another round are rejected.
    pub fn load_fitness(&self, population: usize, round: u64) -> Result<Vec<u64>, StoreError> {
        let keys: Vec<_> = (0..population)
            .map(|id| Namespace::Fitness.key(AgentId(id)))
            .collect();
        let values = self.store.get_many(&keys)?;
        keys.iter()
            .zip(values)
            .map(|(key, value)| {
                let record: FitnessRecord = decode(key, value)?;
                if record.round == round {
                    Ok(record.fitness)
                } else {
                    Err(StoreError::StaleRound {
                        key: key.clone(),
                        found: record.round,
                        expected: round,
                    })
                }
            })
            .collect()
    }

    /// Reads the active genomes of `ids` from their full records.
    pub fn load_genomes(&self, ids: &[AgentId]) -> Result<BTreeMap<AgentId, Genome>, StoreError> {
        let keys: Vec<_> = ids.iter().map(|&id| Namespace::Bot.key(id)).collect();
        let values = self.store.get_many(&keys)?;
        ids.iter()
            .zip(keys.iter().zip(values))
            .map(|(&id, (key, value))| {
                let record: AgentRecord = decode(key, value)?;
                let genome = record.genome.ok_or_else(|| StoreError::Missing {
                    key: format!("{key} (genome)"),
                })?;
                Ok((id, genome))
            })
            .collect()
    }

    /// Latest render records of agents `0..population`; `None` for agents not
    /// published yet.
    pub fn load_render_states(
        &self,
        population: usize,
    ) -> Result<Vec<Option<AgentRecord>>, StoreError> {
        let keys: Vec<_> = (0..population)
            .map(|id| Namespace::RenderBot.key(AgentId(id)))
            .collect();
        let values = self.store.get_many(&keys)?;
        keys.iter()
            .zip(values)
            .map(|(key, value)| value.map(|v| decode(key, Some(v))).transpose())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng as _, SeedableRng as _};
    use rand_pcg::Pcg32;
    use tetrevo_engine::ScriptedGame;
    use tetrevo_evolution::GenomeShape;

    use super::*;
    use crate::store::MemoryStore;

    fn setup(n: usize) -> (Arc<MemoryStore>, StoreClient, Vec<Agent<ScriptedGame>>) {
        let store = Arc::new(MemoryStore::new());
        let client = StoreClient::new(store.clone());
        let mut rng = Pcg32::seed_from_u64(0);
        let agents = (0..n)
            .map(|id| {
                let genome = Genome::random(GenomeShape::for_board(4, 4, 2), &mut rng);
                Agent::new(AgentId(id), 4, 4, genome, rng.random())
            })
            .collect();
        (store, client, agents)
    }

    #[test]
    fn test_publish_and_load_in_single_round_trips() {
        let (store, client, agents) = setup(5);
        client.publish_round(&agents, 3).unwrap();
        assert_eq!(store.stats().sets, 1);

        assert_eq!(client.load_fitness(5, 3).unwrap(), vec![0; 5]);
        let genomes = client.load_genomes(&[AgentId(1), AgentId(4)]).unwrap();
        assert_eq!(genomes[&AgentId(4)], *agents[4].genome().active());
        let states = client.load_render_states(6).unwrap();
        assert!(states[..5].iter().all(|s| s.as_ref().is_some_and(|r| r.genome.is_none())));
        assert!(states[5].is_none());
        assert_eq!(store.stats().gets, 3);
    }

    #[test]
    fn test_stale_fitness_is_rejected() {
        let (_, client, agents) = setup(3);
        client.publish_round(&agents, 1).unwrap();
        client.publish_round(&agents[..2], 2).unwrap();
        let err = client.load_fitness(3, 2).unwrap_err();
        assert!(matches!(
            err,
            StoreError::StaleRound {
                found: 1,
                expected: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_records_are_reported() {
        let (_, client, agents) = setup(2);
        client.publish_render(&agents).unwrap();
        let err = client.load_fitness(2, 0).unwrap_err();
        assert!(matches!(err, StoreError::Missing { .. }));
        let err = client.load_genomes(&[AgentId(0)]).unwrap_err();
        assert!(matches!(err, StoreError::Missing { .. }));
    }
}
