//! Innovation-matched crossover between genomes.

use super::genes::{ConnectionGene, Innovation, NodeGene, NodeId};
use super::genome::{Genome, GenomeError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// What to do with connection genes only the primary parent carries
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverStrategy {
    /// Inherit disjoint and excess genes from the fitter parent
    #[default]
    FitterParent,
    /// Keep matching genes only
    MatchingOnly,
}

impl Genome {
    /// Crossover with another genome.
    ///
    /// Fitness is a cost: the parent with the lower value is primary, ties are
    /// settled by a coin flip. Matching genes are taken from either parent at
    /// random. Nodes come from the primary when both parents have them or
    /// when an inherited connection references them.
    pub fn crossover<R: Rng>(
        &self,
        other: &Genome,
        fitness_self: f32,
        fitness_other: f32,
        strategy: CrossoverStrategy,
        rng: &mut R,
    ) -> Result<Genome, GenomeError> {
        let self_primary = match fitness_self.partial_cmp(&fitness_other) {
            Some(Ordering::Less) => true,
            Some(Ordering::Greater) => false,
            _ => rng.gen_bool(0.5),
        };
        let (primary, secondary) = if self_primary { (self, other) } else { (other, self) };

        let mut connections: BTreeMap<Innovation, ConnectionGene> = BTreeMap::new();
        for (innovation, gene) in &primary.connections {
            let inherited = match secondary.connections.get(innovation) {
                Some(matching) => {
                    if rng.gen_bool(0.5) {
                        gene
                    } else {
                        matching
                    }
                }
                None => match strategy {
                    CrossoverStrategy::FitterParent => gene,
                    CrossoverStrategy::MatchingOnly => continue,
                },
            };
            connections.insert(*innovation, inherited.clone());
        }

        let referenced: BTreeSet<NodeId> = connections.values().flat_map(|c| [c.from, c.to]).collect();
        let nodes: BTreeMap<NodeId, NodeGene> = primary
            .nodes
            .values()
            .filter(|n| referenced.contains(&n.id) || secondary.nodes.contains_key(&n.id))
            .map(|n| (n.id, n.blank_copy()))
            .collect();

        Genome::from_parts(primary.n_inputs(), primary.n_outputs(), nodes, connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neural::{InnovationRegistry, MutationConfig};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    fn parents() -> (Genome, Genome, InnovationRegistry, ChaCha8Rng) {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut registry = InnovationRegistry::new();
        let a = registry.genesis().minimal_genome(8, 2, &mut rng);
        let b = registry.genesis().minimal_genome(8, 2, &mut rng);
        (a, b, registry, rng)
    }

    #[test]
    fn test_crossover_same_topology() {
        let (a, b, _registry, mut rng) = parents();

        let child = a.crossover(&b, 10.0, 20.0, CrossoverStrategy::default(), &mut rng).unwrap();

        assert_eq!(child.nodes().len(), 11);
        assert_eq!(child.connections().len(), 18);
        assert_eq!(child.layer_count(), 2);
        for (innovation, conn) in child.connections() {
            let from_a = &a.connections()[innovation];
            let from_b = &b.connections()[innovation];
            assert!(conn.weight == from_a.weight || conn.weight == from_b.weight);
        }
    }

    #[test]
    fn test_crossover_inherits_fitter_structure() {
        let (mut a, b, mut registry, mut rng) = parents();
        a.add_node(&mut registry, &mut rng).unwrap();
        a.add_node(&mut registry, &mut rng).unwrap();

        // lower cost wins
        let child = a.crossover(&b, 1.0, 50.0, CrossoverStrategy::FitterParent, &mut rng).unwrap();
        assert_eq!(child.hidden_count(), 2);
        assert_eq!(child.connections().len(), a.connections().len());
        assert_eq!(child.layer_count(), a.layer_count());

        let child = a.crossover(&b, 50.0, 1.0, CrossoverStrategy::FitterParent, &mut rng).unwrap();
        assert_eq!(child.hidden_count(), 0);
        assert_eq!(child.connections().len(), 18);
        assert_eq!(child.layer_count(), 2);
    }

    #[test]
    fn test_matching_only_drops_disjoint_genes() {
        let (mut a, b, mut registry, mut rng) = parents();
        a.add_node(&mut registry, &mut rng).unwrap();

        let child = a.crossover(&b, 1.0, 50.0, CrossoverStrategy::MatchingOnly, &mut rng).unwrap();

        assert_eq!(child.hidden_count(), 0);
        assert_eq!(child.connections().len(), 18);
        assert_eq!(child.layer_count(), 2);
        assert!(child.validate().is_ok());
    }

    #[test]
    fn test_child_innovations_come_from_parents() {
        let (mut a, mut b, mut registry, mut rng) = parents();
        let config = MutationConfig {
            add_node_rate: 0.6,
            add_connection_rate: 0.6,
            ..MutationConfig::default()
        };
        for _ in 0..20 {
            a.mutate(&config, &mut registry, &mut rng).unwrap();
            b.mutate(&config, &mut registry, &mut rng).unwrap();
        }

        let child = a.crossover(&b, 3.0, 3.0, CrossoverStrategy::FitterParent, &mut rng).unwrap();

        let parent_ids: HashSet<Innovation> =
            a.connections().keys().chain(b.connections().keys()).copied().collect();
        assert!(child.connections().keys().all(|i| parent_ids.contains(i)));
        assert!(child.validate().is_ok());
        let outputs = child.clone().evaluate(&[0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0]).unwrap();
        assert_eq!(outputs.len(), 2);
    }

    #[test]
    fn test_child_is_a_deep_copy() {
        let (a, b, _registry, mut rng) = parents();
        let weights_a: Vec<f32> = a.connections().values().map(|c| c.weight).collect();

        let mut child = a.crossover(&b, 1.0, 2.0, CrossoverStrategy::default(), &mut rng).unwrap();
        child.mutate_weights(1.0, 0.5, 1.0, &mut rng);
        child.evaluate(&[1.0; 8]).unwrap();

        let after: Vec<f32> = a.connections().values().map(|c| c.weight).collect();
        assert_eq!(weights_a, after);
        assert_eq!(a.node(9).unwrap().sum, 0.0);
    }
}
