//! Innovation numbering for nodes and connections.
//!
//! Every new node and connection gets a permanent number from an
//! [`InnovationRegistry`]. Crossover matches genes across genomes by these
//! numbers, so the counters must only ever move forward while a lineage is
//! evolving. The only way to rewind them is [`InnovationRegistry::genesis`],
//! which hands out the [`Genesis`] guard needed to build an initial genome.

use super::genes::{Innovation, NodeId};
use super::genome::Genome;
use rand::Rng;

/// Monotonic counters for node ids and connection innovation numbers
#[derive(Clone, Debug, Default)]
pub struct InnovationRegistry {
    next_node: NodeId,
    next_connection: Innovation,
}

impl InnovationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the current node id, then advance
    pub fn next_node_id(&mut self) -> NodeId {
        let id = self.next_node;
        self.next_node += 1;
        id
    }

    /// Return the current connection innovation number, then advance
    pub fn next_connection_id(&mut self) -> Innovation {
        let id = self.next_connection;
        self.next_connection += 1;
        id
    }

    /// Node id the next allocation will return
    pub fn peek_node_id(&self) -> NodeId {
        self.next_node
    }

    /// Innovation number the next connection allocation will return
    pub fn peek_connection_id(&self) -> Innovation {
        self.next_connection
    }

    /// Rewind both counters to zero and open a genesis step.
    ///
    /// Only an initial genome may be built through the returned guard, and the
    /// registry stays borrowed until the guard is consumed.
    pub fn genesis(&mut self) -> Genesis<'_> {
        self.reset();
        Genesis { registry: self }
    }

    fn reset(&mut self) {
        self.next_node = 0;
        self.next_connection = 0;
    }
}

/// Construction step for generation-zero genomes
#[derive(Debug)]
pub struct Genesis<'a> {
    registry: &'a mut InnovationRegistry,
}

impl Genesis<'_> {
    /// Build the canonical minimal genome: one bias node and `n_inputs`
    /// inputs on layer 0, fully connected to `n_outputs` outputs on layer 1.
    pub fn minimal_genome<R: Rng>(self, n_inputs: usize, n_outputs: usize, rng: &mut R) -> Genome {
        Genome::minimal(n_inputs, n_outputs, self.registry, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_counters_are_independent() {
        let mut registry = InnovationRegistry::new();

        assert_eq!(registry.next_node_id(), 0);
        assert_eq!(registry.next_node_id(), 1);
        assert_eq!(registry.next_connection_id(), 0);
        assert_eq!(registry.next_node_id(), 2);
        assert_eq!(registry.next_connection_id(), 1);
    }

    #[test]
    fn test_genesis_rewinds() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut registry = InnovationRegistry::new();
        for _ in 0..10 {
            registry.next_node_id();
            registry.next_connection_id();
        }

        let genome = registry.genesis().minimal_genome(8, 2, &mut rng);

        // 1 bias + 8 inputs + 2 outputs, 9 x 2 connections
        assert_eq!(registry.peek_node_id(), 11);
        assert_eq!(registry.peek_connection_id(), 18);
        assert_eq!(genome.nodes().keys().copied().collect::<Vec<_>>(), (0..11).collect::<Vec<_>>());
    }

    #[test]
    fn test_generation_zero_shares_ids() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut registry = InnovationRegistry::new();

        let a = registry.genesis().minimal_genome(3, 2, &mut rng);
        let b = registry.genesis().minimal_genome(3, 2, &mut rng);

        let ids_a: Vec<_> = a.connections().keys().collect();
        let ids_b: Vec<_> = b.connections().keys().collect();
        assert_eq!(ids_a, ids_b);
    }
}
