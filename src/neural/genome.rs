//! Genome graph: layering, validation and feed-forward evaluation.

use super::genes::{ConnectionGene, Innovation, NodeGene, NodeId, NodeKind};
use super::innovation::InnovationRegistry;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use thiserror::Error;

/// Errors raised by genome construction, evaluation and mutation.
///
/// Everything except the shape errors signals a bug in mutation or crossover
/// and is never repaired silently.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenomeError {
    #[error("Feed-forward produced {found} outputs, expected {expected}")]
    InvalidOutputShape { expected: usize, found: usize },
    #[error("Got {found} input values, expected {expected}")]
    InvalidInputShape { expected: usize, found: usize },
    #[error("Invalid range: min {min} must be less than max {max}")]
    InvalidRange { min: usize, max: usize },
    #[error("Node {0} does not exist")]
    MissingNode(NodeId),
    #[error("Connection {0} does not exist")]
    MissingConnection(Innovation),
    #[error("Node id {0} is already in use")]
    DuplicateNode(NodeId),
    #[error("Innovation number {0} is already in use")]
    DuplicateInnovation(Innovation),
    #[error("Nodes {from} and {to} are connected more than once")]
    DuplicateConnection { from: NodeId, to: NodeId },
    #[error("Connection {innovation} runs from layer {from_layer} to layer {to_layer}")]
    LayerOrder {
        innovation: Innovation,
        from_layer: usize,
        to_layer: usize,
    },
    #[error("Layer cache does not match node layers")]
    StaleLayerCache,
    #[error("Outgoing connections of node {0} do not match the connection set")]
    OutgoingMismatch(NodeId),
}

/// A NEAT genome: typed nodes, weighted connections and a layer index.
#[derive(Clone, Debug)]
pub struct Genome {
    pub(super) nodes: BTreeMap<NodeId, NodeGene>,
    pub(super) connections: BTreeMap<Innovation, ConnectionGene>,
    /// Node ids grouped by layer, id-ordered within a layer
    pub(super) layers: Vec<Vec<NodeId>>,
    n_inputs: usize,
    n_outputs: usize,
}

/// Uniform weight in [-1, 1]
pub(crate) fn random_weight<R: Rng>(rng: &mut R) -> f32 {
    rng.gen_range(-1.0..=1.0)
}

impl Genome {
    /// Fresh network: bias + inputs on layer 0, outputs on layer 1, fully
    /// connected. Reached through [`super::Genesis::minimal_genome`].
    pub(super) fn minimal<R: Rng>(
        n_inputs: usize,
        n_outputs: usize,
        registry: &mut InnovationRegistry,
        rng: &mut R,
    ) -> Self {
        let mut nodes = BTreeMap::new();

        let bias = registry.next_node_id();
        nodes.insert(bias, NodeGene::new(bias, NodeKind::Bias, 0));

        for _ in 0..n_inputs {
            let id = registry.next_node_id();
            nodes.insert(id, NodeGene::new(id, NodeKind::Input, 0));
        }

        for _ in 0..n_outputs {
            let id = registry.next_node_id();
            nodes.insert(id, NodeGene::new(id, NodeKind::Output, 1));
        }

        let sources: Vec<NodeId> = nodes.values().filter(|n| n.layer == 0).map(|n| n.id).collect();
        let targets: Vec<NodeId> = nodes.values().filter(|n| n.layer == 1).map(|n| n.id).collect();

        let mut connections = BTreeMap::new();
        for &from in &sources {
            for &to in &targets {
                let innovation = registry.next_connection_id();
                let weight = random_weight(rng);
                connections.insert(innovation, ConnectionGene::new(innovation, from, to, weight));
                if let Some(node) = nodes.get_mut(&from) {
                    node.outgoing.push(innovation);
                }
            }
        }

        let mut genome = Self {
            nodes,
            connections,
            layers: Vec::new(),
            n_inputs,
            n_outputs,
        };
        genome.rebuild_layers();
        genome
    }

    /// Assemble a genome from copied genes.
    ///
    /// Outgoing lists are rebuilt from `connections`, empty layers are
    /// squeezed out and the result is validated.
    pub(super) fn from_parts(
        n_inputs: usize,
        n_outputs: usize,
        mut nodes: BTreeMap<NodeId, NodeGene>,
        connections: BTreeMap<Innovation, ConnectionGene>,
    ) -> Result<Self, GenomeError> {
        for node in nodes.values_mut() {
            node.outgoing.clear();
        }
        for conn in connections.values() {
            if !nodes.contains_key(&conn.to) {
                return Err(GenomeError::MissingNode(conn.to));
            }
            nodes
                .get_mut(&conn.from)
                .ok_or(GenomeError::MissingNode(conn.from))?
                .outgoing
                .push(conn.innovation);
        }

        let mut genome = Self {
            nodes,
            connections,
            layers: Vec::new(),
            n_inputs,
            n_outputs,
        };
        genome.compact_layers();
        genome.validate()?;
        Ok(genome)
    }

    pub fn nodes(&self) -> &BTreeMap<NodeId, NodeGene> {
        &self.nodes
    }

    pub fn connections(&self) -> &BTreeMap<Innovation, ConnectionGene> {
        &self.connections
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeGene> {
        self.nodes.get(&id)
    }

    pub fn connection(&self, innovation: Innovation) -> Option<&ConnectionGene> {
        self.connections.get(&innovation)
    }

    /// Node ids grouped by layer
    pub fn layers(&self) -> &[Vec<NodeId>] {
        &self.layers
    }

    #[inline]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn n_inputs(&self) -> usize {
        self.n_inputs
    }

    pub fn n_outputs(&self) -> usize {
        self.n_outputs
    }

    /// Input node ids in the order `set_inputs` expects values
    pub fn input_ids(&self) -> Vec<NodeId> {
        self.ids_of_kind(NodeKind::Input)
    }

    pub fn output_ids(&self) -> Vec<NodeId> {
        self.ids_of_kind(NodeKind::Output)
    }

    fn ids_of_kind(&self, kind: NodeKind) -> Vec<NodeId> {
        self.nodes.values().filter(|n| n.kind == kind).map(|n| n.id).collect()
    }

    /// Number of hidden nodes (complexity metric)
    pub fn hidden_count(&self) -> usize {
        self.nodes.values().filter(|n| n.kind == NodeKind::Hidden).count()
    }

    pub fn enabled_connection_count(&self) -> usize {
        self.connections.values().filter(|c| c.enabled).count()
    }

    /// Reset every non-bias node, then feed `values` into the input nodes.
    ///
    /// The i-th value goes to the i-th input node in id order.
    pub fn set_inputs(&mut self, values: &[f32]) -> Result<(), GenomeError> {
        if values.len() != self.n_inputs {
            return Err(GenomeError::InvalidInputShape {
                expected: self.n_inputs,
                found: values.len(),
            });
        }

        for node in self.nodes.values_mut() {
            node.reset();
        }

        let inputs = self.nodes.values_mut().filter(|n| n.kind == NodeKind::Input);
        for (node, &value) in inputs.zip(values) {
            node.accumulate(value);
        }

        Ok(())
    }

    /// Propagate activations through the network in ascending layer order.
    ///
    /// Returns the outputs of the final layer in node-id order. Does not reset
    /// sums: call [`Genome::set_inputs`] before every pass.
    pub fn feed_forward(&mut self) -> Result<Vec<f32>, GenomeError> {
        let expected = self.n_outputs;
        let Self {
            nodes,
            connections,
            layers,
            ..
        } = self;

        let mut pending: Vec<(NodeId, f32)> = Vec::new();
        for layer in layers.iter() {
            for id in layer {
                let node = nodes.get(id).ok_or(GenomeError::MissingNode(*id))?;

                pending.clear();
                for innovation in &node.outgoing {
                    let conn = connections
                        .get(innovation)
                        .ok_or(GenomeError::MissingConnection(*innovation))?;
                    if conn.enabled {
                        pending.push((conn.to, node.output * conn.weight));
                    }
                }

                for &(to, value) in &pending {
                    nodes
                        .get_mut(&to)
                        .ok_or(GenomeError::MissingNode(to))?
                        .accumulate(value);
                }
            }
        }

        let outputs: Vec<f32> = layers
            .last()
            .map(|last| {
                last.iter()
                    .filter_map(|id| nodes.get(id))
                    .map(|n| n.output)
                    .collect()
            })
            .unwrap_or_default();

        if outputs.len() != expected {
            return Err(GenomeError::InvalidOutputShape {
                expected,
                found: outputs.len(),
            });
        }

        Ok(outputs)
    }

    /// `set_inputs` followed by `feed_forward`
    pub fn evaluate(&mut self, values: &[f32]) -> Result<Vec<f32>, GenomeError> {
        self.set_inputs(values)?;
        self.feed_forward()
    }

    /// Whether `a` and `b` share a connection in either direction.
    /// Disabled connections count.
    pub fn is_connected(&self, a: NodeId, b: NodeId) -> bool {
        self.connects_to(a, b) || self.connects_to(b, a)
    }

    fn connects_to(&self, from: NodeId, to: NodeId) -> bool {
        self.nodes.get(&from).is_some_and(|node| {
            node.outgoing
                .iter()
                .filter_map(|i| self.connections.get(i))
                .any(|c| c.to == to)
        })
    }

    /// True when every node connects to every node of every later layer
    pub fn is_fully_connected(&self) -> bool {
        for (index, layer) in self.layers.iter().enumerate() {
            let later: BTreeSet<NodeId> = self.layers[index + 1..].iter().flatten().copied().collect();

            for id in layer {
                let Some(node) = self.nodes.get(id) else {
                    return false;
                };
                let targets: BTreeSet<NodeId> = node
                    .outgoing
                    .iter()
                    .filter_map(|i| self.connections.get(i))
                    .map(|c| c.to)
                    .collect();
                if !later.is_subset(&targets) {
                    return false;
                }
            }
        }
        true
    }

    /// Recompute the layer buckets and count from the nodes' layer fields
    pub(super) fn rebuild_layers(&mut self) {
        let count = self.nodes.values().map(|n| n.layer).max().map_or(0, |max| max + 1);

        let mut layers = vec![Vec::new(); count];
        for node in self.nodes.values() {
            layers[node.layer].push(node.id);
        }
        self.layers = layers;
    }

    /// Renumber layers so none is empty, keeping their order
    pub(super) fn compact_layers(&mut self) {
        let used: BTreeSet<usize> = self.nodes.values().map(|n| n.layer).collect();
        let remap: BTreeMap<usize, usize> = used.into_iter().enumerate().map(|(new, old)| (old, new)).collect();

        for node in self.nodes.values_mut() {
            if let Some(&layer) = remap.get(&node.layer) {
                node.layer = layer;
            }
        }
        self.rebuild_layers();
    }

    /// Register a new enabled connection with a fresh innovation number
    pub(super) fn push_connection(
        &mut self,
        registry: &mut InnovationRegistry,
        from: NodeId,
        to: NodeId,
        weight: f32,
    ) -> Result<Innovation, GenomeError> {
        if !self.nodes.contains_key(&to) {
            return Err(GenomeError::MissingNode(to));
        }
        let source = self.nodes.get_mut(&from).ok_or(GenomeError::MissingNode(from))?;

        let innovation = registry.next_connection_id();
        if self.connections.contains_key(&innovation) {
            return Err(GenomeError::DuplicateInnovation(innovation));
        }

        source.outgoing.push(innovation);
        self.connections
            .insert(innovation, ConnectionGene::new(innovation, from, to, weight));
        Ok(innovation)
    }

    /// Check every structural invariant
    pub fn validate(&self) -> Result<(), GenomeError> {
        let mut pairs = HashSet::with_capacity(self.connections.len());
        for conn in self.connections.values() {
            let from = self.nodes.get(&conn.from).ok_or(GenomeError::MissingNode(conn.from))?;
            let to = self.nodes.get(&conn.to).ok_or(GenomeError::MissingNode(conn.to))?;

            if from.layer >= to.layer {
                return Err(GenomeError::LayerOrder {
                    innovation: conn.innovation,
                    from_layer: from.layer,
                    to_layer: to.layer,
                });
            }
            if !pairs.insert((conn.from, conn.to)) {
                return Err(GenomeError::DuplicateConnection {
                    from: conn.from,
                    to: conn.to,
                });
            }
        }

        for node in self.nodes.values() {
            let mut listed = node.outgoing.clone();
            listed.sort_unstable();
            let owned: Vec<Innovation> = self
                .connections
                .values()
                .filter(|c| c.from == node.id)
                .map(|c| c.innovation)
                .collect();
            if listed != owned {
                return Err(GenomeError::OutgoingMismatch(node.id));
            }
        }

        let expected_layers = self.nodes.values().map(|n| n.layer).max().map_or(0, |max| max + 1);
        if self.layers.len() != expected_layers {
            return Err(GenomeError::StaleLayerCache);
        }
        let mut seen = HashSet::with_capacity(self.nodes.len());
        for (layer, ids) in self.layers.iter().enumerate() {
            for id in ids {
                let node = self.nodes.get(id).ok_or(GenomeError::StaleLayerCache)?;
                if node.layer != layer || !seen.insert(*id) {
                    return Err(GenomeError::StaleLayerCache);
                }
            }
        }
        if seen.len() != self.nodes.len() {
            return Err(GenomeError::StaleLayerCache);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn minimal(n_inputs: usize, n_outputs: usize) -> Genome {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut registry = InnovationRegistry::new();
        registry.genesis().minimal_genome(n_inputs, n_outputs, &mut rng)
    }

    fn set_all_weights(genome: &mut Genome, weight: f32) {
        for conn in genome.connections.values_mut() {
            conn.weight = weight;
        }
    }

    #[test]
    fn test_minimal_genome_shape() {
        let genome = minimal(8, 2);

        assert_eq!(genome.nodes().len(), 11);
        assert_eq!(genome.connections().len(), 18);
        assert_eq!(genome.layer_count(), 2);
        assert_eq!(genome.layers()[0].len(), 9);
        assert_eq!(genome.layers()[1], vec![9, 10]);
        assert_eq!(genome.node(0).map(|n| n.kind), Some(NodeKind::Bias));
        assert_eq!(genome.input_ids(), (1..9).collect::<Vec<_>>());
        assert!(genome.validate().is_ok());
    }

    #[test]
    fn test_initial_weights_in_range() {
        let genome = minimal(8, 2);
        assert!(genome
            .connections()
            .values()
            .all(|c| c.enabled && (-1.0..=1.0).contains(&c.weight)));
    }

    #[test]
    fn test_zero_inputs_without_bias_give_zero() {
        let mut genome = minimal(8, 2);
        for conn in genome.connections.values_mut() {
            if conn.from == 0 {
                conn.weight = 0.0;
            }
        }

        let outputs = genome.evaluate(&[0.0; 8]).unwrap();

        assert_eq!(outputs, vec![0.0, 0.0]);
        for id in genome.input_ids() {
            assert_eq!(genome.node(id).unwrap().sum, 0.0);
            assert_eq!(genome.node(id).unwrap().output, 0.0);
        }
    }

    #[test]
    fn test_feed_forward_thresholds() {
        let mut genome = minimal(2, 1);
        set_all_weights(&mut genome, 0.5);

        // bias 1 * 0.5 + 1 * 0.5 = 1.0 -> fires
        assert_eq!(genome.evaluate(&[1.0, 0.0]).unwrap(), vec![1.0]);
        // bias alone 0.5 -> silent
        assert_eq!(genome.evaluate(&[0.0, 0.0]).unwrap(), vec![0.0]);

        set_all_weights(&mut genome, -0.6);
        assert_eq!(genome.evaluate(&[1.0, 1.0]).unwrap(), vec![-1.0]);
    }

    #[test]
    fn test_disabled_connection_contributes_nothing() {
        let mut genome = minimal(1, 1);
        set_all_weights(&mut genome, 1.0);
        assert_eq!(genome.evaluate(&[0.0]).unwrap(), vec![1.0]);

        // connection 0 is bias -> output
        genome.connections.get_mut(&0).unwrap().disable();
        assert_eq!(genome.evaluate(&[0.0]).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_feed_forward_twice_double_accumulates() {
        let mut genome = minimal(1, 1);
        set_all_weights(&mut genome, 0.5);

        genome.set_inputs(&[0.0]).unwrap();
        assert_eq!(genome.feed_forward().unwrap(), vec![0.0]);
        assert_eq!(genome.feed_forward().unwrap(), vec![1.0]);
    }

    #[test]
    fn test_input_shape_checked() {
        let mut genome = minimal(8, 2);
        assert_eq!(
            genome.set_inputs(&[1.0; 3]),
            Err(GenomeError::InvalidInputShape { expected: 8, found: 3 })
        );
    }

    #[test]
    fn test_minimal_genome_is_fully_connected() {
        let genome = minimal(8, 2);
        assert!(genome.is_fully_connected());
    }

    #[test]
    fn test_is_connected_either_direction() {
        let genome = minimal(2, 1);
        assert!(genome.is_connected(1, 3));
        assert!(genome.is_connected(3, 1));
        assert!(!genome.is_connected(1, 2));
    }

    #[test]
    fn test_validate_detects_stale_cache() {
        let mut genome = minimal(2, 1);
        genome.nodes.get_mut(&3).unwrap().layer = 2;

        assert_eq!(genome.validate(), Err(GenomeError::StaleLayerCache));

        genome.rebuild_layers();
        assert!(genome.validate().is_ok());
        assert_eq!(genome.layer_count(), 3);
    }

    #[test]
    fn test_validate_detects_backward_connection() {
        let mut genome = minimal(2, 1);
        genome.nodes.get_mut(&1).unwrap().layer = 1;
        genome.rebuild_layers();

        assert!(matches!(genome.validate(), Err(GenomeError::LayerOrder { .. })));
    }

    #[test]
    fn test_compact_layers_removes_gaps() {
        let mut genome = minimal(2, 1);
        genome.nodes.get_mut(&3).unwrap().layer = 4;
        genome.compact_layers();

        assert_eq!(genome.layer_count(), 2);
        assert_eq!(genome.node(3).unwrap().layer, 1);
        assert!(genome.validate().is_ok());
    }
}
