//! Structural and weight mutations (NEAT-style).
//!
//! Both structural operators enumerate their valid candidates up front and
//! pick one uniformly, so they always terminate.

use super::genes::{Innovation, NodeGene, NodeId, NodeKind};
use super::genome::{random_weight, Genome, GenomeError};
use super::innovation::InnovationRegistry;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Weights are kept inside this bound by weight mutation
pub const WEIGHT_LIMIT: f32 = 5.0;

/// Configuration for mutation operations
#[derive(Clone, Debug)]
pub struct MutationConfig {
    /// Probability of perturbing each connection weight
    pub weight_mutation_rate: f32,
    /// Magnitude of weight perturbations
    pub weight_mutation_strength: f32,
    /// Probability of redrawing a mutated weight instead of perturbing it
    pub weight_replace_rate: f32,
    /// Probability of an add-node mutation
    pub add_node_rate: f32,
    /// Probability of an add-connection mutation
    pub add_connection_rate: f32,
    /// Maximum hidden nodes allowed
    pub max_hidden_nodes: usize,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            weight_mutation_rate: 0.1,
            weight_mutation_strength: 0.3,
            weight_replace_rate: 0.1,
            add_node_rate: 0.1,
            add_connection_rate: 0.2,
            max_hidden_nodes: 50,
        }
    }
}

/// Uniform integer in `[min, max]`
pub(crate) fn layer_in_range<R: Rng>(rng: &mut R, min: usize, max: usize) -> Result<usize, GenomeError> {
    if min >= max {
        return Err(GenomeError::InvalidRange { min, max });
    }
    Ok(rng.gen_range(min..=max))
}

impl Genome {
    /// Apply all mutations according to config
    pub fn mutate<R: Rng>(
        &mut self,
        config: &MutationConfig,
        registry: &mut InnovationRegistry,
        rng: &mut R,
    ) -> Result<(), GenomeError> {
        self.mutate_weights(
            config.weight_mutation_rate,
            config.weight_mutation_strength,
            config.weight_replace_rate,
            rng,
        );

        if rng.gen::<f32>() < config.add_node_rate && self.hidden_count() < config.max_hidden_nodes {
            self.add_node(registry, rng)?;
        }

        if rng.gen::<f32>() < config.add_connection_rate {
            self.add_connection(registry, rng)?;
        }

        Ok(())
    }

    /// Perturb or redraw connection weights
    pub fn mutate_weights<R: Rng>(&mut self, rate: f32, strength: f32, replace_rate: f32, rng: &mut R) {
        for conn in self.connections.values_mut() {
            if rng.gen::<f32>() >= rate {
                continue;
            }
            conn.weight = if rng.gen::<f32>() < replace_rate {
                random_weight(rng)
            } else {
                let delta = if strength > 0.0 {
                    rng.gen_range(-strength..strength)
                } else {
                    0.0
                };
                (conn.weight + delta).clamp(-WEIGHT_LIMIT, WEIGHT_LIMIT)
            };
        }
    }

    /// Add one enabled connection between two unconnected nodes on different
    /// layers, oriented from the lower layer to the higher one.
    ///
    /// Returns `Ok(None)` when the genome is already fully connected.
    pub fn add_connection<R: Rng>(
        &mut self,
        registry: &mut InnovationRegistry,
        rng: &mut R,
    ) -> Result<Option<Innovation>, GenomeError> {
        if self.is_fully_connected() {
            log::trace!("add_connection skipped: genome is fully connected");
            return Ok(None);
        }

        let candidates = self.open_pairs();
        let Some(&(from, to)) = candidates.choose(rng) else {
            return Ok(None);
        };

        let weight = random_weight(rng);
        let innovation = self.push_connection(registry, from, to, weight)?;
        log::trace!("add_connection {} -> {} (innovation {})", from, to, innovation);

        self.validate()?;
        Ok(Some(innovation))
    }

    /// Every (lower layer, higher layer) node pair without a connection
    fn open_pairs(&self) -> Vec<(NodeId, NodeId)> {
        let connected: HashSet<(NodeId, NodeId)> =
            self.connections.values().map(|c| (c.from, c.to)).collect();

        let mut pairs = Vec::new();
        for from in self.nodes.values() {
            for to in self.nodes.values() {
                if from.layer < to.layer
                    && !connected.contains(&(from.id, to.id))
                    && !connected.contains(&(to.id, from.id))
                {
                    pairs.push((from.id, to.id));
                }
            }
        }
        pairs
    }

    /// Split a random enabled connection with a new hidden node.
    ///
    /// The old connection is disabled; `source -> new` gets weight 1 and
    /// `new -> destination` inherits the old weight. Returns the new node id,
    /// or `Ok(None)` when no connection is enabled.
    pub fn add_node<R: Rng>(
        &mut self,
        registry: &mut InnovationRegistry,
        rng: &mut R,
    ) -> Result<Option<NodeId>, GenomeError> {
        let enabled: Vec<Innovation> = self
            .connections
            .values()
            .filter(|c| c.enabled)
            .map(|c| c.innovation)
            .collect();
        let Some(&split) = enabled.choose(rng) else {
            log::trace!("add_node skipped: no enabled connection");
            return Ok(None);
        };

        let conn = self
            .connections
            .get_mut(&split)
            .ok_or(GenomeError::MissingConnection(split))?;
        conn.disable();
        let (from, to, weight) = (conn.from, conn.to, conn.weight);

        let in_layer = self.nodes.get(&from).ok_or(GenomeError::MissingNode(from))?.layer;
        let out_layer = self.nodes.get(&to).ok_or(GenomeError::MissingNode(to))?.layer;
        let layer = self.realign_layers(in_layer, out_layer, rng)?;

        let id = registry.next_node_id();
        if self.nodes.contains_key(&id) {
            return Err(GenomeError::DuplicateNode(id));
        }
        self.nodes.insert(id, NodeGene::new(id, NodeKind::Hidden, layer));

        self.push_connection(registry, from, id, 1.0)?;
        self.push_connection(registry, id, to, weight)?;
        self.rebuild_layers();
        log::trace!(
            "add_node {} on layer {} splitting {} ({} -> {})",
            id,
            layer,
            split,
            from,
            to
        );

        self.validate()?;
        Ok(Some(id))
    }

    /// Pick the layer for a node inserted between `in_layer` and `out_layer`.
    ///
    /// Adjacent layers get a new layer squeezed in between, shifting every
    /// node at or above it up by one.
    fn realign_layers<R: Rng>(
        &mut self,
        in_layer: usize,
        out_layer: usize,
        rng: &mut R,
    ) -> Result<usize, GenomeError> {
        match out_layer.checked_sub(in_layer) {
            Some(1) => {
                let new_layer = in_layer + 1;
                for node in self.nodes.values_mut() {
                    if node.layer >= new_layer {
                        node.layer += 1;
                    }
                }
                Ok(new_layer)
            }
            Some(2) => Ok(in_layer + 1),
            _ => layer_in_range(rng, in_layer + 1, out_layer.saturating_sub(1)),
        }
    }
}
