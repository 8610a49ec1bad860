//! Evolution mechanics: culling, selection and breeding.
//!
//! Fitness is a cost throughout: lower values are better. Culling removes
//! members with probability proportional to their cost, parent selection
//! picks the lowest cost out of a tournament.

use crate::config::{Config, ConfigError};
use crate::neural::{CrossoverStrategy, Genome, GenomeError, InnovationRegistry, MutationConfig};
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

/// Errors raised while evaluating or evolving a population
#[derive(Debug, Error)]
pub enum EvolutionError {
    #[error(transparent)]
    Genome(#[from] GenomeError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Action value {0} is not one of -1, 0, 1")]
    InvalidAction(f32),
    #[error("Population needs at least 2 members, got {0}")]
    PopulationTooSmall(usize),
    #[error("No survivors left to breed from")]
    NoSurvivors,
}

/// Evolution engine for managing population genetics
#[derive(Clone, Debug)]
pub struct EvolutionEngine {
    pub mutation_config: MutationConfig,
    pub crossover_strategy: CrossoverStrategy,
    pub tournament_size: usize,
    pub survivor_mutation_rate: f32,
    pub genocide_fraction: f32,
    pub preserve_champion: bool,
}

/// Cost used for roulette weights: negative and non-finite values weigh nothing.
/// Widened so sums of large costs stay finite.
fn roulette_weight(cost: f32) -> f64 {
    if cost.is_finite() {
        f64::from(cost.max(0.0))
    } else {
        0.0
    }
}

/// Index of the lowest cost, first one on ties
pub fn champion(fitness: &[f32]) -> Option<usize> {
    fitness
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
}

impl EvolutionEngine {
    /// Create evolution engine from config
    pub fn from_config(config: &Config) -> Self {
        Self {
            mutation_config: MutationConfig {
                weight_mutation_rate: config.evolution.weight_mutation_rate,
                weight_mutation_strength: config.evolution.weight_mutation_strength,
                weight_replace_rate: config.evolution.weight_replace_rate,
                add_node_rate: config.evolution.add_node_rate,
                add_connection_rate: config.evolution.add_connection_rate,
                max_hidden_nodes: config.evolution.max_hidden_nodes,
            },
            crossover_strategy: config.evolution.crossover,
            tournament_size: config.evolution.tournament_size,
            survivor_mutation_rate: config.evolution.survivor_mutation_rate,
            genocide_fraction: config.population.genocide_fraction,
            preserve_champion: config.population.preserve_champion,
        }
    }

    /// Members to remove from a population of `size`; at least one survives
    pub fn cull_count(&self, size: usize) -> usize {
        let amount = (size as f32 * self.genocide_fraction).round() as usize;
        amount.min(size.saturating_sub(1))
    }

    /// Fitness-proportionate removal without replacement.
    ///
    /// Each draw is uniform in `[0, total cost)` over the remaining
    /// candidates; walking them in index order, the first whose running cost
    /// sum exceeds the draw is removed. When every remaining candidate costs
    /// nothing the pick is uniform. Returns sorted indices.
    pub fn select_victims<R: Rng>(
        &self,
        fitness: &[f32],
        amount: usize,
        protected: Option<usize>,
        rng: &mut R,
    ) -> Vec<usize> {
        let mut candidates: Vec<usize> = (0..fitness.len()).filter(|&i| Some(i) != protected).collect();
        let amount = amount.min(candidates.len());
        let mut victims = Vec::with_capacity(amount);

        while victims.len() < amount {
            let total: f64 = candidates.iter().map(|&i| roulette_weight(fitness[i])).sum();

            let position = if total > 0.0 {
                let draw = rng.gen_range(0.0..total);
                let mut running = 0.0f64;
                let mut hit = None;
                let mut last_weighted = 0;
                for (position, &i) in candidates.iter().enumerate() {
                    let weight = roulette_weight(fitness[i]);
                    if weight > 0.0 {
                        last_weighted = position;
                    }
                    running += weight;
                    if running > draw {
                        hit = Some(position);
                        break;
                    }
                }
                // rounding can leave the running sum a hair short of the draw
                hit.unwrap_or(last_weighted)
            } else {
                rng.gen_range(0..candidates.len())
            };

            victims.push(candidates.remove(position));
        }

        victims.sort_unstable();
        victims
    }

    /// Tournament selection: the lowest cost among a random sample of survivors
    pub fn select_parent<R: Rng>(&self, fitness: &[f32], survivors: &[usize], rng: &mut R) -> Option<usize> {
        let size = self.tournament_size.clamp(1, survivors.len().max(1));
        survivors
            .choose_multiple(rng, size)
            .copied()
            .min_by(|&a, &b| {
                fitness[a]
                    .partial_cmp(&fitness[b])
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Two parents chosen by independent tournaments
    pub fn select_parents<R: Rng>(
        &self,
        fitness: &[f32],
        survivors: &[usize],
        rng: &mut R,
    ) -> Option<(usize, usize)> {
        let first = self.select_parent(fitness, survivors, rng)?;
        let second = self.select_parent(fitness, survivors, rng)?;
        Some((first, second))
    }

    /// Crossover two parents, then run the mutation pass on the child
    pub fn breed<R: Rng>(
        &self,
        first: &Genome,
        second: &Genome,
        fitness_first: f32,
        fitness_second: f32,
        registry: &mut InnovationRegistry,
        rng: &mut R,
    ) -> Result<Genome, GenomeError> {
        let mut child = first.crossover(second, fitness_first, fitness_second, self.crossover_strategy, rng)?;
        child.mutate(&self.mutation_config, registry, rng)?;
        Ok(child)
    }
}
