//! Configuration system for neat-maze runs.
//!
//! Supports YAML configuration files with sensible defaults. Missing sections
//! and fields fall back to their defaults.

use crate::arena::{ACTION_COUNT, SENSOR_COUNT};
use crate::neural::CrossoverStrategy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub neural: NeuralConfig,
    pub evolution: EvolutionConfig,
    pub population: PopulationConfig,
    pub arena: ArenaConfig,
    pub logging: LoggingConfig,
}

/// Network shape.
///
/// Fixed by the arena's sensors and actions: `validate` only accepts
/// `SENSOR_COUNT` inputs and `ACTION_COUNT` outputs. The section is kept so a
/// config file states the shape its genomes are built with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuralConfig {
    /// Number of input nodes (bias not included)
    pub n_inputs: usize,
    /// Number of output nodes
    pub n_outputs: usize,
}

/// Mutation and breeding parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Probability of weight mutation per connection
    pub weight_mutation_rate: f32,
    /// Magnitude of weight mutations
    pub weight_mutation_strength: f32,
    /// Probability that a mutated weight is redrawn instead of perturbed
    pub weight_replace_rate: f32,
    /// Probability of adding a node
    pub add_node_rate: f32,
    /// Probability of adding a connection
    pub add_connection_rate: f32,
    /// Maximum hidden nodes per genome
    pub max_hidden_nodes: usize,
    /// Probability that a survivor also goes through the mutation pass
    pub survivor_mutation_rate: f32,
    /// Candidates per parent tournament
    pub tournament_size: usize,
    /// Treatment of genes only the fitter parent carries
    pub crossover: CrossoverStrategy,
}

/// Population size, culling and generation lifespan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Number of walkers per generation
    pub size: usize,
    /// Fraction of the population removed every generation
    pub genocide_fraction: f32,
    /// Evaluation steps allowed to the first generation
    pub initial_lifespan: u32,
    /// The lifespan doubles every this many generations
    pub lifespan_increase_interval: u32,
    /// Upper bound for the lifespan
    pub max_lifespan: u32,
    /// Never cull the lowest-cost walker
    pub preserve_champion: bool,
}

/// Tile arena layout and walker cost weights
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub rows: usize,
    pub cols: usize,
    /// Start tile as [row, col]
    pub start: [usize; 2],
    /// Goal tile as [row, col]
    pub goal: [usize; 2],
    /// Interior wall tiles as [row, col]; the border is always walled
    pub walls: Vec<[usize; 2]>,
    /// Cost per tile of Manhattan distance left to the goal
    pub distance_weight: f32,
    /// Cost per move taken
    pub move_weight: f32,
    /// Extra cost for walking into a wall
    pub death_penalty: f32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Generations between summary lines
    pub stats_interval: u32,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for NeuralConfig {
    fn default() -> Self {
        Self {
            n_inputs: SENSOR_COUNT,
            n_outputs: ACTION_COUNT,
        }
    }
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            weight_mutation_rate: 0.1,
            weight_mutation_strength: 0.3,
            weight_replace_rate: 0.1,
            add_node_rate: 0.1,
            add_connection_rate: 0.2,
            max_hidden_nodes: 50,
            survivor_mutation_rate: 0.25,
            tournament_size: 3,
            crossover: CrossoverStrategy::FitterParent,
        }
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: 100,
            genocide_fraction: 0.5,
            initial_lifespan: 250,
            lifespan_increase_interval: 15,
            max_lifespan: 16_000,
            preserve_champion: true,
        }
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        // A wall across the middle with gaps at the top and bottom
        let walls = (4..=10).map(|row| [row, 12]).collect();

        Self {
            rows: 15,
            cols: 25,
            start: [7, 2],
            goal: [7, 22],
            walls,
            distance_weight: 10.0,
            move_weight: 0.1,
            death_penalty: 100.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            stats_interval: 10,
            log_level: "info".to_string(),
        }
    }
}

/// Errors raised while loading or validating a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}

fn is_probability(value: f32) -> bool {
    (0.0..=1.0).contains(&value)
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.neural.n_inputs == 0 || self.neural.n_outputs == 0 {
            return Err(invalid("neural inputs/outputs must be > 0"));
        }
        if self.neural.n_inputs != SENSOR_COUNT || self.neural.n_outputs != ACTION_COUNT {
            return Err(ConfigError::Invalid(format!(
                "the arena needs {} inputs and {} outputs",
                SENSOR_COUNT, ACTION_COUNT
            )));
        }

        let evolution = &self.evolution;
        let rates = [
            evolution.weight_mutation_rate,
            evolution.weight_replace_rate,
            evolution.add_node_rate,
            evolution.add_connection_rate,
            evolution.survivor_mutation_rate,
        ];
        if !rates.iter().all(|&r| is_probability(r)) {
            return Err(invalid("mutation rates must be between 0 and 1"));
        }
        if evolution.weight_mutation_strength < 0.0 {
            return Err(invalid("weight_mutation_strength must be >= 0"));
        }
        if evolution.tournament_size == 0 {
            return Err(invalid("tournament_size must be > 0"));
        }

        let population = &self.population;
        if population.size < 2 {
            return Err(invalid("population size must be at least 2"));
        }
        if !(0.0..1.0).contains(&population.genocide_fraction) {
            return Err(invalid("genocide_fraction must be in [0, 1)"));
        }
        if population.initial_lifespan == 0 || population.lifespan_increase_interval == 0 {
            return Err(invalid("initial_lifespan and lifespan_increase_interval must be > 0"));
        }
        if population.max_lifespan < population.initial_lifespan {
            return Err(invalid("max_lifespan cannot be below initial_lifespan"));
        }

        let arena = &self.arena;
        if arena.rows < 3 || arena.cols < 3 {
            return Err(invalid("arena must be at least 3x3"));
        }
        let interior = |[row, col]: [usize; 2]| row > 0 && col > 0 && row < arena.rows - 1 && col < arena.cols - 1;
        if !interior(arena.start) || !interior(arena.goal) {
            return Err(invalid("start and goal must lie inside the border walls"));
        }
        if arena.start == arena.goal {
            return Err(invalid("start and goal must differ"));
        }
        if arena.walls.contains(&arena.start) || arena.walls.contains(&arena.goal) {
            return Err(invalid("start and goal cannot be walls"));
        }
        if arena.walls.iter().any(|&[row, col]| row >= arena.rows || col >= arena.cols) {
            return Err(invalid("wall outside the arena"));
        }

        Ok(())
    }
}
