//! # neat-maze
//!
//! NEAT-style neuroevolution of small feed-forward networks, with a tile
//! arena for the networks to learn to cross.
//!
//! ## Features
//!
//! - **Growing topologies**: genomes start minimal and gain nodes and
//!   connections through innovation-tracked mutations
//! - **Crossover**: genes of two parents are matched by innovation number
//! - **Configurable**: YAML configuration files
//! - **Reproducible**: Seeded random number generation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use neat_maze::{Arena, Config, Population};
//!
//! let config = Config::default();
//! let arena = Arena::from_config(&config.arena).unwrap();
//! let mut population = Population::new(&config, arena).unwrap();
//!
//! population.run(50).unwrap();
//!
//! println!("Generation: {}", population.generation());
//! println!("Best cost: {:?}", population.best_fitness());
//! ```
//!
//! ## Genomes
//!
//! Initial genomes can only be built through the registry's genesis guard,
//! which also rewinds the innovation counters:
//!
//! ```rust
//! use neat_maze::neural::InnovationRegistry;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(7);
//! let mut registry = InnovationRegistry::new();
//! let mut genome = registry.genesis().minimal_genome(8, 2, &mut rng);
//!
//! genome.add_node(&mut registry, &mut rng).unwrap();
//! let outputs = genome.evaluate(&[1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0]).unwrap();
//! assert_eq!(outputs.len(), 2);
//! ```

pub mod arena;
pub mod config;
pub mod environment;
pub mod evolution;
pub mod neural;
pub mod population;
pub mod stats;

// Re-export main types
pub use arena::Arena;
pub use config::Config;
pub use environment::Environment;
pub use evolution::EvolutionError;
pub use neural::{Genome, InnovationRegistry};
pub use population::{Phase, Population};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Evolve walkers in the default arena and time it
pub fn benchmark(generations: u32, population: usize) -> Result<BenchmarkResult, EvolutionError> {
    use std::time::Instant;

    let mut config = Config::default();
    config.population.size = population;

    let arena = Arena::from_config(&config.arena)?;
    let mut pop = Population::new(&config, arena)?;

    let start = Instant::now();
    pop.run(generations)?;
    let elapsed = start.elapsed();

    let latest = pop.history().latest();
    Ok(BenchmarkResult {
        generations,
        population,
        elapsed_secs: elapsed.as_secs_f64(),
        generations_per_second: generations as f64 / elapsed.as_secs_f64(),
        best_fitness: pop.best_fitness().unwrap_or(f32::INFINITY),
        max_hidden: latest.map_or(0, |s| s.hidden_max),
        max_layers: latest.map_or(0, |s| s.layers_max),
    })
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub generations: u32,
    pub population: usize,
    pub elapsed_secs: f64,
    pub generations_per_second: f64,
    pub best_fitness: f32,
    pub max_hidden: usize,
    pub max_layers: usize,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Generations: {}", self.generations)?;
        writeln!(f, "Population: {}", self.population)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.1} generations/s", self.generations_per_second)?;
        writeln!(f, "Best cost: {:.2}", self.best_fitness)?;
        writeln!(f, "Largest genome: {} hidden, {} layers", self.max_hidden, self.max_layers)?;
        Ok(())
    }
}
