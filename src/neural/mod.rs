//! Neural genome module for walker brains.
//!
//! Implements NEAT-style genomes with:
//! - Typed nodes on explicit layers
//! - Innovation-numbered connections
//! - Structural mutations (add node, add connection)
//! - Innovation-matched crossover

mod crossover;
mod genes;
mod genome;
mod innovation;
mod mutations;

pub use crossover::CrossoverStrategy;
pub use genes::{activate, ConnectionGene, Innovation, NodeGene, NodeId, NodeKind};
pub use genome::{Genome, GenomeError};
pub use innovation::{Genesis, InnovationRegistry};
pub use mutations::{MutationConfig, WEIGHT_LIMIT};
