//! Statistics tracking across generations.

use crate::neural::Genome;
use serde::{Deserialize, Serialize};

/// Summary of one finished generation
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Generation that was just evaluated
    pub generation: u32,
    /// Step budget the generation had
    pub lifespan: u32,
    /// Steps actually taken
    pub steps: u32,
    /// Lowest cost in this generation
    pub best_fitness: f32,
    /// Mean cost in this generation
    pub mean_fitness: f32,
    /// Lowest cost seen in any generation so far
    pub best_fitness_ever: f32,
    /// Members replaced by offspring
    pub culled: usize,
    /// Agents that reached the objective
    pub finished: usize,
    /// Agents that died before the step budget ran out
    pub dead: usize,
    /// Mean hidden node count
    pub hidden_mean: f32,
    /// Largest hidden node count
    pub hidden_max: usize,
    /// Deepest network, in layers
    pub layers_max: usize,
}

impl GenerationStats {
    /// Fill the structural fields from a set of genomes
    pub fn record_genomes<'a>(&mut self, genomes: impl Iterator<Item = &'a Genome>) {
        let mut count = 0usize;
        let mut hidden_total = 0usize;
        self.hidden_max = 0;
        self.layers_max = 0;

        for genome in genomes {
            let hidden = genome.hidden_count();
            count += 1;
            hidden_total += hidden;
            self.hidden_max = self.hidden_max.max(hidden);
            self.layers_max = self.layers_max.max(genome.layer_count());
        }

        self.hidden_mean = if count == 0 {
            0.0
        } else {
            hidden_total as f32 / count as f32
        };
    }

    /// Get a summary string
    pub fn summary(&self) -> String {
        format!(
            "Gen {:4} | Steps {:5}/{:5} | Best {:8.2} | Mean {:8.2} | Ever {:8.2} | Goal {:3} | Dead {:3} | Hidden {:.1}/{} | Layers {}",
            self.generation,
            self.steps,
            self.lifespan,
            self.best_fitness,
            self.mean_fitness,
            self.best_fitness_ever,
            self.finished,
            self.dead,
            self.hidden_mean,
            self.hidden_max,
            self.layers_max,
        )
    }
}

/// History of generation summaries
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatsHistory {
    pub entries: Vec<GenerationStats>,
}

impl StatsHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stats: GenerationStats) {
        self.entries.push(stats);
    }

    pub fn latest(&self) -> Option<&GenerationStats> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Best-ever cost per generation
    pub fn best_curve(&self) -> Vec<f32> {
        self.entries.iter().map(|s| s.best_fitness_ever).collect()
    }
}
