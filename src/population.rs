//! Population of genomes evaluated in an environment and evolved generation
//! by generation.
//!
//! A population alternates between two phases. While evaluating, every
//! `update` advances each living agent by one step. Once no agent is alive or
//! the lifespan is used up, the generation is scored, culled, bred and
//! mutated, and a new generation starts.

use crate::config::Config;
use crate::environment::Environment;
use crate::evolution::{champion, EvolutionEngine, EvolutionError};
use crate::neural::{Genome, InnovationRegistry};
use crate::stats::{GenerationStats, StatsHistory};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// A genome paired with the agent it drives
#[derive(Clone, Debug)]
pub struct Member<A> {
    pub genome: Genome,
    pub agent: A,
    /// Cost scored in the last finished generation. `None` before the first
    /// evolution and for offspring bred into a culled slot.
    pub fitness: Option<f32>,
}

/// Outcome of one [`Population::update`] call
#[derive(Clone, Debug)]
pub enum Phase {
    /// Agents took a step and the generation is still running
    Evaluating,
    /// The generation ended and the next one has been bred
    Evolved(GenerationStats),
}

/// Evolving population
pub struct Population<E: Environment> {
    members: Vec<Member<E::Agent>>,
    environment: E,
    engine: EvolutionEngine,

    // Innovation counters, shared by every genome of this population
    registry: InnovationRegistry,

    // State
    generation: u32,
    steps: u32,
    lifespan: u32,
    best_fitness: Option<f32>,
    best_genome: Option<Genome>,

    // Lifespan schedule
    lifespan_increase_interval: u32,
    max_lifespan: u32,

    // Statistics
    history: StatsHistory,
    stats_interval: u32,

    // Random number generator (seeded for reproducibility)
    rng: ChaCha8Rng,
    seed: u64,
}

/// Run one agent for one step
fn step_member<E: Environment>(environment: &E, member: &mut Member<E::Agent>) -> Result<(), EvolutionError> {
    let sensors = environment.sense(&member.agent);
    member.genome.set_inputs(&sensors)?;
    let actions = member.genome.feed_forward()?;

    if let Some(&bad) = actions.iter().find(|a| ![-1.0, 0.0, 1.0].contains(*a)) {
        return Err(EvolutionError::InvalidAction(bad));
    }

    environment.act(&mut member.agent, &actions);
    Ok(())
}

impl<E: Environment> Population<E> {
    /// Create a population with a random seed
    pub fn new(config: &Config, environment: E) -> Result<Self, EvolutionError> {
        let seed = rand::thread_rng().gen();
        Self::new_with_seed(config, environment, seed)
    }

    /// Create a population with a specific seed for reproducibility
    pub fn new_with_seed(config: &Config, environment: E, seed: u64) -> Result<Self, EvolutionError> {
        let size = config.population.size;
        if size < 2 {
            return Err(EvolutionError::PopulationTooSmall(size));
        }
        config.validate()?;

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut registry = InnovationRegistry::new();

        let members = (0..size)
            .map(|_| Member {
                genome: registry
                    .genesis()
                    .minimal_genome(config.neural.n_inputs, config.neural.n_outputs, &mut rng),
                agent: environment.spawn(),
                fitness: None,
            })
            .collect();

        log::debug!(
            "Population of {} created with seed {} ({} inputs, {} outputs)",
            size,
            seed,
            config.neural.n_inputs,
            config.neural.n_outputs
        );

        Ok(Self {
            members,
            environment,
            engine: EvolutionEngine::from_config(config),
            registry,
            generation: 1,
            steps: 0,
            lifespan: config.population.initial_lifespan,
            best_fitness: None,
            best_genome: None,
            lifespan_increase_interval: config.population.lifespan_increase_interval.max(1),
            max_lifespan: config.population.max_lifespan,
            history: StatsHistory::new(),
            stats_interval: config.logging.stats_interval.max(1),
            rng,
            seed,
        })
    }

    /// Advance the population by one step, evolving when the generation ends
    pub fn update(&mut self) -> Result<Phase, EvolutionError> {
        if self.is_generation_over() {
            return self.evolve().map(Phase::Evolved);
        }

        for member in &mut self.members {
            if self.environment.is_alive(&member.agent) {
                step_member(&self.environment, member)?;
            }
        }
        self.steps += 1;

        Ok(Phase::Evaluating)
    }

    /// Run updates until the current generation has evolved
    pub fn run_generation(&mut self) -> Result<GenerationStats, EvolutionError> {
        loop {
            if let Phase::Evolved(stats) = self.update()? {
                return Ok(stats);
            }
        }
    }

    /// Run the specified number of generations
    pub fn run(&mut self, generations: u32) -> Result<(), EvolutionError> {
        for _ in 0..generations {
            self.run_generation()?;
        }
        Ok(())
    }

    /// Run generations with a callback after each one
    pub fn run_with_callback<F>(&mut self, generations: u32, mut callback: F) -> Result<(), EvolutionError>
    where
        F: FnMut(&Self, &GenerationStats),
    {
        for _ in 0..generations {
            let stats = self.run_generation()?;
            callback(self, &stats);
        }
        Ok(())
    }

    /// No agent left alive, or the step budget is used up
    pub fn is_generation_over(&self) -> bool {
        self.steps >= self.lifespan || !self.members.iter().any(|m| self.environment.is_alive(&m.agent))
    }

    /// Score, cull, breed and mutate, then start the next generation
    fn evolve(&mut self) -> Result<GenerationStats, EvolutionError> {
        let fitness: Vec<f32> = self
            .members
            .iter()
            .map(|m| self.environment.fitness(&m.agent))
            .collect();
        for (member, &cost) in self.members.iter_mut().zip(&fitness) {
            member.fitness = Some(cost);
        }

        let best = champion(&fitness);
        let mut stats = GenerationStats {
            generation: self.generation,
            lifespan: self.lifespan,
            steps: self.steps,
            mean_fitness: fitness.iter().sum::<f32>() / fitness.len() as f32,
            ..Default::default()
        };
        for member in &self.members {
            if self.environment.is_finished(&member.agent) {
                stats.finished += 1;
            } else if !self.environment.is_alive(&member.agent) {
                stats.dead += 1;
            }
        }

        if let Some(index) = best {
            stats.best_fitness = fitness[index];
            if self.best_fitness.map_or(true, |ever| fitness[index] < ever) {
                self.best_fitness = Some(fitness[index]);
                self.best_genome = Some(self.members[index].genome.clone());
            }
        }
        stats.best_fitness_ever = self.best_fitness.unwrap_or(stats.best_fitness);

        // Cull
        let protected = if self.engine.preserve_champion { best } else { None };
        let amount = self.engine.cull_count(self.members.len());
        let victims = self.engine.select_victims(&fitness, amount, protected, &mut self.rng);
        let survivors: Vec<usize> = (0..self.members.len())
            .filter(|i| victims.binary_search(i).is_err())
            .collect();
        stats.culled = victims.len();

        // Breed from survivors only, then overwrite the culled slots
        let mut offspring = Vec::with_capacity(victims.len());
        for _ in &victims {
            let (a, b) = self
                .engine
                .select_parents(&fitness, &survivors, &mut self.rng)
                .ok_or(EvolutionError::NoSurvivors)?;
            let child = self.engine.breed(
                &self.members[a].genome,
                &self.members[b].genome,
                fitness[a],
                fitness[b],
                &mut self.registry,
                &mut self.rng,
            )?;
            offspring.push(child);
        }
        for (&slot, child) in victims.iter().zip(offspring) {
            self.members[slot].genome = child;
            self.members[slot].fitness = None;
        }

        for &index in &survivors {
            if Some(index) == protected {
                continue;
            }
            if self.rng.gen::<f32>() < self.engine.survivor_mutation_rate {
                self.members[index]
                    .genome
                    .mutate(&self.engine.mutation_config, &mut self.registry, &mut self.rng)?;
            }
        }

        for member in &mut self.members {
            member.agent = self.environment.spawn();
        }

        stats.record_genomes(self.members.iter().map(|m| &m.genome));

        if self.generation % self.stats_interval == 0 {
            log::info!("{}", stats.summary());
        } else {
            log::debug!("{}", stats.summary());
        }

        self.generation += 1;
        self.steps = 0;
        if self.generation % self.lifespan_increase_interval == 0 {
            self.lifespan = self.lifespan.saturating_mul(2).min(self.max_lifespan);
            log::debug!("Lifespan raised to {} at generation {}", self.lifespan, self.generation);
        }

        self.history.record(stats.clone());
        Ok(stats)
    }

    pub fn members(&self) -> &[Member<E::Agent>] {
        &self.members
    }

    pub fn environment(&self) -> &E {
        &self.environment
    }

    /// Current generation, starting at 1
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Steps taken in the current generation
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Step budget of the current generation
    pub fn lifespan(&self) -> u32 {
        self.lifespan
    }

    /// Lowest cost seen in any finished generation
    pub fn best_fitness(&self) -> Option<f32> {
        self.best_fitness
    }

    /// Genome that scored [`Population::best_fitness`]
    pub fn best_genome(&self) -> Option<&Genome> {
        self.best_genome.as_ref()
    }

    pub fn history(&self) -> &StatsHistory {
        &self.history
    }

    pub fn registry(&self) -> &InnovationRegistry {
        &self.registry
    }

    /// Get seed for reproducibility
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Agents push a counter with their first output and die after a fixed
    /// number of steps. Cost is the distance of the counter from a target.
    struct Counter {
        lifetime: u32,
        target: f32,
    }

    #[derive(Clone, Debug)]
    struct Tally {
        steps: u32,
        total: f32,
    }

    impl Environment for Counter {
        type Agent = Tally;

        fn spawn(&self) -> Tally {
            Tally { steps: 0, total: 0.0 }
        }

        fn sense(&self, tally: &Tally) -> Vec<f32> {
            let mut sensors = vec![0.0; 8];
            sensors[0] = 1.0;
            sensors[1] = if tally.total < self.target { 1.0 } else { 0.0 };
            sensors
        }

        fn act(&self, tally: &mut Tally, actions: &[f32]) {
            tally.steps += 1;
            tally.total += actions[0];
        }

        fn is_alive(&self, tally: &Tally) -> bool {
            tally.steps < self.lifetime
        }

        fn fitness(&self, tally: &Tally) -> f32 {
            (self.target - tally.total).abs()
        }
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.population.size = 20;
        config.population.initial_lifespan = 10;
        config.population.lifespan_increase_interval = 3;
        config.population.max_lifespan = 1_000;
        config
    }

    fn counter(lifetime: u32) -> Counter {
        Counter { lifetime, target: 5.0 }
    }

    #[test]
    fn test_new_population() {
        let population = Population::new_with_seed(&test_config(), counter(100), 1).unwrap();

        assert_eq!(population.members().len(), 20);
        assert_eq!(population.generation(), 1);
        assert_eq!(population.lifespan(), 10);
        assert_eq!(population.seed(), 1);

        // generation-0 genomes share their innovation numbers
        let first: Vec<_> = population.members()[0].genome.connections().keys().copied().collect();
        for member in population.members() {
            let keys: Vec<_> = member.genome.connections().keys().copied().collect();
            assert_eq!(keys, first);
        }
    }

    #[test]
    fn test_too_small() {
        let mut config = test_config();
        config.population.size = 1;
        assert!(matches!(
            Population::new_with_seed(&config, counter(5), 1),
            Err(EvolutionError::PopulationTooSmall(1))
        ));
    }

    #[test]
    fn test_evolves_when_lifespan_used() {
        let mut population = Population::new_with_seed(&test_config(), counter(100), 2).unwrap();

        for step in 1..=10 {
            assert!(matches!(population.update().unwrap(), Phase::Evaluating));
            assert_eq!(population.steps(), step);
        }

        match population.update().unwrap() {
            Phase::Evolved(stats) => {
                assert_eq!(stats.generation, 1);
                assert_eq!(stats.steps, 10);
                assert_eq!(stats.culled, 10);
            }
            Phase::Evaluating => panic!("generation should have ended"),
        }
        assert_eq!(population.generation(), 2);
        assert_eq!(population.steps(), 0);
    }

    #[test]
    fn test_survivors_keep_last_cost() {
        let mut population = Population::new_with_seed(&test_config(), counter(4), 9).unwrap();
        assert!(population.members().iter().all(|m| m.fitness.is_none()));

        population.run(1).unwrap();

        let scored: Vec<f32> = population.members().iter().filter_map(|m| m.fitness).collect();
        let bred = population.members().iter().filter(|m| m.fitness.is_none()).count();
        assert_eq!(scored.len(), 10);
        assert_eq!(bred, 10);
        // the champion survives, so the best cost is still on a member
        let best = population.best_fitness().unwrap();
        assert!(scored.contains(&best));
        assert!(scored.iter().all(|&cost| cost >= best));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = test_config();
        config.population.genocide_fraction = 1.5;
        assert!(matches!(
            Population::new_with_seed(&config, counter(5), 1),
            Err(EvolutionError::Config(_))
        ));
    }

    #[test]
    fn test_evolves_when_everyone_died() {
        let mut population = Population::new_with_seed(&test_config(), counter(3), 3).unwrap();

        let stats = population.run_generation().unwrap();
        assert_eq!(stats.steps, 3);
    }

    #[test]
    fn test_lifespan_doubles() {
        let mut population = Population::new_with_seed(&test_config(), counter(1_000), 4).unwrap();

        population.run(2).unwrap();
        assert_eq!(population.generation(), 3);
        assert_eq!(population.lifespan(), 20);

        population.run(3).unwrap();
        assert_eq!(population.generation(), 6);
        assert_eq!(population.lifespan(), 40);
    }

    #[test]
    fn test_lifespan_capped() {
        let mut config = test_config();
        config.population.lifespan_increase_interval = 1;
        config.population.max_lifespan = 25;
        let mut population = Population::new_with_seed(&config, counter(3), 5).unwrap();

        population.run(4).unwrap();
        assert_eq!(population.lifespan(), 25);
    }

    #[test]
    fn test_best_fitness_never_worsens() {
        let mut population = Population::new_with_seed(&test_config(), counter(8), 6).unwrap();

        population.run(10).unwrap();

        let curve = population.history().best_curve();
        assert_eq!(curve.len(), 10);
        assert!(curve.windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(population.best_fitness(), curve.last().copied());
        assert!(population.best_genome().is_some());
    }

    #[test]
    fn test_genomes_stay_valid() {
        let mut config = test_config();
        config.evolution.add_node_rate = 0.5;
        config.evolution.add_connection_rate = 0.5;
        let mut population = Population::new_with_seed(&config, counter(6), 7).unwrap();

        population.run(15).unwrap();

        assert_eq!(population.members().len(), 20);
        for member in population.members() {
            assert!(member.genome.validate().is_ok());
        }
        assert!(population.history().latest().unwrap().hidden_max > 0);
    }

    #[test]
    fn test_reproducible_with_seed() {
        let mut a = Population::new_with_seed(&test_config(), counter(6), 42).unwrap();
        let mut b = Population::new_with_seed(&test_config(), counter(6), 42).unwrap();

        a.run(5).unwrap();
        b.run(5).unwrap();

        assert_eq!(a.history().best_curve(), b.history().best_curve());
        for (x, y) in a.members().iter().zip(b.members()) {
            assert_eq!(x.genome.connections(), y.genome.connections());
        }
    }
}
