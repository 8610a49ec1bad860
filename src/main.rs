//! neat-maze - CLI Entry Point
//!
//! Evolves walkers that learn to cross a tile arena.

use clap::{Parser, Subcommand};
use neat_maze::{benchmark, Arena, Config, Population};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "neat-maze")]
#[command(version)]
#[command(about = "NEAT neuroevolution of walkers crossing a tile arena")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evolve a population
    Run {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Number of generations to evolve
        #[arg(short, long, default_value = "200")]
        generations: u32,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of generations
        #[arg(short, long, default_value = "20")]
        generations: u32,

        /// Population size
        #[arg(short, long, default_value = "100")]
        population: usize,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            generations,
            seed,
            quiet,
        } => run_evolution(config, generations, seed, quiet),

        Commands::Benchmark {
            generations,
            population,
        } => {
            init_logging("warn");
            run_benchmark(generations, population)
        }

        Commands::Init { output } => {
            init_logging("info");
            generate_config(output)
        }
    }
}

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run_evolution(
    config_path: PathBuf,
    generations: u32,
    seed: Option<u64>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    // Load or create config
    let config = if config_path.exists() {
        let config = Config::from_file(&config_path)?;
        init_logging(if quiet { "warn" } else { config.logging.log_level.as_str() });
        log::info!("Loaded config from {:?}", config_path);
        config
    } else {
        let config = Config::default();
        init_logging(if quiet { "warn" } else { config.logging.log_level.as_str() });
        log::info!("Using default configuration");
        config
    };

    let arena = Arena::from_config(&config.arena)?;
    let mut population = match seed {
        Some(s) => Population::new_with_seed(&config, arena, s)?,
        None => Population::new(&config, arena)?,
    };

    println!("Starting evolution");
    println!("  Seed: {}", population.seed());
    println!("  Population: {}", config.population.size);
    println!("  Arena: {}x{}", config.arena.rows, config.arena.cols);
    println!("  Generations: {}", generations);
    println!();

    let start = Instant::now();
    let mut solved_at = None;

    population.run_with_callback(generations, |_, stats| {
        if solved_at.is_none() && stats.finished > 0 {
            solved_at = Some(stats.generation);
            log::info!("Goal first reached in generation {}", stats.generation);
        }
    })?;

    let elapsed = start.elapsed();

    println!();
    println!("=== Evolution Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Generations: {}", population.history().len());
    println!(
        "Speed: {:.1} generations/s",
        population.history().len() as f64 / elapsed.as_secs_f64()
    );
    match population.best_fitness() {
        Some(best) => println!("Best cost: {:.2}", best),
        None => println!("Best cost: n/a"),
    }
    match solved_at {
        Some(generation) => println!("Goal first reached: generation {}", generation),
        None => println!("Goal never reached"),
    }
    if let Some(genome) = population.best_genome() {
        println!(
            "Best genome: {} nodes, {} enabled connections, {} layers",
            genome.nodes().len(),
            genome.enabled_connection_count(),
            genome.layer_count()
        );
    }

    Ok(())
}

fn run_benchmark(generations: u32, population: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== neat-maze Benchmark ===");
    println!("Generations: {}", generations);
    println!("Population: {}", population);
    println!();

    let result = benchmark(generations, population)?;
    println!("{}", result);

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}
