//! CLI command for running a PushGP search.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use pushgp::gp::{
    CheckpointConfig, GenerationStats, GeneticAlgorithm, Individual, SearchConfiguration,
    SelectionMethod, SimulatedAnnealing, VariationOperator, latest_checkpoint, load_checkpoint,
    save_program,
};

use crate::cli::CliError;
use crate::cli::problems::Problem;

/// Options of the `evolve` command.
#[derive(Args, Debug)]
pub(crate) struct EvolveArgs {
    /// Problem to solve
    #[arg(short, long, value_enum, default_value = "int-sum")]
    problem: Problem,

    /// Number of fitness cases
    #[arg(long, default_value = "50")]
    cases: usize,

    /// Individuals per generation
    #[arg(short = 'n', long, default_value = "500")]
    population: usize,

    /// Maximum generations
    #[arg(short, long, default_value = "100")]
    generations: usize,

    /// Selection method: lexicase, epsilon-lexicase, tournament, elite, fitness-proportionate
    #[arg(long, default_value = "lexicase")]
    selection: String,

    /// Variation operators as name or name=weight, e.g. umad=0.8 alternation=0.2
    #[arg(long = "operator", num_args = 1.., default_values_t = vec!["umad".to_string()])]
    operators: Vec<String>,

    /// Stop when the best total error is at most this
    #[arg(long, default_value = "0")]
    error_threshold: f64,

    /// Post-run simplification steps
    #[arg(long, default_value = "2000")]
    simplification_steps: usize,

    /// Evaluation threads (0 = serial)
    #[arg(short = 'j', long, default_value = "0")]
    threads: usize,

    /// Random seed (default: from the clock)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Use simulated annealing instead of the genetic algorithm
    #[arg(long)]
    annealing: bool,

    /// Directory for checkpoints
    #[arg(long)]
    checkpoint_dir: Option<PathBuf>,

    /// Write a checkpoint every N generations
    #[arg(long, default_value = "10")]
    checkpoint_interval: usize,

    /// Resume from the latest checkpoint in --checkpoint-dir
    #[arg(long, requires = "checkpoint_dir")]
    resume: bool,

    /// Save the best program to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Show a progress bar
    #[arg(long)]
    progress: bool,
}

fn parse_operator(spec: &str) -> Result<(VariationOperator, f64), CliError> {
    let (name, weight) = match spec.split_once('=') {
        Some((name, weight)) => (
            name,
            weight
                .parse::<f64>()
                .map_err(|e| CliError::new(format!("invalid weight in {spec:?}: {e}")))?,
        ),
        None => (spec, 1.0),
    };
    Ok((name.parse()?, weight))
}

/// Execute the evolve command.
pub(crate) fn execute(args: EvolveArgs) -> Result<(), CliError> {
    let setup = args.problem.setup(args.cases)?;

    let mut config = SearchConfiguration::new(setup.signature, Arc::new(setup.evaluator), setup.spawner);
    config.selection = args.selection.parse::<SelectionMethod>()?;
    config.variation = args
        .operators
        .iter()
        .map(|s| parse_operator(s))
        .collect::<Result<_, _>>()?;
    config.population_size = args.population;
    config.max_generations = args.generations;
    config.error_threshold = args.error_threshold;
    config.simplification_steps = args.simplification_steps;
    config.parallelism = args.threads;
    config.seed = args.seed.unwrap_or_else(|| {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(42)
    });
    config.checkpoint = args.checkpoint_dir.clone().map(|directory| CheckpointConfig {
        directory,
        interval: args.checkpoint_interval,
    });

    println!("Starting search:");
    println!("  Problem: {:?}", args.problem);
    println!("  Population: {}", config.population_size);
    println!("  Generations: {}", config.max_generations);
    println!("  Selection: {}", config.selection.name());
    println!("  Seed: {}", config.seed);
    println!();

    let pb = if args.progress {
        let pb = ProgressBar::new(config.max_generations as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} gens {msg}")
                .map_err(|e| CliError::new(e.to_string()))?
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };
    let observer = |stats: &GenerationStats| {
        if let Some(pb) = &pb {
            pb.set_position(stats.generation as u64 + 1);
            pb.set_message(format!("best={:.4}", stats.best_total_error));
        }
    };

    let best = if args.annealing {
        SimulatedAnnealing::new(config)?.run_with(observer)?
    } else {
        let search = match (&args.checkpoint_dir, args.resume) {
            (Some(dir), true) => {
                let path = latest_checkpoint(dir)?
                    .ok_or_else(|| CliError::new(format!("no checkpoint in {}", dir.display())))?;
                println!("Resuming from {}", path.display());
                GeneticAlgorithm::from_checkpoint(config, &load_checkpoint(&path)?)?
            }
            _ => GeneticAlgorithm::new(config)?,
        };
        search.run_with(observer)?
    };
    if let Some(pb) = &pb {
        pb.finish();
    }

    print_results(&best);
    if let Some(path) = args.output {
        save_program(best.program(), &path)?;
        println!("  Saved to: {}", path.display());
    }
    Ok(())
}

fn print_results(best: &Individual) {
    println!();
    println!("Search complete!");
    println!("  Total error: {}", best.total_error());
    println!("  Genome length: {}", best.genome().len());
    println!("  Program: {}", best.program().code);
}
