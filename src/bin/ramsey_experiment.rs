//! ramsey_experiment CLI - solve the growth-model HJB once or run the belief experiment.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ramsey_fd::core::{
    AdaptiveReport, BaseReport, ExperimentConfig, HjbEngine, from_json, to_json_pretty,
};
use ramsey_fd::engines::hjb::BeliefTrajectory;
use std::path::{Path, PathBuf};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "ramsey_experiment")]
#[command(version)]
#[command(about = "Implicit upwind HJB solver for the stochastic growth model")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a JSON experiment configuration; defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write the JSON report to this file
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve the model once under the true diffusion parameter
    Base,

    /// Run the belief-update experiment
    Adaptive {
        /// Override the number of periods
        #[arg(short, long)]
        periods: Option<usize>,

        /// Override the random seed
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Print the default configuration as JSON
    Example,
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")
}

fn load_config(path: Option<&Path>) -> Result<ExperimentConfig> {
    let Some(path) = path else {
        return Ok(ExperimentConfig::default());
    };
    let payload = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {path:?}"))?;
    from_json(&payload).with_context(|| format!("Failed to parse config from {path:?}"))
}

fn write_report<T: serde::Serialize>(path: Option<&Path>, report: &T) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let json = to_json_pretty(report).context("Failed to serialize report")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write report to {path:?}"))?;
    info!(path = %path.display(), "report written");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    let mut config = load_config(cli.config.as_deref())?;
    if config.overrides_configured_diffusion() {
        warn!(
            configured = config.dynamics.diffusion_parameter(),
            true_sigma = config.belief.true_sigma,
            "diffusion parameter in dynamics is replaced by true_sigma (base) or the belief (adaptive)"
        );
    }

    match cli.command {
        Commands::Example => {
            println!("{}", to_json_pretty(&config)?);
        }

        Commands::Base => {
            let model = config
                .base_model()
                .context("Invalid model configuration")?;
            let solution = config.engine.solve(&model).context("HJB solve failed")?;

            println!("\n=== Base Solve ===");
            println!("Converged:      {}", solution.is_converged());
            println!("Iterations:     {}", solution.iterations);
            println!("Final distance: {:.3e}", solution.final_distance());
            println!(
                "Capital grid:   [{:.4}, {:.4}] x {}",
                solution.grid.capital.min(),
                solution.grid.capital.max(),
                solution.grid.n_capital()
            );
            match solution.steady_state_capital(solution.grid.n_exogenous() / 2) {
                Some(kss) => println!(
                    "Steady state k: {kss:.4} (deterministic {:.4})",
                    model.steady_state_capital()
                ),
                None => warn!("policy drift has no downward zero crossing on the grid"),
            }

            write_report(cli.output.as_deref(), &BaseReport { config, solution })?;
        }

        Commands::Adaptive { periods, seed } => {
            if let Some(periods) = periods {
                config.belief.periods = periods;
            }
            if let Some(seed) = seed {
                config.seed = seed;
            }
            let model = config.model()?;
            let mut rng = config.rng();
            let mut trajectory = BeliefTrajectory::new();

            let outcome = config
                .belief
                .run(&config.engine, &model, &mut rng, &mut trajectory);

            println!("\n=== Belief Experiment ===");
            println!("Periods run:    {}", trajectory.len());
            println!("Updates:        {}", trajectory.update_count());
            println!("Failed solves:  {}", trajectory.failure_count());
            println!(
                "Not converged:  {}",
                trajectory.non_converged_periods().len()
            );
            println!(
                "Belief:         {:.6} -> {:.6} (true {:.6})",
                config.belief.initial_belief,
                trajectory.current_belief(),
                config.belief.true_sigma
            );

            // Persist the partial trajectory before surfacing an abort.
            let report = AdaptiveReport::from_trajectory(config, &trajectory);
            write_report(cli.output.as_deref(), &report)?;
            outcome.context("Belief experiment aborted")?;
        }
    }

    Ok(())
}
