use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use factorlab::data::{get_idx_traversal, SharedData, StateSpace, TraversalMode};
use factorlab::logging::init_logging;
use factorlab::sampling::{adversarial_modes, make_adversarial_sampler, sampler_report};
use factorlab::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "factorlab")]
#[command(about = "Adversarial triple sampling over ground-truth factor spaces", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log as JSON lines
    #[arg(long, global = true, env = "FACTORLAB_JSON_LOGS")]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample triples for the first anchors and print their factor distances
    Sample {
        /// Adversarial sampler mode
        #[arg(short, long, default_value = "close_far")]
        mode: String,

        /// Factor sizes of the state space
        #[arg(short, long, value_delimiter = ',', default_value = "8,8")]
        factor_sizes: Vec<usize>,

        /// Number of anchors to sample
        #[arg(short, long, default_value_t = 100)]
        steps: usize,

        /// Seed for reproducible sampling
        #[arg(long)]
        seed: Option<u64>,

        /// Read mode, factor sizes and seed from a configuration file
        #[arg(short, long, conflicts_with_all = ["mode", "factor_sizes", "seed"])]
        config: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the adversarial sampler modes
    Modes,

    /// Print the value indices visited when animating one factor
    Traverse {
        /// Number of values of the factor
        #[arg(short, long)]
        size: usize,

        /// Number of frames
        #[arg(short, long, default_value_t = 8)]
        frames: usize,

        /// Traversal mode
        #[arg(short, long, default_value = "interval")]
        mode: TraversalMode,
    },

    /// Validate a configuration file and print it with defaults filled in
    Config {
        /// Configuration file to validate
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet, cli.json_logs)?;

    match cli.command {
        Commands::Sample {
            mode,
            factor_sizes,
            steps,
            seed,
            config,
            json,
        } => {
            let (mode, factor_sizes, seed) = match config {
                Some(path) => {
                    let config = Config::from_file(&path)
                        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
                    (config.sampler.mode, config.sampler.factor_sizes, config.sampler.seed)
                }
                None => (mode, factor_sizes, seed),
            };
            sample(&mode, factor_sizes, steps, seed, json)?;
        }

        Commands::Modes => {
            for mode in adversarial_modes() {
                println!("{mode}");
            }
        }

        Commands::Traverse { size, frames, mode } => {
            let traversal = get_idx_traversal(size, frames, mode)?;
            println!("{traversal:?}");
        }

        Commands::Config { file } => {
            let config = Config::from_file(&file).context("Failed to load configuration file")?;
            info!("Configuration is valid");
            println!("{}", config.to_json()?);
        }
    }

    Ok(())
}

fn sample(mode: &str, factor_sizes: Vec<usize>, steps: usize, seed: Option<u64>, json: bool) -> Result<()> {
    let data: SharedData = Arc::new(StateSpace::new(factor_sizes)?);
    info!("Sampling {} anchors with {:?}", steps.min(data.len()), mode);

    let mut sampler = make_adversarial_sampler(mode, seed)?;
    let report = sampler_report(sampler.as_mut(), data, steps)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}
