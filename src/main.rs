//! Command-line trainer.
//!
//! Usage:
//!   trinet <training_set> <hidden> <brain_file> [options]
//!
//! Trains a new network, or keeps training the one already stored in
//! `brain_file`, on every example in `training_set`, then writes the result
//! back to `brain_file`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use log::info;
use rand::{rngs::StdRng, SeedableRng};

use trinet::{train_set, Network, NetError, Topology, TrainConfig, TrainingSet};

#[derive(Parser, Debug)]
#[command(author, version, about = "Train a three-layer neural network on a whitespace-separated data set")]
struct Args {
    /// Training data: inputs followed by targets, repeated
    training_set: PathBuf,

    /// Number of neurons in the hidden layer
    hidden: usize,

    /// Network file to create, or to load and keep training
    brain_file: PathBuf,

    /// Input values per example
    #[arg(long, default_value_t = 4)]
    inputs: usize,

    /// Target values per example
    #[arg(long, default_value_t = 1)]
    outputs: usize,

    #[arg(long, default_value_t = 0.2)]
    learning_rate: f64,

    /// Momentum factor
    #[arg(long, default_value_t = 0.9)]
    momentum: f64,

    /// Train without momentum
    #[arg(long)]
    no_momentum: bool,

    /// Per-example error at which training moves on
    #[arg(long, default_value_t = 0.05)]
    error_threshold: f64,

    /// Cap on training steps per example
    #[arg(long, default_value_t = 50_000)]
    max_iterations: usize,

    /// Linear instead of sigmoid activation on the output layer
    #[arg(long)]
    linear_output: bool,

    /// Seed for the initial weights of a new network
    #[arg(long)]
    seed: Option<u64>,

    /// Write per-example training statistics to this JSON file
    #[arg(long)]
    stats_json: Option<PathBuf>,
}

impl Args {
    fn train_config(&self) -> TrainConfig {
        TrainConfig {
            learning_rate: self.learning_rate,
            momentum: if self.no_momentum { None } else { Some(self.momentum) },
            linear_output: self.linear_output,
            error_threshold: self.error_threshold,
            max_iterations: self.max_iterations,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    info!("Starting neural network trainer.");
    info!("Using dataset: {}", args.training_set.display());
    info!("Building a network with {} hidden nodes.", args.hidden);
    info!("Saving the brain to file: {}", args.brain_file.display());

    let set = TrainingSet::load(&args.training_set, args.inputs, args.outputs)?;
    info!("Read {} training examples", set.len());

    let topology = Topology::new(args.inputs, args.hidden, args.outputs);
    let mut network = open_network(&args.brain_file, topology, args.seed)?;

    let config = args.train_config();
    let summary = train_set(&mut network, &set, &config)?;
    info!(
        "Trained on {} examples: {} converged, {} iterations in total",
        summary.examples.len(),
        summary.converged_count(),
        summary.total_iterations()
    );

    network
        .save(&args.brain_file)
        .with_context(|| format!("failed to write {}", args.brain_file.display()))?;

    if let Some(path) = &args.stats_json {
        let file = std::fs::File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), &summary)
            .context("failed to write training statistics")?;
    }
    Ok(())
}

/// Loads the existing network at `path`, or initialises a fresh one when
/// there is no file yet.
fn open_network(path: &Path, topology: Topology, seed: Option<u64>) -> anyhow::Result<Network> {
    if path.exists() {
        info!("Modifying an existing neural net.");
        let network = Network::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?;
        let stored = network.topology();
        if stored.input != topology.input || stored.output != topology.output {
            bail!(NetError::Configuration(format!(
                "{} is a {} network but the data set has {} inputs and {} outputs",
                path.display(),
                stored,
                topology.input,
                topology.output
            )));
        }
        return Ok(network);
    }

    info!("Starting a new neural net.");
    let network = match seed {
        Some(seed) => Network::with_rng(topology, &mut StdRng::seed_from_u64(seed))?,
        None => Network::new(topology)?,
    };
    Ok(network)
}
