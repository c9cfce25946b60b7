use log::{info, trace, warn};

use crate::data::training_set::{Example, TrainingSet};
use crate::error::Result;
use crate::network::network::Network;
use crate::train::example_stats::{ExampleStats, TrainSummary};
use crate::train::train_config::TrainConfig;

/// Trains `network` on one example until its error is at or below
/// `config.error_threshold` or `config.max_iterations` steps have run.
///
/// Each step is: feed forward, measure the error, back-propagate. The
/// reported error is the one measured before the last weight update.
/// Hyperparameters are taken from the network as it stands; see
/// `TrainConfig::apply`.
pub fn train_example(
    network: &mut Network,
    example: &Example,
    config: &TrainConfig,
) -> Result<ExampleStats> {
    network.set_inputs(&example.inputs)?;
    network.set_desired_outputs(&example.targets)?;

    let mut error = f64::INFINITY;
    let mut iterations = 0;

    while error > config.error_threshold && iterations < config.max_iterations {
        network.feed_forward()?;
        error = network.calculate_error();
        network.back_propagate()?;
        iterations += 1;
        trace!("iteration {}: error = {:.9}", iterations, error);
    }

    if iterations == 0 {
        network.feed_forward()?;
        error = network.calculate_error();
    }

    Ok(ExampleStats {
        example: 0,
        iterations,
        final_error: error,
        converged: error <= config.error_threshold,
    })
}

/// Applies `config` to `network`, then trains on every example in order,
/// one example to convergence (or the cap) before the next.
pub fn train_set(
    network: &mut Network,
    set: &TrainingSet,
    config: &TrainConfig,
) -> Result<TrainSummary> {
    config.apply(network);

    let mut summary = TrainSummary::default();
    for (idx, example) in set.examples.iter().enumerate() {
        let mut stats = train_example(network, example, config)?;
        stats.example = idx + 1;

        if stats.converged {
            info!(
                "example {}: error {:.6} after {} iterations",
                stats.example, stats.final_error, stats.iterations
            );
        } else {
            warn!(
                "example {}: stopped at iteration cap {} with error {:.6}",
                stats.example, stats.iterations, stats.final_error
            );
        }
        summary.examples.push(stats);
    }
    Ok(summary)
}
