use serde::{Serialize, Deserialize};

use crate::network::network::Network;

/// Settings for one training run.
///
/// # Fields
/// - `learning_rate`   — step size shared by every layer
/// - `momentum`        — momentum factor, or `None` to train without momentum
/// - `linear_output`   — pass the output layer's weighted sum through unchanged
/// - `error_threshold` — an example counts as learned once its error is at or
///                       below this value
/// - `max_iterations`  — cap on training steps spent on any one example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub learning_rate: f64,
    pub momentum: Option<f64>,
    pub linear_output: bool,
    pub error_threshold: f64,
    pub max_iterations: usize,
}

impl TrainConfig {
    /// Pushes the training settings into every layer of `network`. Needed
    /// after loading from the text format, which does not store them.
    pub fn apply(&self, network: &mut Network) {
        network.set_learning_rate(self.learning_rate);
        match self.momentum {
            Some(factor) => network.set_momentum(true, factor),
            None => network.set_momentum(false, network.optimizer().momentum_factor),
        }
        network.set_linear_output(self.linear_output);
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            learning_rate: 0.2,
            momentum: Some(0.9),
            linear_output: false,
            error_threshold: 0.05,
            max_iterations: 50_000,
        }
    }
}
