use serde::{Serialize, Deserialize};
use std::f64::consts::E;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationFunction {
    /// Logistic `1 / (1 + e^-x)`, bounded to `(0, 1)`.
    Sigmoid,
    /// Linear pass-through; only ever selected for the output layer.
    Identity,
}

impl ActivationFunction {
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => 1.0 / (1.0 + E.powf(-x)),
            ActivationFunction::Identity => x,
        }
    }

    /// Derivative expressed in terms of the activation `y = f(x)`.
    ///
    /// Backpropagation only keeps post-activation values around, and the
    /// sigmoid derivative has the closed form `y * (1 - y)`.
    pub fn derivative_from_output(&self, y: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => y * (1.0 - y),
            ActivationFunction::Identity => 1.0,
        }
    }
}
