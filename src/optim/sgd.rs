use serde::{Serialize, Deserialize};

/// Gradient-descent settings carried by every layer.
///
/// The update for one connection is
/// `w += lr * gradient + momentum_factor * previous_delta`, after which
/// `previous_delta` becomes `lr * gradient`. The momentum term is only
/// applied while `use_momentum` is set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sgd {
    pub learning_rate: f64,
    pub use_momentum: bool,
    pub momentum_factor: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate, ..Sgd::default() }
    }

    pub fn with_momentum(mut self, factor: f64) -> Sgd {
        self.use_momentum = true;
        self.momentum_factor = factor;
        self
    }

    /// Applies one update to `weight`; `previous_delta` holds the last
    /// plain step and is read before being overwritten.
    pub fn step(&self, weight: &mut f64, previous_delta: &mut f64, gradient: f64) {
        let delta = self.learning_rate * gradient;
        let carried = if self.use_momentum {
            self.momentum_factor * *previous_delta
        } else {
            0.0
        };
        *weight += delta + carried;
        *previous_delta = delta;
    }
}

impl Default for Sgd {
    /// Learning rate 0 (weights stay put until a rate is applied), momentum
    /// off with a factor of 0.9 ready for when it is switched on.
    fn default() -> Self {
        Sgd {
            learning_rate: 0.0,
            use_momentum: false,
            momentum_factor: 0.9,
        }
    }
}
