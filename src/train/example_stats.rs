use serde::{Serialize, Deserialize};

/// Outcome of training on a single example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleStats {
    /// 1-based position of the example in the training set.
    pub example: usize,
    /// Training steps spent on this example.
    pub iterations: usize,
    /// Error measured on the last forward pass.
    pub final_error: f64,
    /// Whether `final_error` reached the threshold before the cap.
    pub converged: bool,
}

/// Per-example statistics for a full pass over a training set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrainSummary {
    pub examples: Vec<ExampleStats>,
}

impl TrainSummary {
    pub fn total_iterations(&self) -> usize {
        self.examples.iter().map(|s| s.iterations).sum()
    }

    pub fn converged_count(&self) -> usize {
        self.examples.iter().filter(|s| s.converged).count()
    }
}
