use serde::{Serialize, Deserialize};

use crate::error::{NetError, Result};

/// Neuron counts of the three layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub input: usize,
    pub hidden: usize,
    pub output: usize,
}

impl Topology {
    pub fn new(input: usize, hidden: usize, output: usize) -> Topology {
        Topology { input, hidden, output }
    }

    /// Every layer needs at least one neuron; an empty layer would break
    /// the parent/child wiring.
    pub fn validate(&self) -> Result<()> {
        for (name, count) in [("input", self.input), ("hidden", self.hidden), ("output", self.output)] {
            if count == 0 {
                return Err(NetError::InvalidTopology(format!("{} layer must have at least one neuron", name)));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.input, self.hidden, self.output)
    }
}
