//! Training-set reader.
//!
//! Format: whitespace-separated numbers, grouped into one example every
//! `input_count + target_count` tokens (inputs first, then targets). Line
//! breaks carry no meaning beyond separating tokens.
use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::error::{NetError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub inputs: Vec<f64>,
    pub targets: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrainingSet {
    pub examples: Vec<Example>,
}

impl TrainingSet {
    pub fn parse(text: &str, input_count: usize, target_count: usize) -> Result<TrainingSet> {
        let width = input_count + target_count;
        if input_count == 0 || target_count == 0 {
            return Err(NetError::Configuration(format!(
                "examples need at least one input and one target (got {} and {})",
                input_count, target_count
            )));
        }

        let values = parse_floats(text)?;
        if values.len() % width != 0 {
            let line = values.last().map_or(0, |&(n, _)| n);
            return Err(NetError::TrainingData {
                line,
                detail: format!(
                    "incomplete example: {} trailing values, each example needs {}",
                    values.len() % width,
                    width
                ),
            });
        }

        let examples = values.chunks(width)
            .map(|group| {
                let (inputs, targets) = group.split_at(input_count);
                Example {
                    inputs: inputs.iter().map(|&(_, v)| v).collect(),
                    targets: targets.iter().map(|&(_, v)| v).collect(),
                }
            })
            .collect();
        Ok(TrainingSet { examples })
    }

    /// Reads and parses a training file. A missing or unreadable file is a
    /// configuration problem, not an I/O hiccup to retry.
    pub fn load(path: impl AsRef<Path>, input_count: usize, target_count: usize) -> Result<TrainingSet> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            NetError::Configuration(format!("failed to open {}: {}", path.display(), e))
        })?;
        TrainingSet::parse(&text, input_count, target_count)
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}

/// Parses every token as `f64`, keeping its 1-based line number for errors.
fn parse_floats(text: &str) -> Result<Vec<(usize, f64)>> {
    let mut values = Vec::new();
    for (n, line) in text.lines().enumerate() {
        for tok in line.split_whitespace() {
            let v = tok.parse::<f64>().map_err(|_| NetError::TrainingData {
                line: n + 1,
                detail: format!("'{}' is not a valid number", tok),
            })?;
            values.push((n + 1, v));
        }
    }
    Ok(values)
}
