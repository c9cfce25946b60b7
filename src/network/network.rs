use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::debug;
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::error::{NetError, Result};
use crate::layers::dense::Layer;
use crate::loss::mse::MseLoss;
use crate::network::topology::Topology;
use crate::optim::sgd::Sgd;

const INPUT: usize = 0;
const HIDDEN: usize = 1;
const OUTPUT: usize = 2;

/// Selects one of the three fixed layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Input,
    Hidden,
    Output,
}

impl LayerKind {
    fn position(self) -> usize {
        match self {
            LayerKind::Input => INPUT,
            LayerKind::Hidden => HIDDEN,
            LayerKind::Output => OUTPUT,
        }
    }
}

/// Input, hidden and output layer in a fixed chain.
///
/// Layer `k`'s child is layer `k + 1`; neighbours are resolved by position
/// in the array rather than by stored references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    layers: [Layer; 3],
}

impl Network {
    /// Builds a network with weights drawn from the thread-local RNG.
    pub fn new(topology: Topology) -> Result<Network> {
        Network::with_rng(topology, &mut rand::thread_rng())
    }

    /// Builds a network with weights drawn from `rng`; a seeded RNG gives a
    /// reproducible starting point.
    pub fn with_rng<R: Rng + ?Sized>(topology: Topology, rng: &mut R) -> Result<Network> {
        let mut network = Network::zeroed(topology)?;
        network.layers[INPUT].randomize_weights(rng);
        network.layers[HIDDEN].randomize_weights(rng);
        debug!("initialized {} network with random weights", topology);
        Ok(network)
    }

    /// Allocates all three layers with zero weights.
    pub(crate) fn zeroed(topology: Topology) -> Result<Network> {
        topology.validate()?;
        Ok(Network {
            layers: [
                Layer::new(topology.input, 0, topology.hidden),
                Layer::new(topology.hidden, topology.input, topology.output),
                Layer::new(topology.output, topology.hidden, 0),
            ],
        })
    }

    pub fn topology(&self) -> Topology {
        Topology::new(
            self.layers[INPUT].node_count,
            self.layers[HIDDEN].node_count,
            self.layers[OUTPUT].node_count,
        )
    }

    pub fn layer(&self, kind: LayerKind) -> &Layer {
        &self.layers[kind.position()]
    }

    pub(crate) fn layer_mut(&mut self, kind: LayerKind) -> &mut Layer {
        &mut self.layers[kind.position()]
    }

    pub fn set_input(&mut self, i: usize, value: f64) -> Result<()> {
        let slot = checked_mut(&mut self.layers[INPUT].activations, i, "input")?;
        *slot = value;
        Ok(())
    }

    pub fn set_inputs(&mut self, values: &[f64]) -> Result<()> {
        copy_exact(&mut self.layers[INPUT].activations, values, "inputs")
    }

    pub fn set_desired_output(&mut self, i: usize, value: f64) -> Result<()> {
        let slot = checked_mut(&mut self.layers[OUTPUT].targets, i, "desired output")?;
        *slot = value;
        Ok(())
    }

    pub fn set_desired_outputs(&mut self, values: &[f64]) -> Result<()> {
        copy_exact(&mut self.layers[OUTPUT].targets, values, "desired outputs")
    }

    pub fn output(&self, i: usize) -> Result<f64> {
        let outputs = &self.layers[OUTPUT].activations;
        outputs.get(i).copied().ok_or(NetError::OutOfRange {
            what: "output",
            index: i,
            len: outputs.len(),
        })
    }

    pub fn outputs(&self) -> &[f64] {
        &self.layers[OUTPUT].activations
    }

    /// Propagates the current inputs through hidden and output layers.
    /// Each layer reads its parent's freshly computed activations, so the
    /// order is fixed.
    pub fn feed_forward(&mut self) -> Result<()> {
        let [input, hidden, output] = &mut self.layers;
        input.calculate_neuron_values(None)?;
        hidden.calculate_neuron_values(Some(&*input))?;
        output.calculate_neuron_values(Some(&*hidden))?;
        Ok(())
    }

    /// One online training step against the current desired outputs.
    ///
    /// Errors run output then hidden (hidden reads the output errors);
    /// weights are adjusted hidden then input.
    pub fn back_propagate(&mut self) -> Result<()> {
        let [input, hidden, output] = &mut self.layers;
        output.calculate_errors(None)?;
        hidden.calculate_errors(Some(&*output))?;

        hidden.adjust_weights(output)?;
        input.adjust_weights(hidden)?;
        Ok(())
    }

    /// Mean squared error between output activations and desired outputs.
    pub fn calculate_error(&self) -> f64 {
        let output = &self.layers[OUTPUT];
        MseLoss::loss(&output.activations, &output.targets)
    }

    /// Index of the strongest output neuron; ties go to the lowest index.
    pub fn max_output_id(&self) -> usize {
        let outputs = self.outputs();
        let mut id = 0;
        for i in 1..outputs.len() {
            if outputs[i] > outputs[id] {
                id = i;
            }
        }
        id
    }

    /// Sets inputs, feeds forward and returns a copy of the outputs.
    pub fn run(&mut self, inputs: &[f64]) -> Result<Vec<f64>> {
        self.set_inputs(inputs)?;
        self.feed_forward()?;
        Ok(self.outputs().to_vec())
    }

    pub fn set_learning_rate(&mut self, rate: f64) {
        for layer in self.layers.iter_mut() {
            layer.optimizer.learning_rate = rate;
        }
    }

    /// Only the output layer acts on this flag; it is still stored on
    /// every layer so all three carry the same settings.
    pub fn set_linear_output(&mut self, use_linear: bool) {
        for layer in self.layers.iter_mut() {
            layer.linear_output = use_linear;
        }
    }

    pub fn set_momentum(&mut self, use_momentum: bool, factor: f64) {
        for layer in self.layers.iter_mut() {
            layer.optimizer.use_momentum = use_momentum;
            layer.optimizer.momentum_factor = factor;
        }
    }

    /// The shared optimizer settings.
    pub fn optimizer(&self) -> Sgd {
        self.layers[OUTPUT].optimizer
    }

    pub fn linear_output(&self) -> bool {
        self.layers[OUTPUT].linear_output
    }

    /// Serializes the full network state, including training settings and
    /// momentum history, to a pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a network from a JSON file previously written by `save_json`.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Network> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let network: Network = serde_json::from_reader(reader)?;
        network.check_wiring()?;
        Ok(network)
    }

    /// Confirms neighbouring layers agree on their shared neuron counts.
    fn check_wiring(&self) -> Result<()> {
        self.topology().validate()?;
        let [input, hidden, output] = &self.layers;
        let wired = input.parent_node_count == 0
            && input.child_node_count == hidden.node_count
            && hidden.parent_node_count == input.node_count
            && hidden.child_node_count == output.node_count
            && output.parent_node_count == hidden.node_count
            && output.child_node_count == 0;
        if !wired {
            return Err(NetError::InvalidTopology("layer neuron counts do not line up".into()));
        }
        for layer in &self.layers {
            let sized = layer.activations.len() == layer.node_count
                && layer.targets.len() == layer.node_count
                && layer.errors.len() == layer.node_count;
            let linked = match &layer.links {
                Some(links) => {
                    let n = layer.child_node_count;
                    (links.weights.rows, links.weights.cols) == (layer.node_count, n)
                        && links.weights.as_slice().len() == layer.node_count * n
                        && links.weight_deltas.as_slice().len() == layer.node_count * n
                        && links.bias_values.len() == n
                        && links.bias_weights.len() == n
                        && links.bias_deltas.len() == n
                }
                None => layer.child_node_count == 0,
            };
            if !sized || !linked {
                return Err(NetError::InvalidTopology("layer buffers do not match neuron counts".into()));
            }
        }
        Ok(())
    }
}

fn checked_mut<'a>(values: &'a mut [f64], i: usize, what: &'static str) -> Result<&'a mut f64> {
    let len = values.len();
    values.get_mut(i).ok_or(NetError::OutOfRange { what, index: i, len })
}

fn copy_exact(dst: &mut [f64], src: &[f64], what: &'static str) -> Result<()> {
    if dst.len() != src.len() {
        return Err(NetError::DimensionMismatch {
            what,
            expected: dst.len(),
            actual: src.len(),
        });
    }
    dst.copy_from_slice(src);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn seeded(topology: Topology, seed: u64) -> Network {
        Network::with_rng(topology, &mut StdRng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn wiring_matches_topology() {
        let net = seeded(Topology::new(4, 3, 2), 1);
        let input = net.layer(LayerKind::Input);
        let hidden = net.layer(LayerKind::Hidden);
        let output = net.layer(LayerKind::Output);
        assert_eq!(input.child_node_count, hidden.node_count);
        assert_eq!(hidden.child_node_count, output.node_count);
        assert_eq!(hidden.parent_node_count, input.node_count);
        assert_eq!(output.parent_node_count, hidden.node_count);
        assert!(input.is_input() && output.is_output());
        assert!(output.links.is_none());
        assert_eq!(net.topology(), Topology::new(4, 3, 2));
    }

    #[test]
    fn zero_sized_layer_is_rejected() {
        assert!(matches!(
            Network::new(Topology::new(4, 0, 1)),
            Err(NetError::InvalidTopology(_))
        ));
    }

    #[test]
    fn input_and_hidden_weights_are_randomized() {
        let net = seeded(Topology::new(3, 3, 1), 2);
        for kind in [LayerKind::Input, LayerKind::Hidden] {
            let links = net.layer(kind).links.as_ref().unwrap();
            assert!(links.weights.as_slice().iter().any(|&w| w != 0.0));
            assert!(links.weights.as_slice().iter().all(|w| (-1.0..=1.0).contains(w)));
        }
    }

    #[test]
    fn setters_reject_out_of_range_indices() {
        let mut net = seeded(Topology::new(2, 2, 1), 3);
        assert!(net.set_input(1, 0.5).is_ok());
        assert!(matches!(
            net.set_input(2, 0.5),
            Err(NetError::OutOfRange { what: "input", index: 2, len: 2 })
        ));
        assert!(net.set_desired_output(1, 1.0).is_err());
        assert!(net.output(1).is_err());
        assert!(net.output(0).is_ok());
    }

    #[test]
    fn bulk_setters_check_length() {
        let mut net = seeded(Topology::new(2, 2, 1), 3);
        assert!(matches!(
            net.set_inputs(&[1.0]),
            Err(NetError::DimensionMismatch { expected: 2, actual: 1, .. })
        ));
        net.set_desired_outputs(&[0.5]).unwrap();
        assert_eq!(net.layer(LayerKind::Output).targets, vec![0.5]);
    }

    #[test]
    fn feed_forward_is_deterministic() {
        let mut net = seeded(Topology::new(4, 5, 3), 4);
        let first = net.run(&[0.1, 0.9, -0.3, 0.5]).unwrap();
        net.feed_forward().unwrap();
        assert_eq!(first, net.outputs());
    }

    #[test]
    fn error_is_zero_only_on_exact_targets() {
        let mut net = seeded(Topology::new(2, 2, 2), 5);
        let outputs = net.run(&[0.3, 0.6]).unwrap();
        net.set_desired_outputs(&outputs).unwrap();
        assert_eq!(net.calculate_error(), 0.0);
        net.set_desired_output(1, outputs[1] + 0.01).unwrap();
        assert!(net.calculate_error() > 0.0);
    }

    #[test]
    fn max_output_prefers_lowest_index_on_ties() {
        let mut net = seeded(Topology::new(1, 1, 4), 6);
        net.layer_mut(LayerKind::Output).activations = vec![0.2, 0.8, 0.8, 0.1];
        assert_eq!(net.max_output_id(), 1);
        net.layer_mut(LayerKind::Output).activations = vec![0.5, 0.5, 0.5, 0.5];
        assert_eq!(net.max_output_id(), 0);
        net.layer_mut(LayerKind::Output).activations = vec![0.1, 0.2, 0.3, 0.9];
        assert_eq!(net.max_output_id(), 3);
    }

    #[test]
    fn hyperparameters_reach_every_layer() {
        let mut net = seeded(Topology::new(2, 2, 1), 7);
        net.set_learning_rate(0.2);
        net.set_momentum(true, 0.8);
        net.set_linear_output(true);
        for kind in [LayerKind::Input, LayerKind::Hidden, LayerKind::Output] {
            let layer = net.layer(kind);
            assert_eq!(layer.optimizer, Sgd { learning_rate: 0.2, use_momentum: true, momentum_factor: 0.8 });
            assert!(layer.linear_output);
        }
        assert!(net.linear_output());
    }

    #[test]
    fn back_propagate_reduces_error_on_the_same_example() {
        let mut improved = 0;
        for seed in 0..50 {
            let mut net = seeded(Topology::new(3, 4, 2), seed);
            net.set_learning_rate(0.1);
            net.set_inputs(&[0.2, 0.7, 0.4]).unwrap();
            net.set_desired_outputs(&[0.9, 0.1]).unwrap();
            net.feed_forward().unwrap();
            let before = net.calculate_error();
            net.back_propagate().unwrap();
            net.feed_forward().unwrap();
            if net.calculate_error() < before {
                improved += 1;
            }
        }
        assert!(improved >= 45, "only {} of 50 steps reduced the error", improved);
    }

    #[test]
    fn unset_learning_rate_leaves_weights_alone() {
        let mut net = seeded(Topology::new(2, 2, 1), 8);
        let before = net.layer(LayerKind::Input).links.clone();
        net.run(&[1.0, 0.0]).unwrap();
        net.set_desired_outputs(&[1.0]).unwrap();
        net.back_propagate().unwrap();
        assert_eq!(net.layer(LayerKind::Input).links, before);
    }

    #[test]
    fn json_round_trip_keeps_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.json");
        let mut net = seeded(Topology::new(3, 2, 1), 9);
        net.set_learning_rate(0.3);
        net.set_momentum(true, 0.7);
        net.save_json(&path).unwrap();

        let loaded = Network::load_json(&path).unwrap();
        assert_eq!(loaded.topology(), net.topology());
        assert_eq!(loaded.optimizer(), net.optimizer());
        let original = net.layer(LayerKind::Hidden).links.as_ref().unwrap();
        let restored = loaded.layer(LayerKind::Hidden).links.as_ref().unwrap();
        for (a, b) in original.weights.as_slice().iter().zip(restored.weights.as_slice()) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
