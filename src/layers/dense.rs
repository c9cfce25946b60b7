use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{NetError, Result};
use crate::math::matrix::Matrix;
use crate::optim::sgd::Sgd;

/// Value fed through every bias connection.
pub const BIAS_VALUE: f64 = -1.0;

/// Outgoing connections from a layer to its child layer.
///
/// Only layers that have a child own a `Links` block; its absence is what
/// marks the output layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Links {
    /// `node_count x child_node_count`, row `i` holds neuron `i`'s fan-out.
    pub weights: Matrix,
    /// Last plain update applied to each weight, consumed by momentum.
    pub weight_deltas: Matrix,
    pub bias_values: Vec<f64>,
    pub bias_weights: Vec<f64>,
    pub bias_deltas: Vec<f64>,
}

impl Links {
    fn zeros(node_count: usize, child_node_count: usize) -> Links {
        Links {
            weights: Matrix::zeros(node_count, child_node_count),
            weight_deltas: Matrix::zeros(node_count, child_node_count),
            bias_values: vec![BIAS_VALUE; child_node_count],
            bias_weights: vec![0.0; child_node_count],
            bias_deltas: vec![0.0; child_node_count],
        }
    }
}

/// One level of the network: per-neuron state plus, unless this is the
/// output layer, the weights leading into the child layer.
///
/// A layer never owns its neighbours. Operations that need the parent or
/// child take it as an argument, and the owning `Network` decides which
/// layer that is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub node_count: usize,
    /// Zero iff this is the input layer.
    pub parent_node_count: usize,
    /// Zero iff this is the output layer.
    pub child_node_count: usize,
    pub activations: Vec<f64>,
    /// Desired outputs; only read on the output layer.
    pub targets: Vec<f64>,
    pub errors: Vec<f64>,
    pub links: Option<Links>,
    pub optimizer: Sgd,
    /// Makes the output layer pass its weighted sum through unchanged.
    pub linear_output: bool,
}

impl Layer {
    /// Allocates a zero-filled layer. Connections to the child are created
    /// only when `child_node_count > 0`, with bias values at `-1` and all
    /// weights at zero until `randomize_weights` is called.
    pub fn new(node_count: usize, parent_node_count: usize, child_node_count: usize) -> Layer {
        let links = if child_node_count > 0 {
            Some(Links::zeros(node_count, child_node_count))
        } else {
            None
        };

        Layer {
            node_count,
            parent_node_count,
            child_node_count,
            activations: vec![0.0; node_count],
            targets: vec![0.0; node_count],
            errors: vec![0.0; node_count],
            links,
            optimizer: Sgd::default(),
            linear_output: false,
        }
    }

    pub fn is_input(&self) -> bool {
        self.parent_node_count == 0
    }

    pub fn is_output(&self) -> bool {
        self.child_node_count == 0
    }

    /// Fills every weight and bias weight with a uniform sample from
    /// `[-1, 1]`. No effect on a layer without a child.
    pub fn randomize_weights<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if let Some(links) = self.links.as_mut() {
            links.weights.randomize(rng);
            for w in links.bias_weights.iter_mut() {
                *w = rng.gen_range(-1.0..=1.0);
            }
        }
    }

    /// The transfer function this layer applies on the forward pass.
    pub fn activation_function(&self) -> ActivationFunction {
        if self.is_output() && self.linear_output {
            ActivationFunction::Identity
        } else {
            ActivationFunction::Sigmoid
        }
    }

    /// Recomputes activations from the parent's activations and weights.
    /// The input layer is left alone; its activations are set externally.
    pub fn calculate_neuron_values(&mut self, parent: Option<&Layer>) -> Result<()> {
        if self.is_input() {
            return Ok(());
        }
        let parent = parent.ok_or_else(|| {
            NetError::InvalidTopology("non-input layer evaluated without a parent".into())
        })?;
        let links = self.incoming_links(parent)?;
        let activation = self.activation_function();

        for j in 0..self.node_count {
            let mut x = 0.0;
            for i in 0..self.parent_node_count {
                x += parent.activations[i] * links.weights[(i, j)];
            }
            x += links.bias_values[j] * links.bias_weights[j];
            self.activations[j] = activation.function(x);
        }
        Ok(())
    }

    /// Recomputes the per-neuron error signal.
    ///
    /// Output: derivative-weighted residual against `targets`.
    /// Input: all zero.
    /// Hidden: child errors pulled back through the outgoing weights,
    /// scaled by the local sigmoid derivative.
    pub fn calculate_errors(&mut self, child: Option<&Layer>) -> Result<()> {
        let sigmoid = ActivationFunction::Sigmoid;

        if self.is_output() {
            for i in 0..self.node_count {
                let y = self.activations[i];
                self.errors[i] = (self.targets[i] - y) * sigmoid.derivative_from_output(y);
            }
            return Ok(());
        }

        if self.is_input() {
            self.errors.iter_mut().for_each(|e| *e = 0.0);
            return Ok(());
        }

        let child = child.ok_or_else(|| {
            NetError::InvalidTopology("hidden layer errors need the child layer".into())
        })?;
        self.check_child(child)?;
        let Layer { links, activations, errors, .. } = self;
        let links = links.as_ref().ok_or_else(|| {
            NetError::InvalidTopology("hidden layer has no outgoing weights".into())
        })?;

        for (i, error) in errors.iter_mut().enumerate() {
            let sum: f64 = links.weights.row(i).iter()
                .zip(child.errors.iter())
                .map(|(w, e)| w * e)
                .sum();
            *error = sum * sigmoid.derivative_from_output(activations[i]);
        }
        Ok(())
    }

    /// Moves every outgoing weight and bias weight along the child's error
    /// signal. A layer without a child has nothing to adjust.
    pub fn adjust_weights(&mut self, child: &Layer) -> Result<()> {
        if self.links.is_none() {
            return Ok(());
        }
        self.check_child(child)?;

        let Layer { links, activations, optimizer, .. } = self;
        if let Some(links) = links.as_mut() {
            for (i, &a) in activations.iter().enumerate() {
                for (j, &e) in child.errors.iter().enumerate() {
                    optimizer.step(&mut links.weights[(i, j)], &mut links.weight_deltas[(i, j)], e * a);
                }
            }

            for (j, &e) in child.errors.iter().enumerate() {
                let gradient = e * links.bias_values[j];
                optimizer.step(&mut links.bias_weights[j], &mut links.bias_deltas[j], gradient);
            }
        }
        Ok(())
    }

    fn incoming_links<'p>(&self, parent: &'p Layer) -> Result<&'p Links> {
        if parent.node_count != self.parent_node_count || parent.child_node_count != self.node_count {
            return Err(NetError::InvalidTopology(format!(
                "parent layer is {}->{} but this layer expects {}->{}",
                parent.node_count, parent.child_node_count, self.parent_node_count, self.node_count
            )));
        }
        parent.links.as_ref().ok_or_else(|| {
            NetError::InvalidTopology("parent layer has no outgoing weights".into())
        })
    }

    fn check_child(&self, child: &Layer) -> Result<()> {
        if child.node_count != self.child_node_count {
            return Err(NetError::InvalidTopology(format!(
                "child layer has {} neurons, expected {}",
                child.node_count, self.child_node_count
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sigmoid(x: f64) -> f64 {
        1.0 / (1.0 + (-x).exp())
    }

    /// 2 -> 2 -> 1 chain with hand-picked weights.
    fn chain() -> (Layer, Layer, Layer) {
        let mut input = Layer::new(2, 0, 2);
        let mut hidden = Layer::new(2, 2, 1);
        let output = Layer::new(1, 2, 0);

        let links = input.links.as_mut().unwrap();
        links.weights[(0, 0)] = 0.5;
        links.weights[(0, 1)] = -0.5;
        links.weights[(1, 0)] = 0.25;
        links.weights[(1, 1)] = 1.0;
        links.bias_weights = vec![0.1, -0.2];

        let links = hidden.links.as_mut().unwrap();
        links.weights[(0, 0)] = 1.0;
        links.weights[(1, 0)] = -1.0;
        links.bias_weights = vec![0.3];

        input.activations = vec![1.0, 2.0];
        (input, hidden, output)
    }

    #[test]
    fn new_layer_is_zeroed_with_negative_bias() {
        let layer = Layer::new(3, 0, 2);
        assert!(layer.activations.iter().chain(&layer.targets).chain(&layer.errors).all(|&x| x == 0.0));
        let links = layer.links.as_ref().unwrap();
        assert_eq!((links.weights.rows, links.weights.cols), (3, 2));
        assert_eq!(links.bias_values, vec![-1.0, -1.0]);
        assert_eq!(links.bias_weights, vec![0.0, 0.0]);
    }

    #[test]
    fn output_layer_has_no_links() {
        let layer = Layer::new(2, 3, 0);
        assert!(layer.links.is_none());
        assert!(layer.is_output());
        assert!(!layer.is_input());
    }

    #[test]
    fn randomize_is_a_noop_without_child() {
        let mut layer = Layer::new(2, 3, 0);
        layer.randomize_weights(&mut rand::thread_rng());
        assert!(layer.links.is_none());
    }

    #[test]
    fn forward_values_follow_weighted_sum() {
        let (input, mut hidden, mut output) = chain();
        hidden.calculate_neuron_values(Some(&input)).unwrap();

        // bias contributes -1 * bias_weight
        let h0 = sigmoid(1.0 * 0.5 + 2.0 * 0.25 - 0.1);
        let h1 = sigmoid(1.0 * -0.5 + 2.0 * 1.0 + 0.2);
        assert_abs_diff_eq!(hidden.activations[0], h0, epsilon = 1e-12);
        assert_abs_diff_eq!(hidden.activations[1], h1, epsilon = 1e-12);

        output.calculate_neuron_values(Some(&hidden)).unwrap();
        assert_abs_diff_eq!(output.activations[0], sigmoid(h0 - h1 - 0.3), epsilon = 1e-12);
    }

    #[test]
    fn linear_output_skips_sigmoid() {
        let (input, mut hidden, mut output) = chain();
        output.linear_output = true;
        hidden.calculate_neuron_values(Some(&input)).unwrap();
        output.calculate_neuron_values(Some(&hidden)).unwrap();
        let expected = hidden.activations[0] - hidden.activations[1] - 0.3;
        assert_abs_diff_eq!(output.activations[0], expected, epsilon = 1e-12);
    }

    #[test]
    fn linear_flag_is_ignored_off_the_output_layer() {
        let (input, mut hidden, _) = chain();
        hidden.linear_output = true;
        hidden.calculate_neuron_values(Some(&input)).unwrap();
        assert!(hidden.activations.iter().all(|&a| a > 0.0 && a < 1.0));
    }

    #[test]
    fn input_layer_values_are_left_alone() {
        let (mut input, _, _) = chain();
        input.calculate_neuron_values(None).unwrap();
        assert_eq!(input.activations, vec![1.0, 2.0]);
    }

    #[test]
    fn missing_parent_is_a_topology_error() {
        let (_, mut hidden, _) = chain();
        assert!(matches!(
            hidden.calculate_neuron_values(None),
            Err(NetError::InvalidTopology(_))
        ));
    }

    #[test]
    fn mismatched_parent_is_a_topology_error() {
        let (_, mut hidden, _) = chain();
        let wrong = Layer::new(3, 0, 2);
        assert!(hidden.calculate_neuron_values(Some(&wrong)).is_err());
    }

    #[test]
    fn errors_per_topology() {
        let (mut input, mut hidden, mut output) = chain();
        hidden.calculate_neuron_values(Some(&input)).unwrap();
        output.calculate_neuron_values(Some(&hidden)).unwrap();
        output.targets = vec![1.0];

        output.calculate_errors(None).unwrap();
        let y = output.activations[0];
        let out_err = (1.0 - y) * y * (1.0 - y);
        assert_abs_diff_eq!(output.errors[0], out_err, epsilon = 1e-12);

        hidden.calculate_errors(Some(&output)).unwrap();
        let h = &hidden.activations;
        assert_abs_diff_eq!(hidden.errors[0], out_err * 1.0 * h[0] * (1.0 - h[0]), epsilon = 1e-12);
        assert_abs_diff_eq!(hidden.errors[1], out_err * -1.0 * h[1] * (1.0 - h[1]), epsilon = 1e-12);

        input.errors = vec![9.0, 9.0];
        input.calculate_errors(Some(&hidden)).unwrap();
        assert_eq!(input.errors, vec![0.0, 0.0]);
    }

    #[test]
    fn adjust_weights_applies_rate_and_momentum() {
        let (mut input, mut hidden, _) = chain();
        hidden.errors = vec![0.5, -0.25];
        input.optimizer = Sgd::new(0.1).with_momentum(0.5);

        input.adjust_weights(&hidden).unwrap();
        let links = input.links.as_ref().unwrap();
        // w[1][0] = 0.25 + 0.1 * 0.5 * 2.0
        assert_abs_diff_eq!(links.weights[(1, 0)], 0.35, epsilon = 1e-12);
        assert_abs_diff_eq!(links.weight_deltas[(1, 0)], 0.1, epsilon = 1e-12);
        // bias: 0.1 + 0.1 * 0.5 * -1
        assert_abs_diff_eq!(links.bias_weights[0], 0.05, epsilon = 1e-12);

        input.adjust_weights(&hidden).unwrap();
        let links = input.links.as_ref().unwrap();
        // second step carries half of the previous delta
        assert_abs_diff_eq!(links.weights[(1, 0)], 0.35 + 0.1 + 0.05, epsilon = 1e-12);
        assert_abs_diff_eq!(links.bias_weights[0], 0.05 - 0.05 - 0.025, epsilon = 1e-12);
    }

    #[test]
    fn adjust_weights_without_child_is_noop() {
        let (_, hidden, mut output) = chain();
        output.optimizer = Sgd::new(1.0);
        output.adjust_weights(&hidden).unwrap();
        assert!(output.links.is_none());
    }
}
