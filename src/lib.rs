pub mod error;
pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod data;
pub mod train;

// Convenience re-exports
pub use error::{NetError, Result};
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use layers::dense::{Layer, Links};
pub use network::{LayerKind, Network, Topology};
pub use loss::mse::MseLoss;
pub use optim::sgd::Sgd;
pub use data::training_set::{Example, TrainingSet};
pub use train::{train_example, train_set, ExampleStats, TrainConfig, TrainSummary};
