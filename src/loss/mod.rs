pub mod mse;
