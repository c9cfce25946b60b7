pub mod trainer;
pub mod example_stats;
pub mod train_config;

pub use trainer::{train_example, train_set};
pub use example_stats::{ExampleStats, TrainSummary};
pub use train_config::TrainConfig;
