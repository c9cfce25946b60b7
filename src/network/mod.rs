pub mod brain_file;
pub mod network;
pub mod topology;

pub use network::{LayerKind, Network};
pub use topology::Topology;
