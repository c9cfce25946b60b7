use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NetError>;

#[derive(Error, Debug)]
pub enum NetError {
    /// An index handed to an accessor lies outside the layer's neuron count.
    #[error("{what} index {index} out of range (layer has {len} neurons)")]
    OutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// A slice passed to a bulk setter has the wrong length.
    #[error("{what}: expected {expected} values, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Zero-sized layer, or a layer operation invoked on a neighbour
    /// without the connections it needs.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// A persisted network failed one of its self-checks.
    #[error("corrupt network file at line {line} ({section}): {detail}")]
    CorruptFile {
        line: usize,
        section: &'static str,
        detail: String,
    },

    #[error("training data error at line {line}: {detail}")]
    TrainingData { line: usize, detail: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
