/// Batch-level failures. Anything raised here aborts the run before an
/// output file is created.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("No document in the request produced a usable section")]
    NoSections,

    #[error("Embedder returned {got} vectors for {expected} texts")]
    EmbeddingCount { expected: usize, got: usize },

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Cannot load classifier model {path}: {reason}")]
    Classifier { path: String, reason: String },

    #[error("Config file {0} does not exist")]
    MissingConfig(String),
}
