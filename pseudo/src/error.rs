use thiserror::Error;

/// Errors returned by pseudo-speaker operations.
#[derive(Debug, Error)]
pub enum PseudoError {
    #[error("pseudo: empty embedding pool")]
    EmptyPool,

    #[error("pseudo: need at least {need} samples, got {got}")]
    InsufficientSamples { need: usize, got: usize },

    #[error("pseudo: dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error(
        "pseudo: invalid reduction target {0}: want a proportion in (0, 1) or a whole number >= 1"
    )]
    InvalidReduction(f64),

    #[error("pseudo: cannot keep {requested} components, at most {max} available")]
    TooManyComponents { requested: usize, max: usize },

    #[error("pseudo: pool has zero variance")]
    ZeroVariance,

    #[error("pseudo: mixture needs at least one component")]
    NoComponents,

    #[error("pseudo: mixture did not converge after {retries} retries")]
    NotConverged { retries: usize },

    #[error("pseudo: invalid gender label {0:?}: want \"m\" or \"f\"")]
    InvalidGender(String),

    #[error("pseudo: unsupported granularity {0:?}: want \"spk\" or \"utt\"")]
    UnsupportedGranularity(String),

    #[error("pseudo: model bundle is {found} but combine_genders={combine_genders}")]
    ModelShapeMismatch {
        found: &'static str,
        combine_genders: bool,
    },

    #[error("pseudo: no source embedding for speaker {0}")]
    MissingEmbedding(String),

    #[error("pseudo: no utterance list for speaker {0}")]
    MissingUtterances(String),

    #[error("pseudo: invalid model format: {0}")]
    InvalidFormat(String),

    #[error("pseudo: serialization error: {0}")]
    Serialization(String),

    #[error("pseudo: io: {0}")]
    Io(#[from] std::io::Error),
}
