use thiserror::Error;

/// Errors returned by Kaldi I/O.
#[derive(Debug, Error)]
pub enum KaldiError {
    #[error("kaldi: io: {0}")]
    Io(#[from] std::io::Error),

    #[error("kaldi: invalid key {0:?}: must be non-empty without whitespace")]
    InvalidKey(String),

    #[error("kaldi: unsupported object {0:?}")]
    UnsupportedObject(String),

    #[error("kaldi: malformed archive: {0}")]
    Malformed(String),

    #[error("kaldi: malformed script line {line}: {text:?}")]
    MalformedScript { line: usize, text: String },
}
