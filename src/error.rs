//! Crate-wide error type.

/// Errors produced anywhere in this crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Wraps an I/O failure (reading a config or audio file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wraps a WAV decoding failure.
    #[error("WAV decode error: {0}")]
    Wav(#[from] hound::Error),

    /// Wraps a JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A chain's configuration was malformed or named an unknown
    /// component type. Callers skip the offending chain rather than
    /// propagating this.
    #[error("configuration error: {0}")]
    Config(String),

    /// A Reed-Solomon block failed to decode. Internal to the IL2P
    /// decoder; never escapes a chain.
    #[error("Reed-Solomon decode failed: {0}")]
    Rs(String),
}

/// Convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
