use thiserror::Error;

/// Errors surfaced by the engine's constructors and codecs.
///
/// Gameplay never produces these: out-of-range moves are no-ops and
/// assist contradictions are reported as [`crate::Conflict`] data.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid board dimensions {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },

    #[error("grid of {rows}x{cols} cannot hold {len} values")]
    MalformedGrid { rows: usize, cols: usize, len: usize },

    #[error("malformed session: {0}")]
    MalformedSession(String),

    #[error("protocol message could not be decoded")]
    Protocol(#[from] serde_json::Error),
}
