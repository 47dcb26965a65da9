use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReplayError>;

/// Fatal decode failures. Records dropped by the reconstruction
/// heuristics are not errors; install a
/// [`DecodeObserver`](crate::analyzer::observer::DecodeObserver) for
/// visibility into those.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// A read ran past the end of the capture buffer.
    #[error("unexpected end of capture at offset {offset}")]
    Truncation { offset: usize },

    /// A record header failed the layout check for the capture's code
    /// version. The capture does not match the epoch it claims.
    #[error("match feedback failed validity check at offset {offset}")]
    ProtocolMismatch { offset: usize },
}
