use thiserror::Error;

/// Failure taxonomy for the conversation engine.
///
/// Callers pattern-match on the variant instead of inspecting message
/// strings; the HTTP layer maps each variant to a response code.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Startup-time misconfiguration: missing credential, missing or
    /// incompatible index artifact, embedding dimension mismatch.
    /// Not retriable; the process should fail fast.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Caller-fixable input problem: empty message, temperature out of
    /// range, unknown model name. Session state is unchanged.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Embedding or nearest-neighbor lookup failed at serve time. No
    /// answer is produced and memory is not mutated.
    #[error("retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// The condensation or answer-generation call failed (timeout, rate
    /// limit, malformed response). Memory is not mutated.
    #[error("generation failed: {0}")]
    GenerationFailure(String),

    /// Anything uncategorized. Logged with full context server-side,
    /// surfaced to callers without internal detail.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
