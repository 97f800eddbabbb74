use faceoff_core::StoreError;

/// Errors raised by the ranking engine.
///
/// All of these are fatal to the operation that raised them; the engine
/// never retries. The driver decides presentation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Too few records to run a session or satisfy a pick request.
    #[error("need at least {needed} records, found {found}")]
    InsufficientPopulation { needed: usize, found: usize },

    /// An exact-mode judgment on a pair that is not mutually undetermined:
    /// either the same pair was judged twice, or the human judgments are
    /// intransitive and a contradicting relation was inferred first.
    #[error("pair ({winner}, {loser}) is not mutually undetermined")]
    PreconditionViolation { winner: String, loser: String },

    /// A judgment referenced an id the engine does not know.
    #[error("unknown record id: {0}")]
    UnknownId(String),

    /// Store or persistence failure during a session operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}
