/// Errors surfaced by a [`TextingParser`](crate::TextingParser) session.
///
/// Malformed input is never an error: the grammar is total and degrades to
/// literal markdown. These variants cover parser defects, bad grammar
/// configuration, API misuse and failures reported by the receiver.
#[derive(Debug, thiserror::Error)]
pub enum TextingError {
    /// The open call already has a frozen first mention and a different one
    /// was reported. This is a state machine bug, not bad input.
    #[error("call mention reported twice: {previous:?} then {next:?}")]
    MentionConflict { previous: String, next: String },

    #[error("invalid grammar: {0}")]
    InvalidGrammar(String),

    #[error("parser session already finalized")]
    SessionFinished,

    /// The downstream receiver failed while handling a notification.
    #[error(transparent)]
    Receiver(#[from] anyhow::Error),
}

pub type Result<T, E = TextingError> = std::result::Result<T, E>;
