use snafu::Snafu;

use super::ids::MessageId;

/// Message log contract violations.
///
/// Both variants indicate a bug in the caller's identifier handling, not a
/// user-facing condition; the session controller fails loudly on them.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LogError {
    #[snafu(display("message '{id}' is already present in the log"))]
    DuplicateId { stage: &'static str, id: MessageId },
    #[snafu(display("message '{id}' was not found in the log"))]
    NotFound { stage: &'static str, id: MessageId },
}

pub type LogResult<T> = Result<T, LogError>;
