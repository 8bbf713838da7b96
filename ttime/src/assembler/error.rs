//! Assembly error types.

use crate::feed::FeedError;

/// Exit status for a worker task that failed.
const WORKER_FAILED: u8 = 70;

/// Errors that abort schedule assembly.
#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    /// A feed table was missing or unreadable
    #[error(transparent)]
    Feed(#[from] FeedError),

    /// A blocking read or stop-time worker task failed
    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl AssembleError {
    /// Process exit status reported for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            AssembleError::Feed(e) => e.kind().exit_code(),
            AssembleError::Worker(_) => WORKER_FAILED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_errors_keep_their_status() {
        let err: AssembleError = FeedError::MissingRequiredFile {
            file: "trips.txt".into(),
        }
        .into();

        assert_eq!(err.exit_code(), 65);
        assert!(err.to_string().contains("trips.txt"));

        let err: AssembleError = FeedError::unreadable("stops.txt", "bad header").into();
        assert_eq!(err.exit_code(), 66);
    }
}
