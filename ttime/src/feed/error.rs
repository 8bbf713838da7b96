//! Feed error types.

/// Errors raised while locating or reading feed tables.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// A required table is not present in the feed
    #[error("file {file} does not exist; this is an invalid feed, because this is a required file")]
    MissingRequiredFile { file: String },

    /// A table is present but could not be opened or parsed
    #[error("there was a problem reading {file}: {source}")]
    UnreadableFile {
        file: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The feed path is neither a zip archive nor a directory
    #[error("could not read feed: {0} is neither a file nor a directory")]
    NotFileNorDirectory(String),
}

/// Coarse classification of fatal feed errors, each with a stable exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedErrorKind {
    /// The feed lacks a table it cannot do without
    MissingRequiredFile,
    /// A table exists but cannot be read
    UnreadableFile,
}

impl FeedErrorKind {
    /// Process exit status reported for this kind of failure.
    pub fn exit_code(self) -> u8 {
        match self {
            FeedErrorKind::MissingRequiredFile => 65,
            FeedErrorKind::UnreadableFile => 66,
        }
    }
}

impl FeedError {
    pub(crate) fn unreadable(
        file: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        FeedError::UnreadableFile {
            file: file.into(),
            source: source.into(),
        }
    }

    /// Classifies the error for exit status reporting.
    pub fn kind(&self) -> FeedErrorKind {
        match self {
            FeedError::MissingRequiredFile { .. } | FeedError::NotFileNorDirectory(_) => {
                FeedErrorKind::MissingRequiredFile
            }
            FeedError::UnreadableFile { .. } => FeedErrorKind::UnreadableFile,
        }
    }
}
