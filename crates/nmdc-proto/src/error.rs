//! Protocol error types.

use thiserror::Error;

/// Errors produced while framing or decomposing NMDC messages.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// A frame exceeded the codec's configured maximum length.
    #[error("frame too long: {actual} bytes (limit {limit})")]
    FrameTooLong {
        /// Observed length of the (partial) frame.
        actual: usize,
        /// Configured limit.
        limit: usize,
    },

    /// A verb exceeded [`crate::message::MAX_VERB_LEN`] bytes.
    #[error("verb too long in frame starting {0:?}")]
    VerbTooLong(String),

    /// The verb is not one the protocol knows.
    #[error("unknown verb: {0}")]
    UnknownVerb(String),

    /// The frame did not match the verb's argument schema.
    #[error("malformed ${verb} frame: {reason}")]
    MalformedFrame {
        /// Verb whose schema was violated (empty for chat frames).
        verb: String,
        /// What was wrong.
        reason: &'static str,
    },

    /// Underlying transport error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtoError {
    pub(crate) fn malformed(verb: &str, reason: &'static str) -> Self {
        Self::MalformedFrame {
            verb: verb.to_string(),
            reason,
        }
    }

    /// Static code string for logging/metrics labels.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::FrameTooLong { .. } => "frame_too_long",
            Self::VerbTooLong(_) => "verb_too_long",
            Self::UnknownVerb(_) => "unknown_verb",
            Self::MalformedFrame { .. } => "malformed_frame",
            Self::Io(_) => "io",
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ProtoError>;
