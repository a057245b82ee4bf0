//! Error types for the request engine.
//!
//! # Design
//! Every failure the engine reports is a variant of one `Error` enum, so a
//! caller can match on the kind or simply propagate with `?`. Builder
//! validation (`Header`, `Mime`, `Logic`) surfaces from the setter that
//! caused it. Transport failures are retried inside `Request::send` and only
//! the final one reaches the caller as `Request`.

use std::io;
use std::path::PathBuf;

/// Errors returned by `Request` operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Process-wide transport initialization or per-request handle creation
    /// failed.
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// Every permitted transfer attempt failed at the transport layer.
    /// `status` is the last status code the transport observed, 0 if none.
    #[error("transfer failed on attempt {attempt}: {reason}")]
    Request {
        attempt: u32,
        status: u16,
        reason: String,
    },

    /// The download target could not be opened or rewound.
    #[error("failed to open file for writing: {}", path.display())]
    OutputFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A header line could not be appended to the outgoing header chain.
    #[error("header error: {0}")]
    Header(String),

    /// A multipart form part could not be created.
    #[error("mime error: {0}")]
    Mime(String),

    /// The caller violated an engine invariant.
    #[error("logic error: {0}")]
    Logic(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Attempt number carried by a final transfer failure.
    pub fn attempt(&self) -> Option<u32> {
        match self {
            Error::Request { attempt, .. } => Some(*attempt),
            _ => None,
        }
    }

    pub(crate) fn logic(msg: impl Into<String>) -> Self {
        Error::Logic(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_error_mentions_attempt_and_reason() {
        let err = Error::Request {
            attempt: 3,
            status: 0,
            reason: "Couldn't connect to server".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "transfer failed on attempt 3: Couldn't connect to server"
        );
        assert_eq!(err.attempt(), Some(3));
    }

    #[test]
    fn output_file_error_exposes_source() {
        let err = Error::OutputFile {
            path: PathBuf::from("/nope/out.bin"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/nope/out.bin"));
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.attempt(), None);
    }
}
