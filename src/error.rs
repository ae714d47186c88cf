use std::path::PathBuf;
use thiserror::Error;

/// Digest grammar failures. Any of these aborts the run; the reconciler never
/// guesses at a merge target.
#[derive(Debug, Error)]
pub enum DigestError {
    #[error("Digest {path} has no section count header line")]
    MissingHeader { path: PathBuf },

    #[error("Digest {path} is missing the '## {section}' section")]
    MissingSection { path: PathBuf, section: &'static str },

    #[error("Failed to access digest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Application '{0}' not found")]
    NotFound(String),

    #[error("Unknown application status '{0}' (expected applied, responded, interview, offer, rejected, withdrawn)")]
    UnknownStatus(String),
}
