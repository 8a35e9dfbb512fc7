//! Error types for release-configuration reconciliation.

use thiserror::Error;

/// Failures of the reconciliation step.
///
/// Every variant is fatal to the invocation. The binary wraps these in
/// `anyhow` context naming the step that failed.
#[derive(Debug, Error)]
pub enum ReleaseError {
    /// The releaserc text is not JSON, or not the expected shape.
    #[error("failed to parse release config")]
    ConfigParse {
        #[source]
        source: serde_json::Error,
    },

    /// The git collaborator could not name the current branch.
    #[error("could not resolve the current branch")]
    BranchResolution {
        #[source]
        source: anyhow::Error,
    },

    /// The reconciled config could not be encoded again.
    #[error("failed to serialize release config")]
    Serialization {
        #[source]
        source: serde_json::Error,
    },

    /// Provider string other than `Github` or `Gitlab`.
    #[error("unknown git provider '{0}' (expected 'Github' or 'Gitlab')")]
    UnknownProvider(String),
}

pub type Result<T, E = ReleaseError> = std::result::Result<T, E>;
