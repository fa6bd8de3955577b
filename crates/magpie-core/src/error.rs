/// Errors that can occur across the Magpie pipeline.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary crate converts to `miette::Report` at the boundary.
///
/// Completion failures are deliberately NOT represented here: the router
/// reports them as [`crate::CompletionOutcome`] values so the orchestrator
/// can turn them into PR feedback instead of aborting.
///
/// # Examples
///
/// ```
/// use magpie_core::MagpieError;
///
/// let err = MagpieError::Config("missing API key".into());
/// assert!(err.to_string().contains("missing API key"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum MagpieError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// GitHub API failure (diff fetch or comment publish).
    #[error("GitHub error: {0}")]
    GitHub(String),

    /// The requested agent key has no registry entry.
    #[error("unknown agent '{0}' (expected one of: reviewer, security, tester, documenter)")]
    UnknownAgent(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A completion failure whose kind is listed in `review.fatal_on`.
    ///
    /// Raised by the orchestrator, never by the router itself.
    #[error("completion failed ({kind}): {message}")]
    FatalCompletion {
        /// Classification of the underlying failure.
        kind: crate::FailureKind,
        /// The router's human-readable fallback message.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: MagpieError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn config_error_displays_message() {
        let err = MagpieError::Config("bad value".into());
        assert_eq!(err.to_string(), "configuration error: bad value");
    }

    #[test]
    fn unknown_agent_names_the_key() {
        let err = MagpieError::UnknownAgent("poet".into());
        assert!(err.to_string().contains("poet"));
        assert!(err.to_string().contains("reviewer"));
    }
}
