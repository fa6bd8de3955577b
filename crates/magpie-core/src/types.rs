use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Classification of a completion failure.
///
/// The router maps every provider failure onto one of these kinds; the
/// orchestrator then consults [`crate::ReviewConfig::fatal_on`] to decide
/// whether the kind aborts the run or degrades into a warning comment.
///
/// # Examples
///
/// ```
/// use magpie_core::FailureKind;
///
/// assert_eq!(format!("{}", FailureKind::QuotaExhausted), "quota-exhausted");
/// assert_eq!("auth".parse::<FailureKind>().unwrap(), FailureKind::Auth);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// Billing or quota hard limit. Not retryable; the account owner
    /// has to act.
    QuotaExhausted,
    /// Provider throttling without quota language. Retryable after
    /// backoff by re-running the job.
    RateLimited,
    /// Missing or invalid credentials. Detected before any network call
    /// when the resolved route has no API key.
    Auth,
    /// Any other provider-reported failure (bad request, unknown model,
    /// server error).
    Provider,
    /// Transport-level failure: timeout, DNS, connection reset.
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::QuotaExhausted => "quota-exhausted",
            FailureKind::RateLimited => "rate-limited",
            FailureKind::Auth => "auth",
            FailureKind::Provider => "provider",
            FailureKind::Network => "network",
        };
        write!(f, "{s}")
    }
}

impl FromStr for FailureKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quota-exhausted" => Ok(FailureKind::QuotaExhausted),
            "rate-limited" => Ok(FailureKind::RateLimited),
            "auth" => Ok(FailureKind::Auth),
            "provider" => Ok(FailureKind::Provider),
            "network" => Ok(FailureKind::Network),
            other => Err(format!("unknown failure kind: {other}")),
        }
    }
}

/// A completion failure with its classification and a human-readable
/// fallback message suitable for posting as PR feedback.
///
/// # Examples
///
/// ```
/// use magpie_core::{CompletionFailure, FailureKind};
///
/// let failure = CompletionFailure {
///     kind: FailureKind::RateLimited,
///     message: "The provider is throttling requests.".into(),
/// };
/// assert_eq!(failure.kind, FailureKind::RateLimited);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionFailure {
    /// What went wrong, for the fatal-vs-warn decision.
    pub kind: FailureKind,
    /// Fallback text shown to humans in the PR comment.
    pub message: String,
}

/// Terminal result of one completion exchange.
///
/// The router always returns one of these; it never raises past its own
/// boundary. Exactly one outcome is produced and consumed per run.
///
/// # Examples
///
/// ```
/// use magpie_core::CompletionOutcome;
///
/// let outcome = CompletionOutcome::Success("Looks good.".into());
/// assert!(outcome.is_success());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The first generated message's text content, verbatim.
    Success(String),
    /// A classified failure with fallback text.
    Failed(CompletionFailure),
}

impl CompletionOutcome {
    /// Whether this outcome carries generated text.
    pub fn is_success(&self) -> bool {
        matches!(self, CompletionOutcome::Success(_))
    }

    /// Shorthand constructor for a failed outcome.
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        CompletionOutcome::Failed(CompletionFailure {
            kind,
            message: message.into(),
        })
    }
}
