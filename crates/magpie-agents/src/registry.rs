use std::fmt;
use std::str::FromStr;

use magpie_core::MagpieError;

const REVIEWER_SYSTEM: &str = "\
You are a perfectionist Lead Developer performing a critical code review. \
Focus on readability, duplication (DRY), and architecture. Be direct and \
technical; do not pad your feedback with praise.";

const SECURITY_SYSTEM: &str = "\
You are a cybersecurity expert. Hunt for logical vulnerabilities, injection \
vectors, and accidental exposure of secrets or sensitive data in the change.";

const TESTER_SYSTEM: &str = "\
You are a QA engineer specialized in unit testing. Detect every new function \
introduced by the change and design the unit test that pins its behavior.";

const DOCUMENTER_SYSTEM: &str = "\
You are a Technical Writer. Your goal is to make code changes understandable \
for humans, both developers and product owners.";

/// A PR feedback agent: a named role producing a system+user prompt pair.
///
/// The registry is closed: exactly these four variants exist, and
/// resolution of an unknown key fails with
/// [`MagpieError::UnknownAgent`] rather than falling back to a default.
///
/// # Examples
///
/// ```
/// use magpie_agents::AgentKind;
///
/// let agent: AgentKind = "security".parse().unwrap();
/// assert_eq!(agent, AgentKind::Security);
/// assert!("poet".parse::<AgentKind>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    /// Critical code review: readability, duplication, architecture.
    Reviewer,
    /// Vulnerability and secret-exposure scan.
    Security,
    /// Unit-test generation for new functions.
    Tester,
    /// Changelog / release-notes drafting.
    Documenter,
}

impl AgentKind {
    /// Every registered agent, for `doctor` output and docs.
    pub fn all() -> [AgentKind; 4] {
        [
            AgentKind::Reviewer,
            AgentKind::Security,
            AgentKind::Tester,
            AgentKind::Documenter,
        ]
    }

    /// The registry key this agent resolves from.
    pub fn key(&self) -> &'static str {
        match self {
            AgentKind::Reviewer => "reviewer",
            AgentKind::Security => "security",
            AgentKind::Tester => "tester",
            AgentKind::Documenter => "documenter",
        }
    }

    /// Human-facing label used in comment headers.
    pub fn label(&self) -> &'static str {
        match self {
            AgentKind::Reviewer => "Reviewer",
            AgentKind::Security => "Security",
            AgentKind::Tester => "Tester",
            AgentKind::Documenter => "Documenter",
        }
    }

    /// Fixed role description for the system message.
    pub fn system_prompt(&self) -> &'static str {
        match self {
            AgentKind::Reviewer => REVIEWER_SYSTEM,
            AgentKind::Security => SECURITY_SYSTEM,
            AgentKind::Tester => TESTER_SYSTEM,
            AgentKind::Documenter => DOCUMENTER_SYSTEM,
        }
    }

    /// Instruction template with the diff interpolated verbatim.
    ///
    /// Pure: no I/O, no external state. The same diff always yields the
    /// same prompt.
    ///
    /// # Examples
    ///
    /// ```
    /// use magpie_agents::AgentKind;
    ///
    /// let prompt = AgentKind::Reviewer.user_prompt("+let x = 1;");
    /// assert!(prompt.contains("+let x = 1;"));
    /// ```
    pub fn user_prompt(&self, diff: &str) -> String {
        match self {
            AgentKind::Reviewer => format!(
                "Analyze this diff and suggest 3 concrete improvements. \
                 Be direct and technical:\n\n{diff}"
            ),
            AgentKind::Security => format!(
                "Scan this diff for security vulnerabilities. For each one you \
                 find, explain the risk and provide the fix:\n\n{diff}"
            ),
            AgentKind::Tester => format!(
                "Identify the new functions in this diff. For each one, generate \
                 a robust unit test using the appropriate framework for the \
                 detected language (e.g. Pytest, Jest). Provide only the test \
                 code:\n\n{diff}"
            ),
            AgentKind::Documenter => format!(
                "Write a changelog (release notes) for these changes. Include a \
                 'Summary' section and a detailed list of technical \
                 impacts:\n\n{diff}"
            ),
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for AgentKind {
    type Err = MagpieError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reviewer" => Ok(AgentKind::Reviewer),
            "security" => Ok(AgentKind::Security),
            "tester" => Ok(AgentKind::Tester),
            "documenter" => Ok(AgentKind::Documenter),
            other => Err(MagpieError::UnknownAgent(other.to_string())),
        }
    }
}
