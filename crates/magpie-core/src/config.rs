use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::MagpieError;
use crate::types::FailureKind;

/// Top-level configuration loaded from `.magpie.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
/// The binary crate builds this struct once at startup (folding in CI
/// environment variables) and passes it by reference into each component;
/// library crates never read process environment themselves.
///
/// # Examples
///
/// ```
/// use magpie_core::MagpieConfig;
///
/// let config = MagpieConfig::default();
/// assert_eq!(config.llm.model, "gpt-4o");
/// assert_eq!(config.agent.default, "reviewer");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MagpieConfig {
    /// LLM provider settings and routing table.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Agent selection settings.
    #[serde(default)]
    pub agent: AgentConfig,
    /// Coding-standards store settings.
    #[serde(default)]
    pub standards: StandardsConfig,
    /// Failure-handling behavior.
    #[serde(default)]
    pub review: ReviewConfig,
    /// GitHub API settings.
    #[serde(default)]
    pub github: GithubConfig,
}

impl MagpieConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`MagpieError::Io`] if the file cannot be read, or
    /// [`MagpieError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use magpie_core::MagpieConfig;
    /// use std::path::Path;
    ///
    /// let config = MagpieConfig::from_file(Path::new(".magpie.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, MagpieError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`MagpieError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use magpie_core::MagpieConfig;
    ///
    /// let toml = r#"
    /// [agent]
    /// default = "security"
    /// "#;
    /// let config = MagpieConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.agent.default, "security");
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, MagpieError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// LLM provider configuration.
///
/// The `model` field may carry a provider prefix (`azure/gpt-4o`,
/// `openrouter/anthropic/claude-sonnet-4`); the prefix selects an entry
/// from [`LlmConfig::providers`]. A bare model name goes to the default
/// OpenAI-compatible route described by `api_key`/`base_url`.
///
/// # Examples
///
/// ```
/// use magpie_core::LlmConfig;
///
/// let config = LlmConfig::default();
/// assert_eq!(config.model, "gpt-4o");
/// assert!(config.providers.iter().any(|p| p.prefix == "azure"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider-qualified model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key for the default route.
    pub api_key: Option<String>,
    /// Base URL for the default route (default: `https://api.openai.com`).
    pub base_url: Option<String>,
    /// Sampling temperature (default: 0.2).
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Routing table for prefixed model identifiers. Adding a provider
    /// is an edit here, not a code change.
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderRoute>,
}

fn default_model() -> String {
    "gpt-4o".into()
}

fn default_temperature() -> f64 {
    0.2
}

fn default_providers() -> Vec<ProviderRoute> {
    vec![
        ProviderRoute {
            prefix: "azure".into(),
            transport: Transport::Azure,
            base_url: None,
            api_key: None,
            api_version: None,
        },
        ProviderRoute {
            prefix: "openrouter".into(),
            transport: Transport::OpenAi,
            base_url: Some("https://openrouter.ai/api".into()),
            api_key: None,
            api_version: None,
        },
    ]
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            base_url: None,
            temperature: default_temperature(),
            providers: default_providers(),
        }
    }
}

/// One entry in the provider routing table.
///
/// # Examples
///
/// ```
/// use magpie_core::{ProviderRoute, Transport};
///
/// let route = ProviderRoute {
///     prefix: "azure".into(),
///     transport: Transport::Azure,
///     base_url: Some("https://my-rg.openai.azure.com".into()),
///     api_key: None,
///     api_version: Some("2024-06-01".into()),
/// };
/// assert_eq!(route.prefix, "azure");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRoute {
    /// Model-identifier prefix that selects this route (without the slash).
    pub prefix: String,
    /// Wire shape spoken by this route.
    #[serde(default)]
    pub transport: Transport,
    /// Endpoint base URL. Required for `azure` transports.
    pub base_url: Option<String>,
    /// API key for this route.
    pub api_key: Option<String>,
    /// API version query parameter (Azure only).
    pub api_version: Option<String>,
}

/// Wire protocol spoken by a provider route.
///
/// # Examples
///
/// ```
/// use magpie_core::Transport;
///
/// assert_eq!(serde_json::to_string(&Transport::Azure).unwrap(), "\"azure\"");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// OpenAI-compatible `/v1/chat/completions` endpoint.
    #[default]
    OpenAi,
    /// Azure OpenAI deployment endpoint with `api-version` query and
    /// `api-key` header.
    Azure,
}

/// Agent selection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Registry key of the agent to run (default: `"reviewer"`).
    #[serde(default = "default_agent")]
    pub default: String,
}

fn default_agent() -> String {
    "reviewer".into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            default: default_agent(),
        }
    }
}

/// Coding-standards store configuration.
///
/// # Examples
///
/// ```
/// use magpie_core::StandardsConfig;
///
/// let config = StandardsConfig::default();
/// assert_eq!(config.map.get("py").map(String::as_str), Some("python.md"));
/// assert_eq!(config.map.get("tsx").map(String::as_str), Some("react.md"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardsConfig {
    /// Directory holding the standards documents (default: `standards`).
    #[serde(default = "default_standards_dir")]
    pub dir: PathBuf,
    /// Extension → document-name mapping. Extensions not listed here
    /// contribute no section.
    #[serde(default = "default_standards_map")]
    pub map: BTreeMap<String, String>,
}

fn default_standards_dir() -> PathBuf {
    PathBuf::from("standards")
}

fn default_standards_map() -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    map.insert("py".into(), "python.md".into());
    map.insert("js".into(), "javascript.md".into());
    map.insert("jsx".into(), "react.md".into());
    map.insert("tsx".into(), "react.md".into());
    map.insert("ts".into(), "typescript.md".into());
    map.insert("css".into(), "style.md".into());
    map.insert("cs".into(), "csharp.md".into());
    map
}

impl Default for StandardsConfig {
    fn default() -> Self {
        Self {
            dir: default_standards_dir(),
            map: default_standards_map(),
        }
    }
}

/// Failure-handling configuration.
///
/// `fatal_on` lists the completion-failure kinds that abort the run
/// before any comment is posted. Everything else degrades into a
/// warning comment so the PR always receives feedback.
///
/// # Examples
///
/// ```
/// use magpie_core::{FailureKind, ReviewConfig};
///
/// let config = ReviewConfig::default();
/// assert!(config.is_fatal(FailureKind::Auth));
/// assert!(!config.is_fatal(FailureKind::QuotaExhausted));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Completion-failure kinds that abort instead of warning.
    #[serde(default = "default_fatal_on")]
    pub fatal_on: Vec<FailureKind>,
}

fn default_fatal_on() -> Vec<FailureKind> {
    vec![FailureKind::Auth]
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            fatal_on: default_fatal_on(),
        }
    }
}

impl ReviewConfig {
    /// Whether a failure of `kind` should abort the pipeline.
    pub fn is_fatal(&self, kind: FailureKind) -> bool {
        self.fatal_on.contains(&kind)
    }
}

/// GitHub API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// API base URL (default: `https://api.github.com`). Change for
    /// GitHub Enterprise Server installs.
    #[serde(default = "default_github_api_base")]
    pub api_base: String,
}

fn default_github_api_base() -> String {
    "https://api.github.com".into()
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: default_github_api_base(),
        }
    }
}
