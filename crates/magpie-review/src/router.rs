use std::time::Duration;

use magpie_core::{CompletionOutcome, FailureKind, LlmConfig, MagpieError, Transport};

use crate::llm::CompletionRequest;

const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com";

/// Maximum provider-error detail carried into a PR comment.
const MAX_DETAIL_LEN: usize = 600;

/// A provider route resolved for a concrete model identifier.
///
/// Produced by [`resolve_route`]; borrows from the routing table.
#[derive(Debug)]
pub struct ResolvedRoute<'a> {
    /// Model (or Azure deployment) name with the routing prefix stripped.
    pub model: &'a str,
    /// Wire shape of the selected route.
    pub transport: Transport,
    /// Endpoint base URL, when the route configures one.
    pub base_url: Option<&'a str>,
    /// API key for the route.
    pub api_key: Option<&'a str>,
    /// Azure `api-version` query value.
    pub api_version: Option<&'a str>,
}

/// Select the provider route for a model identifier.
///
/// The identifier's prefix (the part before the first `/`) is looked up
/// in the routing table. A match handles the request with the remainder
/// as the model name. No match — including a bare identifier — falls
/// through to the default OpenAI-compatible route with the identifier
/// intact, since `vendor/model` catalog names are legal bare model ids.
///
/// # Examples
///
/// ```
/// use magpie_core::{LlmConfig, Transport};
/// use magpie_review::router::resolve_route;
///
/// let config = LlmConfig::default();
/// let route = resolve_route("azure/gpt-4o", &config);
/// assert_eq!(route.model, "gpt-4o");
/// assert_eq!(route.transport, Transport::Azure);
///
/// let route = resolve_route("gpt-4o-mini", &config);
/// assert_eq!(route.model, "gpt-4o-mini");
/// assert_eq!(route.transport, Transport::OpenAi);
/// ```
pub fn resolve_route<'a>(model_id: &'a str, config: &'a LlmConfig) -> ResolvedRoute<'a> {
    if let Some((prefix, rest)) = model_id.split_once('/') {
        if let Some(route) = config.providers.iter().find(|r| r.prefix == prefix) {
            return ResolvedRoute {
                model: rest,
                transport: route.transport,
                base_url: route.base_url.as_deref(),
                api_key: route.api_key.as_deref(),
                api_version: route.api_version.as_deref(),
            };
        }
    }
    ResolvedRoute {
        model: model_id,
        transport: Transport::OpenAi,
        base_url: config.base_url.as_deref(),
        api_key: config.api_key.as_deref(),
        api_version: None,
    }
}

/// Classify a non-success HTTP response from a provider.
///
/// A 429 is split on quota language in the body: billing/quota hard
/// limits are not fixed by retrying, plain throttling is.
///
/// # Examples
///
/// ```
/// use magpie_core::FailureKind;
/// use magpie_review::router::classify_http_failure;
///
/// assert_eq!(
///     classify_http_failure(429, r#"{"error":{"code":"insufficient_quota"}}"#),
///     FailureKind::QuotaExhausted,
/// );
/// assert_eq!(
///     classify_http_failure(429, "Too Many Requests"),
///     FailureKind::RateLimited,
/// );
/// assert_eq!(classify_http_failure(401, ""), FailureKind::Auth);
/// ```
pub fn classify_http_failure(status: u16, body: &str) -> FailureKind {
    match status {
        401 | 403 => FailureKind::Auth,
        429 => {
            let lower = body.to_lowercase();
            if lower.contains("insufficient_quota")
                || lower.contains("quota")
                || lower.contains("billing")
            {
                FailureKind::QuotaExhausted
            } else {
                FailureKind::RateLimited
            }
        }
        _ => FailureKind::Provider,
    }
}

/// Human-readable fallback text for a classified failure.
///
/// This is what ends up in the PR comment when the failure is not
/// fatal, so each message tells the reader what to do next.
pub fn fallback_message(kind: FailureKind, detail: &str) -> String {
    let detail = truncate_detail(detail);
    match kind {
        FailureKind::QuotaExhausted => format!(
            "The AI provider reported insufficient quota: the account's billing \
             or usage limit has been reached. Re-running will not help until the \
             quota is raised. Provider detail: {detail}"
        ),
        FailureKind::RateLimited => format!(
            "The AI provider is rate limiting requests. Re-run this job in a few \
             minutes. Provider detail: {detail}"
        ),
        FailureKind::Auth => format!("No valid API credentials for the AI provider: {detail}"),
        FailureKind::Provider => format!("The AI provider rejected the request: {detail}"),
        FailureKind::Network => format!("Could not reach the AI provider: {detail}"),
    }
}

fn truncate_detail(detail: &str) -> String {
    let detail = detail.trim();
    if detail.len() <= MAX_DETAIL_LEN {
        return detail.to_string();
    }
    let cut = detail
        .char_indices()
        .take_while(|(i, _)| *i < MAX_DETAIL_LEN)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    format!("{}…", &detail[..cut])
}

/// Multi-provider chat-completion router.
///
/// Resolves the request's model identifier against the configured
/// routing table, performs exactly one request/response exchange, and
/// returns a [`CompletionOutcome`]. Never raises past its own boundary:
/// every failure — including missing credentials, detected before any
/// network call — becomes a classified `Failed` outcome with a
/// human-readable fallback message. Retries are the responsibility of
/// the scheduler re-running the whole job.
///
/// # Examples
///
/// ```
/// use magpie_core::LlmConfig;
/// use magpie_review::router::CompletionRouter;
///
/// let config = LlmConfig {
///     api_key: Some("sk-test".into()),
///     ..LlmConfig::default()
/// };
/// let router = CompletionRouter::new(&config).unwrap();
/// assert_eq!(router.model(), "gpt-4o");
/// ```
pub struct CompletionRouter {
    client: reqwest::Client,
    config: LlmConfig,
}

impl CompletionRouter {
    /// Create a router from LLM configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MagpieError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, MagpieError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| MagpieError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Return the configured model identifier.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Issue one chat-completion exchange for an assembled request.
    ///
    /// On success returns the first generated message's text content
    /// verbatim; no post-processing, no truncation.
    pub async fn complete(&self, request: &CompletionRequest) -> CompletionOutcome {
        let route = resolve_route(&request.model, &self.config);

        let Some(api_key) = route.api_key else {
            return CompletionOutcome::failed(
                FailureKind::Auth,
                fallback_message(
                    FailureKind::Auth,
                    &format!("no API key configured for model '{}'", request.model),
                ),
            );
        };

        let (url, azure) = match route.transport {
            Transport::OpenAi => {
                let base = route.base_url.unwrap_or(DEFAULT_OPENAI_BASE);
                (format!("{base}/v1/chat/completions"), false)
            }
            Transport::Azure => {
                let Some(base) = route.base_url else {
                    return CompletionOutcome::failed(
                        FailureKind::Auth,
                        fallback_message(
                            FailureKind::Auth,
                            "azure route has no base_url (endpoint) configured",
                        ),
                    );
                };
                let Some(version) = route.api_version else {
                    return CompletionOutcome::failed(
                        FailureKind::Auth,
                        fallback_message(
                            FailureKind::Auth,
                            "azure route has no api_version configured",
                        ),
                    );
                };
                (
                    format!(
                        "{base}/openai/deployments/{}/chat/completions?api-version={version}",
                        route.model
                    ),
                    true,
                )
            }
        };

        let body = serde_json::json!({
            "model": route.model,
            "messages": request.messages(),
            "temperature": self.config.temperature,
        });

        tracing::debug!(url = %url, model = %route.model, "sending completion request");

        let mut http = self.client.post(&url).json(&body);
        http = if azure {
            http.header("api-key", api_key)
        } else {
            http.header("Authorization", format!("Bearer {api_key}"))
        };

        let response = match http.send().await {
            Ok(r) => r,
            Err(e) => {
                let detail = if e.is_timeout() {
                    format!("request timed out: {e}")
                } else if e.is_connect() {
                    format!("connection failed: {e}")
                } else {
                    e.to_string()
                };
                return CompletionOutcome::failed(
                    FailureKind::Network,
                    fallback_message(FailureKind::Network, &detail),
                );
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            let kind = classify_http_failure(status.as_u16(), &body_text);
            tracing::warn!(status = status.as_u16(), kind = %kind, "provider returned an error");
            return CompletionOutcome::failed(
                kind,
                fallback_message(kind, &format!("HTTP {status}: {body_text}")),
            );
        }

        let response_body: serde_json::Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                return CompletionOutcome::failed(
                    FailureKind::Provider,
                    fallback_message(
                        FailureKind::Provider,
                        &format!("failed to parse response: {e}"),
                    ),
                );
            }
        };

        match response_body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
        {
            Some(content) => CompletionOutcome::Success(content.to_string()),
            None => CompletionOutcome::failed(
                FailureKind::Provider,
                fallback_message(
                    FailureKind::Provider,
                    &format!("unexpected response structure: {response_body}"),
                ),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magpie_core::ProviderRoute;

    fn config_with_azure() -> LlmConfig {
        LlmConfig {
            api_key: Some("sk-default".into()),
            providers: vec![
                ProviderRoute {
                    prefix: "azure".into(),
                    transport: Transport::Azure,
                    base_url: Some("https://rg.openai.azure.com".into()),
                    api_key: Some("azure-key".into()),
                    api_version: Some("2024-06-01".into()),
                },
                ProviderRoute {
                    prefix: "openrouter".into(),
                    transport: Transport::OpenAi,
                    base_url: Some("https://openrouter.ai/api".into()),
                    api_key: Some("or-key".into()),
                    api_version: None,
                },
            ],
            ..LlmConfig::default()
        }
    }

    #[test]
    fn bare_model_uses_default_route() {
        let config = config_with_azure();
        let route = resolve_route("gpt-4o", &config);
        assert_eq!(route.model, "gpt-4o");
        assert_eq!(route.transport, Transport::OpenAi);
        assert_eq!(route.api_key, Some("sk-default"));
        assert!(route.base_url.is_none());
    }

    #[test]
    fn azure_prefix_selects_azure_route() {
        let config = config_with_azure();
        let route = resolve_route("azure/my-deployment", &config);
        assert_eq!(route.model, "my-deployment");
        assert_eq!(route.transport, Transport::Azure);
        assert_eq!(route.api_key, Some("azure-key"));
        assert_eq!(route.api_version, Some("2024-06-01"));
    }

    #[test]
    fn openrouter_prefix_keeps_vendor_in_model() {
        let config = config_with_azure();
        let route = resolve_route("openrouter/anthropic/claude-sonnet-4", &config);
        assert_eq!(route.model, "anthropic/claude-sonnet-4");
        assert_eq!(route.base_url, Some("https://openrouter.ai/api"));
    }

    #[test]
    fn unknown_prefix_falls_through_to_default_route() {
        let config = config_with_azure();
        let route = resolve_route("mistralai/mixtral-8x7b", &config);
        // Not a configured prefix, so the whole id is the model name
        assert_eq!(route.model, "mistralai/mixtral-8x7b");
        assert_eq!(route.transport, Transport::OpenAi);
        assert_eq!(route.api_key, Some("sk-default"));
    }

    #[test]
    fn quota_language_in_429_is_quota_exhausted() {
        let body = r#"{"error":{"message":"You exceeded your current quota","code":"insufficient_quota"}}"#;
        assert_eq!(classify_http_failure(429, body), FailureKind::QuotaExhausted);
    }

    #[test]
    fn plain_429_is_transient_rate_limit() {
        assert_eq!(
            classify_http_failure(429, "Too Many Requests"),
            FailureKind::RateLimited
        );
    }

    #[test]
    fn auth_statuses_classify_as_auth() {
        assert_eq!(classify_http_failure(401, ""), FailureKind::Auth);
        assert_eq!(classify_http_failure(403, "forbidden"), FailureKind::Auth);
    }

    #[test]
    fn other_statuses_classify_as_provider() {
        assert_eq!(classify_http_failure(400, "bad request"), FailureKind::Provider);
        assert_eq!(classify_http_failure(404, "model not found"), FailureKind::Provider);
        assert_eq!(classify_http_failure(500, "oops"), FailureKind::Provider);
    }

    #[test]
    fn fallback_messages_guide_the_reader() {
        let quota = fallback_message(FailureKind::QuotaExhausted, "HTTP 429");
        assert!(quota.contains("insufficient quota"));
        assert!(quota.contains("Re-running will not help"));

        let limited = fallback_message(FailureKind::RateLimited, "HTTP 429");
        assert!(limited.contains("Re-run this job"));
    }

    #[test]
    fn long_details_are_truncated() {
        let detail = "x".repeat(5000);
        let msg = fallback_message(FailureKind::Provider, &detail);
        assert!(msg.len() < 1000);
        assert!(msg.contains('…'));
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_any_network_call() {
        let config = LlmConfig::default(); // no keys anywhere
        let router = CompletionRouter::new(&config).unwrap();
        let request = CompletionRequest {
            model: "gpt-4o".into(),
            system: "sys".into(),
            user: "usr".into(),
        };
        let outcome = router.complete(&request).await;
        let CompletionOutcome::Failed(failure) = outcome else {
            panic!("expected auth failure");
        };
        assert_eq!(failure.kind, FailureKind::Auth);
        assert!(failure.message.contains("gpt-4o"));
    }

    #[tokio::test]
    async fn azure_route_without_endpoint_fails_preflight() {
        let mut config = config_with_azure();
        config.providers[0].base_url = None;
        let router = CompletionRouter::new(&config).unwrap();
        let request = CompletionRequest {
            model: "azure/my-deployment".into(),
            system: "sys".into(),
            user: "usr".into(),
        };
        let outcome = router.complete(&request).await;
        let CompletionOutcome::Failed(failure) = outcome else {
            panic!("expected auth failure");
        };
        assert_eq!(failure.kind, FailureKind::Auth);
        assert!(failure.message.contains("base_url"));
    }
}
