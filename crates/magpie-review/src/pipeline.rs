use magpie_agents::AgentKind;
use magpie_core::{CompletionFailure, CompletionOutcome, MagpieConfig, MagpieError};
use magpie_standards::DirStore;

use crate::feedback;
use crate::github::GithubClient;
use crate::llm::CompletionRequest;
use crate::router::CompletionRouter;

/// Fixed label separating the agent role text from the standards bundle
/// in the final system message.
const STANDARDS_SEPARATOR: &str = "GUIDELINES AND STANDARDS:";

/// Inputs identifying one pipeline invocation.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Repository slug (`owner/name`).
    pub repo: String,
    /// Pull request number to review and comment on.
    pub pr_number: u64,
    /// Registry key of the agent to run.
    pub agent_key: String,
}

/// Summary of a completed (published) run.
#[derive(Debug)]
pub struct RunReport {
    /// The agent that produced the feedback.
    pub agent: AgentKind,
    /// The completion failure that was degraded into a warning comment,
    /// if the completion did not succeed.
    pub failure: Option<CompletionFailure>,
    /// The comment body that was published.
    pub comment_body: String,
}

/// Build the immutable completion request for a run.
///
/// The system message concatenates the agent's role text, the fixed
/// separator label, and the standards bundle (possibly empty); the user
/// message interpolates the diff into the agent's instruction template.
///
/// # Examples
///
/// ```
/// use magpie_agents::AgentKind;
/// use magpie_review::pipeline::assemble_request;
///
/// let request = assemble_request(AgentKind::Reviewer, "gpt-4o", "+x = 1", "");
/// assert_eq!(request.model, "gpt-4o");
/// assert!(request.system.contains("GUIDELINES AND STANDARDS:"));
/// assert!(request.user.contains("+x = 1"));
/// ```
pub fn assemble_request(
    agent: AgentKind,
    model: &str,
    diff: &str,
    standards_bundle: &str,
) -> CompletionRequest {
    CompletionRequest {
        model: model.to_string(),
        system: format!(
            "{}\n\n{STANDARDS_SEPARATOR}\n{standards_bundle}",
            agent.system_prompt()
        ),
        user: agent.user_prompt(diff),
    }
}

/// The sequential feedback pipeline:
/// fetch diff → resolve agent → resolve standards → assemble request →
/// complete → publish.
///
/// Failures upstream of request assembly (diff fetch, unknown agent) are
/// fatal: there is nothing meaningful to comment. Completion failures
/// are fatal only when their kind is listed in `review.fatal_on`;
/// otherwise they degrade into a warning comment so the PR always
/// receives feedback.
pub struct Pipeline<'a> {
    config: &'a MagpieConfig,
    github: GithubClient,
    router: CompletionRouter,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline over pre-built collaborators.
    pub fn new(config: &'a MagpieConfig, github: GithubClient, router: CompletionRouter) -> Self {
        Self {
            config,
            github,
            router,
        }
    }

    /// Run the pipeline once and publish the result.
    ///
    /// # Errors
    ///
    /// Returns [`MagpieError::GitHub`] if the diff fetch or the comment
    /// publish fails, [`MagpieError::UnknownAgent`] for an unregistered
    /// agent key, and [`MagpieError::FatalCompletion`] when the
    /// completion fails with a kind listed in `review.fatal_on`.
    pub async fn run(&self, ctx: &RunContext) -> Result<RunReport, MagpieError> {
        tracing::info!(repo = %ctx.repo, pr = ctx.pr_number, "fetching PR diff");
        let diff = self.github.fetch_pr_diff(&ctx.repo, ctx.pr_number).await?;
        tracing::debug!(bytes = diff.len(), "diff fetched");

        let agent: AgentKind = ctx.agent_key.parse()?;
        tracing::info!(agent = %agent, "agent resolved");

        let store = DirStore::new(&self.config.standards.dir);
        let bundle = magpie_standards::resolve(&diff, &store, &self.config.standards);
        tracing::debug!(bytes = bundle.len(), "standards resolved");

        let request = assemble_request(agent, &self.config.llm.model, &diff, &bundle);

        tracing::info!(model = %request.model, "requesting completion");
        let outcome = self.router.complete(&request).await;

        let failure = match &outcome {
            CompletionOutcome::Success(_) => None,
            CompletionOutcome::Failed(failure) => {
                if self.config.review.is_fatal(failure.kind) {
                    return Err(MagpieError::FatalCompletion {
                        kind: failure.kind,
                        message: failure.message.clone(),
                    });
                }
                tracing::warn!(kind = %failure.kind, "completion failed, publishing warning comment");
                Some(failure.clone())
            }
        };

        let comment_body = feedback::render_comment(agent, &outcome);
        self.github
            .post_comment(&ctx.repo, ctx.pr_number, &comment_body)
            .await?;
        tracing::info!(pr = ctx.pr_number, "feedback published");

        Ok(RunReport {
            agent,
            failure,
            comment_body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magpie_core::{FailureKind, StandardsConfig};
    use magpie_standards::MemoryStore;

    fn full_store() -> MemoryStore {
        MemoryStore::new([
            ("global.md", "global rules"),
            ("python.md", "python rules"),
            ("style.md", "css rules"),
        ])
    }

    #[test]
    fn system_message_carries_role_and_all_sections() {
        // Scenario: app.py + app.css touched, store has global/python/style
        let diff = "+++ b/src/app.py\n+++ b/src/app.css\n";
        let bundle = magpie_standards::resolve(diff, &full_store(), &StandardsConfig::default());
        let request = assemble_request(AgentKind::Reviewer, "gpt-4o", diff, &bundle);

        assert!(request.system.contains("Lead Developer"));
        assert!(request.system.contains("--- GLOBAL STANDARDS ---"));
        assert!(request.system.contains("--- SPECIFIC STANDARDS (PY) ---"));
        assert!(request.system.contains("--- SPECIFIC STANDARDS (CSS) ---"));
        assert!(request.user.contains(diff));
    }

    #[test]
    fn empty_bundle_still_assembles() {
        // Scenario: no recognized lines, store entirely absent
        let diff = "unrelated text\n";
        let bundle =
            magpie_standards::resolve(diff, &MemoryStore::absent(), &StandardsConfig::default());
        assert_eq!(bundle, "");

        let request = assemble_request(AgentKind::Reviewer, "gpt-4o", diff, &bundle);
        assert!(request.system.contains(STANDARDS_SEPARATOR));
        assert!(request.system.ends_with("GUIDELINES AND STANDARDS:\n"));
    }

    #[test]
    fn quota_failure_renders_published_warning() {
        // Scenario: provider 429 with quota language; run still publishes
        let outcome = CompletionOutcome::failed(
            FailureKind::QuotaExhausted,
            "The AI provider reported insufficient quota: the account's billing \
             or usage limit has been reached.",
        );
        let body = feedback::render_comment(AgentKind::Reviewer, &outcome);
        assert!(body.contains("insufficient quota"));
        assert!(body.contains("quota-exhausted"));
    }

    #[test]
    fn identical_inputs_produce_identical_comment_bodies() {
        let diff = "+++ b/src/app.py\n";
        let config = StandardsConfig::default();
        let outcome = CompletionOutcome::Success("Deterministic feedback.".into());

        let render = || {
            let bundle = magpie_standards::resolve(diff, &full_store(), &config);
            let request = assemble_request(AgentKind::Tester, "gpt-4o", diff, &bundle);
            assert!(request.system.contains("python rules"));
            feedback::render_comment(AgentKind::Tester, &outcome)
        };
        assert_eq!(render(), render());
    }

    #[test]
    fn fatal_classification_follows_config() {
        let config = MagpieConfig::default();
        assert!(config.review.is_fatal(FailureKind::Auth));
        for kind in [
            FailureKind::QuotaExhausted,
            FailureKind::RateLimited,
            FailureKind::Provider,
            FailureKind::Network,
        ] {
            assert!(!config.review.is_fatal(kind));
        }
    }
}
