use magpie_agents::AgentKind;
use magpie_core::CompletionOutcome;

/// Render the PR comment body for a completed run.
///
/// Pure function of `(agent, outcome)`: re-running the pipeline with
/// identical inputs and a deterministic router yields a byte-identical
/// comment body. Success bodies carry the completion text verbatim;
/// failure bodies carry a warning block with the router's fallback
/// message, so the PR always receives feedback.
///
/// # Examples
///
/// ```
/// use magpie_agents::AgentKind;
/// use magpie_core::CompletionOutcome;
/// use magpie_review::feedback::render_comment;
///
/// let outcome = CompletionOutcome::Success("Consider extracting a helper.".into());
/// let body = render_comment(AgentKind::Reviewer, &outcome);
/// assert!(body.contains("Reviewer Agent Feedback"));
/// assert!(body.contains("Consider extracting a helper."));
/// ```
pub fn render_comment(agent: AgentKind, outcome: &CompletionOutcome) -> String {
    let header = format!("### \u{1f916} {} Agent Feedback", agent.label());
    match outcome {
        CompletionOutcome::Success(text) => format!("{header}\n\n{text}\n"),
        CompletionOutcome::Failed(failure) => format!(
            "{header}\n\n> \u{26a0}\u{fe0f} **Feedback unavailable ({})**\n>\n> {}\n",
            failure.kind, failure.message,
        ),
    }
}
