use magpie_core::MagpieError;

/// GitHub client for fetching PR diffs and publishing comments.
///
/// Holds an explicit token: the binary crate resolves `GITHUB_TOKEN`
/// once at startup, library code never reads process environment.
pub struct GithubClient {
    http: reqwest::Client,
    token: String,
    api_base: String,
}

impl GithubClient {
    /// Create a client from an explicit token and API base URL.
    ///
    /// # Errors
    ///
    /// Returns [`MagpieError::Config`] if the token is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use magpie_review::github::GithubClient;
    ///
    /// let client = GithubClient::new("ghp_xxxx", "https://api.github.com").unwrap();
    /// assert!(GithubClient::new("", "https://api.github.com").is_err());
    /// ```
    pub fn new(token: impl Into<String>, api_base: impl Into<String>) -> Result<Self, MagpieError> {
        let token = token.into();
        if token.is_empty() {
            return Err(MagpieError::Config(
                "GitHub token is empty. Set GITHUB_TOKEN in the job environment".into(),
            ));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            token,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the unified diff for a pull request.
    ///
    /// `repo` is the `owner/name` slug as provided by `GITHUB_REPOSITORY`.
    ///
    /// # Errors
    ///
    /// Returns [`MagpieError::GitHub`] on network or API errors; a diff
    /// that cannot be fetched is fatal, there is nothing to review.
    pub async fn fetch_pr_diff(&self, repo: &str, pr_number: u64) -> Result<String, MagpieError> {
        let url = format!("{}/repos/{repo}/pulls/{pr_number}", self.api_base);

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/vnd.github.v3.diff")
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", "magpie")
            .send()
            .await
            .map_err(|e| MagpieError::GitHub(format!("failed to fetch PR diff: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MagpieError::GitHub(format!(
                "GitHub API error {status}: {body}"
            )));
        }

        response
            .text()
            .await
            .map_err(|e| MagpieError::GitHub(format!("failed to read diff response: {e}")))
    }

    /// Publish a comment on the pull request's conversation thread.
    ///
    /// # Errors
    ///
    /// Returns [`MagpieError::GitHub`] on API errors.
    pub async fn post_comment(
        &self,
        repo: &str,
        pr_number: u64,
        body: &str,
    ) -> Result<(), MagpieError> {
        let url = format!("{}/repos/{repo}/issues/{pr_number}/comments", self.api_base);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", "magpie")
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await
            .map_err(|e| MagpieError::GitHub(format!("failed to post comment: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MagpieError::GitHub(format!(
                "GitHub API error {status}: {body}"
            )));
        }

        Ok(())
    }
}

/// Parse the PR number from a CI triggering ref such as `refs/pull/42/merge`.
///
/// The number is the second-to-last path segment.
///
/// # Errors
///
/// Returns [`MagpieError::Config`] if the ref has no parseable number;
/// this is fatal since the pipeline cannot know which PR to review.
///
/// # Examples
///
/// ```
/// use magpie_review::github::pr_number_from_ref;
///
/// assert_eq!(pr_number_from_ref("refs/pull/42/merge").unwrap(), 42);
/// assert!(pr_number_from_ref("refs/heads/main").is_err());
/// ```
pub fn pr_number_from_ref(git_ref: &str) -> Result<u64, MagpieError> {
    let segments: Vec<&str> = git_ref.split('/').collect();
    let number = segments
        .len()
        .checked_sub(2)
        .and_then(|i| segments.get(i))
        .and_then(|s| s.parse::<u64>().ok());
    number.ok_or_else(|| {
        MagpieError::Config(format!(
            "cannot parse PR number from ref '{git_ref}' (expected refs/pull/<n>/merge)"
        ))
    })
}
