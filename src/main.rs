use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use miette::{Context, IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use magpie_agents::AgentKind;
use magpie_core::MagpieConfig;
use magpie_review::github::{pr_number_from_ref, GithubClient};
use magpie_review::pipeline::{assemble_request, Pipeline, RunContext};
use magpie_review::router::CompletionRouter;
use magpie_standards::DirStore;

#[derive(Parser)]
#[command(
    name = "magpie",
    version,
    about = "CI bot that reviews pull requests with role-specific AI agents",
    long_about = "Magpie posts AI-generated feedback on pull requests from CI.\n\n\
                   It fetches the PR diff, picks a role agent (reviewer, security, tester,\n\
                   documenter), attaches the coding standards that match the files touched,\n\
                   runs one chat completion against the configured provider, and publishes\n\
                   the result as a PR comment.\n\n\
                   Examples:\n  \
                     magpie run                          Review the PR that triggered this job\n  \
                     magpie run --agent security         Run the security agent instead\n  \
                     magpie run --model azure/gpt-4o     Route through an Azure deployment\n  \
                     magpie run --dry-run                Print the assembled request, call nothing\n  \
                     magpie init                         Create a .magpie.toml config file\n  \
                     magpie doctor                       Check setup and environment"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .magpie.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch the PR diff, run the agent, and publish feedback
    #[command(long_about = "Fetch the PR diff, run the agent, and publish feedback.\n\n\
        Designed to run inside a pull_request CI job. The PR number, repository,\n\
        and credentials default to the standard GitHub Actions environment\n\
        (GITHUB_REF, GITHUB_REPOSITORY, GITHUB_TOKEN); flags override.\n\n\
        Examples:\n  magpie run\n  magpie run --agent tester --model openrouter/anthropic/claude-sonnet-4\n  magpie run --repo octocat/hello-world --pr 42")]
    Run {
        /// Agent to run: reviewer, security, tester, or documenter
        #[arg(
            long,
            long_help = "Agent to run.\n\nOne of: reviewer, security, tester, documenter.\nDefaults to AGENT_TYPE env var, then [agent].default from config."
        )]
        agent: Option<String>,

        /// Provider-qualified model identifier (e.g. gpt-4o, azure/gpt-4o)
        #[arg(
            long,
            long_help = "Provider-qualified model identifier.\n\nA prefix selects a provider route from the config routing table:\n  gpt-4o                       default OpenAI-compatible route\n  azure/<deployment>           Azure OpenAI (needs AZURE_API_BASE etc.)\n  openrouter/<vendor>/<model>  OpenRouter\nDefaults to MODEL_NAME env var, then [llm].model from config."
        )]
        model: Option<String>,

        /// Repository slug (owner/name); defaults to GITHUB_REPOSITORY
        #[arg(long)]
        repo: Option<String>,

        /// Pull request number; defaults to parsing GITHUB_REF
        #[arg(long)]
        pr: Option<u64>,

        /// Triggering git ref to parse the PR number from
        #[arg(long, conflicts_with = "pr")]
        git_ref: Option<String>,

        /// GitHub token; defaults to GITHUB_TOKEN
        #[arg(long)]
        github_token: Option<String>,

        /// Directory holding the standards documents
        #[arg(long)]
        standards_dir: Option<PathBuf>,

        /// Read the diff from a file instead of the GitHub API
        #[arg(long)]
        diff_file: Option<PathBuf>,

        /// Assemble and print the completion request without calling
        /// the provider or posting a comment
        #[arg(long)]
        dry_run: bool,
    },
    /// Create a default .magpie.toml configuration file
    #[command(long_about = "Create a default .magpie.toml configuration file.\n\n\
        Generates a commented template with all available options.\n\
        Fails if .magpie.toml already exists.")]
    Init,
    /// Check your Magpie setup and environment
    #[command(long_about = "Check your Magpie setup and environment.\n\n\
        Runs diagnostics for the config file, standards directory, LLM\n\
        credentials, and GitHub job environment. Use --json for\n\
        machine-readable output.")]
    Doctor {
        /// Emit the checks as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Fold CI environment variables into the config. Process environment
/// is read only in this binary crate; the library crates receive the
/// resulting config by reference.
fn apply_environment(config: &mut MagpieConfig) {
    if config.llm.api_key.is_none() {
        config.llm.api_key = std::env::var("MAGPIE_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .ok();
    }

    for route in &mut config.llm.providers {
        match route.prefix.as_str() {
            "azure" => {
                if route.api_key.is_none() {
                    route.api_key = std::env::var("AZURE_API_KEY").ok();
                }
                if route.base_url.is_none() {
                    route.base_url = std::env::var("AZURE_API_BASE").ok();
                }
                if route.api_version.is_none() {
                    route.api_version = std::env::var("AZURE_API_VERSION").ok();
                }
            }
            "openrouter" => {
                if route.api_key.is_none() {
                    route.api_key = std::env::var("OPENROUTER_API_KEY").ok();
                }
            }
            _ => {}
        }
    }
}

#[derive(serde::Serialize)]
struct CheckResult {
    name: &'static str,
    status: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl CheckResult {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "pass",
            detail: detail.into(),
            hint: None,
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name,
            status: "fail",
            detail: detail.into(),
            hint: Some(hint.into()),
        }
    }

    fn info(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "info",
            detail: detail.into(),
            hint: None,
        }
    }

    fn symbol(&self) -> &'static str {
        match self.status {
            "pass" => "\u{2713}",
            "fail" => "\u{2717}",
            _ => "~",
        }
    }
}

fn run_doctor(config: &MagpieConfig, json: bool) -> Result<()> {
    let mut checks: Vec<CheckResult> = Vec::new();

    // 1. Config file
    let config_path = std::path::Path::new(".magpie.toml");
    if config_path.exists() {
        checks.push(CheckResult::pass("config_file", ".magpie.toml found"));
    } else {
        checks.push(CheckResult::fail(
            "config_file",
            ".magpie.toml not found",
            "run 'magpie init' to create a default config",
        ));
    }

    // 2. Standards store
    if config.standards.dir.is_dir() {
        let count = std::fs::read_dir(&config.standards.dir)
            .map(|entries| entries.filter_map(|e| e.ok()).count())
            .unwrap_or(0);
        checks.push(CheckResult::pass(
            "standards_dir",
            format!("{} ({count} documents)", config.standards.dir.display()),
        ));
    } else {
        checks.push(CheckResult::info(
            "standards_dir",
            format!(
                "{} not found (runs proceed without standards context)",
                config.standards.dir.display()
            ),
        ));
    }

    // 3. LLM route + credentials
    let model = &config.llm.model;
    checks.push(CheckResult::pass("model", model.clone()));
    if let Some((prefix, _)) = model.split_once('/') {
        if let Some(route) = config.llm.providers.iter().find(|r| r.prefix == prefix) {
            if route.api_key.is_some() {
                checks.push(CheckResult::pass(
                    "llm_api_key",
                    format!("credentials present for '{prefix}' route"),
                ));
            } else {
                checks.push(CheckResult::fail(
                    "llm_api_key",
                    format!("no API key for '{prefix}' route"),
                    "set the route's api_key in .magpie.toml or the matching env var",
                ));
            }
        } else {
            checks.push(CheckResult::info(
                "llm_route",
                format!("prefix '{prefix}' has no route entry; the default route will handle it"),
            ));
        }
    } else if config.llm.api_key.is_some() {
        checks.push(CheckResult::pass("llm_api_key", "default route key set"));
    } else {
        checks.push(CheckResult::fail(
            "llm_api_key",
            "no API key for the default route",
            "export OPENAI_API_KEY=... or set api_key in .magpie.toml under [llm]",
        ));
    }

    // 4. GitHub job environment
    if std::env::var("GITHUB_TOKEN").is_ok() {
        checks.push(CheckResult::pass("github_token", "GITHUB_TOKEN set"));
    } else {
        checks.push(CheckResult::fail(
            "github_token",
            "GITHUB_TOKEN not set",
            "expose the workflow token to the job environment",
        ));
    }
    match std::env::var("GITHUB_REF") {
        Ok(git_ref) => match pr_number_from_ref(&git_ref) {
            Ok(n) => checks.push(CheckResult::pass("github_ref", format!("PR #{n}"))),
            Err(_) => checks.push(CheckResult::info(
                "github_ref",
                format!("'{git_ref}' is not a pull_request ref"),
            )),
        },
        Err(_) => checks.push(CheckResult::info(
            "github_ref",
            "GITHUB_REF not set (pass --pr when running locally)",
        )),
    }

    // 5. Agent registry
    let agents: Vec<&str> = AgentKind::all().iter().map(|a| a.key()).collect();
    match config.agent.default.parse::<AgentKind>() {
        Ok(agent) => checks.push(CheckResult::pass(
            "default_agent",
            format!("{agent} (registry: {})", agents.join(", ")),
        )),
        Err(_) => checks.push(CheckResult::fail(
            "default_agent",
            format!("'{}' is not a registered agent", config.agent.default),
            format!("use one of: {}", agents.join(", ")),
        )),
    }

    if json {
        let out = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "checks": checks,
        });
        println!("{}", serde_json::to_string_pretty(&out).into_diagnostic()?);
    } else {
        println!("Magpie v{} — Environment Check\n", env!("CARGO_PKG_VERSION"));
        for check in &checks {
            let label = check.name.replace('_', " ");
            println!("  {} {label:<16} {}", check.symbol(), check.detail);
            if let Some(hint) = &check.hint {
                println!("    hint: {hint}");
            }
        }
        let passed = checks.iter().filter(|c| c.status == "pass").count();
        let failed = checks.iter().filter(|c| c.status == "fail").count();
        let info = checks.iter().filter(|c| c.status == "info").count();
        println!("\n{passed} checks passed, {failed} failed, {info} info");
    }

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Magpie Configuration
# See: https://github.com/magpie-dev/magpie

[llm]
# Provider-qualified model identifier. A prefix selects a routing table
# entry below; a bare name goes to the default OpenAI-compatible route.
# model = "gpt-4o"
# model = "azure/gpt-4o"
# model = "openrouter/anthropic/claude-sonnet-4"
# api_key is usually provided via OPENAI_API_KEY / MAGPIE_API_KEY
# temperature = 0.2

# Provider routing table. Adding a provider is an entry here, not code.
# [[llm.providers]]
# prefix = "azure"
# transport = "azure"
# base_url = "https://my-resource.openai.azure.com"   # or AZURE_API_BASE
# api_version = "2024-06-01"                          # or AZURE_API_VERSION

[agent]
# Which agent runs when AGENT_TYPE is unset: reviewer, security, tester, documenter
# default = "reviewer"

[standards]
# Directory of coding-standard documents merged into the system prompt
# dir = "standards"
# Extension -> document mapping; extensions not listed contribute nothing
# [standards.map]
# py = "python.md"
# ts = "typescript.md"

[review]
# Completion failures that abort the job instead of posting a warning
# comment. Kinds: auth, quota-exhausted, rate-limited, provider, network
# fatal_on = ["auth"]

[github]
# api_base = "https://api.github.com"
"#;

#[allow(clippy::too_many_arguments)]
async fn run_pipeline(
    config: &MagpieConfig,
    agent: Option<String>,
    model: Option<String>,
    repo: Option<String>,
    pr: Option<u64>,
    git_ref: Option<String>,
    github_token: Option<String>,
    diff_file: Option<PathBuf>,
    dry_run: bool,
) -> Result<()> {
    let mut config = config.clone();

    if let Some(model) = model.or_else(|| std::env::var("MODEL_NAME").ok()) {
        config.llm.model = model;
    }
    let agent_key = agent
        .or_else(|| std::env::var("AGENT_TYPE").ok())
        .unwrap_or_else(|| config.agent.default.clone());

    let repo = match repo.or_else(|| std::env::var("GITHUB_REPOSITORY").ok()) {
        Some(r) => r,
        None => miette::bail!(miette::miette!(
            help = "Pass --repo owner/name, or run inside a GitHub Actions job",
            "No repository specified"
        )),
    };

    let pr_number = match pr {
        Some(n) => n,
        None => {
            let git_ref = match git_ref.or_else(|| std::env::var("GITHUB_REF").ok()) {
                Some(r) => r,
                None => miette::bail!(miette::miette!(
                    help = "Pass --pr <number>, or run from a pull_request trigger",
                    "No pull request specified"
                )),
            };
            pr_number_from_ref(&git_ref)?
        }
    };

    let token = github_token
        .or_else(|| std::env::var("GITHUB_TOKEN").ok())
        .unwrap_or_default();

    if dry_run {
        // Assemble the request with the same code paths as a real run,
        // then print instead of completing/publishing.
        let agent: AgentKind = agent_key.parse()?;
        let diff = match &diff_file {
            Some(path) => std::fs::read_to_string(path)
                .into_diagnostic()
                .wrap_err(format!("reading {}", path.display()))?,
            None => {
                let github = GithubClient::new(token, config.github.api_base.clone())?;
                github.fetch_pr_diff(&repo, pr_number).await?
            }
        };
        let store = DirStore::new(&config.standards.dir);
        let bundle = magpie_standards::resolve(&diff, &store, &config.standards);
        let request = assemble_request(agent, &config.llm.model, &diff, &bundle);

        println!("model: {}", request.model);
        println!("\n--- system message ---\n{}", request.system);
        println!("\n--- user message ---\n{}", request.user);
        return Ok(());
    }

    let github = GithubClient::new(token, config.github.api_base.clone())?;
    let router = CompletionRouter::new(&config.llm)?;
    let pipeline = Pipeline::new(&config, github, router);

    let ctx = RunContext {
        repo,
        pr_number,
        agent_key,
    };

    let spinner = if std::io::stderr().is_terminal() {
        let pb = indicatif::ProgressBar::new_spinner();
        pb.set_style(
            indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
                .expect("spinner template"),
        );
        pb.set_message(format!("Running {} agent on PR #{}...", ctx.agent_key, ctx.pr_number));
        pb.enable_steady_tick(std::time::Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    let report = pipeline.run(&ctx).await.inspect_err(|_e| {
        if let Some(pb) = &spinner {
            pb.finish_with_message("Failed");
        }
    })?;

    if let Some(pb) = spinner {
        pb.finish_with_message("Done");
    }

    match &report.failure {
        Some(failure) => eprintln!(
            "Published a warning comment on PR #{} ({} agent, completion failed: {})",
            ctx.pr_number, report.agent, failure.kind,
        ),
        None => eprintln!(
            "Published {} feedback on PR #{} ({} bytes)",
            report.agent,
            ctx.pr_number,
            report.comment_body.len(),
        ),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => MagpieConfig::from_file(path)?,
        None => {
            let default_path = std::path::Path::new(".magpie.toml");
            if default_path.exists() {
                MagpieConfig::from_file(default_path)?
            } else {
                MagpieConfig::default()
            }
        }
    };
    apply_environment(&mut config);

    match cli.command {
        None => {
            Cli::command().print_help().into_diagnostic()?;
            Ok(())
        }
        Some(Command::Run {
            agent,
            model,
            repo,
            pr,
            git_ref,
            github_token,
            standards_dir,
            diff_file,
            dry_run,
        }) => {
            if let Some(dir) = standards_dir {
                config.standards.dir = dir;
            }
            run_pipeline(
                &config,
                agent,
                model,
                repo,
                pr,
                git_ref,
                github_token,
                diff_file,
                dry_run,
            )
            .await
        }
        Some(Command::Init) => {
            let path = std::path::Path::new(".magpie.toml");
            if path.exists() {
                miette::bail!(".magpie.toml already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created .magpie.toml with default configuration");
            Ok(())
        }
        Some(Command::Doctor { json }) => run_doctor(&config, json),
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "magpie", &mut std::io::stdout());
            Ok(())
        }
    }
}
