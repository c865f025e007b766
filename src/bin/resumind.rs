//! CLI binary for resumind.
//!
//! A thin shim over the library crate that maps CLI flags to `ReviewConfig`,
//! runs the workflow against the local file-backed platform, and prints the
//! results page.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use resumind::pipeline::input::resolve_resume;
use resumind::report::render_submission;
use resumind::{
    Platform, ProgressCallback, ReviewConfig, ReviewProgressCallback, Reviewer, SubmissionForm,
    WorkflowState,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner showing the workflow stage as its prefix and the status line as
/// its message. Model failures are printed above it as they happen.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style =
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("idle");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ReviewProgressCallback for CliProgressCallback {
    fn on_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    fn on_state(&self, state: WorkflowState) {
        match state {
            WorkflowState::Complete | WorkflowState::Error => self.bar.finish_and_clear(),
            other => self.bar.set_prefix(other.to_string()),
        }
    }

    fn on_model_start(&self, model: &str, position: usize, total: usize) {
        self.bar.println(format!(
            "  {} {} {}",
            cyan("◆"),
            bold(model),
            dim(&format!("({position}/{total})"))
        ));
    }

    fn on_model_error(&self, model: &str, error: &str) {
        let msg = if error.chars().count() > 100 {
            let cut: String = error.chars().take(99).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };
        self.bar.println(format!("  {} {}  {}", red("✗"), model, red(&msg)));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Start a local session (required before anything else)
  resumind sign-in

  # Review a resume for a role
  resumind review resume.pdf --job-title "Backend Engineer" --company Acme

  # Include the job description from a file, feedback in Persian
  resumind review cv.pdf --job-title SRE --job-description-file jd.txt --language Persian

  # Try a different model order
  resumind review cv.pdf --model claude-sonnet-4 --model claude-3-5-sonnet-20241022

  # Show a stored review, or list them all
  resumind show 3f0c9a1e-...
  resumind list

  # Delete every stored file and record
  resumind wipe --yes

ENVIRONMENT VARIABLES:
  ANTHROPIC_API_KEY       Anthropic API key (default provider)
  OPENAI_API_KEY          OpenAI API key
  EDGEQUAKE_LLM_PROVIDER  Provider name (anthropic, openai, gemini, ollama, ...)
  RESUMIND_DATA_DIR       Where files, records and the session live
  PDFIUM_LIB_PATH         Path to an existing libpdfium
"#;

#[derive(Parser, Debug)]
#[command(
    name = "resumind",
    version,
    about = "AI feedback on PDF resumes, scored against a target job",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory holding uploaded files, records, and the session.
    #[arg(long, global = true, env = "RESUMIND_DATA_DIR", default_value = ".resumind")]
    data_dir: PathBuf,

    /// Username for `sign-in`.
    #[arg(long, global = true, env = "RESUMIND_USER", default_value = "guest")]
    user: String,

    /// Debug-level logs.
    #[arg(short, long, global = true, env = "RESUMIND_VERBOSE")]
    verbose: bool,

    /// Errors only.
    #[arg(short, long, global = true, env = "RESUMIND_QUIET")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a local session.
    SignIn,
    /// End the local session.
    SignOut,
    /// Review a resume (local path or URL).
    Review(ReviewArgs),
    /// Print a stored review.
    Show {
        id: String,
        /// Print the raw record as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List stored reviews.
    List,
    /// Delete every stored file and record.
    Wipe {
        /// Skip the confirmation check.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args, Debug)]
struct ReviewArgs {
    /// Resume PDF: local path or http(s) URL.
    input: String,

    #[arg(long, env = "RESUMIND_COMPANY", default_value = "")]
    company: String,

    #[arg(long, env = "RESUMIND_JOB_TITLE", default_value = "")]
    job_title: String,

    #[arg(long, env = "RESUMIND_JOB_DESCRIPTION", conflicts_with = "job_description_file")]
    job_description: Option<String>,

    #[arg(long)]
    job_description_file: Option<PathBuf>,

    /// Candidate model, tried in the order given. Repeat for fallbacks.
    #[arg(long = "model", env = "RESUMIND_MODELS", value_delimiter = ',')]
    models: Vec<String>,

    #[arg(long, env = "EDGEQUAKE_LLM_PROVIDER")]
    provider: Option<String>,

    /// Language for all feedback text.
    #[arg(long, env = "RESUMIND_LANGUAGE")]
    language: Option<String>,

    /// Seconds each model may take before the next is tried.
    #[arg(long, env = "RESUMIND_TIMEOUT", default_value_t = 60)]
    timeout: u64,

    #[arg(long, env = "RESUMIND_SCALE", default_value_t = 4.0)]
    scale: f32,

    #[arg(long, env = "RESUMIND_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    #[arg(long, env = "RESUMIND_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    #[arg(long, env = "RESUMIND_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print the stored record as JSON instead of the report.
    #[arg(long)]
    json: bool,

    #[arg(long, env = "RESUMIND_NO_PROGRESS")]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner carries the status line; keep library logs quiet under it.
    let spinner = match cli.command {
        Command::Review(ref args) => !cli.quiet && !args.no_progress && !args.json,
        _ => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || spinner {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::SignIn => {
            let platform = Platform::local(&cli.data_dir, &cli.user, &ReviewConfig::default());
            let user = platform.auth.sign_in().await.context("Sign-in failed")?;
            eprintln!("{} Signed in as {}", green("✔"), bold(&user.username));
        }
        Command::SignOut => {
            let platform = Platform::local(&cli.data_dir, &cli.user, &ReviewConfig::default());
            platform.auth.sign_out().await.context("Sign-out failed")?;
            eprintln!("{} Signed out", green("✔"));
        }
        Command::Review(ref args) => review(&cli, args, spinner).await?,
        Command::Show { ref id, json } => {
            let reviewer = offline_reviewer(&cli);
            let submission = reviewer.load(id).await.context("Failed to load review")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&submission)?);
            } else {
                print!("{}", render_submission(&submission));
            }
        }
        Command::List => {
            let reviewer = offline_reviewer(&cli);
            let all = reviewer.list().await.context("Failed to list reviews")?;
            if all.is_empty() {
                eprintln!("{}", dim("No reviews yet."));
            }
            for s in all {
                let score = match s.feedback {
                    Some(ref f) => format!("{:>3}/100", f.overall_score),
                    None => dim("pending"),
                };
                println!(
                    "{}  {}  {}  {}",
                    s.id,
                    score,
                    if s.job_title.is_empty() {
                        "-"
                    } else {
                        s.job_title.as_str()
                    },
                    dim(&s.company_name)
                );
            }
        }
        Command::Wipe { yes } => {
            if !yes {
                anyhow::bail!("Refusing to wipe without --yes");
            }
            let reviewer = offline_reviewer(&cli);
            let report = reviewer.wipe().await.context("Wipe failed")?;
            eprintln!(
                "{} Deleted {} file(s) and {} record(s)",
                green("✔"),
                report.deleted_files.len(),
                report.cleared_records
            );
        }
    }

    Ok(())
}

async fn review(cli: &Cli, args: &ReviewArgs, spinner: bool) -> Result<()> {
    let form = read_form(args).await?;

    // The spinner ticks until the workflow reaches complete or error, so it
    // is only created once the inputs are in hand.
    let progress = if spinner {
        Some(CliProgressCallback::new() as ProgressCallback)
    } else {
        None
    };
    let config = build_config(args, progress)?;

    let platform = Platform::local(&cli.data_dir, &cli.user, &config);
    let reviewer = Reviewer::new(platform, config);
    let outcome = reviewer.submit(form).await.context("Review failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.submission)?);
    } else {
        print!("{}", render_submission(&outcome.submission));
    }
    if !cli.quiet {
        eprintln!(
            "{} Reviewed by {}  →  {}",
            green("✔"),
            bold(&outcome.model),
            cyan(&outcome.route)
        );
    }
    Ok(())
}

/// Reviewer for commands that never render or call a model.
fn offline_reviewer(cli: &Cli) -> Reviewer {
    let config = ReviewConfig::default();
    let platform = Platform::local(&cli.data_dir, &cli.user, &config);
    Reviewer::new(platform, config)
}

/// Read the job description and resume named on the command line.
async fn read_form(args: &ReviewArgs) -> Result<SubmissionForm> {
    let job_description = match args.job_description_file {
        Some(ref path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read job description from {:?}", path))?,
        None => args.job_description.clone().unwrap_or_default(),
    };

    let resume = resolve_resume(&args.input, args.download_timeout)
        .await
        .context("Failed to read resume")?;
    Ok(SubmissionForm::new(resume)
        .company_name(args.company.clone())
        .job_title(args.job_title.clone())
        .job_description(job_description))
}

fn build_config(args: &ReviewArgs, progress: Option<ProgressCallback>) -> Result<ReviewConfig> {
    let mut builder = ReviewConfig::builder()
        .attempt_timeout_secs(args.timeout)
        .render_scale(args.scale)
        .temperature(args.temperature)
        .max_tokens(args.max_tokens);

    if !args.models.is_empty() {
        builder = builder.models(args.models.iter().cloned());
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref language) = args.language {
        builder = builder.feedback_language(language.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
