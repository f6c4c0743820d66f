// # -----------------------------
// # crates/cli/src/main.rs
// # -----------------------------
use std::io::{self, Write};
use std::path::PathBuf;

use agent_activity::{
    parse_issue_number, ActivityLog, ActivityResult, LogConfig, DEFAULT_AGENT_ID,
};
use anyhow::Result;
use clap::{ArgGroup, Parser};
use tracing_subscriber::{fmt, EnvFilter};

mod output;

const USAGE: &str = "log_agent_activity <action> <issue_number> [agent_id] [details]\n       \
                     log_agent_activity [--recent [N] | --issue <N> | --agent <ID>]";

#[derive(Parser, Debug)]
#[command(
    name = "log_agent_activity",
    version,
    about = "Append agent activity to the shared JSONL log, or query it",
    override_usage = USAGE,
    group(
        ArgGroup::new("query")
            .args(["recent", "issue", "agent"])
            .conflicts_with("action")
    )
)]
struct Cli {
    /// Action tag (claim, abandon, state_change, pr_created, pr_merged, comment, ...)
    action: Option<String>,
    /// Issue the action refers to
    #[arg(allow_negative_numbers = true)]
    issue_number: Option<String>,
    /// Agent performing the action
    #[arg(allow_hyphen_values = true)]
    agent_id: Option<String>,
    /// Free-form details
    #[arg(allow_hyphen_values = true)]
    details: Option<String>,
    /// Anything past the details is accepted and dropped
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    extra: Vec<String>,

    /// Print the most recent records (default window from config)
    #[arg(long, value_name = "N", num_args = 0..=1)]
    recent: Option<Option<usize>>,
    /// Print every record for an issue
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    issue: Option<String>,
    /// Print every record written by an agent
    #[arg(long, value_name = "ID")]
    agent: Option<String>,

    /// Activity log file (defaults to <install root>/logs/activity_log.jsonl)
    #[arg(long = "log-file", value_name = "PATH")]
    log_file: Option<PathBuf>,
    /// TOML config file with `log_file` and `recent_limit`
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Log level (trace, debug, info, warn, error, off). Overrides RUST_LOG if set.
    #[arg(long = "log-level", value_name = "LEVEL")]
    log_level: Option<String>,
    /// Human-readable query output instead of JSON lines
    #[arg(long)]
    pretty: bool,
}

/// Initialize logging based on CLI arguments and environment
fn init_logging(log_level: Option<&str>) {
    // CLI arg overrides RUST_LOG
    let filter = if let Some(level) = log_level {
        match level.to_lowercase().as_str() {
            "off" => EnvFilter::new("off"),
            "error" => EnvFilter::new("error"),
            "warn" | "warning" => EnvFilter::new("warn"),
            "info" => EnvFilter::new("info"),
            "debug" => EnvFilter::new("debug"),
            "trace" => EnvFilter::new("trace"),
            _ => {
                eprintln!("Warning: Invalid log level '{}', using 'info'", level);
                EnvFilter::new("info")
            }
        }
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // stdout carries records; diagnostics go to stderr
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Wraps a library failure with what was being done and its error code.
fn coded<T, F>(result: ActivityResult<T>, doing: F) -> Result<T>
where
    F: FnOnce() -> String,
{
    result.map_err(|err| {
        let code = err.error_code();
        let doing = doing();
        anyhow::Error::new(err).context(format!("{doing} [{code}]"))
    })
}

fn resolve_config(cli: &Cli) -> Result<LogConfig> {
    let mut config = match &cli.config {
        Some(path) => coded(LogConfig::load(path), || {
            format!("load config {}", path.display())
        })?,
        None => LogConfig::default(),
    };
    if let Some(log_file) = &cli.log_file {
        config.log_file = log_file.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());
    tracing::debug!("CLI arguments: {:?}", cli);

    let config = resolve_config(&cli)?;
    let log = ActivityLog::from_config(&config);
    tracing::debug!(path = %log.path().display(), "activity log resolved");

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Some(window) = cli.recent {
        let records = coded(
            log.get_recent_activity(window.unwrap_or(config.recent_limit)),
            || format!("read {}", log.path().display()),
        )?;
        output::write_records(&mut out, &records, cli.pretty)?;
        return Ok(());
    }
    if let Some(raw) = &cli.issue {
        let issue = coded(parse_issue_number(raw), || "parse --issue".to_string())?;
        let records = coded(log.get_activity_for_issue(issue), || {
            format!("read {}", log.path().display())
        })?;
        output::write_records(&mut out, &records, cli.pretty)?;
        return Ok(());
    }
    if let Some(agent) = &cli.agent {
        let records = coded(log.get_activity_for_agent(agent), || {
            format!("read {}", log.path().display())
        })?;
        output::write_records(&mut out, &records, cli.pretty)?;
        return Ok(());
    }

    let (Some(action), Some(issue_number)) = (&cli.action, &cli.issue_number) else {
        output::write_usage(&mut out)?;
        out.flush()?;
        std::process::exit(1);
    };

    if !cli.extra.is_empty() {
        tracing::debug!(ignored = ?cli.extra, "extra positional arguments dropped");
    }

    let record = coded(
        log.log_activity(
            action,
            issue_number,
            cli.agent_id.as_deref().unwrap_or(DEFAULT_AGENT_ID),
            cli.details.as_deref().unwrap_or(""),
        ),
        || format!("log activity to {}", log.path().display()),
    )?;

    tracing::info!(action = %record.action, issue = record.issue_number, "activity logged");
    writeln!(
        out,
        "✅ Logged: {} on issue #{} by {}",
        record.action, record.issue_number, record.agent_id
    )?;
    Ok(())
}
