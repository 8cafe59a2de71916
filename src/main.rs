// This is the entry point of the moderation worker.
//
// It reads newline-delimited JSON requests from stdin:
//     {"text": "...", "context": "message"}
// and writes one JSON report per request to stdout, in input order.
//
// This file's job is to:
// 1. Load configuration
// 2. Load and compile the rule table (fatal if invalid)
// 3. Moderate requests concurrently on one shared engine

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use content_moderation::core::moderation::{
    BuiltinRuleSource, Context, ModerationEngine, ModerationVerdict, RuleSource, RuleTable,
};
use content_moderation::infra::moderation::JsonRuleSource;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

const DEFAULT_WORKERS: usize = 4;

/// Settings read from the environment (and `.env`, if present).
#[derive(Debug)]
struct WorkerConfig {
    rules_file: Option<PathBuf>,
    default_context: Context,
    workers: usize,
}

impl WorkerConfig {
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let rules_file = get("MODERATION_RULES_FILE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let default_context = match get("MODERATION_DEFAULT_CONTEXT") {
            Some(tag) => tag
                .parse::<Context>()
                .context("MODERATION_DEFAULT_CONTEXT is not a known context")?,
            None => Context::General,
        };

        let workers = get("MODERATION_WORKERS")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_WORKERS);

        Ok(Self {
            rules_file,
            default_context,
            workers,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ModerationRequest {
    text: String,
    #[serde(default)]
    context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModerationReport {
    line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    checked_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    verdict: Option<ModerationVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ModerationReport {
    fn checked(line: usize, verdict: ModerationVerdict) -> Self {
        Self {
            line,
            checked_at: Some(Utc::now()),
            verdict: Some(verdict),
            error: None,
        }
    }

    fn failed(line: usize, error: String) -> Self {
        Self {
            line,
            checked_at: None,
            verdict: None,
            error: Some(error),
        }
    }
}

/// Parse and moderate one request line. Bad requests become error reports.
fn moderate_line(
    engine: &ModerationEngine,
    line_no: usize,
    line: &str,
    default_context: Context,
) -> ModerationReport {
    let request: ModerationRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => return ModerationReport::failed(line_no, format!("Invalid request: {e}")),
    };

    let context = match request.context.as_deref() {
        Some(tag) => match tag.parse::<Context>() {
            Ok(context) => context,
            Err(e) => return ModerationReport::failed(line_no, e.to_string()),
        },
        None => default_context,
    };

    ModerationReport::checked(line_no, engine.moderate(&request.text, context))
}

/// Await one report and write it out. Returns whether the content was flagged.
async fn write_report<W: AsyncWrite + Unpin>(
    out: &mut W,
    handle: tokio::task::JoinHandle<ModerationReport>,
) -> Result<bool> {
    let report = handle.await.context("Moderation task panicked")?;
    let mut json = serde_json::to_vec(&report)?;
    json.push(b'\n');
    out.write_all(&json).await?;
    Ok(report.verdict.as_ref().is_some_and(|v| !v.is_safe))
}

/// Moderate every request line from `input`, writing reports to `out` in
/// input order. Returns `(lines read, flagged reports)`.
async fn run_worker<R, W>(
    engine: Arc<ModerationEngine>,
    config: &WorkerConfig,
    input: R,
    out: &mut W,
) -> Result<(usize, usize)>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    let mut pending = VecDeque::new();
    let mut line_no = 0;
    let mut flagged = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let engine = Arc::clone(&engine);
        let default_context = config.default_context;
        pending.push_back(tokio::task::spawn_blocking(move || {
            moderate_line(&engine, line_no, &line, default_context)
        }));

        // Keep at most `workers` requests in flight, writing in input order
        while pending.len() >= config.workers {
            if let Some(handle) = pending.pop_front() {
                flagged += usize::from(write_report(out, handle).await?);
            }
        }
    }

    while let Some(handle) = pending.pop_front() {
        flagged += usize::from(write_report(out, handle).await?);
    }
    out.flush().await?;

    Ok((line_no, flagged))
}

async fn load_rules(config: &WorkerConfig) -> Result<RuleTable> {
    let source: Box<dyn RuleSource> = match &config.rules_file {
        Some(path) => Box::new(JsonRuleSource::new(path)),
        None => Box::new(BuiltinRuleSource),
    };

    tracing::info!("Loading moderation rules from {}", source.describe());
    source
        .load()
        .await
        .with_context(|| format!("Failed to load rules from {}", source.describe()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the reports
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Some(pos) = args.iter().position(|a| a == "--export-rules") {
        let path = args
            .get(pos + 1)
            .context("--export-rules needs a file path")?;
        JsonRuleSource::new(path)
            .save(&RuleTable::builtin())
            .await
            .with_context(|| format!("Failed to export rules to {path}"))?;
        tracing::info!("Built-in rules exported to {}", path);
        return Ok(());
    }

    let config = WorkerConfig::from_env()?;
    tracing::debug!(?config, "Worker configuration");

    // Compile once; an invalid table must stop us before any request is served
    let table = load_rules(&config).await?;
    let engine = Arc::new(ModerationEngine::new(&table).context("Invalid moderation rule table")?);

    let mut out = tokio::io::stdout();
    let (requests, flagged) = run_worker(engine, &config, tokio::io::stdin(), &mut out).await?;

    tracing::info!(requests, flagged, "Input exhausted, shutting down");
    Ok(())
}
