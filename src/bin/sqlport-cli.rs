//! sqlport-cli: evaluate a `.sql` file against the in-memory Spanner-flavoured target
//!
//! Exit codes: 0 when every statement executed, 1 when any failed, 2 when the
//! run could not be set up.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use sqlport::{
    split_statements, Connection, EngineConfig, ErrorStyle, ExecutionEngine, FileReport,
    MemoryConnection, ResultsStore,
};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sqlport-cli")]
#[command(version, about = "Run a SQL file against the memory target and classify every failure", long_about = None)]
struct Args {
    /// SQL script to evaluate
    file: PathBuf,

    /// Engine config (JSON); defaults to the Spanner preset
    #[arg(long)]
    config: Option<PathBuf>,

    /// Append the execution result to this accumulated results file
    #[arg(long)]
    results: Option<PathBuf>,

    /// Keep created objects instead of dropping them afterwards
    #[arg(long, default_value_t = false)]
    no_cleanup: bool,

    /// Wrapper used for target error messages
    #[arg(long, value_enum, default_value_t = Style::Rpc)]
    error_style: Style,

    /// Print the report as JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Style {
    Rpc,
    Spanner,
}

impl From<Style> for ErrorStyle {
    fn from(style: Style) -> Self {
        match style {
            Style::Rpc => ErrorStyle::Rpc,
            Style::Spanner => ErrorStyle::SpannerClient,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sqlport=info,warn")),
        )
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// Returns whether the run was free of statement errors
fn run(args: &Args) -> Result<bool> {
    let config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::for_spanner(),
    };

    let script = std::fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let statements = split_statements(&script);
    info!(file = %args.file.display(), statements = statements.len(), "loaded script");

    let mut conn = MemoryConnection::new().with_error_style(args.error_style.into());
    let name = args.file.display().to_string();
    let stdout = std::io::stdout();
    evaluate(&mut conn, config, &statements, &name, args, &mut stdout.lock())
}

/// Executes, writes the report, records it, then tears down
fn evaluate(
    conn: &mut dyn Connection,
    config: EngineConfig,
    statements: &[String],
    name: &str,
    args: &Args,
    out: &mut impl Write,
) -> Result<bool> {
    let start = Instant::now();
    let mut engine = ExecutionEngine::new(conn, config).context("building engine")?;
    let result = engine
        .execute_statements(statements)
        .context("executing statements")?;
    let elapsed = start.elapsed();

    let report = FileReport::from_execution(name, &result, elapsed);
    if args.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        write!(out, "{}", report.render_terminal())?;
    }
    out.flush()?;

    if let Some(path) = &args.results {
        let store = ResultsStore::new(path);
        store
            .record(name, &result)
            .with_context(|| format!("writing results to {}", path.display()))?;
    }

    // teardown last
    if !args.no_cleanup {
        engine.cleanup().context("cleaning up")?;
    }

    Ok(!result.has_errors())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlport::DriverError;
    use tempfile::TempDir;

    fn args(results: Option<PathBuf>) -> Args {
        Args {
            file: PathBuf::from("fixture.sql"),
            config: None,
            results,
            no_cleanup: false,
            error_style: Style::Rpc,
            json: false,
        }
    }

    #[test]
    fn test_report_survives_failed_cleanup() {
        let dir = TempDir::new().unwrap();
        let results = dir.path().join("results.json");
        let mut conn = MemoryConnection::new();
        conn.fail_on("drop table if exists", DriverError::status("FailedPrecondition", "locked"));

        let statements = vec!["CREATE TABLE notes (id INT64 NOT NULL) PRIMARY KEY (id)".to_string()];
        let mut out = Vec::new();
        let outcome = evaluate(
            &mut conn,
            EngineConfig::for_spanner(),
            &statements,
            "fixture.sql",
            &args(Some(results.clone())),
            &mut out,
        );

        assert!(outcome.is_err());
        assert!(String::from_utf8(out).unwrap().contains("fixture.sql"));
        assert_eq!(ResultsStore::new(&results).load().unwrap().runs.len(), 1);
    }

    #[test]
    fn test_clean_run_reports_success() {
        let mut conn = MemoryConnection::new();
        let statements = vec!["DROP TABLE ghost".to_string()];
        let mut out = Vec::new();
        let clean = evaluate(
            &mut conn,
            EngineConfig::for_spanner(),
            &statements,
            "ghost.sql",
            &args(None),
            &mut out,
        )
        .unwrap();
        assert!(clean);
    }
}
