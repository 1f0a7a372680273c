//! pg-schema-diff CLI - print the DDL that turns the old schema into the new one.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use pg_schema_diff::catalog::PgCatalog;
use pg_schema_diff::config::Config;
use pg_schema_diff::error::SchemaRole;
use pg_schema_diff::script::current_version;
use pg_schema_diff::{MigrationRun, generate_migration};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pg-schema-diff")]
#[command(about = "Generate DDL that converges a PostgreSQL schema onto a reference schema")]
#[command(version)]
struct Cli {
    /// Connection URL of the current schema (the one to migrate)
    #[arg(long = "old-db", env = "PG_SCHEMA_DIFF_OLD_DB")]
    old_db: Option<String>,

    /// Connection URL of the reference schema
    #[arg(long = "new-db", env = "PG_SCHEMA_DIFF_NEW_DB")]
    new_db: Option<String>,

    /// Config file (defaults to ./pg-schema-diff.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log verbosity: debug, info, warn, error (RUST_LOG takes precedence)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Do not print the summary to stderr
    #[arg(short, long)]
    quiet: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    setup_logging(&cli.log_level);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pg_schema_diff={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())
        .context("Failed to load configuration")?
        .with_overrides(cli.old_db, cli.new_db);
    config.validate()?;

    let new = PgCatalog::connect(&config.new_url, &config.schema, SchemaRole::New).await?;
    let old = PgCatalog::connect(&config.old_url, &config.schema, SchemaRole::Old).await?;

    let result = generate_migration(&old, &new, current_version()).await;

    old.close().await;
    new.close().await;

    let run = result?;
    print!("{}", run.script);

    if !cli.quiet {
        print_summary(&run);
    }
    Ok(())
}

fn headline(run: &MigrationRun) -> String {
    let changes = &run.changes;

    if !run.script.is_empty() {
        format!(
            "{} statement(s): {} table(s) created, {} dropped, {} altered",
            run.script.statements().len(),
            changes.tables_to_create.len(),
            changes.tables_to_drop.len(),
            changes.table_changes.len()
        )
    } else if run.skipped.is_empty() {
        "No differences - schemas are identical".to_string()
    } else {
        "No differences found in the metadata that could be read".to_string()
    }
}

fn print_summary(run: &MigrationRun) {
    eprintln!("{} {}", "✓".green(), headline(run));

    if !run.skipped.is_empty() {
        eprintln!(
            "{} {} metadata fetch(es) failed, review the script for gaps:",
            "⚠".yellow(),
            run.skipped.len()
        );
        for skip in &run.skipped {
            eprintln!(
                "  {} {} of {} ({} schema): {}",
                "-".dimmed(),
                skip.kind,
                skip.table.yellow(),
                skip.role,
                skip.reason.dimmed()
            );
        }
    }
}
