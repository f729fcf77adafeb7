//! `sqlite-comprehend`: run data in a SQLite table through AWS Comprehend.
//!
//! # Usage
//!
//! ```text
//! sqlite-comprehend entities my.db pages title body
//! sqlite-comprehend entities my.db pages body --where "id < :max_id" -p max_id 50
//! sqlite-comprehend entities my.db pages body --reset -o page_entities
//! ```

mod progress;
mod settings;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use comprehend_aws::ComprehendClient;
use comprehend_core::{job::JobSpec, pipeline, text::TextOptions};
use comprehend_store_sqlite::SqliteStore;
use progress::ProgressReporter;
use settings::AwsArgs;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
  name = "sqlite-comprehend",
  version,
  about = "Tools for running data in a SQLite database through AWS Comprehend"
)]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Extract entities from text columns of a table.
  ///
  /// Results are written to <TABLE>_comprehend_entities unless -o is given.
  /// Rows already processed are skipped, so an interrupted run can simply be
  /// started again.
  Entities(EntitiesArgs),
}

#[derive(Args, Debug)]
struct EntitiesArgs {
  /// SQLite database file; must already exist.
  database: PathBuf,

  /// Table to read rows from.
  table: String,

  /// Text columns, joined with a space into one document per row.
  #[arg(required = true)]
  columns: Vec<String>,

  /// WHERE clause to filter the table.
  #[arg(long = "where", value_name = "SQL")]
  filter: Option<String>,

  /// Named :parameter for the WHERE clause.
  #[arg(
    short = 'p',
    long = "param",
    num_args = 2,
    value_names = ["NAME", "VALUE"],
    action = ArgAction::Append
  )]
  params: Vec<String>,

  /// Custom output table.
  #[arg(short, long, value_name = "TABLE")]
  output: Option<String>,

  /// Drop previous results, checkpoints and dictionaries before starting.
  #[arg(short, long)]
  reset: bool,

  /// Remove HTML/XML tags before sending text.
  #[arg(long)]
  strip_tags: bool,

  /// Settings file (TOML, JSON or YAML) with AWS credentials and region.
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  #[command(flatten)]
  aws: AwsArgs,
}

impl EntitiesArgs {
  fn job_spec(&self) -> JobSpec {
    JobSpec {
      table:   self.table.clone(),
      columns: self.columns.clone(),
      filter:  self.filter.clone(),
      params:  self
        .params
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect(),
      output:  self.output.clone(),
      reset:   self.reset,
      text:    TextOptions { strip_tags: self.strip_tags },
    }
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  match cli.command {
    Command::Entities(args) => entities(args).await,
  }
}

async fn entities(args: EntitiesArgs) -> Result<()> {
  // Opening would silently create an empty database.
  if !args.database.is_file() {
    bail!("database {} does not exist", args.database.display());
  }

  let mut file_settings = settings::load(
    args.config.as_deref(),
    config::Environment::with_prefix(settings::ENV_PREFIX),
  )?;
  if let Some(path) = settings::shared_credentials_path() {
    file_settings = file_settings.or(settings::load_profile(&path, args.aws.profile())?);
  }
  let client_config = settings::resolve(&args.aws, file_settings)?;
  let client = ComprehendClient::new(client_config).context("failed to configure Comprehend client")?;

  let store = SqliteStore::open(&args.database)
    .await
    .with_context(|| format!("failed to open database {}", args.database.display()))?;

  let mut progress = ProgressReporter::new();
  let summary = pipeline::run(&store, &client, args.job_spec(), &mut progress).await?;

  tracing::info!(
    rows = summary.rows_processed,
    entities = summary.entities_written,
    "done"
  );
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(args: &[&str]) -> Result<EntitiesArgs, clap::Error> {
    let cli = Cli::try_parse_from(std::iter::once("sqlite-comprehend").chain(args.iter().copied()))?;
    let Command::Entities(args) = cli.command;
    Ok(args)
  }

  #[test]
  fn minimal_invocation() {
    let args = parse(&["entities", "my.db", "pages", "text"]).unwrap();
    let spec = args.job_spec();

    assert_eq!(args.database, PathBuf::from("my.db"));
    assert_eq!(spec.table, "pages");
    assert_eq!(spec.columns, vec!["text"]);
    assert_eq!(spec.output_table(), "pages_comprehend_entities");
    assert!(!spec.reset);
    assert!(!spec.text.strip_tags);
  }

  #[test]
  fn full_invocation() {
    let args = parse(&[
      "entities", "my.db", "pages", "title", "body",
      "--where", "id < :max_id and site = :site",
      "-p", "max_id", "50",
      "--param", "site", "a",
      "-o", "ents",
      "--reset",
      "--strip-tags",
      "--endpoint-url", "http://localhost:4566",
    ])
    .unwrap();
    let spec = args.job_spec();

    assert_eq!(spec.columns, vec!["title", "body"]);
    assert_eq!(spec.filter.as_deref(), Some("id < :max_id and site = :site"));
    assert_eq!(
      spec.params,
      vec![("max_id".to_owned(), "50".to_owned()), ("site".to_owned(), "a".to_owned())]
    );
    assert_eq!(spec.output_table(), "ents");
    assert!(spec.reset);
    assert!(spec.text.strip_tags);
    assert_eq!(args.aws.endpoint_url.as_deref(), Some("http://localhost:4566"));
  }

  #[test]
  fn profile_flag() {
    let args = parse(&["entities", "my.db", "pages", "text", "--profile", "work"]).unwrap();
    assert_eq!(args.aws.profile(), "work");
  }

  #[test]
  fn columns_are_required() {
    assert!(parse(&["entities", "my.db", "pages"]).is_err());
  }

  #[test]
  fn param_needs_name_and_value() {
    assert!(parse(&["entities", "my.db", "pages", "text", "-p", "max_id"]).is_err());
  }

  #[tokio::test]
  async fn missing_database_is_reported_before_anything_else() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.db");
    let args = parse(&["entities", path.to_str().unwrap(), "pages", "text"]).unwrap();

    let err = entities(args).await.unwrap_err();

    assert_eq!(err.to_string(), format!("database {} does not exist", path.display()));
    assert!(!path.exists());
  }
}
