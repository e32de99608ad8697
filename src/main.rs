use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use askql::analyst::{Analyst, AnalysisResult, AnalyzeOptions};
use askql::generation::GenerationConfig;
use askql::schema::ResultSet;
use askql::store::PostgresConfig;

#[derive(Parser)]
#[command(name = "askql")]
#[command(
  about = "askql - Ask plain-language questions over CSV/Excel files and SQL databases"
)]
#[command(version)]
struct Cli {
  /// Enable verbose logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

/// Data sources shared by the question-answering commands
#[derive(Args)]
struct SourceArgs {
  /// CSV or Excel files to load (table name = lower-cased file stem)
  #[arg(short, long = "file")]
  files: Vec<PathBuf>,

  /// Explicit table name for the first loaded file
  #[arg(short, long)]
  table: Option<String>,

  #[command(flatten)]
  postgres: PostgresArgs,
}

/// Networked-store connection details; all five are required together
#[derive(Args)]
struct PostgresArgs {
  #[arg(long, env = "ASKQL_PG_HOST")]
  pg_host: Option<String>,
  #[arg(long, env = "ASKQL_PG_PORT")]
  pg_port: Option<u16>,
  #[arg(long, env = "ASKQL_PG_USER")]
  pg_user: Option<String>,
  #[arg(long, env = "ASKQL_PG_PASSWORD")]
  pg_password: Option<String>,
  #[arg(long, env = "ASKQL_PG_DATABASE")]
  pg_database: Option<String>,
}

impl From<&PostgresArgs> for PostgresConfig {
  fn from(args: &PostgresArgs) -> Self {
    Self {
      host: args.pg_host.clone(),
      port: args.pg_port,
      user: args.pg_user.clone(),
      password: args.pg_password.clone(),
      database: args.pg_database.clone(),
    }
  }
}

#[derive(Subcommand)]
enum Commands {
  /// Ask one question and print the answer
  Ask {
    /// The question, in plain language
    question: String,

    #[command(flatten)]
    source: SourceArgs,

    /// Summarize results without the generation endpoint
    #[arg(long)]
    fast: bool,

    /// Suggest a chart for the results
    #[arg(long)]
    chart: bool,

    /// Translate non-English questions before SQL generation
    #[arg(long)]
    translate: bool,

    /// Print the full analysis payload as JSON
    #[arg(long)]
    json: bool,
  },
  /// Interactive session: one question per line
  Repl {
    #[command(flatten)]
    source: SourceArgs,

    /// Summarize results without the generation endpoint
    #[arg(long)]
    fast: bool,
  },
  /// Load files and print their schema summaries
  Tables {
    #[command(flatten)]
    source: SourceArgs,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("askql=debug,info")
  } else {
    EnvFilter::new("askql=info,warn")
  };
  tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

  match cli.command {
    Commands::Ask { question, source, fast, chart, translate, json } => {
      let mut analyst = build_analyst(&source).await?;
      let options = AnalyzeOptions { fast_insights: fast, chart, translate };
      let result = analyst.analyze(&question, options).await;

      if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
      } else {
        print_result(&result);
      }

      if !result.success {
        std::process::exit(1);
      }
    }
    Commands::Repl { source, fast } => {
      let mut analyst = build_analyst(&source).await?;
      run_repl(&mut analyst, fast).await?;
    }
    Commands::Tables { source } => {
      let analyst = build_analyst(&source).await?;
      print_tables(&analyst);
    }
  }

  Ok(())
}

/// Build a session from CLI args: Postgres when any connection flag is set
/// (all five must then be present), otherwise the embedded store.
async fn build_analyst(source: &SourceArgs) -> Result<Analyst> {
  let pg = PostgresConfig::from(&source.postgres);

  let mut analyst = if pg.is_requested() {
    Analyst::connect_postgres(&pg, GenerationConfig::from_env()).await?
  } else {
    Analyst::new()?
  };

  for (i, file) in source.files.iter().enumerate() {
    let table = if i == 0 { source.table.as_deref() } else { None };
    let message = analyst.load_file(file, table).await?;
    eprintln!("{} {message}", "✓".green());
  }

  Ok(analyst)
}

fn print_result(result: &AnalysisResult) {
  if !result.success {
    if let Some(error) = &result.error {
      eprintln!("{} {error}", "✗".red());
    }
    return;
  }

  println!("{} {}", "SQL:".dimmed(), result.sql_query);
  if let Some(warning) = &result.warning {
    eprintln!("{} {warning}", "!".yellow());
  }

  if !result.results.is_empty() {
    println!();
    print_table(&result.results);
  }

  println!();
  println!("{}", result.insights);

  if let Some(chart) = &result.chart {
    let axes = match &chart.y {
      Some(y) => format!("{} vs {y}", chart.x),
      None => chart.x.clone(),
    };
    println!("{} {:?} chart over {axes}", "Chart:".dimmed(), chart.kind);
  }
}

/// Render a result set as an aligned text table, capped to keep terminal
/// output readable.
fn print_table(results: &ResultSet) {
  const MAX_ROWS: usize = 20;

  let mut widths: Vec<usize> = results.columns.iter().map(|c| c.len()).collect();
  for row in results.rows.iter().take(MAX_ROWS) {
    for (i, value) in row.iter().enumerate() {
      widths[i] = widths[i].max(value.to_string().len());
    }
  }

  let header: Vec<String> = results
    .columns
    .iter()
    .enumerate()
    .map(|(i, c)| format!("{:<width$}", c, width = widths[i]))
    .collect();
  println!("{}", header.join("  ").bold());

  for row in results.rows.iter().take(MAX_ROWS) {
    let line: Vec<String> = row
      .iter()
      .enumerate()
      .map(|(i, v)| format!("{:<width$}", v.to_string(), width = widths[i]))
      .collect();
    println!("{}", line.join("  "));
  }

  if results.len() > MAX_ROWS {
    println!("… {} more rows", results.len() - MAX_ROWS);
  }
}

fn print_tables(analyst: &Analyst) {
  if analyst.schema().is_empty() {
    println!("No tables loaded.");
    return;
  }

  for table in analyst.schema().tables() {
    println!(
      "{} ({} rows): {}",
      table.name.cyan(),
      table.row_count,
      table.columns.join(", ")
    );
  }
}

async fn run_repl(analyst: &mut Analyst, fast: bool) -> Result<()> {
  println!("askql interactive session. \\tables lists tables, \\history shows past answers, \\quit exits.");

  let stdin = std::io::stdin();
  let mut line = String::new();

  loop {
    print!("{} ", "ask>".cyan());
    std::io::stdout().flush()?;

    line.clear();
    if stdin.lock().read_line(&mut line)? == 0 {
      break;
    }
    let input = line.trim();
    if input.is_empty() {
      continue;
    }

    match input {
      "\\quit" | "\\q" => break,
      "\\tables" => print_tables(analyst),
      "\\history" => {
        for (i, past) in analyst.history().iter().enumerate() {
          let status = if past.success { "ok".green() } else { "failed".red() };
          println!("{:>3}. [{status}] {}", i + 1, past.question);
          if !past.sql_query.is_empty() {
            println!("     {}", past.sql_query.dimmed());
          }
        }
      }
      question => {
        let options = AnalyzeOptions { fast_insights: fast, ..Default::default() };
        let result = analyst.analyze(question, options).await;
        print_result(&result);
      }
    }
  }

  Ok(())
}
