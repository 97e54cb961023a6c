//! Casefile CLI
//!
//! Detective cases solved with SQL, from the terminal:
//! - Browsing the case catalog and reading briefs
//! - Running one-off queries against a freshly seeded case database
//! - Rendering the case schema as text, Graphviz DOT or JSON
//! - An interactive shell with dot-commands and tab completion
//! - Submitting answers and tracking XP in a progress file

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

use casefile_catalog::{category, Case, CaseCatalog, CATEGORIES};
use casefile_engine::{EngineBootstrap, LoadOutcome, SchemaReflector, Workbench};
use casefile_progress::{submit_answer, InMemoryLedger, JsonFileLedger, ProgressLedger};
use casefile_schema::DEFAULT_LAYOUT_RADIUS;

mod output;
mod repl;

#[derive(Parser)]
#[command(name = "casefile")]
#[command(author, version, about = "Casefile: crack detective cases with SQL")]
struct Cli {
    /// Directory of case files (`*.json`); the built-in cases are used otherwise.
    #[arg(long, global = true, env = "CASEFILE_CASES_DIR")]
    cases_dir: Option<PathBuf>,

    /// JSON file recording XP and solved cases.
    #[arg(long, global = true, env = "CASEFILE_PROGRESS")]
    progress: Option<PathBuf>,

    /// Player id credited for solved cases.
    #[arg(long, global = true, env = "CASEFILE_USER")]
    user: Option<String>,

    /// Log engine activity to stderr (`RUST_LOG` overrides).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List cases by category, with lock and completion status.
    Cases,

    /// Show the brief, objectives and tables of a case.
    Brief {
        /// Case id (e.g. `case-001`)
        case: String,
    },

    /// Run one SQL query against a fresh copy of the case database.
    Query {
        case: String,
        sql: String,
        #[arg(long, value_enum, default_value_t = QueryFormat::Table)]
        format: QueryFormat,
    },

    /// Render the tables and foreign keys of a case.
    Schema {
        case: String,
        #[arg(long, value_enum, default_value_t = SchemaFormat::Text)]
        format: SchemaFormat,
        /// Radius of the circular node layout
        #[arg(long, default_value_t = DEFAULT_LAYOUT_RADIUS)]
        radius: f64,
    },

    /// Interactive SQL shell for a case.
    Repl { case: String },

    /// Submit an answer for a case.
    Solve { case: String, answer: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum QueryFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum SchemaFormat {
    Text,
    Dot,
    Json,
}

// ============================================================================
// Application context
// ============================================================================

pub(crate) struct App {
    rt: Runtime,
    pub catalog: Arc<CaseCatalog>,
    pub bench: Workbench,
    ledger: Arc<dyn ProgressLedger>,
    user: Option<String>,
}

impl App {
    fn new(cli: &Cli) -> Result<Self> {
        let catalog = match &cli.cases_dir {
            Some(dir) => CaseCatalog::from_dir(dir)
                .with_context(|| format!("failed to load cases from {}", dir.display()))?,
            None => CaseCatalog::builtin().context("built-in cases are invalid")?,
        };
        let catalog = Arc::new(catalog);

        let ledger: Arc<dyn ProgressLedger> = match &cli.progress {
            Some(path) => Arc::new(JsonFileLedger::new(path)),
            None => Arc::new(InMemoryLedger::new()),
        };

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| anyhow!("failed to initialize tokio runtime: {e}"))?;

        Ok(Self {
            rt,
            bench: Workbench::new(EngineBootstrap::global(), catalog.clone()),
            catalog,
            ledger,
            user: cli.user.clone(),
        })
    }

    pub fn case(&self, id: &str) -> Result<&Case> {
        self.catalog
            .get(id)
            .ok_or_else(|| anyhow!("unknown case `{id}` (see `casefile cases`)"))
    }

    /// Make `id` the active case, seeding its database if needed.
    pub fn open_case(&self, id: &str) -> Result<&Case> {
        let case = self.case(id)?;
        let outcome = self
            .rt
            .block_on(self.bench.sessions.load_schema(&case.id))
            .with_context(|| format!("failed to open case `{}`", case.id))?;
        if outcome == LoadOutcome::Superseded {
            return Err(anyhow!("loading case `{}` was cancelled", case.id));
        }
        Ok(case)
    }

    pub fn solve(&self, case: &Case, answer: &str) -> Result<()> {
        let submission = self
            .rt
            .block_on(submit_answer(
                case,
                answer,
                self.user.as_deref(),
                self.ledger.as_ref(),
            ))
            .context("failed to record progress")?;
        output::print_submission(case, &submission, self.user.is_some());
        Ok(())
    }

    fn completed_and_xp(&self) -> Result<(BTreeSet<String>, u64)> {
        match &self.user {
            Some(user) => {
                let progress = self
                    .rt
                    .block_on(self.ledger.progress(user))
                    .context("failed to read progress")?;
                Ok((progress.completed_cases, progress.xp))
            }
            None => Ok((BTreeSet::new(), 0)),
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let app = App::new(&cli)?;

    match &cli.command {
        Commands::Cases => cmd_cases(&app),
        Commands::Brief { case } => cmd_brief(&app, case),
        Commands::Query { case, sql, format } => cmd_query(&app, case, sql, *format),
        Commands::Schema {
            case,
            format,
            radius,
        } => cmd_schema(&app, case, *format, *radius),
        Commands::Repl { case } => repl::cmd_repl(&app, case),
        Commands::Solve { case, answer } => {
            let case = app.case(case)?;
            app.solve(case, answer)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn cmd_cases(app: &App) -> Result<()> {
    let (completed, xp) = app.completed_and_xp()?;
    if app.user.is_some() {
        println!("{} {xp}\n", "XP:".bold());
    }

    for cat in CATEGORIES {
        let lock = if cat.is_unlocked(xp) {
            "".normal()
        } else {
            format!(" (locked, {} XP required)", cat.required_xp)
                .as_str()
                .yellow()
        };
        println!("{}{lock}", cat.title.green().bold());
        println!("  {}", cat.description.dimmed());
        for case in app.catalog.in_category(cat.id) {
            output::print_case_line(case, completed.contains(&case.id));
        }
        println!();
    }

    let uncategorized: Vec<&Case> = app
        .catalog
        .cases()
        .iter()
        .filter(|c| category(c.category).is_none())
        .collect();
    if !uncategorized.is_empty() {
        println!("{}", "Other".green().bold());
        for case in uncategorized {
            output::print_case_line(case, completed.contains(&case.id));
        }
    }
    Ok(())
}

fn cmd_brief(app: &App, id: &str) -> Result<()> {
    let case = app.open_case(id)?;
    let graph = app.bench.reflector.reflect()?;

    println!("{} {}", case.id.dimmed(), case.title.green().bold());
    println!(
        "{} · {} · {} XP\n",
        case.category,
        output::difficulty_stars(case.difficulty),
        case.xp_reward
    );
    println!("{}\n", case.brief);
    if !case.objectives.is_empty() {
        println!("{}", "Objectives".bold());
        for (i, objective) in case.objectives.iter().enumerate() {
            println!("  {}. {objective}", i + 1);
        }
        println!();
    }
    println!("{} {}", "Tables:".bold(), graph.table_names().join(", "));
    Ok(())
}

fn cmd_query(app: &App, id: &str, sql: &str, format: QueryFormat) -> Result<()> {
    app.open_case(id)?;
    let result = app.bench.executor.run(sql)?;
    match format {
        QueryFormat::Table => output::print_result(&result),
        QueryFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }
    Ok(())
}

fn cmd_schema(app: &App, id: &str, format: SchemaFormat, radius: f64) -> Result<()> {
    app.open_case(id)?;
    let reflector = SchemaReflector::new(app.bench.sessions.clone()).with_radius(radius);
    let (graph, positions) = reflector.reflect_with_layout()?;
    match format {
        SchemaFormat::Text => print!("{}", output::render_schema_text(&graph, &positions)),
        SchemaFormat::Dot => print!("{}", casefile_schema::render_dot(&graph, &positions)),
        SchemaFormat::Json => println!("{}", casefile_schema::render_json(&graph, &positions)?),
    }
    Ok(())
}
