//! Interactive SQL shell for a case.
//!
//! Lines starting with `.` are shell commands; anything else is SQL run
//! against the active case database. By default `rustyline` provides line
//! editing and tab completion. A minimal stdin-based fallback exists behind
//! `--no-default-features`.

use anyhow::{anyhow, Result};
use colored::Colorize;
#[cfg(not(feature = "repl-rustyline"))]
use std::io::{self, BufRead, Write};

use crate::output;
use crate::App;

const COMMANDS: &[&str] = &[".case", ".exit", ".help", ".quit", ".schema", ".solve", ".tables"];

pub fn cmd_repl(app: &App, case_id: &str) -> Result<()> {
    app.open_case(case_id)?;

    #[cfg(feature = "repl-rustyline")]
    {
        return cmd_repl_rustyline(app);
    }
    #[cfg(not(feature = "repl-rustyline"))]
    {
        return cmd_repl_simple(app);
    }
}

fn print_banner(app: &App) {
    println!("{}", "Casefile SQL shell".green().bold());
    if let Some(case) = active_case(app) {
        println!("Case {}: {}", case.id, case.title.bold());
    }
    println!("Type `.help` for commands. Type `.exit` to quit.\n");
}

fn prompt(app: &App) -> String {
    format!(
        "{}> ",
        app.bench
            .sessions
            .active_puzzle()
            .unwrap_or_else(|| "casefile".to_string())
    )
}

#[cfg(not(feature = "repl-rustyline"))]
fn cmd_repl_simple(app: &App) -> Result<()> {
    print_banner(app);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{}", prompt(app));
        io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let line = line?;
        match dispatch_line(app, line.trim()) {
            Ok(ReplControl::Continue) => {}
            Ok(ReplControl::Exit) => break,
            Err(e) => eprintln!("{} {e:#}", "error:".red().bold()),
        }
    }
    Ok(())
}

#[cfg(feature = "repl-rustyline")]
fn cmd_repl_rustyline(app: &App) -> Result<()> {
    use rustyline::error::ReadlineError;
    use rustyline::Editor;

    print_banner(app);

    let completions = std::sync::Arc::new(std::sync::RwLock::new(CompletionData::default()));
    let helper = ReplLineHelper::new(completions.clone());
    let mut rl: Editor<ReplLineHelper, rustyline::history::DefaultHistory> =
        Editor::new().map_err(|e| anyhow!("failed to init rustyline: {e}"))?;
    rl.set_helper(Some(helper));

    loop {
        // Table names change when the player switches case.
        refresh_completion_data(&completions, app);

        let line = match rl.readline(&prompt(app)) {
            Ok(l) => l,
            Err(ReadlineError::Eof) => break,
            Err(ReadlineError::Interrupted) => continue,
            Err(e) => return Err(anyhow!("readline error: {e}")),
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        rl.add_history_entry(line)
            .map_err(|e| anyhow!("failed to record history: {e}"))?;

        match dispatch_line(app, line) {
            Ok(ReplControl::Continue) => {}
            Ok(ReplControl::Exit) => break,
            Err(e) => eprintln!("{} {e:#}", "error:".red().bold()),
        }
    }

    Ok(())
}

// ============================================================================
// Dispatch
// ============================================================================

#[derive(Debug, PartialEq, Eq)]
enum ReplControl {
    Continue,
    Exit,
}

/// `.cmd rest of line` -> (`.cmd`, `rest of line`)
fn split_command(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (line, ""),
    }
}

fn active_case(app: &App) -> Option<&casefile_catalog::Case> {
    let id = app.bench.sessions.active_puzzle()?;
    app.catalog.get(&id)
}

fn dispatch_line(app: &App, line: &str) -> Result<ReplControl> {
    if line.is_empty() {
        return Ok(ReplControl::Continue);
    }
    if !line.starts_with('.') {
        let result = app.bench.executor.run(line)?;
        output::print_result(&result);
        return Ok(ReplControl::Continue);
    }

    let (cmd, arg) = split_command(line);
    match cmd {
        ".help" => print_help(),
        ".exit" | ".quit" => return Ok(ReplControl::Exit),
        ".tables" => {
            let graph = app.bench.reflector.reflect()?;
            for name in graph.table_names() {
                println!("{name}");
            }
        }
        ".schema" => {
            let (graph, positions) = app.bench.reflector.reflect_with_layout()?;
            print!("{}", output::render_schema_text(&graph, &positions));
        }
        ".case" => {
            if arg.is_empty() {
                match active_case(app) {
                    Some(case) => println!("{} {}", case.id.dimmed(), case.title.bold()),
                    None => println!("{}", "(no case loaded)".dimmed()),
                }
            } else {
                let case = app.open_case(arg)?;
                println!("Opened {} {}", case.id.dimmed(), case.title.bold());
            }
        }
        ".solve" => {
            if arg.is_empty() {
                return Err(anyhow!("usage: .solve <answer>"));
            }
            let case = active_case(app).ok_or_else(|| anyhow!("no case loaded"))?;
            app.solve(case, arg)?;
        }
        other => return Err(anyhow!("unknown command `{other}` (try .help)")),
    }
    Ok(ReplControl::Continue)
}

fn print_help() {
    println!("{}", "Commands".bold());
    println!("  .tables            list the tables of the current case");
    println!("  .schema            show columns, keys and foreign keys");
    println!("  .case [id]         show the current case, or switch to another");
    println!("  .solve <answer>    submit your answer");
    println!("  .help              show this help");
    println!("  .exit              leave the shell");
    println!("\nAnything else is run as SQL.");
}

// ============================================================================
// Completion
// ============================================================================

#[derive(Debug, Default)]
struct CompletionData {
    tables: Vec<String>,
    cases: Vec<String>,
}

#[cfg(feature = "repl-rustyline")]
fn refresh_completion_data(completions: &std::sync::RwLock<CompletionData>, app: &App) {
    let tables = app
        .bench
        .reflector
        .reflect()
        .map(|g| g.tables.into_iter().map(|t| t.name).collect())
        .unwrap_or_default();
    if let Ok(mut data) = completions.write() {
        data.tables = tables;
        data.cases = app.catalog.ids();
    }
}

/// Candidates for the word under the cursor, given the tokens before it.
fn candidates(data: &CompletionData, tokens: &[&str], word: &str) -> Vec<String> {
    match tokens.first() {
        None if word.starts_with('.') => COMMANDS
            .iter()
            .filter(|c| c.starts_with(word))
            .map(|c| c.to_string())
            .collect(),
        Some(&".case") if tokens.len() == 1 => prefixed(&data.cases, word),
        Some(cmd) if cmd.starts_with('.') => Vec::new(),
        _ => {
            // SQL identifiers are matched case-insensitively.
            let lower = word.to_lowercase();
            data.tables
                .iter()
                .filter(|t| !word.is_empty() && t.to_lowercase().starts_with(&lower))
                .cloned()
                .collect()
        }
    }
}

fn prefixed(items: &[String], prefix: &str) -> Vec<String> {
    items
        .iter()
        .filter(|item| item.starts_with(prefix))
        .cloned()
        .collect()
}

#[cfg(feature = "repl-rustyline")]
struct ReplLineHelper {
    data: std::sync::Arc<std::sync::RwLock<CompletionData>>,
}

#[cfg(feature = "repl-rustyline")]
impl ReplLineHelper {
    fn new(data: std::sync::Arc<std::sync::RwLock<CompletionData>>) -> Self {
        Self { data }
    }
}

#[cfg(feature = "repl-rustyline")]
impl rustyline::Helper for ReplLineHelper {}

#[cfg(feature = "repl-rustyline")]
impl rustyline::highlight::Highlighter for ReplLineHelper {}

#[cfg(feature = "repl-rustyline")]
impl rustyline::hint::Hinter for ReplLineHelper {
    type Hint = String;
    fn hint(&self, _line: &str, _pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        None
    }
}

#[cfg(feature = "repl-rustyline")]
impl rustyline::validate::Validator for ReplLineHelper {}

#[cfg(feature = "repl-rustyline")]
impl rustyline::completion::Completer for ReplLineHelper {
    type Candidate = rustyline::completion::Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        let start = line[..pos]
            .rfind(|c: char| c.is_whitespace() || matches!(c, ',' | '(' | '='))
            .map(|i| i + 1)
            .unwrap_or(0);
        let word = &line[start..pos];
        let tokens: Vec<&str> = line[..start].split_whitespace().collect();

        let Ok(data) = self.data.read() else {
            return Ok((start, Vec::new()));
        };
        let pairs = candidates(&data, &tokens, word)
            .into_iter()
            .map(|item| rustyline::completion::Pair {
                display: item.clone(),
                replacement: item,
            })
            .collect();
        Ok((start, pairs))
    }
}
