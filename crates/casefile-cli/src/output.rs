//! Terminal rendering of query results, schemas and submissions.

use colored::Colorize;
use std::fmt::Write as _;

use casefile_catalog::Case;
use casefile_engine::QueryResult;
use casefile_progress::{AwardOutcome, Submission};
use casefile_schema::{NodePosition, SchemaGraph};

const MAX_CELL_WIDTH: usize = 60;

/// Column-aligned table: header, rule, then one line per row.
pub fn render_table(result: &QueryResult) -> Vec<String> {
    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(|v| truncate(&v.to_string())).collect())
        .collect();

    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |values: &[String]| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{v:<w$}"))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(cells.len() + 2);
    lines.push(line(result.columns.as_slice()));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &cells {
        lines.push(line(row.as_slice()));
    }
    lines
}

fn truncate(value: &str) -> String {
    let flat = value.replace('\n', " ");
    if flat.chars().count() <= MAX_CELL_WIDTH {
        return flat;
    }
    let mut cut: String = flat.chars().take(MAX_CELL_WIDTH - 1).collect();
    cut.push('…');
    cut
}

pub fn print_result(result: &QueryResult) {
    if result.is_empty() {
        println!("{}", "(no rows)".dimmed());
        return;
    }
    let lines = render_table(result);
    let mut iter = lines.iter();
    if let Some(header) = iter.next() {
        println!("{}", header.as_str().bold());
    }
    for line in iter {
        println!("{line}");
    }
    let n = result.rows.len();
    println!("{}", format!("({n} row{})", if n == 1 { "" } else { "s" }).as_str().dimmed());
}

pub fn render_schema_text(graph: &SchemaGraph, positions: &[NodePosition]) -> String {
    let mut out = String::new();
    if graph.tables.is_empty() {
        out.push_str("(no tables)\n");
        return out;
    }

    for table in &graph.tables {
        let pos = positions
            .iter()
            .find(|p| p.table == table.name)
            .map(|p| format!("  @ ({:.0}, {:.0})", p.x, p.y))
            .unwrap_or_default();
        let _ = writeln!(out, "{}{pos}", table.name);
        for col in &table.columns {
            let mut markers = Vec::new();
            if col.is_primary_key {
                markers.push("PK");
            }
            if col.is_foreign_key {
                markers.push("FK");
            }
            let ty = if col.data_type.is_empty() {
                "ANY"
            } else {
                col.data_type.as_str()
            };
            let _ = writeln!(
                out,
                "  {:<5} {} {}",
                markers.join(","),
                col.name,
                ty.to_lowercase()
            );
        }
    }

    if !graph.edges.is_empty() {
        out.push_str("\nForeign keys\n");
        for e in &graph.edges {
            let _ = writeln!(
                out,
                "  {}.{} -> {}.{}",
                e.from_table, e.from_column, e.to_table, e.to_column
            );
        }
    }
    out
}

pub fn difficulty_stars(difficulty: u8) -> String {
    let filled = usize::from(difficulty.min(5));
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

pub fn print_case_line(case: &Case, completed: bool) {
    let mark = if completed { "✓".green() } else { " ".normal() };
    println!(
        "  {mark} {:<10} {:<32} {}  {} XP",
        case.id,
        case.title,
        difficulty_stars(case.difficulty),
        case.xp_reward
    );
}

pub fn print_submission(case: &Case, submission: &Submission, signed_in: bool) {
    if !submission.correct {
        println!(
            "{} Incorrect answer. Keep investigating, detective.",
            "✗".red().bold()
        );
        return;
    }

    println!("{} {}", "✓".green().bold(), case.solution.success_message);
    println!("\n{}\n{}", "Explanation".bold(), case.solution.explanation);
    match submission.award {
        Some(AwardOutcome::Awarded { xp }) => {
            println!("\n{}", format!("+{xp} XP").as_str().green().bold())
        }
        Some(AwardOutcome::AlreadyCompleted) | None if signed_in => {
            println!("\n{}", "Case already solved; no XP awarded.".dimmed())
        }
        _ => println!(
            "\n{}",
            "Pass --user to earn XP for solved cases.".dimmed()
        ),
    }
}
