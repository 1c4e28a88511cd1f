use std::path::{Path, PathBuf};

use clap::Subcommand;
use diesel::connection::SimpleConnection;
use diesel::sqlite::SqliteConnection;

use super::utils::{CliResult, confirm};

#[derive(Subcommand)]
pub enum SqlAction {
    #[command(about = "Apply a .sql file statement by statement")]
    Apply {
        #[arg(help = "Path to the .sql file")]
        file: PathBuf,
        #[arg(long, help = "Print the file instead of executing it")]
        print: bool,
        #[arg(short = 'y', long = "yes", help = "Skip confirmation prompt")]
        yes: bool,
        #[arg(long, help = "Keep going after a failed statement")]
        continue_on_error: bool,
    },
}

pub fn handle_sql_command_with_conn(conn: &mut SqliteConnection, action: SqlAction) -> CliResult {
    match action {
        SqlAction::Apply {
            file,
            print,
            yes,
            continue_on_error,
        } => apply_sql_impl(conn, &file, print, yes, continue_on_error),
    }
}

/// Splits a SQL script into statements on `;`.
///
/// Semicolons inside quoted strings and identifiers, comments, and
/// `CREATE TRIGGER ... BEGIN ... END` bodies do not end a statement.
/// Comments are dropped from the output.
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut splitter = Splitter::default();
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_alphanumeric() || c == '_' {
            splitter.word.push(c);
            splitter.current.push(c);
            continue;
        }
        splitter.end_word();

        match c {
            '\'' | '"' | '`' => {
                splitter.current.push(c);
                while let Some(q) = chars.next() {
                    splitter.current.push(q);
                    if q == c {
                        // doubled quote is an escaped quote
                        if chars.peek() == Some(&c) {
                            chars.next();
                            splitter.current.push(c);
                        } else {
                            break;
                        }
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                for n in chars.by_ref() {
                    if n == '\n' {
                        break;
                    }
                }
                splitter.current.push('\n');
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for n in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
                splitter.current.push(' ');
            }
            ';' if splitter.depth == 0 => splitter.finish_statement(),
            _ => splitter.current.push(c),
        }
    }
    splitter.end_word();
    splitter.finish_statement();
    splitter.statements
}

#[derive(Default)]
struct Splitter {
    statements: Vec<String>,
    current: String,
    word: String,
    first_word: Option<String>,
    is_trigger: bool,
    depth: usize,
}

impl Splitter {
    fn end_word(&mut self) {
        if self.word.is_empty() {
            return;
        }
        let word = std::mem::take(&mut self.word).to_uppercase();
        match word.as_str() {
            "TRIGGER" if self.first_word.as_deref() == Some("CREATE") => self.is_trigger = true,
            "BEGIN" if self.is_trigger => self.depth += 1,
            "CASE" if self.depth > 0 => self.depth += 1,
            "END" if self.depth > 0 => self.depth -= 1,
            _ => {}
        }
        if self.first_word.is_none() {
            self.first_word = Some(word);
        }
    }

    fn finish_statement(&mut self) {
        let statement = self.current.trim();
        if !statement.is_empty() {
            self.statements.push(statement.to_string());
        }
        self.current.clear();
        self.first_word = None;
        self.is_trigger = false;
        self.depth = 0;
    }
}

/// First line of a statement, shortened for progress output.
fn summary(statement: &str) -> String {
    let line = statement.lines().next().unwrap_or("").trim();
    if line.chars().count() > 60 {
        format!("{}...", line.chars().take(60).collect::<String>())
    } else {
        line.to_string()
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Runs statements in order, printing `✓`/`✗` for each. Stops at the first
/// failure unless `continue_on_error`.
pub fn execute_statements(
    conn: &mut SqliteConnection,
    statements: &[String],
    continue_on_error: bool,
) -> ApplyReport {
    let mut report = ApplyReport::default();
    for (index, statement) in statements.iter().enumerate() {
        match conn.batch_execute(statement) {
            Ok(()) => {
                report.succeeded += 1;
                println!("✓ [{}] {}", index + 1, summary(statement));
            }
            Err(e) => {
                report.failed += 1;
                eprintln!("✗ [{}] {}: {}", index + 1, summary(statement), e);
                if !continue_on_error {
                    report.skipped = statements.len() - index - 1;
                    break;
                }
            }
        }
    }
    report
}

pub fn apply_sql_impl(
    conn: &mut SqliteConnection,
    file: &Path,
    print: bool,
    yes: bool,
    continue_on_error: bool,
) -> CliResult {
    let sql = std::fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;

    if print {
        println!("-- {}", file.display());
        println!("{}", sql);
        return Ok(());
    }

    let statements = split_statements(&sql);
    if statements.is_empty() {
        println!("No statements found in {}", file.display());
        return Ok(());
    }
    println!("{} statement(s) in {}", statements.len(), file.display());

    if !yes && !confirm(&format!("Execute {} statement(s)?", statements.len()))? {
        println!("Operation cancelled.");
        return Ok(());
    }

    let report = execute_statements(conn, &statements, continue_on_error);
    println!(
        "{} succeeded, {} failed, {} skipped",
        report.succeeded, report.failed, report.skipped
    );
    if report.failed > 0 {
        return Err(format!("{} statement(s) failed", report.failed).into());
    }
    Ok(())
}
