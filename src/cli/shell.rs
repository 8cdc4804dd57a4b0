//! Line-oriented session over one open store.
//!
//! Each input line is parsed like a command line without the binary name.
//! A failing line reports its error and the session keeps going, so the view
//! history survives across commands.

use std::io::BufRead;

use clap::Parser;

use crate::cli::{Commands, Session};
use crate::error::{Error, Result};
use crate::output::{command_name, print_error};

#[derive(Parser, Debug)]
#[command(name = "kanban", no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Commands,
}

/// Lines run and lines that failed during one shell session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShellStats {
    pub executed: usize,
    pub failed: usize,
}

pub fn run<R: BufRead>(session: &mut Session, input: R) -> Result<ShellStats> {
    let mut stats = ShellStats::default();

    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if matches!(trimmed, "exit" | "quit") {
            break;
        }

        let words = match split_words(trimmed) {
            Ok(words) => words,
            Err(err) => {
                stats.failed += 1;
                print_error("shell", &err, session.output.is_json())?;
                continue;
            }
        };
        let command = match ShellLine::try_parse_from(&words) {
            Ok(parsed) => parsed.command,
            Err(err) => {
                // --help and usage errors both land here; clap formats them.
                if err.use_stderr() {
                    stats.failed += 1;
                }
                let _ = err.print();
                continue;
            }
        };

        let name = command_name(&words);
        let result = match command {
            Commands::Shell => Err(Error::InvalidArgument(
                "shell cannot be started from inside a shell".to_string(),
            )),
            command => session.execute(command),
        };
        stats.executed += 1;
        if let Err(err) = result {
            stats.failed += 1;
            print_error(&name, &err, session.output.is_json())?;
        }
    }

    tracing::debug!(
        executed = stats.executed,
        failed = stats.failed,
        "shell finished"
    );
    Ok(stats)
}

/// Splits a line on whitespace, keeping quoted runs together.
fn split_words(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for ch in line.chars() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_word = true;
            }
            None if ch.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(ch);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err(Error::InvalidArgument(format!("unterminated quote in '{line}'")));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
