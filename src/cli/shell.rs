//! Line-oriented session over one open catalog.
//!
//! Each input line is split like a shell command line and parsed with the
//! same definitions as the one-shot CLI, so `issue 101 201` or
//! `add-book "The Hobbit" Tolkien Fantasy` work as typed. A failing command
//! is reported and the session carries on. `exit` or end of input saves
//! both files and ends the session.

use std::io::{BufRead, Write};

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::{run_command, CatalogCommand};
use crate::library::Catalog;
use crate::storage::RecordStore;

const PROMPT: &str = "citylib> ";

/// One line typed into the shell
#[derive(Parser, Debug)]
#[command(name = "citylib", no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
    #[command(flatten)]
    Catalog(CatalogCommand),

    /// Save both files and leave the shell
    #[command(alias = "quit")]
    Exit,
}

/// What the session should do after a line
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// Run commands from `input` until `exit` or end of input
pub fn run_session<S, R, W>(
    catalog: &mut Catalog<S>,
    input: R,
    out: &mut W,
    json: bool,
    prompt: bool,
) -> Result<()>
where
    S: RecordStore,
    R: BufRead,
    W: Write + ?Sized,
{
    if prompt {
        writeln!(out, "Welcome to the citylib shell. Type 'help' for commands.")?;
    }

    let mut lines = input.lines();
    loop {
        if prompt {
            write!(out, "{}", PROMPT)?;
            out.flush()?;
        }

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;

        match handle_line(catalog, &line, out, json) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Exit) => break,
            Err(e) => writeln!(out, "Operation failed: {:#}", e)?,
        }
    }

    writeln!(out, "Saving and exiting...")?;
    if let Err(e) = catalog.flush() {
        tracing::warn!("Final save failed: {}", e);
        writeln!(out, "Error saving data: {}", e)?;
    }
    Ok(())
}

fn handle_line<S, W>(catalog: &mut Catalog<S>, line: &str, out: &mut W, json: bool) -> Result<Flow>
where
    S: RecordStore,
    W: Write + ?Sized,
{
    let line = line.trim();
    if line.is_empty() {
        return Ok(Flow::Continue);
    }

    let tokens = shell_words::split(line)?;
    let parsed = match ShellLine::try_parse_from(tokens) {
        Ok(parsed) => parsed,
        Err(e) => {
            // Help output and usage errors alike are shown, not treated as failures
            write!(out, "{}", e.render())?;
            return Ok(Flow::Continue);
        }
    };

    match parsed.command {
        ShellCommand::Exit => Ok(Flow::Exit),
        ShellCommand::Catalog(command) => {
            run_command(catalog, command, out, json)?;
            Ok(Flow::Continue)
        }
    }
}
