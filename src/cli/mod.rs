//! Command-line interface for citylib.
//!
//! Every catalog operation is a subcommand. `citylib shell` runs the same
//! commands line by line against one open catalog.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::config::{self, Overrides, ResolvedConfig};
use crate::domain::{Book, BookId, Member, MemberId};
use crate::library::{BookField, Catalog, LoadReport};
use crate::storage::RecordStore;

pub mod shell;

/// citylib - flat-file library catalog
#[derive(Parser, Debug)]
#[command(name = "citylib")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Books file (default: books.txt)
    #[arg(long, global = true, env = "CITYLIB_BOOKS")]
    pub books: Option<PathBuf>,

    /// Members file (default: members.txt)
    #[arg(long, global = true, env = "CITYLIB_MEMBERS")]
    pub members: Option<PathBuf>,

    /// Print records as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(flatten)]
    Catalog(CatalogCommand),

    /// Run commands read from stdin against one catalog
    Shell,

    /// Show resolved configuration
    Config,
}

/// Operations on an open catalog
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CatalogCommand {
    /// Add a book
    AddBook {
        title: String,
        author: String,
        category: String,
    },

    /// Register a member
    AddMember { name: String, email: String },

    /// Issue a book to a member
    Issue { book_id: u32, member_id: u32 },

    /// Return a book from a member
    Return { book_id: u32, member_id: u32 },

    /// Search books by field (case-insensitive substring)
    Search {
        #[arg(value_enum)]
        field: FieldArg,

        /// Search query (empty matches everything)
        #[arg(default_value = "")]
        query: String,
    },

    /// List books ordered by field
    Sort {
        #[arg(value_enum)]
        field: FieldArg,
    },

    /// List all books
    ListBooks,

    /// List all members
    ListMembers,

    /// List known categories
    Categories,

    /// Show one book and who holds it
    ShowBook { id: u32 },

    /// Show one member
    ShowMember { id: u32 },

    /// Check that issued flags and member lists agree
    Check,
}

/// Book field for CLI (maps to BookField)
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FieldArg {
    Title,
    Author,
    Category,
}

impl From<FieldArg> for BookField {
    fn from(f: FieldArg) -> Self {
        match f {
            FieldArg::Title => BookField::Title,
            FieldArg::Author => BookField::Author,
            FieldArg::Category => BookField::Category,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        let config = config::load(Overrides {
            books: self.books,
            members: self.members,
        })?;

        let stdout = io::stdout();
        let mut out = stdout.lock();

        match self.command {
            Commands::Config => show_config(&config, &mut out),
            Commands::Shell => {
                let mut catalog = open_catalog(&config);
                let stdin = io::stdin();
                let prompt = stdin.is_terminal();
                shell::run_session(&mut catalog, stdin.lock(), &mut out, self.json, prompt)
            }
            Commands::Catalog(command) => {
                let mut catalog = open_catalog(&config);
                run_command(&mut catalog, command, &mut out, self.json)
            }
        }
    }
}

/// Open the configured catalog, reporting load problems on stderr
fn open_catalog(config: &ResolvedConfig) -> Catalog {
    let (catalog, report) = Catalog::open_with(config.store(), config.options);
    report_load(&report);
    catalog
}

fn report_load(report: &LoadReport) {
    for warning in &report.warnings {
        eprintln!("Could not load data: {}", warning);
    }
    if report.skipped > 0 {
        tracing::info!(skipped = report.skipped, "Ignored malformed records");
    }
}

/// Run one catalog command, writing its result to `out`
pub fn run_command<S, W>(
    catalog: &mut Catalog<S>,
    command: CatalogCommand,
    out: &mut W,
    json: bool,
) -> Result<()>
where
    S: RecordStore,
    W: Write + ?Sized,
{
    match command {
        CatalogCommand::AddBook {
            title,
            author,
            category,
        } => {
            let book = catalog.add_book(title.trim(), author.trim(), category.trim())?;
            writeln!(out, "Book added successfully with ID: {}", book.id)?;
        }
        CatalogCommand::AddMember { name, email } => {
            let member = catalog.add_member(name.trim(), email.trim())?;
            writeln!(out, "Member added successfully with ID: {}", member.id)?;
        }
        CatalogCommand::Issue { book_id, member_id } => {
            let outcome = catalog.issue_book(BookId(book_id), MemberId(member_id))?;
            writeln!(out, "{}", outcome)?;
        }
        CatalogCommand::Return { book_id, member_id } => {
            let outcome = catalog.return_book(BookId(book_id), MemberId(member_id))?;
            writeln!(out, "{}", outcome)?;
        }
        CatalogCommand::Search { field, query } => {
            let results = catalog.search_by(field.into(), query.trim());
            if results.is_empty() && !json {
                writeln!(out, "No books match your search.")?;
            } else {
                print_books(out, &results, json)?;
            }
        }
        CatalogCommand::Sort { field } => {
            let sorted = catalog.sorted_by(field.into());
            print_books(out, &sorted, json)?;
        }
        CatalogCommand::ListBooks => {
            let books: Vec<&Book> = catalog.books().collect();
            if books.is_empty() && !json {
                writeln!(out, "No books available.")?;
            } else {
                print_books(out, &books, json)?;
            }
        }
        CatalogCommand::ListMembers => {
            let members: Vec<&Member> = catalog.members().collect();
            if members.is_empty() && !json {
                writeln!(out, "No members available.")?;
            } else {
                print_members(out, &members, json)?;
            }
        }
        CatalogCommand::Categories => {
            let categories: Vec<&str> = catalog.categories().collect();
            if json {
                print_json(out, &categories)?;
            } else if categories.is_empty() {
                writeln!(out, "No categories yet.")?;
            } else {
                for category in categories {
                    writeln!(out, "{}", category)?;
                }
            }
        }
        CatalogCommand::ShowBook { id } => match catalog.book(BookId(id)) {
            Some(book) => {
                let borrower = if book.issued {
                    catalog.borrower_of(book.id)
                } else {
                    None
                };
                if json {
                    #[derive(Serialize)]
                    struct BookView<'a> {
                        #[serde(flatten)]
                        book: &'a Book,
                        borrower: Option<MemberId>,
                    }
                    print_json(
                        out,
                        &BookView {
                            book,
                            borrower: borrower.map(|m| m.id),
                        },
                    )?;
                } else {
                    writeln!(out, "{}", book)?;
                    if let Some(member) = borrower {
                        writeln!(out, "Held by: {} ({})", member.name, member.id)?;
                    }
                }
            }
            None => writeln!(out, "Book not found.")?,
        },
        CatalogCommand::ShowMember { id } => match catalog.member(MemberId(id)) {
            Some(member) if json => print_json(out, member)?,
            Some(member) => {
                writeln!(out, "{}", member)?;
                for book_id in &member.issued_books {
                    match catalog.book(*book_id) {
                        Some(book) => writeln!(out, "  {} - {}", book.id, book.title)?,
                        None => writeln!(out, "  {} - (unknown book)", book_id)?,
                    }
                }
            }
            None => writeln!(out, "Member not found.")?,
        },
        CatalogCommand::Check => {
            let found = catalog.audit();
            if json {
                print_json(out, &found)?;
            } else if found.is_empty() {
                writeln!(out, "Catalog is consistent.")?;
            } else {
                for problem in &found {
                    writeln!(out, "{}", problem)?;
                }
                writeln!(out, "\nTotal: {} problem(s)", found.len())?;
            }
        }
    }

    Ok(())
}

fn print_books<W: Write + ?Sized>(out: &mut W, books: &[&Book], json: bool) -> Result<()> {
    if json {
        return print_json(out, books);
    }
    for book in books {
        writeln!(out, "{}", book)?;
    }
    Ok(())
}

fn print_members<W: Write + ?Sized>(out: &mut W, members: &[&Member], json: bool) -> Result<()> {
    if json {
        return print_json(out, members);
    }
    for member in members {
        writeln!(out, "{}", member)?;
    }
    Ok(())
}

fn print_json<W, T>(out: &mut W, value: &T) -> Result<()>
where
    W: Write + ?Sized,
    T: Serialize + ?Sized,
{
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    writeln!(out, "{}", json)?;
    Ok(())
}

/// Show resolved configuration
fn show_config<W: Write + ?Sized>(config: &ResolvedConfig, out: &mut W) -> Result<()> {
    writeln!(out, "citylib configuration")?;
    writeln!(out)?;
    writeln!(
        out,
        "Config file: {}",
        config
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    )?;
    writeln!(out)?;
    writeln!(out, "Paths:")?;
    writeln!(out, "  Books:   {}", config.books.display())?;
    writeln!(out, "  Members: {}", config.members.display())?;
    writeln!(out)?;
    writeln!(out, "Catalog:")?;
    writeln!(out, "  Strict returns: {}", config.options.strict_returns)?;
    Ok(())
}
