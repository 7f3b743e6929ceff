//! Jotter CLI - quick notes with live search.

mod backend;
mod render;

use anyhow::{bail, Context, Result};
use backend::{Backend, BackendKind};
use clap::{Parser, Subcommand};
use jotter_core::{Debouncer, NoteStore, StoreOptions, SystemClock};
use render::{render_note, render_notes, render_results};
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

const JOTTER_DIR: &str = ".jotter";
const LIVE_CLEAR_COMMAND: &str = "/clear";

type Store = NoteStore<Backend, SystemClock>;

#[derive(Parser)]
#[command(name = "jotter", about = "Quick notes with live search", version)]
struct Cli {
    /// Storage backend
    #[arg(long, value_enum, env = "JOTTER_BACKEND", default_value = "files", global = true)]
    backend: BackendKind,
    /// Namespace for this note list; other namespaces are never touched
    #[arg(long, env = "JOTTER_NAMESPACE", default_value = "jotter", global = true)]
    namespace: String,
    /// Delay before a live search runs, in milliseconds
    #[arg(long, env = "JOTTER_DEBOUNCE_MS", default_value = "500", global = true)]
    debounce_ms: u64,
    /// Keep counting ids from where they were after `clear`
    #[arg(long, env = "JOTTER_KEEP_COUNTER", global = true)]
    keep_counter: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new jotter directory in the current directory
    Init {
        /// Delete existing data and reinitialize
        #[arg(long)]
        reinitialize: bool,
    },
    /// Add a new note
    Add {
        /// Note title
        #[arg(long, default_value = "")]
        title: String,
        /// Note text (reads from stdin if not provided and stdin is not a tty)
        #[arg(long)]
        text: Option<String>,
    },
    /// List all notes
    Ls,
    /// Delete one or more notes
    Rm {
        /// Comma-separated note IDs
        ids: String,
    },
    /// Delete all notes
    Clear,
    /// Search titles and texts, ignoring case
    Search {
        /// Text to look for; empty shows every note
        #[arg(default_value = "")]
        query: String,
    },
    /// Read queries from stdin, one per line, and search as you type
    Live,
}

/// Find the .jotter directory by searching up from current directory
fn find_jotter_dir() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;
    loop {
        let jotter_path = current.join(JOTTER_DIR);
        if jotter_path.is_dir() {
            return Some(jotter_path);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Get the jotter directory path, or error if not initialized
fn get_jotter_dir() -> Result<PathBuf> {
    match find_jotter_dir() {
        Some(dir) => Ok(dir),
        None => bail!("No .jotter directory found. Run 'jotter init' to start taking notes."),
    }
}

fn parse_ids(ids: &str) -> Result<Vec<u64>> {
    ids.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u64>().context(format!("Invalid note ID: {}", s)))
        .collect()
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read from stdin")?;
    if buf.ends_with('\n') {
        buf.pop();
        if buf.ends_with('\r') {
            buf.pop();
        }
    }
    Ok(buf)
}

fn is_stdin_tty() -> bool {
    atty::is(atty::Stream::Stdin)
}

/// Run a debounced search for every line typed on stdin.
///
/// Only a query that stays unchanged for the debounce delay is searched. The
/// line `/clear` deletes all notes and drops any search still waiting.
async fn live(store: &mut Store, delay: Duration) -> Result<()> {
    let mut debouncer = Debouncer::new(delay);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut eof = false;

    loop {
        tokio::select! {
            line = lines.next_line(), if !eof => {
                match line.context("Failed to read from stdin")? {
                    Some(line) if line.trim() == LIVE_CLEAR_COMMAND => {
                        debouncer.cancel();
                        store.clear().await?;
                        println!("Cleared all notes");
                    }
                    Some(query) => debouncer.trigger(query),
                    None => eof = true,
                }
            }
            Some(query) = debouncer.settled() => {
                log::debug!("Searching for {:?}", query);
                let output = render_results(&store.search(&query));
                if !output.is_empty() {
                    println!("{}", output);
                }
                println!("{}", "-".repeat(40));
            }
            else => break,
        }
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if let Commands::Init { reinitialize } = cli.command {
        let dir = PathBuf::from(JOTTER_DIR);

        if dir.exists() {
            if reinitialize {
                std::fs::remove_dir_all(&dir)
                    .context("Failed to remove existing .jotter directory")?;
            } else {
                bail!("Jotter is already initialized in this directory. Use --reinitialize to delete and recreate.");
            }
        }

        // Opening the backend creates the directory and any schema
        let _storage =
            Backend::open(cli.backend, &dir, &cli.namespace).context("Failed to create storage")?;

        if reinitialize {
            println!("Reinitialized jotter in {}", dir.display());
        } else {
            println!("Initialized jotter in {}", dir.display());
        }
        return Ok(());
    }

    // All other commands need the store
    let dir = get_jotter_dir()?;
    let storage = Backend::open(cli.backend, &dir, &cli.namespace)
        .with_context(|| format!("Failed to open storage in {}", dir.display()))?;
    let options = StoreOptions {
        reset_counter_on_clear: !cli.keep_counter,
    };
    let mut store = NoteStore::open_with_options(storage, SystemClock, options)
        .await
        .context("Failed to open note store")?;

    match cli.command {
        Commands::Init { .. } => unreachable!(),

        Commands::Add { title, text } => {
            let text = match text {
                Some(t) => t,
                None if !is_stdin_tty() => read_stdin()?,
                None => String::new(),
            };
            let note = store.add(title, text).await.context("Failed to add note")?;
            println!("Added note {}", note.id);
            println!("{}", render_note(&note, false));
        }

        Commands::Ls => {
            if store.notes().is_empty() {
                eprintln!("No notes");
            } else {
                println!("{}", render_notes(store.notes(), false));
            }
        }

        Commands::Rm { ids } => {
            let ids = parse_ids(&ids)?;
            if ids.is_empty() {
                eprintln!("No note IDs provided");
                std::process::exit(1);
            }

            let mut deleted = Vec::new();
            let mut not_found = Vec::new();

            for id in &ids {
                if store.remove(*id).await.context("Failed to delete note")? {
                    deleted.push(*id);
                } else {
                    not_found.push(*id);
                }
            }

            for id in &deleted {
                println!("Deleted note {}", id);
            }

            if !not_found.is_empty() {
                for id in &not_found {
                    eprintln!("Note {} not found", id);
                }
                std::process::exit(1);
            }
        }

        Commands::Clear => {
            let count = store.notes().len();
            store.clear().await.context("Failed to clear notes")?;
            let noun = if count == 1 { "note" } else { "notes" };
            println!("Cleared {} {}", count, noun);
        }

        Commands::Search { query } => {
            let output = render_results(&store.search(&query));
            if !output.is_empty() {
                println!("{}", output);
            }
        }

        Commands::Live => {
            live(&mut store, Duration::from_millis(cli.debounce_ms)).await?;
        }
    }

    Ok(())
}
