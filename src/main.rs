//! # docvec CLI
//!
//! Upload documents, search their chunks, and ask questions answered from
//! their most relevant pages.
//!
//! ## Usage
//!
//! ```bash
//! docvec --config ./config/docvec.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docvec upload <path>` | Store a file and index its pages and chunks |
//! | `docvec chunks <file> "<query>"` | Print the best matching chunks |
//! | `docvec ask <file> "<query>"` | Answer a question from the document |
//! | `docvec delete <file>` | Remove a document and its collections |
//! | `docvec clear` | Remove every document and document collection |
//! | `docvec collections` | List document collections |
//! | `docvec documents` | List stored documents |
//!
//! Results go to stdout; logs and progress go to stderr. Set `RUST_LOG` to
//! change log verbosity (default `docvec=info`).

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docvec::config;
use docvec::progress::ProgressMode;
use docvec::setup;

/// docvec: index documents as pages and chunks, then ask them questions.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docvec.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docvec",
    about = "Index documents as pages and chunks in a vector store and answer questions about them",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docvec.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy a file into managed storage and index it.
    ///
    /// Creates `<basename>_pages` and `<basename>_chunks`, where the
    /// basename is the file name up to the first `.`. Uploading a file with
    /// the same basename again overwrites the previous upload.
    Upload {
        /// PDF, text or markdown file.
        path: PathBuf,

        /// Progress output on stderr. Defaults to `human` on a terminal.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Print the chunks of a document most similar to a query.
    Chunks {
        /// Uploaded file name, e.g. `manual.pdf`.
        file: String,
        query: String,
    },

    /// Answer a question from the most relevant pages of a document.
    Ask {
        /// Uploaded file name, e.g. `manual.pdf`.
        file: String,
        query: String,
    },

    /// Delete a stored document and both of its collections.
    Delete {
        /// Uploaded file name, e.g. `manual.pdf`.
        file: String,
    },

    /// Delete every document collection and every stored file.
    ///
    /// Collections that do not end in `_pages` or `_chunks` are left alone.
    Clear,

    /// List document collections in the vector store.
    Collections,

    /// List stored documents.
    Documents,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docvec=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config(&cli.config)?;
    let docs = setup::build(&cfg)?;

    match cli.command {
        Commands::Upload { path, progress } => {
            let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
            let docs = docs.with_progress(mode.reporter());
            let report = docs.upload_document(&path).await?;
            println!(
                "Uploaded {}: {} pages -> {}, {} chunks -> {}",
                report.document,
                report.pages_written,
                report.collections.pages,
                report.chunks_written,
                report.collections.chunks
            );
        }
        Commands::Chunks { file, query } => {
            let chunks = docs.find_chunks(&file, &query).await?;
            if chunks.is_empty() {
                println!("No matching chunks.");
            }
            for (i, text) in chunks.iter().enumerate() {
                println!("[{}] {}", i + 1, text);
            }
        }
        Commands::Ask { file, query } => {
            let answer = docs.answer_query(&file, &query).await?;
            println!("{}", answer);
        }
        Commands::Delete { file } => {
            let deleted = docs.delete_document(&file).await?;
            println!("Deleted {} ({} collections removed)", file, deleted.len());
            for name in deleted {
                println!("  {}", name);
            }
        }
        Commands::Clear => {
            let deleted = docs.clear_all().await?;
            println!("Cleared {} collections.", deleted.len());
            for name in deleted {
                println!("  {}", name);
            }
        }
        Commands::Collections => {
            for name in docs.list_collections().await? {
                println!("{}", name);
            }
        }
        Commands::Documents => {
            for name in docs.list_documents().await? {
                println!("{}", name);
            }
        }
    }

    Ok(())
}
