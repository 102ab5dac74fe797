//! recd — command-line client for the recording server.
//!
//! Streams a local file as a single recording, or watches the events and
//! notifications the server pushes to every connection.

mod commands;

use clap::{Parser, Subcommand};
use tracing::error;

/// recd — recording server client
#[derive(Parser)]
#[command(name = "recd", version, about = "Stream recordings to a recd server over WebSocket")]
struct Cli {
    /// Server WebSocket URL
    #[arg(short, long, global = true, default_value = "ws://127.0.0.1:5000")]
    url: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stream a file as one recording
    Stream {
        /// File to send
        file: String,

        /// Bytes per binary frame
        #[arg(long, default_value_t = recd_client::DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },

    /// Print every server event as one JSON line
    Listen,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("recd=debug,recd_cli=debug,recd_client=debug,recd_core=debug")
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("recd=warn,recd_cli=warn")
            .with_target(false)
            .init();
    }

    let result = match cli.command {
        Command::Stream { file, chunk_size } => {
            commands::stream::run(&cli.url, &file, chunk_size).await
        }
        Command::Listen => commands::listen::run(&cli.url).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        eprintln!("recd: {e:#}");
        std::process::exit(1);
    }
}
