//! CLI frontend for the Common Sense party game.

mod commands;

use std::io;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "common-sense",
    about = "Common Sense: answer prompts the way everybody else would",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Draw prompts and show which attributes they ask about
    Draw {
        /// Number of prompts to draw
        #[arg(short, long, default_value = "5")]
        count: u32,

        /// RNG seed for deterministic draws
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Deck CSV file (default: built-in decks)
        #[arg(short, long)]
        decks: Option<PathBuf>,

        /// Derive attributes from the category text only
        #[arg(long)]
        category_only: bool,
    },

    /// Play a local game on the terminal
    Play {
        /// Game mode: standard, timed, streak, describe (default: standard)
        #[arg(short, long)]
        mode: Option<String>,

        /// RNG seed for deterministic draws (default: 42)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Deck CSV file (default: built-in decks)
        #[arg(short, long)]
        decks: Option<PathBuf>,

        /// Comma-separated player names (default: "Player 1,Player 2")
        #[arg(short, long, value_delimiter = ',')]
        players: Option<Vec<String>>,

        /// Seconds per round in timed mode
        #[arg(long)]
        time_limit: Option<u32>,

        /// End the game after this many rounds
        #[arg(short, long)]
        rounds: Option<u32>,

        /// JSON session configuration; flags override its values
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run a networked game between bots over an in-memory store
    Simulate {
        /// Number of bot players
        #[arg(short, long, default_value = "4")]
        players: usize,

        /// Rounds to play
        #[arg(short, long, default_value = "5")]
        rounds: u32,

        /// RNG seed for the host and the bots
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Deck CSV file (default: built-in decks)
        #[arg(short, long)]
        decks: Option<PathBuf>,

        /// Also print the completed-game history as CSV
        #[arg(long)]
        export: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Draw {
            count,
            seed,
            decks,
            category_only,
        } => commands::draw::run(count, seed, decks.as_deref(), category_only),
        Commands::Play {
            mode,
            seed,
            decks,
            players,
            time_limit,
            rounds,
            config,
        } => commands::play::run(commands::play::PlayOptions {
            mode,
            seed,
            decks,
            players,
            time_limit,
            rounds,
            config,
        }),
        Commands::Simulate {
            players,
            rounds,
            seed,
            decks,
            export,
        } => commands::simulate::run(players, rounds, seed, decks.as_deref(), export),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
