//! Argument parsing. A small enough surface (three debug subcommands) that
//! `clap`'s derive API is a better fit than the teacher's hand-built
//! `Command`/`Arg` graph, which earns its keep over a much larger command
//! tree.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "allstar", about = "Debug front end for the ALLSTAR adaptive LL(*) runtime")]
pub struct Cli {
    /// Path to a serialized ATN (the raw 16-bit word stream, little-endian).
    pub atn_path: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the ATN's states, decisions, and rule boundaries.
    Dump,
    /// Run the lexer simulator over literal input text and print the
    /// resulting token stream.
    Lex {
        text: String,
        #[arg(short, long)]
        verbose: bool,
    },
    /// Run `ParserAtnSimulator::adaptive_predict` for one decision against a
    /// literal sequence of token types.
    Predict {
        decision: usize,
        /// Token type integers making up the lookahead, in order.
        tokens: Vec<i32>,
        #[arg(short, long)]
        verbose: bool,
    },
}

pub fn build_cli() -> Cli {
    Cli::parse()
}
