//! Debug front end for the runtime: load a serialized ATN, run the lexer or
//! parser simulator over literal input, and dump ATN/DFA state. Exists for
//! engineering visibility into the runtime crate, not as a product surface —
//! real recognizers are generated code this crate has no knowledge of.

mod cli;
mod commands;

use cli::{build_cli, Command};

fn main() {
    let cli = build_cli();

    let words = match read_words(&cli.atn_path) {
        Ok(words) => words,
        Err(e) => {
            eprintln!("error: failed to read {}: {}", cli.atn_path.display(), e);
            std::process::exit(1);
        }
    };
    let atn = match allstar_bytecode::deserialize(&words) {
        Ok(atn) => atn,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Command::Dump => commands::dump::run(&atn),
        Command::Lex { text, verbose } => commands::lex::run(&atn, &text, verbose),
        Command::Predict { decision, tokens, verbose } => commands::predict::run(&atn, decision, &tokens, verbose),
    }
}

/// Serialized ATNs are arrays of 16-bit words; on disk that's just their
/// little-endian byte pairs, with no header of our own to strip.
fn read_words(path: &std::path::Path) -> std::io::Result<Vec<u16>> {
    let bytes = std::fs::read(path)?;
    Ok(bytes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect())
}
