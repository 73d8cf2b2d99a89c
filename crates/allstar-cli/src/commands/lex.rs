use allstar_bytecode::atn::Atn;
use allstar_core::char_stream::InputStream;
use allstar_runtime::{Lexer, PrintTracer, Verbosity};

pub fn run(atn: &Atn, text: &str, verbose: bool) {
    let input = InputStream::with_name(text, "<cli>");
    let mut lexer = Lexer::new(atn, input);
    if verbose {
        lexer.set_tracer(Box::new(PrintTracer::new(Verbosity::VeryVerbose)));
    }

    loop {
        let tok = lexer.next_token();
        let is_eof = tok.is_eof();
        println!(
            "{:>4}  type={:<6} line={:<4} col={:<4} text={:?}",
            tok.token_index,
            tok.token_type,
            tok.line,
            tok.column,
            tok.text.as_deref().unwrap_or(""),
        );
        if is_eof {
            break;
        }
    }
}
