use allstar_bytecode::atn::Atn;
use allstar_core::error::StreamError;
use allstar_core::token::{Token, EOF_TYPE};
use allstar_core::token_stream::TokenStream;
use allstar_runtime::{NoopTracer, ParserAtnSimulator, PredicateEvaluator, PrintTracer, SilentErrorListener, Verbosity};

/// A fixed, literal sequence of token types fed straight to the simulator —
/// there's no real lexer behind it, just the integers given on the command
/// line followed by an implicit EOF.
struct LiteralTokens {
    types: Vec<i32>,
    index: i64,
}

impl LiteralTokens {
    fn new(types: &[i32]) -> Self {
        Self { types: types.to_vec(), index: 0 }
    }

    fn type_at(&self, i: i64) -> i32 {
        if i < 0 || i as usize >= self.types.len() {
            EOF_TYPE
        } else {
            self.types[i as usize]
        }
    }
}

impl TokenStream for LiteralTokens {
    fn lt(&mut self, i: i32) -> Token {
        let target = self.index + if i > 0 { i as i64 - 1 } else { i as i64 };
        Token {
            token_type: self.type_at(target),
            channel: 0,
            start: 0,
            stop: 0,
            line: 1,
            column: 0,
            token_index: target,
            text: None,
            source: None,
        }
    }

    fn get(&mut self, i: usize) -> Token {
        self.lt(i as i32 + 1)
    }

    fn consume(&mut self) {
        if self.type_at(self.index) != EOF_TYPE {
            self.index += 1;
        }
    }

    fn index(&self) -> i64 {
        self.index
    }

    fn mark(&mut self) -> i64 {
        0
    }

    fn release(&mut self, _mark: i64) -> Result<(), StreamError> {
        Ok(())
    }

    fn seek(&mut self, index: i64) -> Result<(), StreamError> {
        self.index = index;
        Ok(())
    }

    fn size(&self) -> usize {
        self.types.len() + 1
    }
}

struct AlwaysTrue;

impl PredicateEvaluator for AlwaysTrue {
    fn sempred(&self, _rule_index: u32, _pred_index: u32) -> bool {
        true
    }

    fn precedence(&self) -> i32 {
        0
    }
}

pub fn run(atn: &Atn, decision: usize, tokens: &[i32], verbose: bool) {
    if decision >= atn.num_decisions() {
        eprintln!("error: decision {decision} out of range (ATN has {} decisions)", atn.num_decisions());
        std::process::exit(1);
    }

    let mut sim = ParserAtnSimulator::new(atn);
    let mut input = LiteralTokens::new(tokens);
    let evaluator = AlwaysTrue;
    let mut listener = SilentErrorListener;

    let outer_context = sim.empty_context();
    let result = if verbose {
        let mut tracer = PrintTracer::new(Verbosity::VeryVerbose);
        sim.adaptive_predict(decision, outer_context, &mut input, &evaluator, &mut tracer, &mut listener)
    } else {
        let mut tracer = NoopTracer;
        sim.adaptive_predict(decision, outer_context, &mut input, &evaluator, &mut tracer, &mut listener)
    };

    match result {
        Ok(alt) => println!("predicted alt {alt}"),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
