//! Generated-lexer driver: owns mode/channel state, drives the longest-match
//! simulator in a loop, and applies the lexer actions it accumulates before
//! emitting (or skipping) a token.

use std::sync::Arc;

use allstar_bytecode::atn::Atn;
use allstar_bytecode::lexer_action::LexerAction;
use allstar_core::char_stream::{CharStream, EOF};
use allstar_core::token::{DefaultTokenFactory, Token, TokenFactory, TokenSource, DEFAULT_CHANNEL, EOF_TYPE};
use allstar_core::token_stream::TokenProducer;

use crate::lexer_action_executor::LexerActionTarget;
use crate::lexer_sim::LexerAtnSimulator;
use crate::listener::{ErrorListener, SilentErrorListener};
use crate::trace::{NoopTracer, Tracer};

pub struct Lexer<'a, S: CharStream> {
    simulator: LexerAtnSimulator<'a>,
    input: S,
    factory: Box<dyn TokenFactory>,
    tracer: Box<dyn Tracer>,
    listener: Box<dyn ErrorListener>,
    source_name: Arc<str>,

    mode: usize,
    mode_stack: Vec<usize>,
    channel: i32,
    type_override: Option<i32>,
    skip: bool,
    more: bool,

    line: u32,
    column: u32,
}

impl<'a, S: CharStream> Lexer<'a, S> {
    pub fn new(atn: &'a Atn, input: S) -> Self {
        let source_name: Arc<str> = Arc::from(input.source_name());
        Self {
            simulator: LexerAtnSimulator::new(atn),
            input,
            factory: Box::new(DefaultTokenFactory),
            tracer: Box::new(NoopTracer),
            listener: Box::new(SilentErrorListener),
            source_name,
            mode: 0,
            mode_stack: Vec::new(),
            channel: DEFAULT_CHANNEL,
            type_override: None,
            skip: false,
            more: false,
            line: 1,
            column: 0,
        }
    }

    pub fn set_tracer(&mut self, tracer: Box<dyn Tracer>) {
        self.tracer = tracer;
    }

    pub fn set_listener(&mut self, listener: Box<dyn ErrorListener>) {
        self.listener = listener;
    }

    pub fn set_factory(&mut self, factory: Box<dyn TokenFactory>) {
        self.factory = factory;
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    fn token_source(&self) -> TokenSource {
        TokenSource { source_name: self.source_name.clone() }
    }

    fn advance_position(&mut self, text: &str) {
        for ch in text.chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
    }

    /// Pulls the next token, repeating internally across `Skip`/`More`
    /// tokens and lexer-error recovery (discard one char, try again) so the
    /// caller always gets back a real token (or EOF).
    pub fn next_token(&mut self) -> Token {
        loop {
            if self.input.la(1) == EOF {
                let idx = self.input.index();
                return self.factory.create(
                    EOF_TYPE,
                    DEFAULT_CHANNEL,
                    idx,
                    idx - 1,
                    self.line,
                    self.column,
                    None,
                    Some(self.token_source()),
                );
            }

            self.skip = false;
            self.more = false;
            self.type_override = None;
            self.channel = DEFAULT_CHANNEL;
            let start = self.input.index();

            match self.simulator.match_token(&mut self.input, self.mode, self.tracer.as_mut()) {
                Ok(m) => {
                    m.lexer_action_executor.execute(self, start);

                    let text = self.input.get_text(m.start, m.stop);
                    self.advance_position(&text);

                    if self.skip {
                        continue;
                    }
                    if self.more {
                        // Accumulate and keep matching; generated lexers
                        // using `more` re-enter the same rule set, which
                        // this driver supports by simply not emitting yet.
                        continue;
                    }

                    let token_type = self.type_override.unwrap_or(m.token_type);
                    return self.factory.create(
                        token_type,
                        self.channel,
                        m.start,
                        m.stop,
                        self.line,
                        self.column,
                        Some(text),
                        Some(self.token_source()),
                    );
                }
                Err(_) => {
                    let bad_char = self.input.get_text(start, start);
                    self.advance_position(&bad_char);
                    self.listener.syntax_error(
                        -1,
                        self.line,
                        self.column,
                        &format!("token recognition error at: '{}'", bad_char),
                    );
                }
            }
        }
    }
}

impl<'a, S: CharStream> LexerActionTarget for Lexer<'a, S> {
    fn execute_lexer_action(&mut self, action: &LexerAction, _input_index: i64) {
        match action {
            LexerAction::Channel(c) => self.channel = *c,
            LexerAction::Type(t) => self.type_override = Some(*t),
            LexerAction::Mode(m) => self.mode = *m as usize,
            LexerAction::PushMode(m) => {
                self.mode_stack.push(self.mode);
                self.mode = *m as usize;
            }
            LexerAction::PopMode => {
                if let Some(m) = self.mode_stack.pop() {
                    self.mode = m;
                }
            }
            LexerAction::Skip => self.skip = true,
            LexerAction::More => self.more = true,
            LexerAction::Custom(..) => {
                // Dispatched to generated code by a higher layer; the
                // runtime core has nothing to execute here.
            }
        }
    }
}

impl<'a, S: CharStream> TokenProducer for Lexer<'a, S> {
    fn next_token(&mut self) -> Token {
        Lexer::next_token(self)
    }

    fn source_name(&self) -> String {
        self.source_name.to_string()
    }
}
