//! Buffered token stream sitting between a token producer (the lexer) and
//! the parser ATN simulator. Tokens are pulled lazily and kept in an
//! append-only buffer so marks can rewind without re-lexing.

use crate::error::StreamError;
use crate::token::{Token, EOF_TYPE};

/// What a generated lexer exposes to the stream: "give me the next token".
/// Kept separate from the lexer driver itself so the stream doesn't need to
/// know about ATN simulation.
pub trait TokenProducer {
    fn next_token(&mut self) -> Token;
    fn source_name(&self) -> String;
}

pub trait TokenStream {
    /// 1-based lookahead; negative values look behind the current position.
    /// `i == 0` is invalid.
    fn lt(&mut self, i: i32) -> Token;

    fn la(&mut self, i: i32) -> i32 {
        self.lt(i).token_type
    }

    fn get(&mut self, i: usize) -> Token;

    fn consume(&mut self);

    fn index(&self) -> i64;

    fn mark(&mut self) -> i64;

    fn release(&mut self, mark: i64) -> Result<(), StreamError>;

    fn seek(&mut self, index: i64) -> Result<(), StreamError>;

    fn size(&self) -> usize;
}

pub struct BufferedTokenStream<P: TokenProducer> {
    producer: P,
    buffer: Vec<Token>,
    /// Index of the current token within `buffer`; `-1` before the first
    /// fetch, matching the reference stream's uninitialized state.
    index: i64,
    marks: Vec<i64>,
    next_mark_id: i64,
    fetched_eof: bool,
}

impl<P: TokenProducer> BufferedTokenStream<P> {
    pub fn new(producer: P) -> Self {
        Self {
            producer,
            buffer: Vec::new(),
            index: -1,
            marks: Vec::new(),
            next_mark_id: -1,
            fetched_eof: false,
        }
    }

    fn lazy_init(&mut self) {
        if self.index == -1 {
            self.fetch(1);
            self.index = 0;
        }
    }

    /// Pulls tokens from the producer until at least `n` more are buffered
    /// or EOF has been seen.
    fn fetch(&mut self, n: usize) -> usize {
        if self.fetched_eof {
            return 0;
        }
        let mut fetched = 0;
        for _ in 0..n {
            let tok = self.producer.next_token();
            let is_eof = tok.is_eof();
            let mut tok = tok;
            tok.token_index = self.buffer.len() as i64;
            self.buffer.push(tok);
            fetched += 1;
            if is_eof {
                self.fetched_eof = true;
                break;
            }
        }
        fetched
    }

    fn sync(&mut self, want_index: i64) {
        let need = want_index - (self.buffer.len() as i64) + 1;
        if need > 0 {
            self.fetch(need as usize);
        }
    }
}

impl<P: TokenProducer> TokenStream for BufferedTokenStream<P> {
    fn lt(&mut self, i: i32) -> Token {
        self.lazy_init();
        if i == 0 {
            panic!("LT(0) is undefined");
        }
        let target = self.index + if i > 0 { i as i64 - 1 } else { i as i64 };
        if target < 0 {
            // Before start of input: reference semantics return an
            // "invalid" sentinel token; we synthesize an EOF-typed one
            // rather than panic, since callers only inspect its type.
            return Token {
                token_type: EOF_TYPE,
                channel: 0,
                start: -1,
                stop: -1,
                line: 0,
                column: 0,
                token_index: -1,
                text: None,
                source: None,
            };
        }
        self.sync(target);
        let idx = (target as usize).min(self.buffer.len() - 1);
        self.buffer[idx].clone()
    }

    fn get(&mut self, i: usize) -> Token {
        self.sync(i as i64);
        self.buffer[i.min(self.buffer.len() - 1)].clone()
    }

    fn consume(&mut self) {
        self.lazy_init();
        let at_eof = self
            .buffer
            .get(self.index as usize)
            .map(|t| t.is_eof())
            .unwrap_or(false);
        if !at_eof {
            self.index += 1;
            self.sync(self.index);
        }
    }

    fn index(&self) -> i64 {
        self.index
    }

    fn mark(&mut self) -> i64 {
        let id = self.next_mark_id;
        self.next_mark_id -= 1;
        self.marks.push(id);
        id
    }

    fn release(&mut self, mark: i64) -> Result<(), StreamError> {
        match self.marks.last() {
            Some(&top) if top == mark => {
                self.marks.pop();
                Ok(())
            }
            Some(&top) => Err(StreamError::UnbalancedMark {
                requested: mark,
                innermost: top,
            }),
            None => Err(StreamError::UnbalancedMark {
                requested: mark,
                innermost: 0,
            }),
        }
    }

    fn seek(&mut self, index: i64) -> Result<(), StreamError> {
        self.lazy_init();
        if index < 0 {
            return Err(StreamError::SeekOutOfBounds { index, size: self.buffer.len() as i64 });
        }
        self.sync(index);
        self.index = index.min(self.buffer.len() as i64 - 1);
        Ok(())
    }

    fn size(&self) -> usize {
        self.buffer.len()
    }
}
