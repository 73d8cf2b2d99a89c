//! Default recovery strategy invoked by the parser driver when `match`
//! disagrees with the lookahead, or when a rule's entry decision finds no
//! viable alternative. Tries single-token deletion and insertion before
//! falling back to set-based resynchronization.

use allstar_bytecode::atn::{Atn, StateIndex};
use allstar_bytecode::interval::IntervalSet;
use allstar_core::token::{Token, EOF_TYPE};
use allstar_core::token_stream::TokenStream;

use crate::errors::{IntervalSetDisplay, RecognitionError};
use crate::listener::ErrorListener;

/// What the error strategy needs from the parser driver to compute expected
/// sets and report diagnostics. The driver owns the ATN, the token stream,
/// and the live rule-invocation stack; the strategy only ever reads them.
pub trait RecoveryContext {
    fn atn(&self) -> &Atn;
    fn current_state(&self) -> StateIndex;
    /// Invoking ATN states for every rule still open on the call stack,
    /// innermost first.
    fn rule_invocation_stack(&self) -> &[StateIndex];
    fn input(&mut self) -> &mut dyn TokenStream;
    fn listener(&mut self) -> &mut dyn ErrorListener;
}

/// Strategies are stateful: they track whether the parser is mid-recovery
/// so cascading errors on the same malformed input don't each fire a
/// listener report.
pub struct DefaultErrorStrategy {
    in_error_recovery_mode: bool,
    error_count: u32,
    /// Input index at the previous `recover` call, paired with
    /// `last_error_states` to detect a recovery attempt that lands back on
    /// the same state without consuming anything — a failsafe against
    /// looping forever on a token the expected/FOLLOW set never covers.
    last_error_index: i64,
    last_error_states: allstar_bytecode::bitset::BitSet,
}

impl Default for DefaultErrorStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultErrorStrategy {
    pub fn new() -> Self {
        Self {
            in_error_recovery_mode: false,
            error_count: 0,
            last_error_index: -1,
            last_error_states: allstar_bytecode::bitset::BitSet::new(),
        }
    }

    pub fn in_error_recovery_mode(&self) -> bool {
        self.in_error_recovery_mode
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn reset(&mut self) {
        self.in_error_recovery_mode = false;
        self.error_count = 0;
        self.last_error_index = -1;
        self.last_error_states = allstar_bytecode::bitset::BitSet::new();
    }

    fn end_recovery(&mut self) {
        self.in_error_recovery_mode = false;
    }

    fn expected_tokens(&self, ctx: &dyn RecoveryContext) -> IntervalSet {
        ctx.atn().expected_tokens(ctx.current_state(), ctx.rule_invocation_stack())
    }

    /// Reports a syntax error via the listener unless one was already
    /// reported for this exact input position — avoids cascading reports
    /// for the same offending token across nested rule failures.
    fn report_error(&mut self, ctx: &mut dyn RecoveryContext, err: &RecognitionError) {
        if self.in_error_recovery_mode {
            return;
        }
        self.error_count += 1;
        self.in_error_recovery_mode = true;

        let offending = ctx.input().lt(1);
        let message = err.to_string();
        ctx.listener().syntax_error(offending.token_index, offending.line, offending.column, &message);
    }

    /// Called by `match` when `LA(1)` doesn't satisfy the current
    /// transition. Tries deletion, then insertion, before giving up.
    pub fn recover_inline(
        &mut self,
        ctx: &mut dyn RecoveryContext,
        expected: &IntervalSet,
    ) -> Result<Token, RecognitionError> {
        if let Some(deleted) = self.single_token_deletion(ctx, expected) {
            return Ok(deleted);
        }
        if let Some(inserted) = self.single_token_insertion(ctx, expected) {
            return Ok(inserted);
        }

        let found = ctx.input().la(1);
        let err = RecognitionError::InputMismatch {
            found,
            expected: IntervalSetDisplay(expected.clone()),
        };
        self.report_error(ctx, &err);
        Err(err)
    }

    /// `LA(2)` satisfies `expected`: treat `LA(1)` as a single extraneous
    /// token, consume it as an error token, and let the caller re-try the
    /// match against the now-current `LA(1)`.
    fn single_token_deletion(&mut self, ctx: &mut dyn RecoveryContext, expected: &IntervalSet) -> Option<Token> {
        let next = ctx.input().la(2);
        if !expected.contains(next) {
            return None;
        }
        let offending = ctx.input().lt(1);
        let err = RecognitionError::InputMismatch {
            found: offending.token_type,
            expected: IntervalSetDisplay(expected.clone()),
        };
        self.report_error(ctx, &err);
        ctx.input().consume();
        self.in_error_recovery_mode = false;
        Some(offending)
    }

    /// `LA(1)` is itself a plausible continuation (it's in the expected
    /// follow set): synthesize the missing token without consuming
    /// anything, so the caller's `match` can proceed against the real
    /// token next time around.
    fn single_token_insertion(&mut self, ctx: &mut dyn RecoveryContext, expected: &IntervalSet) -> Option<Token> {
        if expected.is_empty() {
            return None;
        }
        let current = ctx.input().la(1);

        // If the missing token were inserted, matching would land on the
        // state past the current one; check whether LA(1) is consistent
        // with what's expected *there* instead of here.
        let next_state = ctx.atn().state(ctx.current_state()).transitions.first()?.target();
        let expecting_at_ll2 = ctx.atn().expected_tokens(next_state, ctx.rule_invocation_stack());
        if !expecting_at_ll2.contains(current) {
            return None;
        }

        let missing_type = expected.intervals().first().map(|iv| iv.start).unwrap_or(EOF_TYPE);
        let at = ctx.input().lt(1);
        let err = RecognitionError::InputMismatch {
            found: at.token_type,
            expected: IntervalSetDisplay(expected.clone()),
        };
        self.report_error(ctx, &err);
        Some(Token {
            token_type: missing_type,
            channel: at.channel,
            start: at.start,
            stop: at.start - 1,
            line: at.line,
            column: at.column,
            token_index: at.token_index,
            text: Some(format!("<missing {}>", missing_type)),
            source: at.source.clone(),
        })
    }

    /// Invoked when prediction itself fails (`NoViableAlt`) rather than a
    /// plain token mismatch: consumes input up to the expected or FOLLOW
    /// set so the caller's enclosing rule can keep going.
    pub fn recover(&mut self, ctx: &mut dyn RecoveryContext, err: RecognitionError) {
        let current_index = ctx.input().index();
        let current_state = ctx.current_state() as usize;
        if self.last_error_index == current_index && self.last_error_states.get(current_state) {
            // Landed back on the same state at the same index as last time:
            // the expected/FOLLOW set never covered LA(1), so nothing got
            // consumed. Force one token down to guarantee progress.
            ctx.input().consume();
        }
        self.last_error_index = current_index;
        self.last_error_states.set(current_state);

        self.report_error(ctx, &err);
        self.consume_until_sync(ctx);
    }

    /// Called at loop/subrule entry points to resynchronize before
    /// starting a new decision, matching the reference strategy's `sync`.
    pub fn sync(&mut self, ctx: &mut dyn RecoveryContext) {
        if !self.in_error_recovery_mode {
            return;
        }
        let la = ctx.input().la(1);
        let expected = self.expected_tokens(ctx);
        if la == EOF_TYPE || expected.contains(la) {
            return;
        }
        self.consume_until_sync(ctx);
    }

    fn consume_until_sync(&mut self, ctx: &mut dyn RecoveryContext) {
        let expected = self.expected_tokens(ctx);
        loop {
            let la = ctx.input().la(1);
            if la == EOF_TYPE || expected.contains(la) {
                break;
            }
            ctx.input().consume();
        }
        self.end_recovery();
    }

    pub fn report_match(&mut self) {
        self.end_recovery();
    }
}
