//! Error-listener contract for recognition events. Distinct from [`crate::trace::Tracer`]:
//! listeners are the always-on reporting channel a host relies on for
//! diagnostics (IDE squiggles, CI output), while tracing is an opt-in
//! internals view. Implementations must not call back into the parser or
//! mutate recognizer state — they observe, they don't participate.

use allstar_bytecode::BitSet;

pub trait ErrorListener {
    fn syntax_error(&mut self, offending_token_index: i64, line: u32, column: u32, message: &str);

    fn report_ambiguity(&mut self, decision: usize, start_index: i64, stop_index: i64, alts: &BitSet);

    fn report_attempting_full_context(&mut self, decision: usize, start_index: i64, stop_index: i64);

    fn report_context_sensitivity(&mut self, decision: usize, start_index: i64, stop_index: i64, prediction: u32);
}

/// Discards every event. The default when a host registers nothing.
#[derive(Default)]
pub struct SilentErrorListener;

impl ErrorListener for SilentErrorListener {
    fn syntax_error(&mut self, _offending_token_index: i64, _line: u32, _column: u32, _message: &str) {}
    fn report_ambiguity(&mut self, _decision: usize, _start_index: i64, _stop_index: i64, _alts: &BitSet) {}
    fn report_attempting_full_context(&mut self, _decision: usize, _start_index: i64, _stop_index: i64) {}
    fn report_context_sensitivity(&mut self, _decision: usize, _start_index: i64, _stop_index: i64, _prediction: u32) {}
}
