//! Zero-cost tracing hooks into prediction and recognition. A `Tracer` is a
//! compile-time abstraction, not a dynamic logging facade: the default
//! [`NoopTracer`] inlines away entirely, and hosts that want visibility swap
//! in [`PrintTracer`] or their own implementation — generic code is written
//! against `T: Tracer` rather than a trait object on hot paths.

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Default,
    Verbose,
    VeryVerbose,
}

pub trait Tracer {
    fn verbosity(&self) -> Verbosity {
        Verbosity::Default
    }

    fn trace_enter_rule(&mut self, _rule_index: u32, _token_index: i64) {}
    fn trace_exit_rule(&mut self, _rule_index: u32) {}
    fn trace_consume(&mut self, _token_type: i32, _token_index: i64) {}

    fn trace_dfa_hit(&mut self, _decision: usize, _state: u32) {}
    fn trace_dfa_miss(&mut self, _decision: usize) {}
    fn trace_sll_conflict(&mut self, _decision: usize) {}
    fn trace_switch_to_ll(&mut self, _decision: usize, _token_index: i64) {}
    fn trace_predict(&mut self, _decision: usize, _alt: u32) {}

    fn trace_report_ambiguity(&mut self, _decision: usize, _alts: &[u32]) {}
    fn trace_report_attempting_full_context(&mut self, _decision: usize) {}
    fn trace_report_context_sensitivity(&mut self, _decision: usize) {}

    fn trace_syntax_error(&mut self, _message: &str, _token_index: i64) {}
}

#[derive(Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {}

pub struct PrintTracer {
    pub verbosity: Verbosity,
}

impl PrintTracer {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

impl Default for PrintTracer {
    fn default() -> Self {
        Self::new(Verbosity::Default)
    }
}

impl Tracer for PrintTracer {
    fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    fn trace_enter_rule(&mut self, rule_index: u32, token_index: i64) {
        if self.verbosity >= Verbosity::Verbose {
            println!("enter rule {rule_index} at token {token_index}");
        }
    }

    fn trace_exit_rule(&mut self, rule_index: u32) {
        if self.verbosity >= Verbosity::Verbose {
            println!("exit rule {rule_index}");
        }
    }

    fn trace_consume(&mut self, token_type: i32, token_index: i64) {
        if self.verbosity >= Verbosity::VeryVerbose {
            println!("consume token type {token_type} at index {token_index}");
        }
    }

    fn trace_dfa_hit(&mut self, decision: usize, state: u32) {
        if self.verbosity >= Verbosity::VeryVerbose {
            println!("decision {decision}: DFA hit at state {state}");
        }
    }

    fn trace_dfa_miss(&mut self, decision: usize) {
        if self.verbosity >= Verbosity::Verbose {
            println!("decision {decision}: DFA miss, computing target");
        }
    }

    fn trace_sll_conflict(&mut self, decision: usize) {
        println!("decision {decision}: SLL conflict detected");
    }

    fn trace_switch_to_ll(&mut self, decision: usize, token_index: i64) {
        println!("decision {decision}: switching to LL mode at token {token_index}");
    }

    fn trace_predict(&mut self, decision: usize, alt: u32) {
        if self.verbosity >= Verbosity::Verbose {
            println!("decision {decision}: predicted alt {alt}");
        }
    }

    fn trace_report_ambiguity(&mut self, decision: usize, alts: &[u32]) {
        println!("decision {decision}: ambiguity among alts {alts:?}");
    }

    fn trace_report_attempting_full_context(&mut self, decision: usize) {
        println!("decision {decision}: attempting full context");
    }

    fn trace_report_context_sensitivity(&mut self, decision: usize) {
        println!("decision {decision}: context-sensitive prediction");
    }

    fn trace_syntax_error(&mut self, message: &str, token_index: i64) {
        println!("syntax error at token {token_index}: {message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_tracer_accepts_all_calls_without_panicking() {
        let mut t = NoopTracer;
        t.trace_enter_rule(0, 0);
        t.trace_predict(0, 1);
        t.trace_report_ambiguity(0, &[1, 2]);
    }

    #[test]
    fn default_verbosity_ordering() {
        assert!(Verbosity::VeryVerbose > Verbosity::Verbose);
        assert!(Verbosity::Verbose > Verbosity::Default);
    }
}
