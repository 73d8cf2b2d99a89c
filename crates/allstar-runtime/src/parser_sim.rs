//! Adaptive LL(*) prediction: the two-phase SLL-then-LL algorithm that
//! decides which alternative of a decision to take, given only the token
//! stream and (when SLL can't resolve it) the real call-stack context.

use allstar_bytecode::atn::Atn;
use allstar_bytecode::BitSet;
use allstar_core::token::EOF_TYPE;
use allstar_core::token_stream::TokenStream;

use crate::closure::{closure, ClosureContext};
use crate::config::{AtnConfig, AtnConfigSet};
use crate::context::{ContextId, PredictionContextCache};
use crate::dfa::{Dfa, DfaStateId, ERROR_STATE};
use crate::errors::RecognitionError;
use crate::listener::ErrorListener;
use crate::semantic::PredicateEvaluator;
use crate::trace::Tracer;

enum PredictionOutcome {
    Predicted(u32),
    /// SLL found a real conflict and couldn't rule out context sensitivity;
    /// the caller must retry with the real call-stack context.
    RequiresFullContext,
}

pub struct ParserAtnSimulator<'a> {
    atn: &'a Atn,
    cache: PredictionContextCache,
    sll_dfas: Vec<Dfa>,
    ll_dfas: Vec<Dfa>,
}

impl<'a> ParserAtnSimulator<'a> {
    pub fn new(atn: &'a Atn) -> Self {
        let make = || {
            (0..atn.num_decisions())
                .map(|d| {
                    let state = atn.decision_state(d);
                    Dfa::new(d, state.index, state.is_precedence_decision)
                })
                .collect()
        };
        Self { atn, cache: PredictionContextCache::new(), sll_dfas: make(), ll_dfas: make() }
    }

    /// The empty call-stack context, shared across every parser instance
    /// that predicts against this ATN. The parser driver seeds its real
    /// call-stack context from this at the start of a parse.
    pub fn empty_context(&self) -> ContextId {
        self.cache.empty()
    }

    /// Pushes one rule-invocation frame onto `parent`, returning the context
    /// representing "currently inside a rule invoked from `parent`, which
    /// resumes at `return_state` on return". The parser driver calls this on
    /// rule entry to build the real call-stack context `adaptive_predict`
    /// uses once SLL prediction reports a conflict.
    pub fn push_context(&mut self, parent: ContextId, return_state: i32) -> ContextId {
        self.cache.singleton(parent, return_state)
    }

    /// Predicts which alternative of `decision` to take, leaving the token
    /// stream positioned exactly where it started — the caller does the
    /// real consuming once it knows which alt won.
    pub fn adaptive_predict(
        &mut self,
        decision: usize,
        outer_context: ContextId,
        input: &mut dyn TokenStream,
        evaluator: &dyn PredicateEvaluator,
        tracer: &mut dyn Tracer,
        listener: &mut dyn ErrorListener,
    ) -> Result<u32, RecognitionError> {
        let start_index = input.index();

        let alt = match self.run(decision, false, start_index, outer_context, input, evaluator, tracer, listener)? {
            PredictionOutcome::Predicted(alt) => alt,
            PredictionOutcome::RequiresFullContext => {
                input.seek(start_index).map_err(|_| RecognitionError::NoViableAlt { start_token_index: start_index })?;
                tracer.trace_switch_to_ll(decision, start_index);
                listener.report_attempting_full_context(decision, start_index, start_index);
                match self.run(decision, true, start_index, outer_context, input, evaluator, tracer, listener)? {
                    PredictionOutcome::Predicted(alt) => {
                        listener.report_context_sensitivity(decision, start_index, input.index(), alt);
                        alt
                    }
                    // target() always resolves a full-context decision to an
                    // accept state (unique alt or min-alt tiebreak); this
                    // only fires if that invariant is ever violated.
                    PredictionOutcome::RequiresFullContext => {
                        return Err(RecognitionError::NoViableAlt { start_token_index: start_index })
                    }
                }
            }
        };

        input.seek(start_index).map_err(|_| RecognitionError::NoViableAlt { start_token_index: start_index })?;
        Ok(alt)
    }

    fn run(
        &mut self,
        decision: usize,
        full_ctx: bool,
        start_index: i64,
        outer_context: ContextId,
        input: &mut dyn TokenStream,
        evaluator: &dyn PredicateEvaluator,
        tracer: &mut dyn Tracer,
        listener: &mut dyn ErrorListener,
    ) -> Result<PredictionOutcome, RecognitionError> {
        let mut s = self.start_state(decision, full_ctx, outer_context, evaluator);

        loop {
            let snapshot = if full_ctx { self.ll_dfas[decision].state(s) } else { self.sll_dfas[decision].state(s) };
            if snapshot.is_accept_state {
                let alt = snapshot.prediction.expect("accept state always carries a prediction");
                tracer.trace_predict(decision, alt);
                return Ok(PredictionOutcome::Predicted(alt));
            }
            if !full_ctx && snapshot.requires_full_context {
                return Ok(PredictionOutcome::RequiresFullContext);
            }

            let symbol = input.la(1);
            let current_index = input.index();
            let next = self.target(decision, full_ctx, s, symbol, start_index, current_index, evaluator, tracer, listener)?;
            if next == ERROR_STATE {
                return Err(RecognitionError::NoViableAlt { start_token_index: start_index });
            }

            if symbol == EOF_TYPE {
                let next_snapshot = if full_ctx { self.ll_dfas[decision].state(next) } else { self.sll_dfas[decision].state(next) };
                if next_snapshot.is_accept_state {
                    let alt = next_snapshot.prediction.expect("accept state always carries a prediction");
                    tracer.trace_predict(decision, alt);
                    return Ok(PredictionOutcome::Predicted(alt));
                }
                if !full_ctx && next_snapshot.requires_full_context {
                    return Ok(PredictionOutcome::RequiresFullContext);
                }
                return Err(RecognitionError::NoViableAlt { start_token_index: start_index });
            }

            input.consume();
            s = next;
        }
    }

    fn start_state(
        &mut self,
        decision: usize,
        full_ctx: bool,
        outer_context: ContextId,
        evaluator: &dyn PredicateEvaluator,
    ) -> DfaStateId {
        let existing = if full_ctx { self.ll_dfas[decision].s0() } else { self.sll_dfas[decision].s0() };
        if let Some(s0) = existing {
            return s0;
        }

        let decision_state = self.atn.decision_state(decision);
        let seed_context = if full_ctx { outer_context } else { self.cache.empty() };
        let mut configs = AtnConfigSet::new(full_ctx);
        let ctx = ClosureContext {
            full_ctx,
            is_lexer: false,
            current_precedence: evaluator.precedence(),
            current_input_index: 0,
        };
        for (i, t) in decision_state.transitions.iter().enumerate() {
            let seed = AtnConfig::new(t.target(), (i + 1) as u32, seed_context);
            closure(self.atn, &mut self.cache, seed, &mut configs, &ctx);
        }

        let s0 = if full_ctx { self.ll_dfas[decision].install(configs.clone()) } else { self.sll_dfas[decision].install(configs.clone()) };
        if configs.has_unique_alt() {
            let alt = configs.unique_alt().unwrap();
            if full_ctx { self.ll_dfas[decision].mark_accept(s0, alt); } else { self.sll_dfas[decision].mark_accept(s0, alt); }
        }
        if full_ctx { self.ll_dfas[decision].set_s0(s0); } else { self.sll_dfas[decision].set_s0(s0); }
        s0
    }

    fn target(
        &mut self,
        decision: usize,
        full_ctx: bool,
        from: DfaStateId,
        symbol: i32,
        start_index: i64,
        current_index: i64,
        evaluator: &dyn PredicateEvaluator,
        tracer: &mut dyn Tracer,
        listener: &mut dyn ErrorListener,
    ) -> Result<DfaStateId, RecognitionError> {
        let cached = if full_ctx { self.ll_dfas[decision].edge(from, symbol) } else { self.sll_dfas[decision].edge(from, symbol) };
        if let Some(to) = cached {
            tracer.trace_dfa_hit(decision, from);
            return Ok(to);
        }
        tracer.trace_dfa_miss(decision);

        let from_configs = if full_ctx { self.ll_dfas[decision].state(from).configs } else { self.sll_dfas[decision].state(from).configs };
        let reached = self.reach(&from_configs, symbol, full_ctx, evaluator);
        if reached.is_empty() {
            if full_ctx { self.ll_dfas[decision].add_edge(from, symbol, ERROR_STATE); } else { self.sll_dfas[decision].add_edge(from, symbol, ERROR_STATE); }
            return Ok(ERROR_STATE);
        }

        let filtered = self.evaluate_predicates(reached, evaluator);
        if filtered.is_empty() {
            if full_ctx { self.ll_dfas[decision].add_edge(from, symbol, ERROR_STATE); } else { self.sll_dfas[decision].add_edge(from, symbol, ERROR_STATE); }
            return Ok(ERROR_STATE);
        }

        let to = if full_ctx { self.ll_dfas[decision].install(filtered.clone()) } else { self.sll_dfas[decision].install(filtered.clone()) };
        if full_ctx { self.ll_dfas[decision].add_edge(from, symbol, to); } else { self.sll_dfas[decision].add_edge(from, symbol, to); }

        if filtered.has_unique_alt() {
            let alt = filtered.unique_alt().unwrap();
            if full_ctx { self.ll_dfas[decision].mark_accept(to, alt); } else { self.sll_dfas[decision].mark_accept(to, alt); }
        } else if filtered.conflicting_alt_subsets().iter().any(|subset| subset.count() > 1) {
            if full_ctx {
                let min_alt = filtered.alts().iter().min().expect("conflict implies at least one alt") as u32;
                listener.report_ambiguity(decision, start_index, current_index, &filtered.alts());
                tracer.trace_report_ambiguity(decision, &filtered.alts().iter().map(|a| a as u32).collect::<Vec<_>>());
                self.ll_dfas[decision].mark_accept(to, min_alt);
            } else if !filtered.dips_into_outer_context {
                tracer.trace_sll_conflict(decision);
                self.sll_dfas[decision].set_requires_full_context(to);
            }
        }
        Ok(to)
    }

    fn reach(&mut self, configs: &AtnConfigSet, symbol: i32, full_ctx: bool, evaluator: &dyn PredicateEvaluator) -> AtnConfigSet {
        let mut intermediate = AtnConfigSet::new(full_ctx);
        for config in configs.iter() {
            let state = self.atn.state(config.state);
            for t in &state.transitions {
                if t.matches(symbol) {
                    let mut next = config.clone();
                    next.state = t.target();
                    intermediate.add(&mut self.cache, next);
                }
            }
        }

        let mut out = AtnConfigSet::new(full_ctx);
        let ctx = ClosureContext {
            full_ctx,
            is_lexer: false,
            current_precedence: evaluator.precedence(),
            current_input_index: 0,
        };
        for config in intermediate.iter() {
            closure(self.atn, &mut self.cache, config.clone(), &mut out, &ctx);
        }
        out
    }

    /// Drops configs whose accumulated predicate evaluates false. A no-op
    /// fast path when nothing in the set carries a predicate at all.
    fn evaluate_predicates(&mut self, configs: AtnConfigSet, evaluator: &dyn PredicateEvaluator) -> AtnConfigSet {
        if !configs.has_semantic_context {
            return configs;
        }
        let full_ctx = configs.full_ctx;
        let mut out = AtnConfigSet::new(full_ctx);
        for config in configs.iter() {
            if config.semantic_context.evaluate(evaluator) {
                out.add(&mut self.cache, config.clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use allstar_bytecode::atn::{AtnState, GrammarType, StateIndex, StateType, Transition};
    use allstar_core::error::StreamError;

    struct FixedTokens {
        types: Vec<i32>,
        index: i64,
    }

    impl FixedTokens {
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

    impl TokenStream for FixedTokens {
        fn lt(&mut self, i: i32) -> allstar_core::Token {
            let target = self.index + if i > 0 { i as i64 - 1 } else { i as i64 };
            allstar_core::Token {
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

        fn get(&mut self, i: usize) -> allstar_core::Token {
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

    #[derive(Default)]
    struct RecordingListener {
        full_context_attempts: u32,
        ambiguities: u32,
        context_sensitivities: u32,
    }

    impl ErrorListener for RecordingListener {
        fn syntax_error(&mut self, _offending_token_index: i64, _line: u32, _column: u32, _message: &str) {}
        fn report_ambiguity(&mut self, _decision: usize, _start_index: i64, _stop_index: i64, _alts: &BitSet) {
            self.ambiguities += 1;
        }
        fn report_attempting_full_context(&mut self, _decision: usize, _start_index: i64, _stop_index: i64) {
            self.full_context_attempts += 1;
        }
        fn report_context_sensitivity(&mut self, _decision: usize, _start_index: i64, _stop_index: i64, _prediction: u32) {
            self.context_sensitivities += 1;
        }
    }

    fn basic(index: StateIndex, rule: u32) -> AtnState {
        AtnState::new(index, StateType::Basic, rule)
    }

    /// Decision between `'a' 'b'` (alt 1) and `'a' 'c'` (alt 2): plain LL(2),
    /// resolvable by SLL alone without ever needing full context.
    fn lookahead_atn() -> Atn {
        let mut d = basic(0, 0);
        d.state_type = StateType::DecisionBasic;
        d.decision = Some(0);
        d.transitions.push(Transition::Epsilon { target: 1 });
        d.transitions.push(Transition::Epsilon { target: 3 });

        let mut s1 = basic(1, 0);
        s1.transitions.push(Transition::Atom { target: 2, label: 10 });
        let mut s2 = basic(2, 0);
        s2.transitions.push(Transition::Atom { target: 5, label: 11 });

        let mut s3 = basic(3, 0);
        s3.transitions.push(Transition::Atom { target: 4, label: 10 });
        let mut s4 = basic(4, 0);
        s4.transitions.push(Transition::Atom { target: 5, label: 12 });

        let s5 = basic(5, 0);

        Atn {
            grammar_type: GrammarType::Parser,
            max_token_type: 12,
            states: vec![d, s1, s2, s3, s4, s5],
            decision_to_state: vec![0],
            rule_to_start_state: vec![0],
            rule_to_stop_state: vec![5],
            rule_to_token_type: Vec::new(),
            mode_to_start_state: Vec::new(),
            lexer_actions: Vec::new(),
        }
    }

    /// Decision between two alternatives that both match `'a'` and land on
    /// the same state: genuinely ambiguous, unresolvable even in full
    /// context, so the simulator must pick the lowest-numbered alt.
    fn ambiguous_atn() -> Atn {
        let mut d = basic(0, 0);
        d.state_type = StateType::DecisionBasic;
        d.decision = Some(0);
        d.transitions.push(Transition::Epsilon { target: 1 });
        d.transitions.push(Transition::Epsilon { target: 2 });

        let mut s1 = basic(1, 0);
        s1.transitions.push(Transition::Atom { target: 3, label: 10 });
        let mut s2 = basic(2, 0);
        s2.transitions.push(Transition::Atom { target: 3, label: 10 });
        let s3 = basic(3, 0);

        Atn {
            grammar_type: GrammarType::Parser,
            max_token_type: 10,
            states: vec![d, s1, s2, s3],
            decision_to_state: vec![0],
            rule_to_start_state: vec![0],
            rule_to_stop_state: vec![3],
            rule_to_token_type: Vec::new(),
            mode_to_start_state: Vec::new(),
            lexer_actions: Vec::new(),
        }
    }

    #[test]
    fn sll_alone_resolves_plain_lookahead() {
        let atn = lookahead_atn();
        let mut sim = ParserAtnSimulator::new(&atn);
        let mut input = FixedTokens::new(&[10, 12]);
        let evaluator = AlwaysTrue;
        let mut tracer = crate::trace::NoopTracer;
        let mut listener = RecordingListener::default();
        let alt = sim
            .adaptive_predict(0, sim_empty(&mut sim), &mut input, &evaluator, &mut tracer, &mut listener)
            .expect("should predict");
        assert_eq!(alt, 2);
        assert_eq!(input.index(), 0, "prediction must not consume real input");
        assert_eq!(listener.full_context_attempts, 0);
    }

    #[test]
    fn true_ambiguity_falls_back_to_full_context_and_picks_lowest_alt() {
        let atn = ambiguous_atn();
        let mut sim = ParserAtnSimulator::new(&atn);
        let mut input = FixedTokens::new(&[10]);
        let evaluator = AlwaysTrue;
        let mut tracer = crate::trace::NoopTracer;
        let mut listener = RecordingListener::default();
        let alt = sim
            .adaptive_predict(0, sim_empty(&mut sim), &mut input, &evaluator, &mut tracer, &mut listener)
            .expect("should predict despite ambiguity");
        assert_eq!(alt, 1);
        assert_eq!(listener.full_context_attempts, 1);
        assert_eq!(listener.ambiguities, 1);
    }

    fn sim_empty(sim: &mut ParserAtnSimulator) -> ContextId {
        sim.cache.empty()
    }
}
