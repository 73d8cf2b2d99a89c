//! Longest-match lexer simulation: each mode gets its own [`Dfa`], consulted
//! first on every step; a miss falls back to reach + closure over the ATN
//! and installs the result so later passes over the same input hit cache.

use allstar_bytecode::atn::{Atn, StateType};
use allstar_core::char_stream::{CharStream, EOF};

use crate::closure::{closure, ClosureContext};
use crate::config::{AtnConfig, AtnConfigSet};
use crate::context::PredictionContextCache;
use crate::dfa::{Dfa, DfaStateId, ERROR_STATE};
use crate::errors::RecognitionError;
use crate::lexer_action_executor::LexerActionExecutor;
use crate::trace::Tracer;

pub struct LexerAtnSimulator<'a> {
    atn: &'a Atn,
    cache: PredictionContextCache,
    dfas: Vec<Dfa>,
}

/// The longest accepting position seen so far along the current run, kept
/// around so a later, shorter rule-stop never overwrites a longer match.
struct AcceptRecord {
    input_index: i64,
    lexer_action_executor: LexerActionExecutor,
    token_type: i32,
}

pub struct LexerMatch {
    pub token_type: i32,
    pub start: i64,
    pub stop: i64,
    pub lexer_action_executor: LexerActionExecutor,
}

impl<'a> LexerAtnSimulator<'a> {
    pub fn new(atn: &'a Atn) -> Self {
        let num_modes = atn.mode_to_start_state.len().max(1);
        let dfas = (0..num_modes)
            .map(|i| {
                let start = atn.mode_to_start_state.get(i).copied().unwrap_or(0);
                Dfa::new(i, start, false)
            })
            .collect();
        Self { atn, cache: PredictionContextCache::new(), dfas }
    }

    /// Matches the longest token starting at the stream's current position
    /// in the given lexer `mode`. On failure the stream is left at the
    /// position it started at; the driver is responsible for error recovery.
    pub fn match_token(
        &mut self,
        input: &mut dyn CharStream,
        mode: usize,
        tracer: &mut dyn Tracer,
    ) -> Result<LexerMatch, RecognitionError> {
        let start_index = input.index();
        let mut s = self.s0(mode);
        let mut accept: Option<AcceptRecord> = None;

        loop {
            if s == ERROR_STATE {
                break;
            }
            if let Some(rec) = self.accept_at(mode, s, input) {
                accept = Some(rec);
            }
            let symbol = input.la(1);
            if symbol == EOF {
                break;
            }
            let next = self.target(mode, s, symbol, input.index(), tracer);
            if next == ERROR_STATE {
                break;
            }
            input.seek(input.index() + 1).ok();
            s = next;
        }

        match accept {
            Some(rec) => {
                input.seek(rec.input_index).ok();
                tracer.trace_consume(rec.token_type, start_index);
                Ok(LexerMatch {
                    token_type: rec.token_type,
                    start: start_index,
                    stop: rec.input_index - 1,
                    lexer_action_executor: rec.lexer_action_executor,
                })
            }
            None => {
                input.seek(start_index + 1).ok();
                Err(RecognitionError::LexerNoViableAlt { line: 0, column: 0 })
            }
        }
    }

    fn s0(&mut self, mode: usize) -> DfaStateId {
        if let Some(s0) = self.dfas[mode].s0() {
            return s0;
        }
        let mode_start = self.atn.mode_to_start_state[mode];
        let mut configs = AtnConfigSet::new(false);
        let ctx = ClosureContext {
            full_ctx: false,
            is_lexer: true,
            current_precedence: 0,
            current_input_index: 0,
        };
        closure(self.atn, &mut self.cache, AtnConfig::new(mode_start, 1, 0), &mut configs, &ctx);
        let s0 = self.dfas[mode].install(configs);
        self.dfas[mode].set_s0(s0);
        s0
    }

    fn target(
        &mut self,
        mode: usize,
        from: DfaStateId,
        symbol: i32,
        input_index: i64,
        tracer: &mut dyn Tracer,
    ) -> DfaStateId {
        if let Some(to) = self.dfas[mode].edge(from, symbol) {
            tracer.trace_dfa_hit(mode, from);
            return to;
        }
        tracer.trace_dfa_miss(mode);

        let from_configs = self.dfas[mode].state(from).configs;
        let reached = self.reach(&from_configs, symbol, input_index);
        let to = if reached.is_empty() {
            ERROR_STATE
        } else {
            self.dfas[mode].install(reached)
        };
        self.dfas[mode].add_edge(from, symbol, to);
        to
    }

    fn reach(&mut self, configs: &AtnConfigSet, symbol: i32, input_index: i64) -> AtnConfigSet {
        let mut intermediate = AtnConfigSet::new(false);
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

        let mut out = AtnConfigSet::new(false);
        let ctx = ClosureContext {
            full_ctx: false,
            is_lexer: true,
            current_precedence: 0,
            current_input_index: input_index + 1,
        };
        for config in intermediate.iter() {
            closure(self.atn, &mut self.cache, config.clone(), &mut out, &ctx);
        }
        out
    }

    /// If any config in DFA state `s` sits on a rule stop, the run accepts
    /// here; the lowest-numbered rule/alt wins ties, matching the order
    /// closure deposited configs in.
    fn accept_at(&self, mode: usize, s: DfaStateId, input: &dyn CharStream) -> Option<AcceptRecord> {
        let state = self.dfas[mode].state(s);
        for config in state.configs.iter() {
            let atn_state = self.atn.state(config.state);
            if atn_state.state_type == StateType::RuleStop {
                let token_type = self
                    .atn
                    .rule_to_token_type
                    .get(atn_state.rule_index as usize)
                    .copied()
                    .flatten()
                    .unwrap_or(-1);
                return Some(AcceptRecord {
                    input_index: input.index() + 1,
                    lexer_action_executor: config.lexer_action_executor.clone().unwrap_or_default(),
                    token_type,
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use allstar_bytecode::atn::{AtnState, GrammarType, StateIndex, Transition};
    use allstar_core::char_stream::InputStream;

    /// `ID: [a-z]+;` as a tiny hand-built ATN: start -> loop entry (basic) ->
    /// range[a-z] -> loop back epsilon to loop entry, and an epsilon exit to
    /// the rule stop. Greedy, so the simulator should eat as many letters as
    /// possible before accepting.
    fn id_only_atn() -> Atn {
        let mode_start: StateIndex = 0;
        let rule_start: StateIndex = 1;
        let loop_entry: StateIndex = 2;
        let match_range: StateIndex = 3;
        let rule_stop: StateIndex = 4;

        let mut states = vec![AtnState::new(0, StateType::Basic, 0); 5];
        states[0] = AtnState::new(0, StateType::TokenStart, 0);
        states[0].transitions.push(Transition::Rule {
            target: rule_start,
            rule_start,
            rule_index: 0,
            follow_state: rule_stop,
            precedence: 0,
        });
        states[1] = AtnState::new(rule_start, StateType::RuleStart, 0);
        states[1].transitions.push(Transition::Epsilon { target: loop_entry });
        states[2] = AtnState::new(loop_entry, StateType::StarLoopEntry, 0);
        states[2].transitions.push(Transition::Epsilon { target: match_range });
        states[2].transitions.push(Transition::Epsilon { target: rule_stop });
        states[3] = AtnState::new(match_range, StateType::Basic, 0);
        states[3].transitions.push(Transition::Range {
            target: loop_entry,
            from: 'a' as i32,
            to: 'z' as i32,
        });
        states[4] = AtnState::new(rule_stop, StateType::RuleStop, 0);

        Atn {
            grammar_type: GrammarType::Lexer,
            max_token_type: 1,
            states,
            decision_to_state: vec![loop_entry],
            rule_to_start_state: vec![rule_start],
            rule_to_stop_state: vec![rule_stop],
            rule_to_token_type: vec![Some(1)],
            mode_to_start_state: vec![mode_start],
            lexer_actions: Vec::new(),
        }
    }

    #[test]
    fn longest_match_consumes_every_letter() {
        let atn = id_only_atn();
        let mut sim = LexerAtnSimulator::new(&atn);
        let mut input = InputStream::new("abc ");
        let mut tracer = crate::trace::NoopTracer;
        let m = sim.match_token(&mut input, 0, &mut tracer).expect("should match");
        assert_eq!(m.token_type, 1);
        assert_eq!(m.start, 0);
        assert_eq!(m.stop, 2);
        assert_eq!(input.index(), 3);
    }

    #[test]
    fn repeated_matches_hit_the_cached_dfa() {
        let atn = id_only_atn();
        let mut sim = LexerAtnSimulator::new(&atn);
        let mut input = InputStream::new("ab cd");
        let mut tracer = crate::trace::NoopTracer;
        sim.match_token(&mut input, 0, &mut tracer).expect("first token");
        input.seek(3).unwrap();
        let m = sim.match_token(&mut input, 0, &mut tracer).expect("second token");
        assert_eq!(m.start, 3);
        assert_eq!(m.stop, 4);
    }

    #[test]
    fn no_viable_alt_on_unmatched_input() {
        let atn = id_only_atn();
        let mut sim = LexerAtnSimulator::new(&atn);
        let mut input = InputStream::new("123");
        let mut tracer = crate::trace::NoopTracer;
        assert!(sim.match_token(&mut input, 0, &mut tracer).is_err());
    }
}
