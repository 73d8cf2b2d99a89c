//! Epsilon-closure: the inner loop shared by the lexer and parser
//! simulators. Walks epsilon transitions from a seed configuration,
//! crossing rule boundaries by pushing/popping [`PredictionContext`]
//! frames, accumulating lexer actions and semantic predicates along the
//! way, and depositing every terminal configuration into the result set.

use std::collections::HashSet;

use allstar_bytecode::atn::{Atn, StateIndex, StateType, Transition};

use crate::config::{AtnConfig, AtnConfigSet};
use crate::context::PredictionContextCache;
use crate::semantic::{and_all, SemanticContext};

/// Bounds recursion so a malformed or adversarial ATN can't blow the stack;
/// real grammars never approach this depth; a practical nesting depth would
/// be in the low hundreds at most.
const MAX_CLOSURE_DEPTH: u32 = 2000;

#[derive(Clone, Copy, Debug)]
pub struct ClosureContext {
    pub full_ctx: bool,
    pub is_lexer: bool,
    /// Current parser precedence, used to filter `Precedence` transitions
    /// for left-recursive rules. Irrelevant (`0`) for lexer closures.
    pub current_precedence: i32,
    /// Current input index, used to position-tag lexer actions that are
    /// context-dependent.
    pub current_input_index: i64,
}

pub fn closure(
    atn: &Atn,
    cache: &mut PredictionContextCache,
    seed: AtnConfig,
    out: &mut AtnConfigSet,
    ctx: &ClosureContext,
) {
    let mut visited = HashSet::new();
    closure_impl(atn, cache, seed, out, &mut visited, ctx, 0);
}

type VisitKey = (StateIndex, u32, crate::context::ContextId, SemanticContext);

fn closure_impl(
    atn: &Atn,
    cache: &mut PredictionContextCache,
    config: AtnConfig,
    out: &mut AtnConfigSet,
    visited: &mut HashSet<VisitKey>,
    ctx: &ClosureContext,
    depth: u32,
) {
    if depth > MAX_CLOSURE_DEPTH {
        return;
    }
    let key: VisitKey = (config.state, config.alt, config.context, config.semantic_context.clone());
    if !visited.insert(key) {
        return;
    }

    let state = atn.state(config.state);

    if state.state_type == StateType::RuleStop {
        if cache.is_empty(config.context) {
            // Exited the topmost rule on this stack: this config has
            // nothing left to match against in-decision; retain it for
            // conflict analysis, marking the dip into outer context.
            let mut surfaced = config.clone();
            surfaced.reaches_into_outer_context += 1;
            out.add(cache, surfaced);
            return;
        }
        for (parent, return_state) in cache.pairs(config.context) {
            let mut next = config.clone();
            next.context = parent;
            next.state = return_state as StateIndex;
            closure_impl(atn, cache, next, out, visited, ctx, depth + 1);
        }
        return;
    }

    if state.transitions.is_empty() {
        out.add(cache, config);
        return;
    }

    let mut dead_end = true;
    for t in &state.transitions {
        if !t.is_epsilon() {
            continue;
        }
        dead_end = false;
        step(atn, cache, &config, t, out, visited, ctx, depth);
    }

    if dead_end {
        // Every outgoing transition consumes input (or there are none left
        // to try epsilon-wise): this configuration is a reach target, not a
        // closure leaf to discard.
        out.add(cache, config);
    }
}

fn step(
    atn: &Atn,
    cache: &mut PredictionContextCache,
    config: &AtnConfig,
    t: &Transition,
    out: &mut AtnConfigSet,
    visited: &mut HashSet<VisitKey>,
    ctx: &ClosureContext,
    depth: u32,
) {
    match t {
        Transition::Epsilon { target } => {
            let mut next = config.clone();
            next.state = *target;
            closure_impl(atn, cache, next, out, visited, ctx, depth + 1);
        }
        Transition::Rule { target, follow_state, .. } => {
            let new_context = cache.singleton(config.context, *follow_state as i32);
            let mut next = config.clone();
            next.state = *target;
            next.context = new_context;
            closure_impl(atn, cache, next, out, visited, ctx, depth + 1);
        }
        Transition::Predicate { rule_index, pred_index, is_ctx_dependent, target } => {
            let mut next = config.clone();
            next.state = *target;
            next.semantic_context = and_all(vec![
                config.semantic_context.clone(),
                SemanticContext::Predicate {
                    rule_index: *rule_index,
                    pred_index: *pred_index,
                    is_ctx_dependent: *is_ctx_dependent,
                },
            ]);
            closure_impl(atn, cache, next, out, visited, ctx, depth + 1);
        }
        Transition::Action { action_index, target, .. } => {
            let mut next = config.clone();
            next.state = *target;
            if ctx.is_lexer && *action_index >= 0 {
                if let Some(action) = atn.lexer_actions.get(*action_index as usize) {
                    let exec = config.lexer_action_executor.clone().unwrap_or_default();
                    next.lexer_action_executor = Some(exec.append(action.clone(), ctx.current_input_index));
                }
            }
            closure_impl(atn, cache, next, out, visited, ctx, depth + 1);
        }
        Transition::Precedence { precedence, target } => {
            if *precedence < ctx.current_precedence && !config.precedence_filter_suppressed {
                return;
            }
            let mut next = config.clone();
            next.state = *target;
            closure_impl(atn, cache, next, out, visited, ctx, depth + 1);
        }
        _ => unreachable!("non-epsilon transition passed to closure step"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use allstar_bytecode::atn::{AtnState, GrammarType};

    fn ctx(full: bool) -> ClosureContext {
        ClosureContext { full_ctx: full, is_lexer: false, current_precedence: 0, current_input_index: 0 }
    }

    fn atn_with(states: Vec<AtnState>, rule_starts: Vec<StateIndex>, rule_stops: Vec<StateIndex>) -> Atn {
        Atn {
            grammar_type: GrammarType::Parser,
            max_token_type: 10,
            states,
            decision_to_state: Vec::new(),
            rule_to_start_state: rule_starts,
            rule_to_stop_state: rule_stops,
            rule_to_token_type: Vec::new(),
            mode_to_start_state: Vec::new(),
            lexer_actions: Vec::new(),
        }
    }

    #[test]
    fn closure_follows_epsilon_chains_to_a_reach_leaf() {
        let mut s0 = AtnState::new(0, StateType::Basic, 0);
        s0.transitions.push(Transition::Epsilon { target: 1 });
        let mut s1 = AtnState::new(1, StateType::Basic, 0);
        s1.transitions.push(Transition::Atom { target: 2, label: 7 });
        let s2 = AtnState::new(2, StateType::RuleStop, 0);
        let atn = atn_with(vec![s0, s1, s2], vec![0], vec![2]);

        let mut cache = PredictionContextCache::new();
        let mut out = AtnConfigSet::new(false);
        let empty = cache.empty();
        closure(&atn, &mut cache, AtnConfig::new(0, 1, empty), &mut out, &ctx(false));

        assert_eq!(out.len(), 1);
        assert_eq!(out.iter().next().unwrap().state, 1);
    }

    #[test]
    fn closure_pops_rule_stop_via_context_to_follow_state() {
        // Rule 0 invokes rule 1; rule 1's stop pops back to state 2 in rule 0.
        let mut states = vec![AtnState::new(0, StateType::Basic, 0); 12];
        states[0].transitions.push(Transition::Rule {
            target: 10,
            rule_start: 10,
            rule_index: 1,
            follow_state: 2,
            precedence: 0,
        });
        states[2] = AtnState::new(2, StateType::Basic, 0);
        states[10] = AtnState::new(10, StateType::RuleStart, 1);
        states[10].transitions.push(Transition::Epsilon { target: 11 });
        states[11] = AtnState::new(11, StateType::RuleStop, 1);
        let atn = atn_with(states, vec![0, 10], vec![0, 11]);

        let mut cache = PredictionContextCache::new();
        let mut out = AtnConfigSet::new(false);
        let empty = cache.empty();
        closure(&atn, &mut cache, AtnConfig::new(0, 1, empty), &mut out, &ctx(false));

        assert_eq!(out.len(), 1);
        assert_eq!(out.iter().next().unwrap().state, 2);
    }
}
