//! The deserialized ATN graph itself.

use crate::lexer_action::LexerAction;
use super::state::{AtnState, StateIndex};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrammarType {
    Lexer,
    Parser,
}

/// A fully resolved ATN: every transition target is a valid index into
/// `states`, every rule has a start and stop state, decisions are dense from
/// zero. Immutable once built; shared across recognizer instances.
#[derive(Clone, Debug)]
pub struct Atn {
    pub grammar_type: GrammarType,
    pub max_token_type: i32,
    pub states: Vec<AtnState>,
    /// decision number -> state index; dense from 0.
    pub decision_to_state: Vec<StateIndex>,
    /// rule index -> start/stop state index; parallel, one entry per rule.
    pub rule_to_start_state: Vec<StateIndex>,
    pub rule_to_stop_state: Vec<StateIndex>,
    /// lexer only: rule index -> token type emitted by that rule, or
    /// `None` for fragment rules.
    pub rule_to_token_type: Vec<Option<i32>>,
    /// lexer only: mode index -> start state index.
    pub mode_to_start_state: Vec<StateIndex>,
    pub lexer_actions: Vec<LexerAction>,
}

impl Atn {
    pub fn state(&self, index: StateIndex) -> &AtnState {
        &self.states[index as usize]
    }

    pub fn state_mut(&mut self, index: StateIndex) -> &mut AtnState {
        &mut self.states[index as usize]
    }

    pub fn decision_state(&self, decision: usize) -> &AtnState {
        self.state(self.decision_to_state[decision])
    }

    pub fn num_decisions(&self) -> usize {
        self.decision_to_state.len()
    }

    pub fn rule_start_state(&self, rule_index: usize) -> &AtnState {
        self.state(self.rule_to_start_state[rule_index])
    }

    pub fn rule_stop_state(&self, rule_index: usize) -> &AtnState {
        self.state(self.rule_to_stop_state[rule_index])
    }

    /// The FOLLOW set immediately reachable inside the rule containing
    /// `state`, computed on first use and cached on the state itself.
    ///
    /// Grounded on the reference `ATN.nextTokens(ATNState)`: walk the state's
    /// outgoing transitions, collecting symbol labels and recursing through
    /// epsilon edges, refusing to cross a rule boundary.
    pub fn next_tokens_within_rule(&self, state_index: StateIndex) -> crate::interval::IntervalSet {
        let mut result = crate::interval::IntervalSet::new();
        let mut visited = std::collections::HashSet::new();
        self.collect_next_tokens(state_index, &mut result, &mut visited);
        result
    }

    /// Returns `true` if some epsilon path from `state_index` reaches this
    /// rule's stop state, i.e. the rule can complete from here without
    /// consuming another token.
    fn collect_next_tokens(
        &self,
        state_index: StateIndex,
        result: &mut crate::interval::IntervalSet,
        visited: &mut std::collections::HashSet<StateIndex>,
    ) -> bool {
        if !visited.insert(state_index) {
            return false;
        }
        let state = self.state(state_index);
        if state.state_type == super::state::StateType::RuleStop {
            return true;
        }
        let mut reaches_stop = false;
        for t in &state.transitions {
            match t {
                super::transition::Transition::Rule { .. } => {
                    // Rule invocations don't contribute directly; the caller
                    // is responsible for descending via closure if it wants
                    // the full FIRST set across rule boundaries.
                }
                _ if t.is_epsilon() => {
                    if self.collect_next_tokens(t.target(), result, visited) {
                        reaches_stop = true;
                    }
                }
                _ => {
                    if let Some(label) = t.label() {
                        result.add_set(&label);
                    }
                }
            }
        }
        reaches_stop
    }

    /// The `returnState` an invoking state transitions to once the called
    /// rule completes — the sole `Rule` transition out of that state.
    pub fn rule_transition_follow_state(&self, invoking_state: StateIndex) -> StateIndex {
        self.state(invoking_state)
            .transitions
            .iter()
            .find_map(|t| match t {
                super::transition::Transition::Rule { follow_state, .. } => Some(*follow_state),
                _ => None,
            })
            .unwrap_or(invoking_state)
    }

    /// Full expected-token set at `state_index`, widened outward through
    /// `rule_invocation_stack` (innermost invoking state first) for every
    /// enclosing rule that can still be completed without consuming input.
    ///
    /// Grounded on the reference `ATN.getExpectedTokens`.
    pub fn expected_tokens(
        &self,
        state_index: StateIndex,
        rule_invocation_stack: &[StateIndex],
    ) -> crate::interval::IntervalSet {
        let mut expected = crate::interval::IntervalSet::new();
        let mut visited = std::collections::HashSet::new();
        let mut reaches_stop = self.collect_next_tokens(state_index, &mut expected, &mut visited);

        for &invoking_state in rule_invocation_stack {
            if !reaches_stop {
                break;
            }
            let follow_state = self.rule_transition_follow_state(invoking_state);
            let mut level = crate::interval::IntervalSet::new();
            let mut level_visited = std::collections::HashSet::new();
            reaches_stop = self.collect_next_tokens(follow_state, &mut level, &mut level_visited);
            expected.add_set(&level);
        }

        expected
    }
}
