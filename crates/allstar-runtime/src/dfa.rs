//! Per-decision DFA cache: the memoization layer that lets repeated
//! predictions over the same decision skip ATN subset construction entirely
//! once a path has been walked once.

use std::collections::HashMap;
use std::sync::Mutex;

use allstar_bytecode::atn::StateIndex;

use crate::config::AtnConfigSet;
use crate::semantic::SemanticContext;

pub type DfaStateId = u32;

/// Sentinel marking a state as a known dead end, distinguishable from "no
/// edge computed yet" without allocating an error config set.
pub const ERROR_STATE: DfaStateId = u32::MAX;

#[derive(Clone, Debug)]
pub struct DfaState {
    pub state_number: DfaStateId,
    pub configs: AtnConfigSet,
    /// Keyed by `symbol + 1` so index `0` is the EOF (`-1`) sentinel, per
    /// the reference edge-indexing convention.
    edges: HashMap<i32, DfaStateId>,
    pub is_accept_state: bool,
    pub prediction: Option<u32>,
    pub predicates: Vec<(SemanticContext, u32)>,
    pub requires_full_context: bool,
}

impl DfaState {
    fn new(state_number: DfaStateId, configs: AtnConfigSet) -> Self {
        Self {
            state_number,
            configs,
            edges: HashMap::new(),
            is_accept_state: false,
            prediction: None,
            predicates: Vec::new(),
            requires_full_context: false,
        }
    }

    fn edge_key(symbol: i32) -> i32 {
        symbol + 1
    }
}

struct DfaInner {
    states: Vec<DfaState>,
    /// Canonicalizes config sets to their installed DFA state, so two
    /// structurally equal subset-construction results collapse to one node.
    index: HashMap<AtnConfigSet, DfaStateId>,
    s0: Option<DfaStateId>,
    /// Precedence decisions index their start state by the parser's current
    /// precedence level instead of sharing one `s0`.
    s0_by_precedence: HashMap<i32, DfaStateId>,
}

pub struct Dfa {
    pub decision: usize,
    pub atn_start_state: StateIndex,
    pub precedence_dfa: bool,
    inner: Mutex<DfaInner>,
}

impl Dfa {
    pub fn new(decision: usize, atn_start_state: StateIndex, precedence_dfa: bool) -> Self {
        Self {
            decision,
            atn_start_state,
            precedence_dfa,
            inner: Mutex::new(DfaInner {
                states: Vec::new(),
                index: HashMap::new(),
                s0: None,
                s0_by_precedence: HashMap::new(),
            }),
        }
    }

    pub fn s0(&self) -> Option<DfaStateId> {
        self.inner.lock().unwrap().s0
    }

    pub fn set_s0(&self, id: DfaStateId) {
        self.inner.lock().unwrap().s0 = Some(id);
    }

    pub fn s0_for_precedence(&self, precedence: i32) -> Option<DfaStateId> {
        assert!(self.precedence_dfa, "s0_for_precedence on a non-precedence DFA");
        self.inner.lock().unwrap().s0_by_precedence.get(&precedence).copied()
    }

    pub fn set_s0_for_precedence(&self, precedence: i32, id: DfaStateId) {
        assert!(self.precedence_dfa, "set_s0_for_precedence on a non-precedence DFA");
        self.inner.lock().unwrap().s0_by_precedence.insert(precedence, id);
    }

    /// Optimistic read of a cached edge. Callers follow the double-checked
    /// discipline themselves: try this first, and only fall back to
    /// computing + `install`ing a new target on a miss.
    pub fn edge(&self, from: DfaStateId, symbol: i32) -> Option<DfaStateId> {
        let guard = self.inner.lock().unwrap();
        guard.states[from as usize].edges.get(&DfaState::edge_key(symbol)).copied()
    }

    pub fn add_edge(&self, from: DfaStateId, symbol: i32, to: DfaStateId) {
        let mut guard = self.inner.lock().unwrap();
        guard.states[from as usize].edges.insert(DfaState::edge_key(symbol), to);
    }

    /// Installs `configs` as a DFA state, re-checking under the lock in case
    /// a concurrent caller already installed a congruent set (the
    /// "double-checked" half of the discipline: the expensive subset
    /// construction happened unlocked, only canonicalization happens here).
    /// The config set is sealed as part of installation.
    pub fn install(&self, mut configs: AtnConfigSet) -> DfaStateId {
        configs.seal();
        let mut guard = self.inner.lock().unwrap();
        if let Some(&existing) = guard.index.get(&configs) {
            return existing;
        }
        let id = guard.states.len() as DfaStateId;
        guard.index.insert(configs.clone(), id);
        guard.states.push(DfaState::new(id, configs));
        id
    }

    pub fn state(&self, id: DfaStateId) -> DfaState {
        self.inner.lock().unwrap().states[id as usize].clone()
    }

    pub fn mark_accept(&self, id: DfaStateId, alt: u32) {
        let mut guard = self.inner.lock().unwrap();
        let state = &mut guard.states[id as usize];
        if let Some(existing) = state.prediction {
            assert_eq!(existing, alt, "DFA state {id} accept alt reassigned (monotonicity violation)");
        }
        state.is_accept_state = true;
        state.prediction = Some(alt);
    }

    pub fn set_requires_full_context(&self, id: DfaStateId) {
        self.inner.lock().unwrap().states[id as usize].requires_full_context = true;
    }

    pub fn num_states(&self) -> usize {
        self.inner.lock().unwrap().states.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AtnConfig, AtnConfigSet};
    use crate::context::PredictionContextCache;

    fn sample_configs(cache: &mut PredictionContextCache, alt: u32) -> AtnConfigSet {
        let mut set = AtnConfigSet::new(false);
        let ctx = cache.empty();
        set.add(cache, AtnConfig::new(0, alt, ctx));
        set
    }

    #[test]
    fn installing_congruent_config_sets_returns_same_state() {
        let mut cache = PredictionContextCache::new();
        let dfa = Dfa::new(0, 0, false);
        let a = dfa.install(sample_configs(&mut cache, 1));
        let b = dfa.install(sample_configs(&mut cache, 1));
        assert_eq!(a, b);
        assert_eq!(dfa.num_states(), 1);
    }

    #[test]
    fn distinct_config_sets_get_distinct_states() {
        let mut cache = PredictionContextCache::new();
        let dfa = Dfa::new(0, 0, false);
        let a = dfa.install(sample_configs(&mut cache, 1));
        let b = dfa.install(sample_configs(&mut cache, 2));
        assert_ne!(a, b);
    }

    #[test]
    fn edge_lookup_is_eof_sentinel_aware() {
        let mut cache = PredictionContextCache::new();
        let dfa = Dfa::new(0, 0, false);
        let s0 = dfa.install(sample_configs(&mut cache, 1));
        let s1 = dfa.install(sample_configs(&mut cache, 2));
        dfa.add_edge(s0, allstar_bytecode::interval::EOF, s1);
        assert_eq!(dfa.edge(s0, allstar_bytecode::interval::EOF), Some(s1));
        assert_eq!(dfa.edge(s0, 5), None);
    }

    #[test]
    #[should_panic(expected = "monotonicity")]
    fn reassigning_accept_alt_panics() {
        let mut cache = PredictionContextCache::new();
        let dfa = Dfa::new(0, 0, false);
        let s0 = dfa.install(sample_configs(&mut cache, 1));
        dfa.mark_accept(s0, 1);
        dfa.mark_accept(s0, 2);
    }

    #[test]
    fn precedence_dfa_indexes_s0_by_level() {
        let dfa = Dfa::new(0, 0, true);
        dfa.set_s0_for_precedence(3, 7);
        assert_eq!(dfa.s0_for_precedence(3), Some(7));
        assert_eq!(dfa.s0_for_precedence(4), None);
    }
}
