//! Configurations and configuration sets: the elements of the ATN subset
//! construction performed by closure/reach.

use std::collections::HashMap;

use indexmap::IndexMap;

use allstar_bytecode::bitset::BitSet;
use allstar_bytecode::atn::StateIndex;

use crate::context::{merge, ContextId, PredictionContextCache};
use crate::lexer_action_executor::LexerActionExecutor;
use crate::semantic::SemanticContext;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AtnConfig {
    pub state: StateIndex,
    pub alt: u32,
    pub context: ContextId,
    pub semantic_context: SemanticContext,
    /// Count of rule-stop crossings with an empty remaining stack — a
    /// config that dipped out of the outer decision entirely.
    pub reaches_into_outer_context: u32,
    pub precedence_filter_suppressed: bool,
    /// Lexer-only: set once this config's path has gone through a
    /// non-greedy star loop's decision, so the simulator can stop widening
    /// at the first accept instead of searching for a longer match.
    pub passed_through_non_greedy_decision: bool,
    /// Lexer-only: actions accumulated along this path, executed at accept.
    pub lexer_action_executor: Option<LexerActionExecutor>,
}

impl AtnConfig {
    pub fn new(state: StateIndex, alt: u32, context: ContextId) -> Self {
        Self {
            state,
            alt,
            context,
            semantic_context: SemanticContext::None,
            reaches_into_outer_context: 0,
            precedence_filter_suppressed: false,
            passed_through_non_greedy_decision: false,
            lexer_action_executor: None,
        }
    }

    /// The key configs are merged on: identical `(state, alt, semanticContext)`
    /// congruent configs fold their contexts together instead of appending.
    fn congruence_key(&self) -> (StateIndex, u32, SemanticContext) {
        (self.state, self.alt, self.semantic_context.clone())
    }
}

/// Ordered, hash-indexed set of configurations built during one closure/reach
/// step. Backed by an `IndexMap` keyed on `(state, alt, semanticContext)` so
/// congruence lookup during `add` is O(1) while iteration still sees configs
/// in the order they were first inserted — the reference's `LinkedHashMap`
/// role.
#[derive(Clone, Debug, Default)]
pub struct AtnConfigSet {
    configs: IndexMap<(StateIndex, u32, SemanticContext), AtnConfig>,
    pub full_ctx: bool,
    pub has_semantic_context: bool,
    pub dips_into_outer_context: bool,
    read_only: bool,
}

impl AtnConfigSet {
    pub fn new(full_ctx: bool) -> Self {
        Self {
            full_ctx,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AtnConfig> {
        self.configs.values()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Freezes the set after it's installed as a DFA state's configs.
    pub fn seal(&mut self) {
        self.read_only = true;
    }

    /// Inserts `config`, merging its context with any congruent existing
    /// config's context via the prediction-context merge algebra. Returns
    /// `true` if a fresh entry was appended.
    ///
    /// # Panics
    /// Panics if the set is read-only — mutating an installed DFA state's
    /// configs is a caller bug, not a recoverable condition.
    pub fn add(&mut self, cache: &mut PredictionContextCache, config: AtnConfig) -> bool {
        assert!(!self.read_only, "cannot mutate a sealed ATNConfigSet");

        if !matches!(config.semantic_context, SemanticContext::None) {
            self.has_semantic_context = true;
        }
        if config.reaches_into_outer_context > 0 {
            self.dips_into_outer_context = true;
        }

        let key = config.congruence_key();
        if let Some(existing) = self.configs.get_mut(&key) {
            existing.context = merge(cache, existing.context, config.context, !self.full_ctx);
            existing.reaches_into_outer_context = existing
                .reaches_into_outer_context
                .max(config.reaches_into_outer_context);
            false
        } else {
            self.configs.insert(key, config);
            true
        }
    }

    /// Whether every config predicts the same alternative.
    pub fn has_unique_alt(&self) -> bool {
        let mut alts = self.configs.values().map(|c| c.alt);
        match alts.next() {
            None => true,
            Some(first) => alts.all(|a| a == first),
        }
    }

    pub fn unique_alt(&self) -> Option<u32> {
        if self.has_unique_alt() {
            self.configs.values().next().map(|c| c.alt)
        } else {
            None
        }
    }

    pub fn alts(&self) -> BitSet {
        self.configs.values().map(|c| c.alt as usize).collect()
    }

    /// Partitions configs by `(state, context)`; alternatives sharing a
    /// partition with another alt are mutually conflicting. Used by both SLL
    /// and LL conflict detection — callers interpret the partitions
    /// differently (see `parser_sim`).
    pub fn conflicting_alt_subsets(&self) -> Vec<BitSet> {
        let mut partitions: HashMap<(StateIndex, ContextId), BitSet> = HashMap::new();
        for c in self.configs.values() {
            partitions
                .entry((c.state, c.context))
                .or_default()
                .set(c.alt as usize);
        }
        partitions.into_values().collect()
    }
}

impl PartialEq for AtnConfigSet {
    fn eq(&self, other: &Self) -> bool {
        self.configs.values().eq(other.configs.values())
            && self.full_ctx == other.full_ctx
            && self.has_semantic_context == other.has_semantic_context
            && self.dips_into_outer_context == other.dips_into_outer_context
    }
}
impl Eq for AtnConfigSet {}

impl std::hash::Hash for AtnConfigSet {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for c in self.configs.values() {
            c.hash(state);
        }
    }
}
