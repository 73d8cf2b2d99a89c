//! Graph-structured prediction contexts: an arena of immutable, interned
//! nodes representing rule-invocation call stacks, plus the merge algebra
//! used to combine them during closure.
//!
//! The reference implementation shares nodes by object identity across a GC
//! heap. Here the arena plays that role directly (see the teacher's
//! `FrameArena` cactus stack): every node is interned by structural equality
//! so "same stack" becomes an integer comparison instead of a graph walk.

use std::collections::HashMap;

/// Index into a [`PredictionContextCache`]'s node arena. Two contexts are
/// the same stack iff they carry the same id.
pub type ContextId = u32;

/// Sentinel return-state value marking an array slot whose remaining stack
/// is empty (the "null parent" branch from the reference encoding).
pub const EMPTY_RETURN_STATE: i32 = i32::MAX;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Node {
    Empty,
    Singleton {
        parent: ContextId,
        return_state: i32,
    },
    /// Invariant: `return_states` ascending, ties broken by `parents` id, no
    /// duplicate `(parent, return_state)` pairs.
    Array {
        parents: Vec<ContextId>,
        return_states: Vec<i32>,
    },
}

pub struct PredictionContextCache {
    nodes: Vec<Node>,
    index: HashMap<Node, ContextId>,
}

impl Default for PredictionContextCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictionContextCache {
    pub fn new() -> Self {
        let mut index = HashMap::new();
        index.insert(Node::Empty, 0);
        Self {
            nodes: vec![Node::Empty],
            index,
        }
    }

    pub fn empty(&self) -> ContextId {
        0
    }

    pub fn is_empty(&self, id: ContextId) -> bool {
        id == 0
    }

    fn intern(&mut self, node: Node) -> ContextId {
        if let Some(&id) = self.index.get(&node) {
            return id;
        }
        let id = self.nodes.len() as ContextId;
        self.index.insert(node.clone(), id);
        self.nodes.push(node);
        id
    }

    pub fn singleton(&mut self, parent: ContextId, return_state: i32) -> ContextId {
        self.intern(Node::Singleton { parent, return_state })
    }

    /// Builds a context from a set of `(parent, returnState)` pairs — the
    /// shape a decision's alternatives produce before any merging happens.
    /// Sorts and dedups to keep the array invariant.
    pub fn from_pairs(&mut self, mut pairs: Vec<(ContextId, i32)>) -> ContextId {
        pairs.sort_by_key(|&(parent, state)| (state, parent));
        pairs.dedup();
        self.build_array(
            pairs.iter().map(|&(p, _)| p).collect(),
            pairs.iter().map(|&(_, s)| s).collect(),
        )
    }

    fn build_array(&mut self, parents: Vec<ContextId>, return_states: Vec<i32>) -> ContextId {
        match return_states.len() {
            0 => self.empty(),
            1 => {
                if parents[0] == self.empty() && return_states[0] == EMPTY_RETURN_STATE {
                    self.empty()
                } else {
                    self.singleton(parents[0], return_states[0])
                }
            }
            _ => self.intern(Node::Array { parents, return_states }),
        }
    }

    /// Every node's `(parent, returnState)` pairs in the uniform array shape
    /// the merge algorithm operates on — `Empty` becomes the single pair
    /// `(EMPTY, EMPTY_RETURN_STATE)`.
    fn array_form(&self, id: ContextId) -> (Vec<ContextId>, Vec<i32>) {
        match &self.nodes[id as usize] {
            Node::Empty => (vec![0], vec![EMPTY_RETURN_STATE]),
            Node::Singleton { parent, return_state } => (vec![*parent], vec![*return_state]),
            Node::Array { parents, return_states } => (parents.clone(), return_states.clone()),
        }
    }

    pub fn depth(&self, id: ContextId) -> usize {
        match &self.nodes[id as usize] {
            Node::Empty => 0,
            Node::Singleton { parent, .. } => 1 + self.depth(*parent),
            Node::Array { parents, .. } => {
                1 + parents.iter().map(|&p| self.depth(p)).max().unwrap_or(0)
            }
        }
    }

    /// The `(parent, returnState)` pairs a config should branch into when
    /// popping this context at a rule-stop state. Public counterpart of
    /// `array_form` for closure's rule-stop handling.
    pub fn pairs(&self, id: ContextId) -> Vec<(ContextId, i32)> {
        let (parents, states) = self.array_form(id);
        parents.into_iter().zip(states).collect()
    }

    /// All nodes reachable from `id`, for debugging dumps.
    pub fn all_context_nodes(&self, id: ContextId) -> Vec<ContextId> {
        let mut seen = Vec::new();
        self.collect(id, &mut seen);
        seen
    }

    fn collect(&self, id: ContextId, seen: &mut Vec<ContextId>) {
        if seen.contains(&id) {
            return;
        }
        seen.push(id);
        match &self.nodes[id as usize] {
            Node::Empty => {}
            Node::Singleton { parent, .. } => self.collect(*parent, seen),
            Node::Array { parents, .. } => {
                for &p in parents {
                    self.collect(p, seen);
                }
            }
        }
    }

    pub fn display(&self, id: ContextId) -> String {
        match &self.nodes[id as usize] {
            Node::Empty => "$".to_string(),
            Node::Singleton { parent, return_state } => {
                format!("{}→{}", return_state, self.display(*parent))
            }
            Node::Array { parents, return_states } => {
                let parts: Vec<String> = return_states
                    .iter()
                    .zip(parents)
                    .map(|(s, &p)| format!("{}→{}", s, self.display(p)))
                    .collect();
                format!("[{}]", parts.join(", "))
            }
        }
    }
}

/// Cache key also carries `rootIsWildcard` since SLL and LL merges of the
/// same two contexts can legitimately produce different results.
type MergeMemo = HashMap<(ContextId, ContextId, bool), ContextId>;

/// Merges two call-stack contexts into one representing "either stack is
/// possible here", deduplicating shared suffixes. `root_is_wildcard` selects
/// SLL semantics (`true`: EMPTY absorbs, i.e. "anything could follow") versus
/// full LL semantics (`false`: EMPTY is one concrete possible tail, unioned
/// alongside the rest).
pub fn merge(
    cache: &mut PredictionContextCache,
    a: ContextId,
    b: ContextId,
    root_is_wildcard: bool,
) -> ContextId {
    let mut memo = MergeMemo::new();
    merge_memoized(cache, a, b, root_is_wildcard, &mut memo)
}

fn merge_memoized(
    cache: &mut PredictionContextCache,
    a: ContextId,
    b: ContextId,
    root_is_wildcard: bool,
    memo: &mut MergeMemo,
) -> ContextId {
    if a == b {
        return a;
    }
    if let Some(&hit) = memo.get(&(a, b, root_is_wildcard)).or_else(|| memo.get(&(b, a, root_is_wildcard))) {
        return hit;
    }

    if root_is_wildcard {
        if cache.is_empty(a) {
            memo.insert((a, b, root_is_wildcard), a);
            return a;
        }
        if cache.is_empty(b) {
            memo.insert((a, b, root_is_wildcard), b);
            return b;
        }
    }

    let (a_parents, a_states) = cache.array_form(a);
    let (b_parents, b_states) = cache.array_form(b);

    let mut merged_parents = Vec::with_capacity(a_states.len() + b_states.len());
    let mut merged_states = Vec::with_capacity(a_states.len() + b_states.len());
    let (mut i, mut j) = (0usize, 0usize);
    while i < a_states.len() && j < b_states.len() {
        match a_states[i].cmp(&b_states[j]) {
            std::cmp::Ordering::Equal => {
                let mp = merge_memoized(cache, a_parents[i], b_parents[j], root_is_wildcard, memo);
                merged_parents.push(mp);
                merged_states.push(a_states[i]);
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => {
                merged_parents.push(a_parents[i]);
                merged_states.push(a_states[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                merged_parents.push(b_parents[j]);
                merged_states.push(b_states[j]);
                j += 1;
            }
        }
    }
    merged_parents.extend_from_slice(&a_parents[i..]);
    merged_states.extend_from_slice(&a_states[i..]);
    merged_parents.extend_from_slice(&b_parents[j..]);
    merged_states.extend_from_slice(&b_states[j..]);

    let result = cache.build_array(merged_parents, merged_states);
    memo.insert((a, b, root_is_wildcard), result);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_contexts_merge_to_themselves() {
        let mut cache = PredictionContextCache::new();
        let a = cache.singleton(cache.empty(), 5);
        assert_eq!(merge(&mut cache, a, a, true), a);
    }

    #[test]
    fn sll_wildcard_root_absorbs_empty() {
        let mut cache = PredictionContextCache::new();
        let a = cache.singleton(cache.empty(), 5);
        let empty = cache.empty();
        assert_eq!(merge(&mut cache, empty, a, true), empty);
        assert_eq!(merge(&mut cache, a, empty, true), empty);
    }

    #[test]
    fn ll_mode_unions_empty_as_concrete_branch() {
        let mut cache = PredictionContextCache::new();
        let a = cache.singleton(cache.empty(), 5);
        let empty = cache.empty();
        let merged = merge(&mut cache, empty, a, false);
        assert_ne!(merged, empty);
        assert_ne!(merged, a);
    }

    #[test]
    fn singletons_with_equal_return_state_merge_parents() {
        let mut cache = PredictionContextCache::new();
        let p1 = cache.singleton(cache.empty(), 1);
        let p2 = cache.singleton(cache.empty(), 2);
        let a = cache.singleton(p1, 9);
        let b = cache.singleton(p2, 9);
        let merged = merge(&mut cache, a, b, true);
        // parents differ but return state matches: expect a fresh singleton
        // whose parent is itself the merge of p1 and p2.
        assert_ne!(merged, a);
        assert_ne!(merged, b);
    }

    #[test]
    fn singletons_with_distinct_return_states_produce_sorted_array() {
        let mut cache = PredictionContextCache::new();
        let common_parent = cache.singleton(cache.empty(), 100);
        let a = cache.singleton(common_parent, 9);
        let b = cache.singleton(common_parent, 3);
        let merged = merge(&mut cache, a, b, true);
        assert_ne!(merged, a);
        assert_ne!(merged, b);
        assert_eq!(cache.depth(merged), cache.depth(a));
    }

    #[test]
    fn merge_is_order_independent() {
        let mut cache = PredictionContextCache::new();
        let a = cache.singleton(cache.empty(), 1);
        let b = cache.singleton(cache.empty(), 2);
        let ab = merge(&mut cache, a, b, true);
        let ba = merge(&mut cache, b, a, true);
        assert_eq!(ab, ba);
    }

    #[test]
    fn structurally_equal_contexts_are_interned_to_one_id() {
        let mut cache = PredictionContextCache::new();
        let a = cache.singleton(cache.empty(), 42);
        let b = cache.singleton(cache.empty(), 42);
        assert_eq!(a, b);
    }

    #[test]
    fn from_pairs_builds_sorted_array_and_collapses_singletons() {
        let mut cache = PredictionContextCache::new();
        let empty = cache.empty();
        let single = cache.from_pairs(vec![(empty, 7)]);
        assert_eq!(single, cache.singleton(empty, 7));

        let multi = cache.from_pairs(vec![(empty, 7), (empty, 3)]);
        let (_, states) = cache.array_form(multi);
        assert_eq!(states, vec![3, 7]);
    }
}
