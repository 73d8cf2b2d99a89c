//! ATN transition variants.
//!
//! Transitions are tagged by payload rather than split into a trait-object
//! hierarchy: the hot paths (closure, reach) match exhaustively over this
//! enum instead of paying for a vtable call per edge.

use crate::interval::IntervalSet;
use super::state::StateIndex;

#[derive(Clone, Debug)]
pub enum Transition {
    Epsilon {
        target: StateIndex,
    },
    Range {
        target: StateIndex,
        from: i32,
        to: i32,
    },
    Rule {
        target: StateIndex,
        rule_start: StateIndex,
        rule_index: u32,
        follow_state: StateIndex,
        precedence: i32,
    },
    Predicate {
        target: StateIndex,
        rule_index: u32,
        pred_index: u32,
        is_ctx_dependent: bool,
    },
    Atom {
        target: StateIndex,
        label: i32,
    },
    Action {
        target: StateIndex,
        rule_index: u32,
        action_index: i32,
        is_ctx_dependent: bool,
    },
    Set {
        target: StateIndex,
        labels: IntervalSet,
    },
    NotSet {
        target: StateIndex,
        labels: IntervalSet,
    },
    Wildcard {
        target: StateIndex,
    },
    /// Left-recursion precedence gate: only traversable when the parser's
    /// current precedence is <= this transition's precedence.
    Precedence {
        target: StateIndex,
        precedence: i32,
    },
}

impl Transition {
    pub fn target(&self) -> StateIndex {
        match self {
            Transition::Epsilon { target }
            | Transition::Range { target, .. }
            | Transition::Rule { target, .. }
            | Transition::Predicate { target, .. }
            | Transition::Atom { target, .. }
            | Transition::Action { target, .. }
            | Transition::Set { target, .. }
            | Transition::NotSet { target, .. }
            | Transition::Wildcard { target }
            | Transition::Precedence { target, .. } => *target,
        }
    }

    pub fn is_epsilon(&self) -> bool {
        matches!(
            self,
            Transition::Epsilon { .. }
                | Transition::Rule { .. }
                | Transition::Predicate { .. }
                | Transition::Action { .. }
                | Transition::Precedence { .. }
        )
    }

    /// Whether this transition consumes a single input symbol equal to `sym`.
    pub fn matches(&self, sym: i32) -> bool {
        match self {
            Transition::Range { from, to, .. } => sym >= *from && sym <= *to,
            Transition::Atom { label, .. } => sym == *label,
            Transition::Set { labels, .. } => labels.contains(sym),
            Transition::NotSet { labels, .. } => sym != crate::interval::EOF && !labels.contains(sym),
            Transition::Wildcard { .. } => sym != crate::interval::EOF,
            _ => false,
        }
    }

    /// The label set this transition matches, for FOLLOW-set computation and
    /// error-message formatting. `None` for transitions with no symbol label.
    pub fn label(&self) -> Option<IntervalSet> {
        match self {
            Transition::Range { from, to, .. } => Some(IntervalSet::of(*from, *to)),
            Transition::Atom { label, .. } => Some(IntervalSet::single(*label)),
            Transition::Set { labels, .. } => Some(labels.clone()),
            Transition::NotSet { labels, .. } => Some(labels.complement(0, i32::MAX)),
            Transition::Wildcard { .. } => Some(IntervalSet::of(0, i32::MAX)),
            _ => None,
        }
    }
}
