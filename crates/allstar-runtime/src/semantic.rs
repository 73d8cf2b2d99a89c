//! Semantic predicate algebra: the boolean lattice prediction partially
//! evaluates without firing side-effecting user predicates.

use std::rc::Rc;

/// Host hook for evaluating the predicates embedded in a grammar. Generated
/// recognizers implement this; the runtime never inspects predicate bodies
/// itself.
pub trait PredicateEvaluator {
    fn sempred(&self, rule_index: u32, pred_index: u32) -> bool;
    /// Current parser precedence, used to resolve `PrecedencePredicate`s.
    fn precedence(&self) -> i32;
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SemanticContext {
    None,
    Predicate {
        rule_index: u32,
        pred_index: u32,
        is_ctx_dependent: bool,
    },
    PrecedencePredicate {
        precedence: i32,
    },
    And(Rc<Vec<SemanticContext>>),
    Or(Rc<Vec<SemanticContext>>),
}

impl SemanticContext {
    pub fn evaluate(&self, evaluator: &dyn PredicateEvaluator) -> bool {
        match self {
            SemanticContext::None => true,
            SemanticContext::Predicate { rule_index, pred_index, .. } => {
                evaluator.sempred(*rule_index, *pred_index)
            }
            SemanticContext::PrecedencePredicate { precedence } => {
                evaluator.precedence() >= *precedence
            }
            SemanticContext::And(ops) => ops.iter().all(|op| op.evaluate(evaluator)),
            SemanticContext::Or(ops) => ops.iter().any(|op| op.evaluate(evaluator)),
        }
    }

    /// Partially evaluates precedence predicates against the current parser
    /// precedence without touching user predicates, returning a simplified
    /// context or `None` when the result is definitely false.
    pub fn evaluate_precedence(&self, evaluator: &dyn PredicateEvaluator) -> Option<SemanticContext> {
        match self {
            SemanticContext::PrecedencePredicate { precedence } => {
                if evaluator.precedence() >= *precedence {
                    Some(SemanticContext::None)
                } else {
                    None
                }
            }
            SemanticContext::And(ops) => {
                let mut simplified = Vec::with_capacity(ops.len());
                for op in ops.iter() {
                    match op.evaluate_precedence(evaluator) {
                        Some(SemanticContext::None) => {}
                        Some(other) => simplified.push(other),
                        None => return None,
                    }
                }
                Some(and_all(simplified))
            }
            SemanticContext::Or(ops) => {
                let mut simplified = Vec::new();
                for op in ops.iter() {
                    match op.evaluate_precedence(evaluator) {
                        Some(SemanticContext::None) => return Some(SemanticContext::None),
                        Some(other) => simplified.push(other),
                        None => {}
                    }
                }
                if simplified.is_empty() {
                    None
                } else {
                    Some(or_all(simplified))
                }
            }
            other => Some(other.clone()),
        }
    }

    fn precedence_value(&self) -> Option<i32> {
        match self {
            SemanticContext::PrecedencePredicate { precedence } => Some(*precedence),
            _ => None,
        }
    }
}

fn flatten_and(items: Vec<SemanticContext>) -> Vec<SemanticContext> {
    let mut flat = Vec::with_capacity(items.len());
    for item in items {
        match item {
            SemanticContext::And(ops) => flat.extend(ops.iter().cloned()),
            other => flat.push(other),
        }
    }
    flat
}

fn flatten_or(items: Vec<SemanticContext>) -> Vec<SemanticContext> {
    let mut flat = Vec::with_capacity(items.len());
    for item in items {
        match item {
            SemanticContext::Or(ops) => flat.extend(ops.iter().cloned()),
            other => flat.push(other),
        }
    }
    flat
}

/// Builds a conjunction, flattening nested ANDs, deduplicating, dropping
/// redundant `None`s, and keeping only the strictest precedence predicate.
pub fn and_all(items: Vec<SemanticContext>) -> SemanticContext {
    let mut ops: Vec<SemanticContext> = flatten_and(items)
        .into_iter()
        .filter(|c| *c != SemanticContext::None)
        .collect();
    ops.dedup();
    ops.sort_by(semantic_order);
    ops.dedup();

    if let Some(highest) = keep_one_precedence_predicate(&mut ops, true) {
        ops.push(highest);
    }

    match ops.len() {
        0 => SemanticContext::None,
        1 => ops.into_iter().next().unwrap(),
        _ => SemanticContext::And(Rc::new(ops)),
    }
}

/// Builds a disjunction; symmetric to [`and_all`] but keeps the *lowest*
/// precedence predicate (the least restrictive alternative still viable).
pub fn or_all(items: Vec<SemanticContext>) -> SemanticContext {
    let mut ops: Vec<SemanticContext> = flatten_or(items)
        .into_iter()
        .filter(|c| *c != SemanticContext::None)
        .collect();
    ops.dedup();
    ops.sort_by(semantic_order);
    ops.dedup();

    if let Some(lowest) = keep_one_precedence_predicate(&mut ops, false) {
        ops.push(lowest);
    }

    match ops.len() {
        0 => SemanticContext::None,
        1 => ops.into_iter().next().unwrap(),
        _ => SemanticContext::Or(Rc::new(ops)),
    }
}

/// Removes all `PrecedencePredicate` entries from `ops`, returning the one
/// to keep (highest value if `want_highest`, else lowest), or `None` if
/// there were none to begin with.
fn keep_one_precedence_predicate(ops: &mut Vec<SemanticContext>, want_highest: bool) -> Option<SemanticContext> {
    let mut best: Option<i32> = None;
    ops.retain(|op| {
        if let Some(p) = op.precedence_value() {
            best = Some(match best {
                None => p,
                Some(existing) => {
                    if want_highest {
                        existing.max(p)
                    } else {
                        existing.min(p)
                    }
                }
            });
            false
        } else {
            true
        }
    });
    best.map(|p| SemanticContext::PrecedencePredicate { precedence: p })
}

fn semantic_order(a: &SemanticContext, b: &SemanticContext) -> std::cmp::Ordering {
    format!("{a:?}").cmp(&format!("{b:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeEval {
        truths: Vec<bool>,
        precedence: i32,
    }

    impl PredicateEvaluator for FakeEval {
        fn sempred(&self, _rule_index: u32, pred_index: u32) -> bool {
            self.truths[pred_index as usize]
        }

        fn precedence(&self) -> i32 {
            self.precedence
        }
    }

    #[test]
    fn and_of_none_reduces_to_none() {
        let ctx = and_all(vec![SemanticContext::None, SemanticContext::None]);
        assert_eq!(ctx, SemanticContext::None);
    }

    #[test]
    fn and_keeps_only_highest_precedence_predicate() {
        let ctx = and_all(vec![
            SemanticContext::PrecedencePredicate { precedence: 3 },
            SemanticContext::PrecedencePredicate { precedence: 7 },
        ]);
        assert_eq!(ctx, SemanticContext::PrecedencePredicate { precedence: 7 });
    }

    #[test]
    fn or_keeps_only_lowest_precedence_predicate() {
        let ctx = or_all(vec![
            SemanticContext::PrecedencePredicate { precedence: 3 },
            SemanticContext::PrecedencePredicate { precedence: 7 },
        ]);
        assert_eq!(ctx, SemanticContext::PrecedencePredicate { precedence: 3 });
    }

    #[test]
    fn evaluate_and_short_circuits_over_operands() {
        let ctx = and_all(vec![
            SemanticContext::Predicate { rule_index: 0, pred_index: 0, is_ctx_dependent: false },
            SemanticContext::Predicate { rule_index: 0, pred_index: 1, is_ctx_dependent: false },
        ]);
        let eval = FakeEval { truths: vec![true, false], precedence: 0 };
        assert!(!ctx.evaluate(&eval));
    }

    #[test]
    fn evaluate_precedence_simplifies_without_touching_user_predicates() {
        let ctx = SemanticContext::And(Rc::new(vec![
            SemanticContext::PrecedencePredicate { precedence: 2 },
            SemanticContext::Predicate { rule_index: 0, pred_index: 0, is_ctx_dependent: false },
        ]));
        let eval = FakeEval { truths: vec![true], precedence: 5 };
        let simplified = ctx.evaluate_precedence(&eval).unwrap();
        assert_eq!(
            simplified,
            SemanticContext::Predicate { rule_index: 0, pred_index: 0, is_ctx_dependent: false }
        );
    }

    #[test]
    fn evaluate_precedence_returns_none_when_definitely_false() {
        let ctx = SemanticContext::PrecedencePredicate { precedence: 10 };
        let eval = FakeEval { truths: vec![], precedence: 2 };
        assert!(ctx.evaluate_precedence(&eval).is_none());
    }
}
