//! ATN state types.

use super::transition::Transition;

/// Index into [`Atn::states`](super::model::Atn::states). `u32::MAX` is never
/// a valid index — the deserializer rejects graphs that large.
pub type StateIndex = u32;

pub const INVALID_STATE: StateIndex = u32::MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateType {
    Basic,
    RuleStart,
    RuleStop,
    BlockStart,
    BlockEnd,
    PlusBlockStart,
    PlusLoopBack,
    StarBlockStart,
    StarLoopEntry,
    StarLoopBack,
    TokenStart,
    DecisionBasic,
}

impl StateType {
    pub fn is_decision(self) -> bool {
        matches!(
            self,
            StateType::BlockStart
                | StateType::PlusBlockStart
                | StateType::StarBlockStart
                | StateType::StarLoopEntry
                | StateType::DecisionBasic
        )
    }
}

/// A single ATN state. Loop-related states carry a companion state number
/// (the matching `loopBackState` / `endState`) resolved by the deserializer's
/// back-patch pass.
#[derive(Clone, Debug)]
pub struct AtnState {
    pub index: StateIndex,
    pub state_type: StateType,
    pub rule_index: u32,
    /// For block/loop starts: the matching end state. For loop-back states:
    /// the loop entry they close. `INVALID_STATE` when not applicable.
    pub companion_state: StateIndex,
    pub non_greedy: bool,
    /// Set for star-loop-entry states belonging to a left-recursive rule's
    /// primary decision.
    pub is_precedence_decision: bool,
    /// Populated for decision states once the ATN's `decisionToState` table
    /// is built; index into that table, or `None` for non-decision states.
    pub decision: Option<u32>,
    pub transitions: Vec<Transition>,
    /// Lazily computed "what tokens can follow immediately inside this rule"
    /// set, used by the default error strategy's single-token insertion.
    pub next_token_within_rule: Option<crate::interval::IntervalSet>,
}

impl AtnState {
    pub fn new(index: StateIndex, state_type: StateType, rule_index: u32) -> Self {
        Self {
            index,
            state_type,
            rule_index,
            companion_state: INVALID_STATE,
            non_greedy: false,
            is_precedence_decision: false,
            decision: None,
            transitions: Vec::new(),
            next_token_within_rule: None,
        }
    }

    pub fn is_decision(&self) -> bool {
        self.state_type.is_decision()
    }
}
