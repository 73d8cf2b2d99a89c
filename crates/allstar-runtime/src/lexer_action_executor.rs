//! Accumulates lexer actions encountered during closure and defers their
//! execution to accept time, so actions never fire speculatively down a
//! path the longest-match rule later discards.

use allstar_bytecode::LexerAction;

/// One accumulated action plus the input position it should run against, if
/// it's context-dependent (only `Custom` actions are, per the reference
/// semantics — see [`LexerAction::is_position_dependent`]).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct Entry {
    action: LexerAction,
    position: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct LexerActionExecutor {
    entries: Vec<Entry>,
}

impl LexerActionExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a new executor with `action` appended, position-tagged with
    /// the current input index when the action is position-dependent.
    pub fn append(&self, action: LexerAction, current_input_index: i64) -> Self {
        let position = action.is_position_dependent().then_some(current_input_index);
        let mut entries = self.entries.clone();
        entries.push(Entry { action, position });
        Self { entries }
    }

    /// Runs every accumulated action against `target` in order, using the
    /// tagged position for context-dependent actions and `token_start` for
    /// the rest.
    pub fn execute(&self, target: &mut dyn LexerActionTarget, token_start: i64) {
        for entry in &self.entries {
            let pos = entry.position.unwrap_or(token_start);
            target.execute_lexer_action(&entry.action, pos);
        }
    }
}

/// What the lexer driver exposes so accumulated actions can mutate its
/// channel/mode/type state without the executor knowing about the driver.
pub trait LexerActionTarget {
    fn execute_lexer_action(&mut self, action: &LexerAction, input_index: i64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingTarget {
        seen: Vec<(LexerAction, i64)>,
    }

    impl LexerActionTarget for RecordingTarget {
        fn execute_lexer_action(&mut self, action: &LexerAction, input_index: i64) {
            self.seen.push((action.clone(), input_index));
        }
    }

    #[test]
    fn actions_execute_in_accumulation_order() {
        let exec = LexerActionExecutor::new()
            .append(LexerAction::Skip, 0)
            .append(LexerAction::Mode(2), 0);
        let mut target = RecordingTarget::default();
        exec.execute(&mut target, 10);
        assert_eq!(target.seen, vec![(LexerAction::Skip, 10), (LexerAction::Mode(2), 10)]);
    }

    #[test]
    fn custom_actions_are_tagged_with_accumulation_time_position() {
        let exec = LexerActionExecutor::new().append(LexerAction::Custom(0, 1), 42);
        let mut target = RecordingTarget::default();
        exec.execute(&mut target, 100);
        assert_eq!(target.seen, vec![(LexerAction::Custom(0, 1), 42)]);
    }
}
