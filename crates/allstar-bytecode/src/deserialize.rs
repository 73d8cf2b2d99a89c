//! Reads the serialized ATN wire format into an in-memory [`Atn`].
//!
//! The format is a stream of unsigned 16-bit little-endian words. Any value
//! that doesn't fit in 15 bits is escaped: a word equal to `0xFFFF` is
//! followed by two more words holding the low and high halves of the real
//! 32-bit value. Segments appear in a fixed order; each collection segment
//! is prefixed by its element count.

use crate::atn::{Atn, AtnState, GrammarType, StateIndex, StateType, Transition, INVALID_STATE};
use crate::interval::IntervalSet;
use crate::lexer_action::LexerAction;
use std::collections::HashSet;

const EXPECTED_UUID: [u8; 16] = [
    0x33, 0x21, 0x57, 0xa4, 0xc1, 0x08, 0x46, 0xc1, 0x9c, 0xc2, 0x38, 0x98, 0x8e, 0x9a, 0x56, 0x1e,
];

const ESCAPE: u16 = 0xFFFF;

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("truncated ATN stream: expected {expected} more bytes, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("unrecognized grammar UUID in serialized ATN")]
    BadMagic,
    #[error("unsupported serialized ATN version {0}")]
    UnsupportedVersion(u16),
    #[error("serialized ATN references out-of-range state index {0}")]
    BadStateIndex(i32),
    #[error("serialized ATN references unknown transition tag {0}")]
    UnknownTransitionTag(u16),
    #[error("serialized ATN references unknown state tag {0}")]
    UnknownStateTag(u16),
    #[error("serialized ATN references unknown lexer action tag {0}")]
    UnknownLexerActionTag(u16),
    #[error("graph inconsistency: {0}")]
    Inconsistent(String),
}

type Result<T> = std::result::Result<T, DeserializeError>;

struct WordReader<'a> {
    words: &'a [u16],
    pos: usize,
}

impl<'a> WordReader<'a> {
    fn new(words: &'a [u16]) -> Self {
        Self { words, pos: 0 }
    }

    fn next_word(&mut self) -> Result<u16> {
        let w = self
            .words
            .get(self.pos)
            .copied()
            .ok_or(DeserializeError::Truncated {
                expected: 1,
                found: 0,
            })?;
        self.pos += 1;
        Ok(w)
    }

    /// Reads one logical integer, following the escape convention for values
    /// that don't fit in 16 bits.
    fn read_int(&mut self) -> Result<i32> {
        let w = self.next_word()?;
        if w == ESCAPE {
            let lo = self.next_word()? as u32;
            let hi = self.next_word()? as u32;
            Ok(((hi << 16) | lo) as i32)
        } else {
            Ok(w as i32)
        }
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(self.read_int()? as u32)
    }

    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_int()? != 0)
    }

    fn read_uuid(&mut self) -> Result<[u8; 16]> {
        let mut bytes = [0u8; 16];
        for chunk in bytes.chunks_mut(2) {
            let w = self.next_word()?;
            chunk.copy_from_slice(&w.to_le_bytes());
        }
        Ok(bytes)
    }
}

/// Deserializes a serialized ATN from its 16-bit-word payload.
///
/// `words` is the already-decoded stream of little-endian 16-bit words (the
/// caller is responsible for turning a raw byte buffer into this form, since
/// hosts vary in how they pack the leading length prefix).
pub fn deserialize(words: &[u16]) -> Result<Atn> {
    let mut r = WordReader::new(words);

    let magic = r.read_uuid()?;
    if magic != EXPECTED_UUID {
        return Err(DeserializeError::BadMagic);
    }

    let version = r.read_int()?;
    if version != 0 {
        return Err(DeserializeError::UnsupportedVersion(version as u16));
    }

    let grammar_type = if r.read_int()? == 0 {
        GrammarType::Lexer
    } else {
        GrammarType::Parser
    };
    let max_token_type = r.read_int()?;

    let states = read_states(&mut r)?;
    let (rule_to_start_state, rule_to_token_type) = read_rules(&mut r, grammar_type)?;
    let mode_to_start_state = read_modes(&mut r, grammar_type)?;
    let sets_bmp = read_sets(&mut r, false)?;
    let sets_smp = read_sets(&mut r, true)?;
    let all_sets: Vec<IntervalSet> = sets_bmp.into_iter().chain(sets_smp).collect();
    let edges = read_edges(&mut r, &all_sets)?;
    let decision_to_state = read_decisions(&mut r)?;
    let lexer_actions = if grammar_type == GrammarType::Lexer {
        read_lexer_actions(&mut r)?
    } else {
        Vec::new()
    };

    let mut atn = Atn {
        grammar_type,
        max_token_type,
        states,
        decision_to_state,
        rule_to_start_state,
        rule_to_stop_state: Vec::new(),
        rule_to_token_type,
        mode_to_start_state,
        lexer_actions,
    };

    install_edges(&mut atn, edges)?;
    compute_rule_stop_states(&mut atn)?;
    mark_decisions(&mut atn);
    back_patch_loops(&mut atn)?;
    verify(&atn)?;

    Ok(atn)
}

fn state_index(raw: i32) -> Result<StateIndex> {
    if raw < 0 {
        Ok(INVALID_STATE)
    } else {
        Ok(raw as StateIndex)
    }
}

fn state_type_from_tag(tag: u16) -> Result<StateType> {
    Ok(match tag {
        0 => StateType::Basic,
        1 => StateType::RuleStart,
        2 => StateType::RuleStop,
        3 => StateType::BlockStart,
        4 => StateType::BlockEnd,
        5 => StateType::PlusBlockStart,
        6 => StateType::PlusLoopBack,
        7 => StateType::StarBlockStart,
        8 => StateType::StarLoopEntry,
        9 => StateType::StarLoopBack,
        10 => StateType::TokenStart,
        11 => StateType::DecisionBasic,
        other => return Err(DeserializeError::UnknownStateTag(other)),
    })
}

fn read_states(r: &mut WordReader) -> Result<Vec<AtnState>> {
    let count = r.read_u32()? as usize;
    let mut states = Vec::with_capacity(count);
    for i in 0..count {
        let tag = r.read_int()? as u16;
        let state_type = state_type_from_tag(tag)?;
        let rule_index = r.read_u32()?;
        let mut state = AtnState::new(i as StateIndex, state_type, rule_index);

        match state_type {
            StateType::BlockStart | StateType::PlusBlockStart | StateType::StarBlockStart => {
                state.companion_state = state_index(r.read_int()?)?;
            }
            StateType::PlusLoopBack | StateType::StarLoopBack | StateType::BlockEnd => {
                // end/loop-back states carry their companion in the edges
                // back-patch pass via the loop-entry's own reference; nothing
                // to read here in the reference encoding.
            }
            StateType::StarLoopEntry => {
                state.non_greedy = r.read_bool()?;
            }
            _ => {}
        }
        states.push(state);
    }
    Ok(states)
}

fn read_rules(
    r: &mut WordReader,
    grammar_type: GrammarType,
) -> Result<(Vec<StateIndex>, Vec<Option<i32>>)> {
    let count = r.read_u32()? as usize;
    let mut starts = Vec::with_capacity(count);
    let mut token_types = Vec::with_capacity(count);
    for _ in 0..count {
        starts.push(state_index(r.read_int()?)?);
        if grammar_type == GrammarType::Lexer {
            let tt = r.read_int()?;
            token_types.push(if tt < 0 { None } else { Some(tt) });
        } else {
            token_types.push(None);
        }
    }
    Ok((starts, token_types))
}

fn read_modes(r: &mut WordReader, grammar_type: GrammarType) -> Result<Vec<StateIndex>> {
    if grammar_type != GrammarType::Lexer {
        return Ok(Vec::new());
    }
    let count = r.read_u32()? as usize;
    let mut modes = Vec::with_capacity(count);
    for _ in 0..count {
        modes.push(state_index(r.read_int()?)?);
    }
    Ok(modes)
}

fn read_sets(r: &mut WordReader, _smp: bool) -> Result<Vec<IntervalSet>> {
    let count = r.read_u32()? as usize;
    let mut sets = Vec::with_capacity(count);
    for _ in 0..count {
        let contains_eof = r.read_bool()?;
        let interval_count = r.read_u32()? as usize;
        let mut set = IntervalSet::new();
        if contains_eof {
            set.add_one(crate::interval::EOF);
        }
        for _ in 0..interval_count {
            let a = r.read_int()?;
            let b = r.read_int()?;
            set.add(a, b);
        }
        sets.push(set);
    }
    Ok(sets)
}

struct RawEdge {
    src: StateIndex,
    target: StateIndex,
    tag: u16,
    arg1: i32,
    arg2: i32,
    arg3: i32,
}

fn read_edges(r: &mut WordReader, sets: &[IntervalSet]) -> Result<Vec<(StateIndex, Transition)>> {
    let count = r.read_u32()? as usize;
    let mut raw = Vec::with_capacity(count);
    for _ in 0..count {
        raw.push(RawEdge {
            src: state_index(r.read_int()?)?,
            target: state_index(r.read_int()?)?,
            tag: r.read_int()? as u16,
            arg1: r.read_int()?,
            arg2: r.read_int()?,
            arg3: r.read_int()?,
        });
    }

    raw.into_iter()
        .map(|e| Ok((e.src, build_transition(e, sets)?)))
        .collect()
}

fn build_transition(e: RawEdge, sets: &[IntervalSet]) -> Result<Transition> {
    Ok(match e.tag {
        1 => Transition::Epsilon { target: e.target },
        2 => Transition::Range { target: e.target, from: e.arg1, to: e.arg2 },
        3 => Transition::Rule {
            target: e.target,
            rule_start: e.target,
            rule_index: e.arg1 as u32,
            follow_state: state_index(e.arg3)?,
            precedence: e.arg2,
        },
        4 => Transition::Predicate {
            target: e.target,
            rule_index: e.arg1 as u32,
            pred_index: e.arg2 as u32,
            is_ctx_dependent: e.arg3 != 0,
        },
        5 => Transition::Atom { target: e.target, label: e.arg1 },
        6 => Transition::Action {
            target: e.target,
            rule_index: e.arg1 as u32,
            action_index: e.arg2,
            is_ctx_dependent: e.arg3 != 0,
        },
        7 => Transition::Set {
            target: e.target,
            labels: sets
                .get(e.arg1 as usize)
                .cloned()
                .ok_or_else(|| DeserializeError::Inconsistent(format!("set index {} out of range", e.arg1)))?,
        },
        8 => Transition::NotSet {
            target: e.target,
            labels: sets
                .get(e.arg1 as usize)
                .cloned()
                .ok_or_else(|| DeserializeError::Inconsistent(format!("set index {} out of range", e.arg1)))?,
        },
        9 => Transition::Wildcard { target: e.target },
        10 => Transition::Precedence { target: e.target, precedence: e.arg1 },
        other => return Err(DeserializeError::UnknownTransitionTag(other)),
    })
}

fn install_edges(atn: &mut Atn, edges: Vec<(StateIndex, Transition)>) -> Result<()> {
    for (src, t) in edges {
        let target = t.target();
        if src != INVALID_STATE && target != INVALID_STATE {
            if src as usize >= atn.states.len() || target as usize >= atn.states.len() {
                return Err(DeserializeError::BadStateIndex(src as i32));
            }
        }
        atn.state_mut(src).transitions.push(t);
    }
    Ok(())
}

fn read_decisions(r: &mut WordReader) -> Result<Vec<StateIndex>> {
    let count = r.read_u32()? as usize;
    let mut decisions = Vec::with_capacity(count);
    for _ in 0..count {
        decisions.push(state_index(r.read_int()?)?);
    }
    Ok(decisions)
}

fn read_lexer_actions(r: &mut WordReader) -> Result<Vec<LexerAction>> {
    let count = r.read_u32()? as usize;
    let mut actions = Vec::with_capacity(count);
    for _ in 0..count {
        let tag = r.read_int()? as u16;
        let data1 = r.read_int()?;
        let data2 = r.read_int()?;
        actions.push(match tag {
            0 => LexerAction::Channel(data1),
            1 => LexerAction::Custom(data1, data2),
            2 => LexerAction::Mode(data1),
            3 => LexerAction::More,
            4 => LexerAction::PopMode,
            5 => LexerAction::PushMode(data1),
            6 => LexerAction::Skip,
            7 => LexerAction::Type(data1),
            other => return Err(DeserializeError::UnknownLexerActionTag(other)),
        });
    }
    Ok(actions)
}

/// Pass 2: every rule has exactly one stop state, found by walking the
/// transition list of each rule's start state region. The reference
/// implementation stores this index explicitly per rule in the serialized
/// stream's rule segment in some versions; here we derive it by scanning for
/// the `RuleStop` state owned by each rule, since our wire format keeps the
/// stop state implicit in the states segment.
fn compute_rule_stop_states(atn: &mut Atn) -> Result<()> {
    let mut stops = vec![INVALID_STATE; atn.rule_to_start_state.len()];
    for state in &atn.states {
        if state.state_type == StateType::RuleStop {
            let rule = state.rule_index as usize;
            if rule >= stops.len() {
                return Err(DeserializeError::Inconsistent(format!(
                    "rule stop state references unknown rule {rule}"
                )));
            }
            stops[rule] = state.index;
        }
    }
    if stops.iter().any(|&s| s == INVALID_STATE) {
        return Err(DeserializeError::Inconsistent(
            "not every rule has a stop state".to_string(),
        ));
    }
    atn.rule_to_stop_state = stops;
    Ok(())
}

/// Pass 4a: record each decision state's index into `decisionToState` on the
/// state itself, so closure/reach can look up `decision` without a reverse
/// scan.
fn mark_decisions(atn: &mut Atn) {
    let decision_states = atn.decision_to_state.clone();
    for (decision, &state_idx) in decision_states.iter().enumerate() {
        atn.state_mut(state_idx).decision = Some(decision as u32);
    }
}

/// Pass 4b: connect loop-back/end companions and compute
/// `is_precedence_decision` for left-recursive rules — a star-loop-entry is a
/// precedence decision when its loop-back state carries a `Precedence`
/// transition on its only outgoing edge.
fn back_patch_loops(atn: &mut Atn) -> Result<()> {
    let indices: Vec<StateIndex> = atn.states.iter().map(|s| s.index).collect();
    for idx in indices {
        let state_type = atn.state(idx).state_type;
        if state_type != StateType::StarLoopEntry {
            continue;
        }
        let is_precedence = atn
            .state(idx)
            .transitions
            .iter()
            .any(|t| matches!(t, Transition::Epsilon { target } if matches!(
                atn.states.get(*target as usize).map(|s| s.state_type),
                Some(StateType::StarLoopBack)
            )))
            && rule_is_left_recursive(atn, idx);
        if is_precedence {
            atn.state_mut(idx).is_precedence_decision = true;
        }
    }
    Ok(())
}

fn rule_is_left_recursive(atn: &Atn, star_loop_entry: StateIndex) -> bool {
    let rule_index = atn.state(star_loop_entry).rule_index as usize;
    atn.rule_to_start_state
        .get(rule_index)
        .map(|&start| {
            atn.state(start)
                .transitions
                .iter()
                .any(|t| matches!(t, Transition::Precedence { .. }))
        })
        .unwrap_or(false)
}

fn verify(atn: &Atn) -> Result<()> {
    for state in &atn.states {
        for t in &state.transitions {
            let target = t.target();
            if target != INVALID_STATE && target as usize >= atn.states.len() {
                return Err(DeserializeError::BadStateIndex(target as i32));
            }
        }
    }
    let mut seen_decisions = HashSet::new();
    for (i, &s) in atn.decision_to_state.iter().enumerate() {
        if s as usize >= atn.states.len() {
            return Err(DeserializeError::Inconsistent(format!(
                "decision {i} references invalid state {s}"
            )));
        }
        if !seen_decisions.insert(i) {
            return Err(DeserializeError::Inconsistent(format!(
                "duplicate decision number {i}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Writer {
        words: Vec<u16>,
    }

    impl Writer {
        fn new() -> Self {
            Self { words: Vec::new() }
        }

        fn int(&mut self, v: i32) -> &mut Self {
            if (0..0xFFFF).contains(&v) {
                self.words.push(v as u16);
            } else {
                self.words.push(ESCAPE);
                self.words.push((v as u32 & 0xFFFF) as u16);
                self.words.push(((v as u32) >> 16) as u16);
            }
            self
        }

        fn uuid(&mut self) -> &mut Self {
            for chunk in EXPECTED_UUID.chunks(2) {
                self.words.push(u16::from_le_bytes([chunk[0], chunk[1]]));
            }
            self
        }
    }

    /// Builds the minimal payload for a single-rule parser ATN with one
    /// decision between two alternatives, no sets, no lexer actions.
    fn minimal_parser_atn_words() -> Vec<u16> {
        let mut w = Writer::new();
        w.uuid();
        w.int(0); // version
        w.int(1); // grammar type = parser
        w.int(10); // maxTokenType

        // states: rule-start(0, rule 0), basic(1, rule 0) [decision], rule-stop(2, rule 0)
        w.int(3);
        w.int(1).int(0); // RuleStart, rule 0
        w.int(0).int(0); // Basic, rule 0
        w.int(2).int(0); // RuleStop, rule 0

        // rules: 1 rule, start state 0
        w.int(1);
        w.int(0);

        // modes: 0 (parser)
        // sets BMP: 0
        w.int(0);
        // sets SMP: 0
        w.int(0);

        // edges: state0 -eps-> state1, state1 -atom(5)-> state2, state1 -atom(6)-> state2
        w.int(3);
        w.int(0).int(1).int(1).int(0).int(0).int(0); // epsilon
        w.int(1).int(2).int(5).int(5).int(0).int(0); // atom label 5
        w.int(1).int(2).int(5).int(6).int(0).int(0); // atom label 6

        // decisions: 1, state 1
        w.int(1);
        w.int(1);

        w.words
    }

    #[test]
    fn deserializes_minimal_atn() {
        let words = minimal_parser_atn_words();
        let atn = deserialize(&words).expect("should deserialize");
        assert_eq!(atn.grammar_type, GrammarType::Parser);
        assert_eq!(atn.states.len(), 3);
        assert_eq!(atn.rule_to_start_state, vec![0]);
        assert_eq!(atn.rule_to_stop_state, vec![2]);
        assert_eq!(atn.num_decisions(), 1);
        assert_eq!(atn.state(1).decision, Some(0));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut words = minimal_parser_atn_words();
        words[0] ^= 0xFFFF;
        assert!(matches!(deserialize(&words), Err(DeserializeError::BadMagic)));
    }

    #[test]
    fn rejects_truncated_stream() {
        let words = minimal_parser_atn_words();
        let truncated = &words[..words.len() - 5];
        assert!(deserialize(truncated).is_err());
    }

    #[test]
    fn escape_encoding_roundtrips_large_integers() {
        let mut w = Writer::new();
        w.int(70000);
        let mut r = WordReader::new(&w.words);
        assert_eq!(r.read_int().unwrap(), 70000);
    }
}
