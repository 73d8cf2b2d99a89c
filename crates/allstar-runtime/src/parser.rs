//! The parser driver: the primitives a generated recognizer's rule methods
//! call into — `enter_rule`/`exit_rule`, `match_token`, `adaptive_predict`,
//! and the precedence-stack support left-recursive rules need. Everything
//! above this (which alternative a rule method chooses, how it builds its
//! own result) is generated code's job; this module only supplies the
//! runtime machinery that code would call.

use allstar_bytecode::atn::{Atn, StateIndex, INVALID_STATE};
use allstar_core::token::Token;
use allstar_core::token_stream::TokenStream;

use crate::context::ContextId;
use crate::error_strategy::{DefaultErrorStrategy, RecoveryContext};
use crate::errors::RecognitionError;
use crate::listener::{ErrorListener, SilentErrorListener};
use crate::parser_sim::ParserAtnSimulator;
use crate::semantic::PredicateEvaluator;
use crate::trace::{NoopTracer, Tracer};
use crate::tree::{NodeId, ParseTree, ParseTreeNode};

/// Host hook for evaluating a grammar's embedded semantic predicates.
/// Separate from [`PredicateEvaluator`] (which also needs the live
/// precedence, already tracked by [`Parser`] itself) so generated code only
/// has to answer "is predicate N of rule R true right now".
pub trait SempredHook {
    fn sempred(&self, rule_index: u32, pred_index: u32) -> bool;
}

/// Accepts every predicate. The default until a host registers real ones.
#[derive(Default)]
pub struct AlwaysTrueSempred;

impl SempredHook for AlwaysTrueSempred {
    fn sempred(&self, _rule_index: u32, _pred_index: u32) -> bool {
        true
    }
}

struct DriverPredicateEvaluator<'p> {
    precedence: i32,
    hook: &'p dyn SempredHook,
}

impl<'p> PredicateEvaluator for DriverPredicateEvaluator<'p> {
    fn sempred(&self, rule_index: u32, pred_index: u32) -> bool {
        self.hook.sempred(rule_index, pred_index)
    }

    fn precedence(&self) -> i32 {
        self.precedence
    }
}

/// Borrows just the fields `RecoveryContext` needs, leaving `strategy`
/// untouched so the driver can hold both a `&mut DefaultErrorStrategy` and
/// this at once.
struct DriverRecoveryCtx<'p, S: TokenStream> {
    atn: &'p Atn,
    state: StateIndex,
    rule_stack: &'p [StateIndex],
    input: &'p mut S,
    listener: &'p mut dyn ErrorListener,
}

impl<'p, S: TokenStream> RecoveryContext for DriverRecoveryCtx<'p, S> {
    fn atn(&self) -> &Atn {
        self.atn
    }

    fn current_state(&self) -> StateIndex {
        self.state
    }

    fn rule_invocation_stack(&self) -> &[StateIndex] {
        self.rule_stack
    }

    fn input(&mut self) -> &mut dyn TokenStream {
        self.input
    }

    fn listener(&mut self) -> &mut dyn ErrorListener {
        self.listener
    }
}

/// Drives one parse: owns the token stream, the ATN simulator, the parse
/// tree being built, and the error-recovery state. Generated rule methods
/// are free functions (or methods on a thin wrapper) that call back into
/// this for every primitive operation — the driver never knows what rule
/// it's in beyond the index it's told.
pub struct Parser<'a, S: TokenStream> {
    atn: &'a Atn,
    simulator: ParserAtnSimulator<'a>,
    input: S,
    strategy: DefaultErrorStrategy,
    tree: ParseTree,
    tracer: Box<dyn Tracer>,
    listener: Box<dyn ErrorListener>,
    sempred_hook: Box<dyn SempredHook>,
    current_state: StateIndex,
    node_stack: Vec<NodeId>,
    invoking_state_stack: Vec<StateIndex>,
    rule_invocation_states: Vec<StateIndex>,
    context_stack: Vec<ContextId>,
    precedence_stack: Vec<i32>,
}

impl<'a, S: TokenStream> Parser<'a, S> {
    pub fn new(atn: &'a Atn, input: S) -> Self {
        let simulator = ParserAtnSimulator::new(atn);
        let empty_ctx = simulator.empty_context();
        Self {
            atn,
            simulator,
            input,
            strategy: DefaultErrorStrategy::new(),
            tree: ParseTree::new(),
            tracer: Box::new(NoopTracer),
            listener: Box::new(SilentErrorListener),
            sempred_hook: Box::new(AlwaysTrueSempred),
            current_state: 0,
            node_stack: Vec::new(),
            invoking_state_stack: Vec::new(),
            rule_invocation_states: Vec::new(),
            context_stack: vec![empty_ctx],
            precedence_stack: Vec::new(),
        }
    }

    pub fn set_tracer(&mut self, tracer: Box<dyn Tracer>) {
        self.tracer = tracer;
    }

    pub fn set_listener(&mut self, listener: Box<dyn ErrorListener>) {
        self.listener = listener;
    }

    pub fn set_sempred_hook(&mut self, hook: Box<dyn SempredHook>) {
        self.sempred_hook = hook;
    }

    pub fn tree(&self) -> &ParseTree {
        &self.tree
    }

    pub fn input(&mut self) -> &mut S {
        &mut self.input
    }

    pub fn state(&self) -> StateIndex {
        self.current_state
    }

    /// Generated code sets this before every `match_token`/`sync` call —
    /// mirrors the reference recognizer's `setState`.
    pub fn set_state(&mut self, state: StateIndex) {
        self.current_state = state;
    }

    pub fn current_node(&self) -> Option<NodeId> {
        self.node_stack.last().copied()
    }

    pub fn in_error_recovery_mode(&self) -> bool {
        self.strategy.in_error_recovery_mode()
    }

    pub fn error_count(&self) -> u32 {
        self.strategy.error_count()
    }

    pub fn push_precedence(&mut self, precedence: i32) {
        self.precedence_stack.push(precedence);
    }

    pub fn pop_precedence(&mut self) {
        self.precedence_stack.pop();
    }

    pub fn precedence(&self) -> i32 {
        self.precedence_stack.last().copied().unwrap_or(0)
    }

    /// Whether the enclosing left-recursive rule's current precedence
    /// permits recursing into an operator binding at `min_precedence`.
    pub fn precpred(&self, min_precedence: i32) -> bool {
        self.precedence() >= min_precedence
    }

    /// Opens a rule context as a child of whatever rule is currently open
    /// (or as a fresh root if none is), pushing a real call-stack frame onto
    /// the prediction context so a later SLL-to-LL retry sees the actual
    /// invocation chain. `invoking_state` is the caller's `Rule`-transition
    /// state, or [`INVALID_STATE`] for the start rule of a parse.
    pub fn enter_rule(&mut self, rule_index: u32, invoking_state: StateIndex) -> NodeId {
        let parent = self.node_stack.last().copied();
        let node = self.tree.enter_rule(parent, rule_index);
        self.node_stack.push(node);
        self.invoking_state_stack.push(invoking_state);

        if invoking_state != INVALID_STATE {
            self.rule_invocation_states.insert(0, invoking_state);
        }

        let top_ctx = *self.context_stack.last().expect("context stack is never empty");
        let new_ctx = if invoking_state == INVALID_STATE {
            top_ctx
        } else {
            let follow = self.atn.rule_transition_follow_state(invoking_state);
            self.simulator.push_context(top_ctx, follow as i32)
        };
        self.context_stack.push(new_ctx);

        self.tracer.trace_enter_rule(rule_index, self.input.index());
        node
    }

    /// Closes the innermost open rule context, sealing its children.
    pub fn exit_rule(&mut self, stop: Option<Token>) {
        let node = self.node_stack.pop().expect("exit_rule without matching enter_rule");
        let invoking_state = self.invoking_state_stack.pop().expect("exit_rule without matching enter_rule");
        if invoking_state != INVALID_STATE {
            self.rule_invocation_states.remove(0);
        }
        self.context_stack.pop();

        let rule_index = match self.tree.node(node) {
            ParseTreeNode::Rule(r) => r.rule_index,
            _ => unreachable!("node_stack only ever holds rule nodes"),
        };
        self.tree.exit_rule(node, stop);
        self.tracer.trace_exit_rule(rule_index);
    }

    /// Consumes the current token unconditionally, attaching it as a
    /// terminal child of the open rule.
    pub fn consume(&mut self) -> NodeId {
        let tok = self.input.lt(1);
        self.tracer.trace_consume(tok.token_type, tok.token_index);
        self.input.consume();
        let parent = *self.node_stack.last().expect("consume called outside a rule");
        self.tree.add_terminal(parent, tok)
    }

    fn split_recovery(&mut self) -> (&mut DefaultErrorStrategy, DriverRecoveryCtx<'_, S>) {
        (
            &mut self.strategy,
            DriverRecoveryCtx {
                atn: self.atn,
                state: self.current_state,
                rule_stack: &self.rule_invocation_states,
                input: &mut self.input,
                listener: self.listener.as_mut(),
            },
        )
    }

    /// Matches the current token against `expected_type`, recovering via
    /// single-token deletion/insertion on mismatch. A deleted or synthesized
    /// token is attached as an error node rather than a plain terminal.
    pub fn match_token(&mut self, expected_type: i32) -> Result<NodeId, RecognitionError> {
        if self.input.la(1) == expected_type {
            self.strategy.report_match();
            return Ok(self.consume());
        }

        let expected = self.atn.expected_tokens(self.current_state, &self.rule_invocation_states);
        let (strategy, mut ctx) = self.split_recovery();
        let recovered = strategy.recover_inline(&mut ctx, &expected)?;
        let parent = *self.node_stack.last().expect("match_token called outside a rule");
        Ok(self.tree.add_error(parent, recovered))
    }

    /// Resynchronizes at a loop/subrule decision point, consuming input up
    /// to the expected set if mid-recovery. A no-op otherwise.
    pub fn sync(&mut self) {
        let (strategy, mut ctx) = self.split_recovery();
        strategy.sync(&mut ctx);
    }

    /// Reports and recovers from a prediction failure (`NoViableAlt`),
    /// consuming up to the expected/FOLLOW set so the enclosing rule can
    /// keep going.
    pub fn recover(&mut self, err: RecognitionError) {
        let (strategy, mut ctx) = self.split_recovery();
        strategy.recover(&mut ctx, err);
    }

    /// Predicts the alternative of `decision`, trying SLL first and
    /// escalating to full LL context (seeded from the real call stack) only
    /// on a genuine conflict.
    pub fn adaptive_predict(&mut self, decision: usize) -> Result<u32, RecognitionError> {
        let outer_context = *self.context_stack.last().expect("context stack is never empty");
        let evaluator = DriverPredicateEvaluator { precedence: self.precedence(), hook: self.sempred_hook.as_ref() };
        self.simulator.adaptive_predict(
            decision,
            outer_context,
            &mut self.input,
            &evaluator,
            self.tracer.as_mut(),
            self.listener.as_mut(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use allstar_bytecode::atn::{AtnState, GrammarType, StateType, Transition};
    use allstar_core::token::EOF_TYPE;
    use allstar_core::token_stream::{BufferedTokenStream, TokenProducer};

    struct FixedProducer {
        tokens: std::vec::IntoIter<Token>,
    }

    fn tok(t: i32) -> Token {
        Token {
            token_type: t,
            channel: 0,
            start: 0,
            stop: 0,
            line: 1,
            column: 0,
            token_index: -1,
            text: None,
            source: None,
        }
    }

    impl FixedProducer {
        fn new(types: &[i32]) -> Self {
            let mut v: Vec<Token> = types.iter().map(|&t| tok(t)).collect();
            v.push(tok(EOF_TYPE));
            Self { tokens: v.into_iter() }
        }
    }

    impl TokenProducer for FixedProducer {
        fn next_token(&mut self) -> Token {
            self.tokens.next().unwrap_or(tok(EOF_TYPE))
        }
        fn source_name(&self) -> String {
            "<test>".into()
        }
    }

    /// `s: 'a' 'b' 'c';` as a flat five-state ATN (rule-start/stop plus the
    /// three matched states), no decisions needed.
    fn flat_abc_atn() -> Atn {
        let mut states = vec![AtnState::new(0, StateType::Basic, 0); 5];
        states[0] = AtnState::new(0, StateType::RuleStart, 0);
        states[0].transitions.push(Transition::Atom { target: 1, label: b'a' as i32 });
        states[1] = AtnState::new(1, StateType::Basic, 0);
        states[1].transitions.push(Transition::Atom { target: 2, label: b'b' as i32 });
        states[2] = AtnState::new(2, StateType::Basic, 0);
        states[2].transitions.push(Transition::Atom { target: 3, label: b'c' as i32 });
        states[3] = AtnState::new(3, StateType::Basic, 0);
        states[3].transitions.push(Transition::Epsilon { target: 4 });
        states[4] = AtnState::new(4, StateType::RuleStop, 0);

        Atn {
            grammar_type: GrammarType::Parser,
            max_token_type: 256,
            states,
            decision_to_state: Vec::new(),
            rule_to_start_state: vec![0],
            rule_to_stop_state: vec![4],
            rule_to_token_type: Vec::new(),
            mode_to_start_state: Vec::new(),
            lexer_actions: Vec::new(),
        }
    }

    #[test]
    fn single_token_deletion_recovers_mid_parse_and_records_error_node() {
        // input "abxc": matches 'a', 'b', then an extraneous 'x' before 'c'.
        let atn = flat_abc_atn();
        let stream = BufferedTokenStream::new(FixedProducer::new(&[
            b'a' as i32,
            b'b' as i32,
            b'x' as i32,
            b'c' as i32,
        ]));
        let mut parser = Parser::new(&atn, stream);

        let root = parser.enter_rule(0, INVALID_STATE);
        parser.set_state(0);
        parser.match_token(b'a' as i32).expect("a matches cleanly");
        parser.set_state(1);
        parser.match_token(b'b' as i32).expect("b matches cleanly");
        parser.set_state(2);
        let recovered = parser.match_token(b'c' as i32).expect("recovers by deleting x");
        parser.exit_rule(None);

        match parser.tree().node(recovered) {
            ParseTreeNode::Error(e) => assert_eq!(e.symbol.token_type, b'x' as i32),
            other => panic!("expected an error node, got {other:?}"),
        }
        assert_eq!(parser.tree().children(root).len(), 3);
        assert!(!parser.in_error_recovery_mode());
        assert_eq!(parser.error_count(), 1);
    }

    #[test]
    fn clean_match_consumes_and_attaches_terminal() {
        let atn = flat_abc_atn();
        let stream = BufferedTokenStream::new(FixedProducer::new(&[b'a' as i32]));
        let mut parser = Parser::new(&atn, stream);

        let root = parser.enter_rule(0, INVALID_STATE);
        parser.set_state(0);
        let node = parser.match_token(b'a' as i32).expect("matches cleanly");
        parser.exit_rule(None);

        match parser.tree().node(node) {
            ParseTreeNode::Terminal(t) => assert_eq!(t.symbol.token_type, b'a' as i32),
            other => panic!("expected a terminal node, got {other:?}"),
        }
        assert_eq!(parser.error_count(), 0);
        assert_eq!(parser.tree().children(root).len(), 1);
    }

    #[test]
    fn nested_rule_tracks_real_call_stack_context() {
        let atn = flat_abc_atn();
        let stream = BufferedTokenStream::new(FixedProducer::new(&[b'a' as i32, b'b' as i32]));
        let mut parser = Parser::new(&atn, stream);

        let outer_before = *parser.context_stack.last().unwrap();
        let outer = parser.enter_rule(0, INVALID_STATE);
        parser.set_state(0);
        parser.match_token(b'a' as i32).unwrap();

        let inner_before = *parser.context_stack.last().unwrap();
        parser.enter_rule(1, 0);
        let inner_ctx = *parser.context_stack.last().unwrap();
        assert_ne!(inner_ctx, inner_before, "entering a rule with a real invoking state pushes a new frame");
        parser.set_state(1);
        parser.match_token(b'b' as i32).unwrap();
        parser.exit_rule(None);

        assert_eq!(*parser.context_stack.last().unwrap(), inner_before, "exiting pops back to the caller's context");
        parser.exit_rule(None);
        assert_eq!(*parser.context_stack.last().unwrap(), outer_before);
        let _ = outer;
    }
}
