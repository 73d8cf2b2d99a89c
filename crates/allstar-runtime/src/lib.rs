//! Adaptive LL(*) prediction and recognition on top of a deserialized ATN:
//! lexer and parser simulators, the DFA cache they memoize into, graph
//! structured prediction contexts, the default error-recovery strategy, and
//! the driver primitives a generated recognizer's rule methods call.
//!
//! This crate has no knowledge of grammar compilation or code generation —
//! it only runs the prediction/recognition machinery a generated recognizer
//! would drive.

pub mod closure;
pub mod config;
pub mod context;
pub mod dfa;
pub mod error_strategy;
pub mod errors;
pub mod lexer;
pub mod lexer_action_executor;
pub mod lexer_sim;
pub mod listener;
pub mod parser;
pub mod parser_sim;
pub mod semantic;
pub mod trace;
pub mod tree;

pub use config::{AtnConfig, AtnConfigSet};
pub use context::{merge, ContextId, PredictionContextCache, EMPTY_RETURN_STATE};
pub use dfa::{Dfa, DfaState, DfaStateId, ERROR_STATE};
pub use error_strategy::{DefaultErrorStrategy, RecoveryContext};
pub use errors::{IntervalSetDisplay, RecognitionError, RuntimeFault};
pub use lexer::Lexer;
pub use lexer_sim::LexerAtnSimulator;
pub use listener::{ErrorListener, SilentErrorListener};
pub use parser::{AlwaysTrueSempred, Parser, SempredHook};
pub use parser_sim::ParserAtnSimulator;
pub use semantic::{and_all, or_all, PredicateEvaluator, SemanticContext};
pub use trace::{NoopTracer, PrintTracer, Tracer, Verbosity};
pub use tree::{NodeId, ParseTree, ParseTreeNode};
