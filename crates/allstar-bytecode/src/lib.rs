//! ATN data model and the deserializer that builds it from the compact
//! serialized grammar format produced by offline grammar compilation.
//!
//! This crate has no knowledge of prediction, parsing, or lexing — it only
//! owns the static graph and the primitives ([`interval::IntervalSet`],
//! [`bitset::BitSet`], [`hash`]) that the runtime builds on top of.

pub mod atn;
pub mod bitset;
pub mod deserialize;
pub mod hash;
pub mod interval;
pub mod lexer_action;

pub use atn::{Atn, AtnState, GrammarType, StateIndex, StateType, Transition};
pub use bitset::BitSet;
pub use deserialize::{deserialize, DeserializeError};
pub use interval::{Interval, IntervalSet};
pub use lexer_action::LexerAction;
