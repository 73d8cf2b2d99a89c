pub mod model;
pub mod state;
pub mod transition;

pub use model::{Atn, GrammarType};
pub use state::{AtnState, StateIndex, StateType, INVALID_STATE};
pub use transition::Transition;
