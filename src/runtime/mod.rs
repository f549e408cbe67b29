pub mod turn;

pub use turn::{run_turn, TurnOutcome};
