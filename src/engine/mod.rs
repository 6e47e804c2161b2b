pub mod invariants;
pub mod roster;
pub mod turn;

pub use turn::TurnEngine;
