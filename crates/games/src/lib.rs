//! Pure game rules: dice and rock-paper-scissors.
//!
//! Both games are stateless functions over an injected RNG, so handlers
//! stay thin and tests can drive outcomes with a seeded generator.

pub mod dice;
pub mod rps;

pub use rps::Choice;

/// Result of a single game round, from the player's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Lose,
    Draw,
}

impl Outcome {
    /// Stable identifier used in localization keys ("win", "lose", "draw").
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Win => "win",
            Self::Lose => "lose",
            Self::Draw => "draw",
        }
    }
}
