//! Rock-paper-scissors against the house.

use rand::{Rng, seq::IndexedRandom};

use crate::Outcome;

/// A player or house choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Choice {
    Rock,
    Paper,
    Scissors,
}

impl Choice {
    pub const ALL: [Choice; 3] = [Choice::Rock, Choice::Paper, Choice::Scissors];

    /// Parse a choice, case-insensitively. Returns `None` for anything
    /// that is not one of the three names.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "rock" => Some(Self::Rock),
            "paper" => Some(Self::Paper),
            "scissors" => Some(Self::Scissors),
            _ => None,
        }
    }

    /// Stable identifier used in callback data and localization keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rock => "rock",
            Self::Paper => "paper",
            Self::Scissors => "scissors",
        }
    }

    /// Uniformly random valid choice.
    pub fn random(rng: &mut impl Rng) -> Self {
        // ALL is non-empty, so choose cannot fail.
        *Choice::ALL.choose(rng).unwrap_or(&Choice::Rock)
    }

    /// Standard beats relation: rock > scissors > paper > rock.
    pub fn beats(self, other: Choice) -> bool {
        matches!(
            (self, other),
            (Choice::Rock, Choice::Scissors)
                | (Choice::Scissors, Choice::Paper)
                | (Choice::Paper, Choice::Rock)
        )
    }
}

/// Compare two choices from the player's perspective.
pub fn outcome(player: Choice, house: Choice) -> Outcome {
    if player == house {
        Outcome::Draw
    } else if player.beats(house) {
        Outcome::Win
    } else {
        Outcome::Lose
    }
}

/// Play a full round against a random house choice.
///
/// An unrecognized player input is silently replaced by a random valid
/// choice rather than rejected. That permissiveness is a policy, and the
/// returned player value always reflects the substitution.
pub fn play(rng: &mut impl Rng, raw_choice: &str) -> (Choice, Choice, Outcome) {
    let player = Choice::parse(raw_choice).unwrap_or_else(|| Choice::random(rng));
    let house = Choice::random(rng);
    (player, house, outcome(player, house))
}

/// XP granted for a round.
pub fn reward(outcome: Outcome) -> i64 {
    match outcome {
        Outcome::Win => 15,
        Outcome::Draw => 5,
        Outcome::Lose => 2,
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Choice::Rock, Choice::Scissors, Outcome::Win)]
    #[case(Choice::Rock, Choice::Paper, Outcome::Lose)]
    #[case(Choice::Rock, Choice::Rock, Outcome::Draw)]
    #[case(Choice::Paper, Choice::Rock, Outcome::Win)]
    #[case(Choice::Paper, Choice::Scissors, Outcome::Lose)]
    #[case(Choice::Paper, Choice::Paper, Outcome::Draw)]
    #[case(Choice::Scissors, Choice::Paper, Outcome::Win)]
    #[case(Choice::Scissors, Choice::Rock, Outcome::Lose)]
    #[case(Choice::Scissors, Choice::Scissors, Outcome::Draw)]
    fn beats_relation(#[case] player: Choice, #[case] house: Choice, #[case] expected: Outcome) {
        assert_eq!(outcome(player, house), expected);
    }

    #[rstest]
    #[case(Outcome::Win, 15)]
    #[case(Outcome::Draw, 5)]
    #[case(Outcome::Lose, 2)]
    fn reward_table(#[case] outcome: Outcome, #[case] xp: i64) {
        assert_eq!(reward(outcome), xp);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Choice::parse("Rock"), Some(Choice::Rock));
        assert_eq!(Choice::parse("PAPER"), Some(Choice::Paper));
        assert_eq!(Choice::parse("scissors"), Some(Choice::Scissors));
        assert_eq!(Choice::parse("lizard"), None);
    }

    #[test]
    fn rock_vs_scissors_concrete() {
        assert_eq!(outcome(Choice::Rock, Choice::Scissors), Outcome::Win);
        assert_eq!(reward(Outcome::Win), 15);
        assert_eq!(outcome(Choice::Rock, Choice::Rock), Outcome::Draw);
        assert_eq!(reward(Outcome::Draw), 5);
    }

    #[test]
    fn invalid_input_substitutes_a_valid_choice() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..50 {
            let (player, house, o) = play(&mut rng, "not-a-choice");
            assert!(Choice::ALL.contains(&player));
            assert!(Choice::ALL.contains(&house));
            assert_eq!(o, outcome(player, house));
        }
    }

    #[test]
    fn valid_input_is_kept() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let (player, _, _) = play(&mut rng, "rock");
            assert_eq!(player, Choice::Rock);
        }
    }
}
