//! Dice duel: one d6 each for the player and the house, higher roll wins.

use rand::Rng;

use crate::Outcome;

/// Roll a single six-sided die.
pub fn roll(rng: &mut impl Rng) -> u8 {
    rng.random_range(1..=6)
}

/// Compare two rolls. Strictly greater wins, equal is a draw.
pub fn outcome(player: u8, house: u8) -> Outcome {
    if player > house {
        Outcome::Win
    } else if player < house {
        Outcome::Lose
    } else {
        Outcome::Draw
    }
}

/// Play a full round: both sides roll, the comparison decides.
pub fn play(rng: &mut impl Rng) -> (u8, u8, Outcome) {
    let player = roll(rng);
    let house = roll(rng);
    (player, house, outcome(player, house))
}

/// XP granted for a round. The same table applies in private and group
/// chats.
pub fn reward(outcome: Outcome) -> i64 {
    match outcome {
        Outcome::Win => 10,
        Outcome::Draw => 3,
        Outcome::Lose => 1,
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};
    use rstest::rstest;

    use super::*;

    #[test]
    fn roll_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let v = roll(&mut rng);
            assert!((1..=6).contains(&v), "rolled {v}");
        }
    }

    #[test]
    fn full_outcome_table() {
        for p in 1..=6u8 {
            for h in 1..=6u8 {
                let expected = match p.cmp(&h) {
                    std::cmp::Ordering::Greater => Outcome::Win,
                    std::cmp::Ordering::Less => Outcome::Lose,
                    std::cmp::Ordering::Equal => Outcome::Draw,
                };
                assert_eq!(outcome(p, h), expected, "p={p} h={h}");
            }
        }
    }

    #[test]
    fn four_beats_two() {
        assert_eq!(outcome(4, 2), Outcome::Win);
        assert_eq!(reward(outcome(4, 2)), 10);
    }

    #[rstest]
    #[case(Outcome::Win, 10)]
    #[case(Outcome::Draw, 3)]
    #[case(Outcome::Lose, 1)]
    fn reward_table(#[case] outcome: Outcome, #[case] xp: i64) {
        assert_eq!(reward(outcome), xp);
    }

    #[test]
    fn play_is_consistent_with_outcome() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let (p, h, o) = play(&mut rng);
            assert_eq!(o, outcome(p, h));
        }
    }
}
