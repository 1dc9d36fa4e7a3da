//! Difficulty score rule applied after each quiz answer

/// Lowest reachable score.
pub const SCORE_FLOOR: i32 = -20;
/// Scores at or above this count as mastered.
pub const MASTERY_THRESHOLD: i32 = 50;
/// Where a mastered word lands after a wrong answer.
pub const DEMOTED_SCORE: i32 = 25;

/// Quiz outcome for one word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Correct,
    Wrong,
}

impl Answer {
    /// Score change for this outcome: correct answers raise the score.
    pub const fn delta(self) -> i32 {
        match self {
            Self::Correct => 5,
            Self::Wrong => -5,
        }
    }
}

/// Apply `delta` to `current`.
///
/// A mastered word that loses points drops straight to [`DEMOTED_SCORE`];
/// otherwise the sum is clamped at [`SCORE_FLOOR`].
pub const fn update_score(current: i32, delta: i32) -> i32 {
    if current >= MASTERY_THRESHOLD && delta < 0 {
        return DEMOTED_SCORE;
    }
    let next = current.saturating_add(delta);
    if next < SCORE_FLOOR {
        SCORE_FLOOR
    } else {
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mastered_word_is_demoted_on_loss() {
        assert_eq!(update_score(55, -5), 25);
        assert_eq!(update_score(50, -1), 25);
    }

    #[test]
    fn score_is_floored() {
        assert_eq!(update_score(-18, -5), -20);
        assert_eq!(update_score(-20, -5), -20);
    }

    #[test]
    fn ordinary_updates_add_delta() {
        assert_eq!(update_score(10, 5), 15);
        assert_eq!(update_score(55, 5), 60);
        assert_eq!(update_score(49, -5), 44);
    }

    #[test]
    fn answers_map_to_deltas() {
        assert!(Answer::Correct.delta() > 0);
        assert!(Answer::Wrong.delta() < 0);
        assert_eq!(update_score(0, Answer::Correct.delta()), 5);
        assert_eq!(update_score(0, Answer::Wrong.delta()), -5);
    }

    #[test]
    fn wrong_answer_demotes_mastered_word() {
        assert_eq!(update_score(55, Answer::Wrong.delta()), DEMOTED_SCORE);
        assert_eq!(update_score(55, Answer::Correct.delta()), 60);
    }
}
