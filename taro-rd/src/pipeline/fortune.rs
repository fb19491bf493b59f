//! Fortune score derivation from the summary text
//!
//! Keyword scan over the summary, case-insensitive. Within each polarity
//! the strongest matching tier wins and the rest of that polarity is
//! skipped; change-related wording adds a small independent bump.

const BASELINE: i32 = 80;
const MIN_SCORE: i32 = 60;
const MAX_SCORE: i32 = 99;

const STRONG_POSITIVE: &[&str] = &["great fortune", "excellent", "wonderful", "triumph"];
const POSITIVE: &[&str] = &["success", "abundance", "lucky", "good fortune", "prosperity"];
const MILD_POSITIVE: &[&str] = &["hope", "growth", "positive", "opportunity", "harmony"];

const STRONG_NEGATIVE: &[&str] = &["misfortune", "disaster", "grave danger", "ruin"];
const NEGATIVE: &[&str] = &["caution", "warning", "difficult", "loss", "conflict"];
const MILD_NEGATIVE: &[&str] = &["worry", "uncertain", "obstacle", "doubt"];

const CHANGE: &[&str] = &["change", "transition", "turning point", "transformation"];

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// Score a summary, clamped to [60, 99]
pub fn fortune_score(summary: &str) -> u8 {
    let text = summary.to_lowercase();

    let positive = if contains_any(&text, STRONG_POSITIVE) {
        15
    } else if contains_any(&text, POSITIVE) {
        10
    } else if contains_any(&text, MILD_POSITIVE) {
        5
    } else {
        0
    };

    let negative = if contains_any(&text, STRONG_NEGATIVE) {
        -5
    } else if contains_any(&text, NEGATIVE) {
        -3
    } else if contains_any(&text, MILD_NEGATIVE) {
        -2
    } else {
        0
    };

    let change = if contains_any(&text, CHANGE) { 3 } else { 0 };

    (BASELINE + positive + negative + change).clamp(MIN_SCORE, MAX_SCORE) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_summary_scores_baseline() {
        assert_eq!(fortune_score("The cards were drawn."), 80);
        assert_eq!(fortune_score(""), 80);
    }

    #[test]
    fn strongest_positive_tier_wins() {
        // "wonderful" (+15) shadows "success" (+10)
        assert_eq!(fortune_score("A wonderful path to success."), 95);
    }

    #[test]
    fn polarities_combine() {
        // +10 success, -3 caution
        assert_eq!(fortune_score("Success, but proceed with caution."), 87);
    }

    #[test]
    fn change_adds_independently() {
        assert_eq!(fortune_score("A turning point brings growth."), 88);
    }

    #[test]
    fn score_is_clamped_to_ceiling() {
        assert_eq!(
            fortune_score("Wonderful! A turning point, full of success and triumph."),
            98
        );
    }

    #[test]
    fn score_never_exceeds_ninety_nine() {
        let text = "wonderful turning point";
        assert!(fortune_score(text) <= 99);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(fortune_score("WONDERFUL news"), 95);
    }
}
