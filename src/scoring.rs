//! Deterministic scoring: raw section scores, band conversion, word counts.
//!
//! Everything here is a pure function of its arguments. Answer comparison is
//! case- and surrounding-whitespace-insensitive, order-sensitive, with no
//! partial credit.

/// Band staircase: minimum percentage (inclusive) for each band, checked from
/// the highest threshold down. Below the last entry the floor band applies.
const BAND_STEPS: [(u32, f64); 14] = [
    (90, 9.0),
    (85, 8.5),
    (80, 8.0),
    (75, 7.5),
    (70, 7.0),
    (65, 6.5),
    (60, 6.0),
    (55, 5.5),
    (50, 5.0),
    (45, 4.5),
    (40, 4.0),
    (35, 3.5),
    (30, 3.0),
    (25, 2.5),
];

/// Minimum band for any non-zero raw score below the lowest threshold.
const FLOOR_BAND: f64 = 2.0;

fn normalize(answer: &str) -> String {
    answer.trim().to_lowercase()
}

/// Count positions where the submitted answer matches the key.
///
/// Answer sheets are sized from the key at session creation, so a length
/// mismatch is a programming defect, not an input condition.
pub fn score_section(answers: &[String], key: &[String]) -> usize {
    assert_eq!(
        answers.len(),
        key.len(),
        "answer sheet length must match the answer key"
    );

    answers
        .iter()
        .zip(key.iter())
        .filter(|(answer, expected)| normalize(answer) == normalize(expected))
        .count()
}

/// Convert a raw correct-answer count to a band score.
///
/// A raw score of zero always maps to band 0; otherwise the percentage is
/// mapped to the nearest lower step on the band staircase.
pub fn band_from_raw(raw: usize, total: usize) -> f64 {
    assert!(total > 0, "answer key must not be empty");

    if raw == 0 {
        return 0.0;
    }

    let percentage = (raw as f64 / total as f64) * 100.0;

    for (threshold, band) in BAND_STEPS {
        if percentage >= threshold as f64 {
            return band;
        }
    }

    FLOOR_BAND
}

/// Overall band: mean of the reading and listening bands, rounded half-up to
/// one decimal. Writing is deliberately excluded (it is never auto-graded).
pub fn overall_band(reading_band: f64, listening_band: f64) -> f64 {
    ((reading_band + listening_band) / 2.0 * 10.0).round() / 10.0
}

/// Count words by splitting on whitespace runs and dropping empty tokens.
/// Punctuation-only tokens count as words; the counts are informational.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
