use serde::{Deserialize, Serialize};

/// Fixed answer keys for the auto-graded sections.
///
/// Key lengths determine the answer-sheet sizes at session creation; a key
/// may never be empty (scoring would divide by zero), so the constructor
/// fails fast on that programmer error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerKeys {
    pub reading: Vec<String>,
    pub listening: Vec<String>,
}

impl AnswerKeys {
    pub fn new(reading: Vec<String>, listening: Vec<String>) -> Self {
        assert!(!reading.is_empty(), "reading answer key must not be empty");
        assert!(
            !listening.is_empty(),
            "listening answer key must not be empty"
        );

        Self { reading, listening }
    }

    /// The built-in 40-question reading and listening keys.
    pub fn builtin() -> Self {
        let reading = [
            // Passage 1 (13 questions)
            "TRUE",
            "FALSE",
            "FALSE",
            "TRUE",
            "FALSE",
            "TRUE",
            "NOT GIVEN",
            "46",
            "the human eye",
            "Indo-European",
            "Richard Brocklesby",
            "Royal Institution",
            "gas lighting",
            // Passage 2 (13 questions)
            "v",
            "ii",
            "iv",
            "viii",
            "i",
            "iii",
            "vi",
            "sewing machine",
            "department stores",
            "prices",
            "Europe",
            "C",
            "D",
            // Passage 3 (14 questions)
            "D",
            "L",
            "F",
            "J",
            "I",
            "B",
            "YES",
            "NOT GIVEN",
            "YES",
            "NOT GIVEN",
            "D",
            "A",
            "B",
            "C",
        ];

        let listening = [
            // Section 1 (10 questions)
            "database",
            "rock",
            "month",
            "25",
            "500",
            "studio",
            "legal",
            "photograph",
            "King",
            "alive",
            // Section 2 (10 questions)
            "A",
            "B",
            "C",
            "C",
            "F",
            "A",
            "D",
            "H",
            "B",
            "G",
            // Section 3 (10 questions)
            "A",
            "C",
            "C",
            "A",
            "C",
            "C",
            "B",
            "C",
            "F",
            "D",
            // Section 4 (10 questions)
            "erosion",
            "fuel",
            "pesticides",
            "rubbish",
            "bamboo",
            "red",
            "nursery",
            "fresh",
            "crab",
            "storm",
        ];

        Self::new(
            reading.iter().map(|s| s.to_string()).collect(),
            listening.iter().map(|s| s.to_string()).collect(),
        )
    }
}
