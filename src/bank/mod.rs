//! Fixed exam material: answer keys for the auto-graded sections and the
//! writing prompt bank. Both are immutable, externally-provided sequences as
//! far as the engine is concerned.

pub mod keys;
pub mod prompts;

pub use keys::AnswerKeys;
pub use prompts::{select_prompts, ChartPrompt, PromptBank};
