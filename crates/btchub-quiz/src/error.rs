use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuizError {
    #[error("game {0} has no levels")]
    NoLevels(String),

    #[error("level {level} of {game}: correct answer {correct} is outside {options} options")]
    BadAnswerKey {
        game: String,
        level: usize,
        correct: usize,
        options: usize,
    },

    #[error("option {option} out of range ({available} available)")]
    InvalidOption { option: usize, available: usize },

    #[error("answer already submitted for this level")]
    AlreadySubmitted,

    #[error("no answer selected")]
    NothingSelected,

    #[error("game already completed")]
    Completed,

    #[error("failed to parse game data: {0}")]
    Parse(String),
}
