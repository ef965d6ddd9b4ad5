//! Configuration-driven quiz games.
//!
//! Every educational game shares one state machine ([`QuizSession`]); games
//! differ only in their [`GameConfig`]: level content, point values, score
//! label and theme.

pub mod catalog;
pub mod error;
pub mod game;
pub mod session;

pub use catalog::Catalog;
pub use error::QuizError;
pub use game::{GameConfig, GameSummary, Level};
pub use session::{AnswerOutcome, QuizSession, SessionSummary};
