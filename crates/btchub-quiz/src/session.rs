use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use crate::error::QuizError;
use crate::game::{GameConfig, Level};

/// Result of submitting an answer for the current level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    pub correct: bool,
    pub correct_option: usize,
    /// Zero when wrong, or when this level already paid out.
    pub points_awarded: u32,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub game_id: String,
    pub score_label: String,
    pub score: u32,
    pub max_score: u32,
    pub correct_levels: Vec<usize>,
    pub completed: bool,
}

/// One play-through of a game.
///
/// States: current level in `[0, N)`, an optional selected option, whether
/// that selection has been submitted, and whether the game is completed.
/// Points for a level are awarded at most once per session, no matter how
/// often the player revisits and resubmits it.
#[derive(Debug, Clone)]
pub struct QuizSession {
    game: Arc<GameConfig>,
    level: usize,
    selected: Option<usize>,
    submitted: bool,
    completed: bool,
    score: u32,
    answered: BTreeSet<usize>,
}

impl QuizSession {
    pub fn new(game: Arc<GameConfig>) -> Result<Self, QuizError> {
        game.validate()?;
        Ok(Self {
            game,
            level: 0,
            selected: None,
            submitted: false,
            completed: false,
            score: 0,
            answered: BTreeSet::new(),
        })
    }

    /// Play `answers` in level order (`None` skips a level) and finish the game.
    pub fn replay(game: Arc<GameConfig>, answers: &[Option<usize>]) -> Result<SessionSummary, QuizError> {
        let mut session = Self::new(game)?;
        for answer in answers {
            if session.completed {
                break;
            }
            if let Some(option) = answer {
                session.select(*option)?;
                session.submit()?;
            }
            session.next();
        }
        Ok(session.summary())
    }

    pub fn current_level(&self) -> &Level {
        &self.game.levels[self.level]
    }

    pub fn level_index(&self) -> usize {
        self.level
    }

    pub fn level_count(&self) -> usize {
        self.game.levels.len()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn max_score(&self) -> u32 {
        self.game.max_score()
    }

    /// Percentage of levels reached, counting the current one.
    pub fn progress_percent(&self) -> f64 {
        (self.level + 1) as f64 / self.level_count() as f64 * 100.0
    }

    pub fn select(&mut self, option: usize) -> Result<(), QuizError> {
        if self.completed {
            return Err(QuizError::Completed);
        }
        if self.submitted {
            return Err(QuizError::AlreadySubmitted);
        }
        let available = self.current_level().quiz.options.len();
        if option >= available {
            return Err(QuizError::InvalidOption { option, available });
        }
        self.selected = Some(option);
        Ok(())
    }

    pub fn submit(&mut self) -> Result<AnswerOutcome, QuizError> {
        if self.completed {
            return Err(QuizError::Completed);
        }
        if self.submitted {
            return Err(QuizError::AlreadySubmitted);
        }
        let selected = self.selected.ok_or(QuizError::NothingSelected)?;

        let quiz = &self.game.levels[self.level].quiz;
        let correct = selected == quiz.correct;
        let points_awarded = if correct && self.answered.insert(self.level) {
            quiz.points
        } else {
            0
        };
        let outcome = AnswerOutcome {
            correct,
            correct_option: quiz.correct,
            points_awarded,
            explanation: quiz.explanation.clone(),
        };

        self.score += points_awarded;
        self.submitted = true;
        Ok(outcome)
    }

    /// Advance one level, or complete the game from the last level.
    pub fn next(&mut self) {
        if self.completed {
            return;
        }
        if self.level + 1 < self.level_count() {
            self.level += 1;
            self.clear_answer();
        } else {
            self.completed = true;
        }
    }

    pub fn previous(&mut self) {
        if self.completed || self.level == 0 {
            return;
        }
        self.level -= 1;
        self.clear_answer();
    }

    pub fn reset(&mut self) {
        self.level = 0;
        self.score = 0;
        self.completed = false;
        self.answered.clear();
        self.clear_answer();
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            game_id: self.game.id.clone(),
            score_label: self.game.score_label.clone(),
            score: self.score,
            max_score: self.max_score(),
            correct_levels: self.answered.iter().copied().collect(),
            completed: self.completed,
        }
    }

    fn clear_answer(&mut self) {
        self.selected = None;
        self.submitted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{LevelData, Question, Theme};

    fn level(id: u32, correct: usize, points: u32) -> Level {
        Level {
            id,
            title: format!("Level {id}"),
            story: String::new(),
            data: LevelData {
                title: String::new(),
                stats: vec![],
            },
            quiz: Question {
                question: "?".into(),
                options: vec!["a".into(), "b".into(), "c".into()],
                correct,
                explanation: "because".into(),
                points,
            },
        }
    }

    fn game() -> Arc<GameConfig> {
        Arc::new(GameConfig {
            id: "test-game".into(),
            title: "Test".into(),
            subtitle: String::new(),
            description: String::new(),
            score_label: "Sats".into(),
            theme: Theme::default(),
            estimated_time: "1 min".into(),
            levels: vec![level(1, 1, 10), level(2, 0, 20), level(3, 2, 5)],
        })
    }

    #[test]
    fn submit_locks_selection() {
        let mut s = QuizSession::new(game()).unwrap();
        s.select(1).unwrap();
        s.submit().unwrap();

        assert_eq!(s.select(0), Err(QuizError::AlreadySubmitted));
        assert_eq!(s.selected(), Some(1));
        assert_eq!(s.submit(), Err(QuizError::AlreadySubmitted));
    }

    #[test]
    fn selection_can_change_before_submit() {
        let mut s = QuizSession::new(game()).unwrap();
        s.select(0).unwrap();
        s.select(1).unwrap();
        let outcome = s.submit().unwrap();
        assert!(outcome.correct);
        assert_eq!(outcome.points_awarded, 10);
    }

    #[test]
    fn points_awarded_once_per_level() {
        let mut s = QuizSession::new(game()).unwrap();
        s.select(1).unwrap();
        assert_eq!(s.submit().unwrap().points_awarded, 10);

        // leave and come back: the level can be answered again but pays nothing
        s.next();
        s.previous();
        s.select(1).unwrap();
        let again = s.submit().unwrap();
        assert!(again.correct);
        assert_eq!(again.points_awarded, 0);
        assert_eq!(s.score(), 10);
    }

    #[test]
    fn wrong_answer_scores_nothing_but_can_retry_later() {
        let mut s = QuizSession::new(game()).unwrap();
        s.select(2).unwrap();
        let outcome = s.submit().unwrap();
        assert!(!outcome.correct);
        assert_eq!(outcome.correct_option, 1);
        assert_eq!(s.score(), 0);

        s.next();
        s.previous();
        s.select(1).unwrap();
        assert_eq!(s.submit().unwrap().points_awarded, 10);
    }

    #[test]
    fn submit_requires_selection() {
        let mut s = QuizSession::new(game()).unwrap();
        assert_eq!(s.submit(), Err(QuizError::NothingSelected));
    }

    #[test]
    fn out_of_range_option_rejected() {
        let mut s = QuizSession::new(game()).unwrap();
        assert_eq!(
            s.select(3),
            Err(QuizError::InvalidOption { option: 3, available: 3 })
        );
    }

    #[test]
    fn navigation_is_bounded_and_completes_on_last_level() {
        let mut s = QuizSession::new(game()).unwrap();
        s.previous();
        assert_eq!(s.level_index(), 0);

        s.next();
        s.next();
        assert_eq!(s.level_index(), 2);
        assert!(!s.is_completed());
        assert!((s.progress_percent() - 100.0).abs() < f64::EPSILON);

        s.next();
        assert!(s.is_completed());
        assert_eq!(s.level_index(), 2);
        assert_eq!(s.select(0), Err(QuizError::Completed));
    }

    #[test]
    fn moving_clears_pending_answer() {
        let mut s = QuizSession::new(game()).unwrap();
        s.select(1).unwrap();
        s.submit().unwrap();
        s.next();
        assert_eq!(s.selected(), None);
        assert!(!s.is_submitted());
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut s = QuizSession::new(game()).unwrap();
        s.select(1).unwrap();
        s.submit().unwrap();
        s.next();
        s.next();
        s.next();
        s.reset();

        assert_eq!(s.level_index(), 0);
        assert_eq!(s.score(), 0);
        assert!(!s.is_completed());
        s.select(1).unwrap();
        assert_eq!(s.submit().unwrap().points_awarded, 10);
    }

    #[test]
    fn replay_scores_a_full_run() {
        let summary = QuizSession::replay(game(), &[Some(1), None, Some(2)]).unwrap();
        assert_eq!(summary.score, 15);
        assert_eq!(summary.max_score, 35);
        assert_eq!(summary.correct_levels, vec![0, 2]);
        assert!(summary.completed);
    }

    #[test]
    fn replay_ignores_extra_answers() {
        let summary = QuizSession::replay(game(), &[Some(1), Some(0), Some(2), Some(1)]).unwrap();
        assert_eq!(summary.score, 35);
    }
}
