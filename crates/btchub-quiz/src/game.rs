use serde::{Deserialize, Serialize};

use crate::error::QuizError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stat {
    pub label: String,
    pub value: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelData {
    pub title: String,
    #[serde(default)]
    pub stats: Vec<Stat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`.
    pub correct: usize,
    pub explanation: String,
    pub points: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Level {
    pub id: u32,
    pub title: String,
    pub story: String,
    pub data: LevelData,
    pub quiz: Question,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Theme {
    pub color: String,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub score_label: String,
    #[serde(default)]
    pub theme: Theme,
    pub estimated_time: String,
    pub levels: Vec<Level>,
}

impl GameConfig {
    pub fn from_json(raw: &str) -> Result<Self, QuizError> {
        let config: Self = serde_json::from_str(raw).map_err(|e| QuizError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// A game needs at least one level and every answer key must point at an option.
    pub fn validate(&self) -> Result<(), QuizError> {
        if self.levels.is_empty() {
            return Err(QuizError::NoLevels(self.id.clone()));
        }
        for (idx, level) in self.levels.iter().enumerate() {
            if level.quiz.correct >= level.quiz.options.len() {
                return Err(QuizError::BadAnswerKey {
                    game: self.id.clone(),
                    level: idx,
                    correct: level.quiz.correct,
                    options: level.quiz.options.len(),
                });
            }
        }
        Ok(())
    }

    pub fn max_score(&self) -> u32 {
        self.levels.iter().map(|l| l.quiz.points).sum()
    }

    pub fn summary(&self) -> GameSummary {
        GameSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            subtitle: self.subtitle.clone(),
            description: self.description.clone(),
            score_label: self.score_label.clone(),
            theme: self.theme.clone(),
            estimated_time: self.estimated_time.clone(),
            level_count: self.levels.len(),
            max_score: self.max_score(),
        }
    }
}

/// Catalog listing entry; the full level data is served separately.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub score_label: String,
    pub theme: Theme,
    pub estimated_time: String,
    pub level_count: usize,
    pub max_score: u32,
}
