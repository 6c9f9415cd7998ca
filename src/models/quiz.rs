// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::config::DEFAULT_QUIZ_DURATION_SECS;

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,

    /// Configured duration in seconds. NULL or non-positive values are
    /// treated as unset; readers must go through `effective_duration`.
    pub duration_secs: Option<i64>,

    /// Whether the quiz is listed on the user dashboard.
    pub is_visible: bool,

    /// Whether a user may attempt the quiz more than once.
    pub allow_reattempts: bool,

    /// Whether takers get to see their numeric score afterwards.
    pub show_score: bool,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Quiz {
    /// Duration to advertise to clients, falling back to the 600s default
    /// when the stored value is missing or unusable.
    pub fn effective_duration(&self) -> i64 {
        self.duration_secs
            .filter(|d| *d > 0)
            .unwrap_or(DEFAULT_QUIZ_DURATION_SECS)
    }
}

/// DTO for creating a new quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    /// Optional; stored as-is, the 600s default applies on read.
    pub duration_secs: Option<i64>,
}

/// DTO for partially updating quiz settings. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateQuizRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration_secs: Option<i64>,
    pub is_visible: Option<bool>,
    pub allow_reattempts: Option<bool>,
    pub show_score: Option<bool>,
}

impl UpdateQuizRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.duration_secs.is_none()
            && self.is_visible.is_none()
            && self.allow_reattempts.is_none()
            && self.show_score.is_none()
    }
}

/// Quiz as returned to a taker: duration already defaulted.
#[derive(Debug, Serialize)]
pub struct QuizView {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub duration_secs: i64,
    pub allow_reattempts: bool,
    pub show_score: bool,
}

impl From<Quiz> for QuizView {
    fn from(quiz: Quiz) -> Self {
        let duration_secs = quiz.effective_duration();
        QuizView {
            id: quiz.id,
            title: quiz.title,
            description: quiz.description,
            duration_secs,
            allow_reattempts: quiz.allow_reattempts,
            show_score: quiz.show_score,
        }
    }
}

/// Dashboard row for regular users: a visible quiz plus whether the caller
/// may still attempt it. `duration_secs` is already defaulted by the query.
#[derive(Debug, Serialize, FromRow)]
pub struct DashboardQuiz {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub duration_secs: i64,
    pub allow_reattempts: bool,
    pub can_attempt: bool,
}

/// Aggregated admin dashboard row: quiz plus attempt statistics.
#[derive(Debug, Serialize, FromRow)]
pub struct AdminQuizSummary {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub duration_secs: Option<i64>,
    pub is_visible: bool,
    pub allow_reattempts: bool,
    pub show_score: bool,
    pub question_count: i64,
    pub attempt_count: i64,
    /// Simple average of per-result percentages; NULL when nobody attempted.
    pub avg_score_percent: Option<f64>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz_with_duration(duration_secs: Option<i64>) -> Quiz {
        Quiz {
            id: 1,
            title: "Sample".to_string(),
            description: None,
            duration_secs,
            is_visible: true,
            allow_reattempts: false,
            show_score: true,
            created_at: None,
        }
    }

    #[test]
    fn effective_duration_uses_stored_value() {
        assert_eq!(quiz_with_duration(Some(1800)).effective_duration(), 1800);
    }

    #[test]
    fn effective_duration_defaults_when_unset() {
        assert_eq!(quiz_with_duration(None).effective_duration(), 600);
    }

    #[test]
    fn effective_duration_defaults_when_non_positive() {
        assert_eq!(quiz_with_duration(Some(0)).effective_duration(), 600);
        assert_eq!(quiz_with_duration(Some(-5)).effective_duration(), 600);
    }
}
