// src/models/result.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::question::AnswerOption;

/// Represents the 'results' table in the database.
/// One row per attempt; immutable once created.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizResult {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    pub score: i64,
    pub total_questions: i64,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// Represents the 'user_answers' table in the database: the answer trail
/// belonging to one result. `selected_option_id` is NULL for questions the
/// user left unanswered.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserAnswer {
    pub id: i64,
    pub result_id: i64,
    pub question_id: i64,
    pub selected_option_id: Option<i64>,
    pub is_correct: bool,
}

/// Response payload for a successful submission.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub result_id: i64,
    pub score: i64,
    pub total_questions: i64,
}

/// A result row joined with the taker's username, for admin views.
#[derive(Debug, Serialize, FromRow)]
pub struct ResultWithUser {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub score: i64,
    pub total_questions: i64,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// One of the caller's own results. The numeric score is withheld when the
/// quiz's `show_score` flag is off.
#[derive(Debug, Serialize)]
pub struct OwnResult {
    pub id: i64,
    pub quiz_id: i64,
    pub quiz_title: String,
    pub score: Option<i64>,
    pub total_questions: i64,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// One entry of an answer trail as shown to admins: the stored snapshot plus
/// whatever still exists of the question it pointed at.
#[derive(Debug, Serialize)]
pub struct AnswerDetail {
    pub question_id: i64,
    /// None when the question has been deleted since the attempt.
    pub question_text: Option<String>,
    pub question_image_url: Option<String>,
    pub selected_option_id: Option<i64>,
    pub is_correct: bool,
    /// The question's current options, correctness flags included.
    pub options: Vec<AnswerOption>,
}
