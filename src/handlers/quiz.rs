// src/handlers/quiz.rs

use std::collections::HashMap;

use axum::{
    Extension, Form, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::{
    attempt::{policy, recorder, scoring, submission::SubmissionInput},
    config::DEFAULT_QUIZ_DURATION_SECS,
    error::AppError,
    models::{
        question::{AnswerOption, PublicQuestion, Question, QuestionWithOptions},
        quiz::{DashboardQuiz, Quiz, QuizView},
        result::{OwnResult, SubmitResponse},
    },
    utils::jwt::Claims,
};

/// Loads a quiz's questions with their nested options, in authoring order.
/// This is the snapshot both the take-view and the scoring pass work from.
pub(crate) async fn load_questions(
    pool: &PgPool,
    quiz_id: i64,
) -> Result<Vec<QuestionWithOptions>, AppError> {
    let questions: Vec<Question> = sqlx::query_as(
        r#"
        SELECT id, quiz_id, text, image_url, created_at
        FROM questions
        WHERE quiz_id = $1
        ORDER BY created_at, id
        "#,
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch questions for quiz {}: {:?}", quiz_id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    if questions.is_empty() {
        return Ok(Vec::new());
    }

    let question_ids: Vec<i64> = questions.iter().map(|q| q.id).collect();

    let options: Vec<AnswerOption> = sqlx::query_as(
        r#"
        SELECT id, question_id, text, is_correct
        FROM options
        WHERE question_id = ANY($1)
        ORDER BY id
        "#,
    )
    .bind(&question_ids)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch options for quiz {}: {:?}", quiz_id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    let mut grouped: HashMap<i64, Vec<AnswerOption>> = HashMap::new();
    for option in options {
        grouped.entry(option.question_id).or_default().push(option);
    }

    Ok(questions
        .into_iter()
        .map(|q| QuestionWithOptions {
            options: grouped.remove(&q.id).unwrap_or_default(),
            id: q.id,
            quiz_id: q.quiz_id,
            text: q.text,
            image_url: q.image_url,
        })
        .collect())
}

/// Lists visible quizzes for the logged-in user, with a per-quiz flag for
/// whether another attempt is still allowed.
pub async fn user_dashboard(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let quizzes: Vec<DashboardQuiz> = sqlx::query_as(
        r#"
        SELECT
            q.id,
            q.title,
            q.description,
            CASE
                WHEN q.duration_secs IS NULL OR q.duration_secs <= 0 THEN $2
                ELSE q.duration_secs
            END AS duration_secs,
            q.allow_reattempts,
            (q.allow_reattempts OR NOT EXISTS (
                SELECT 1 FROM results r WHERE r.quiz_id = q.id AND r.user_id = $1
            )) AS can_attempt
        FROM quizzes q
        WHERE q.is_visible
        ORDER BY q.created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(DEFAULT_QUIZ_DURATION_SECS)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list visible quizzes: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(quizzes))
}

/// Response for the take-quiz view: the quiz plus its questions with the
/// correctness flags stripped.
#[derive(Debug, Serialize)]
pub struct TakeQuizResponse {
    pub quiz: QuizView,
    pub questions: Vec<PublicQuestion>,
}

/// Presents a quiz for taking.
///
/// Rejects with 404 if the quiz does not exist and with an "already
/// attempted" notice when the reattempt policy forbids another pass. The
/// same policy check runs again at submission time; nothing is cached
/// between the two.
pub async fn take_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let quiz: Option<Quiz> = sqlx::query_as(
        r#"
        SELECT id, title, description, duration_secs, is_visible,
               allow_reattempts, show_score, created_at
        FROM quizzes
        WHERE id = $1
        "#,
    )
    .bind(quiz_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch quiz {}: {:?}", quiz_id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    let quiz = quiz.ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    policy::ensure_can_attempt(&pool, quiz_id, user_id).await?;

    let questions = load_questions(&pool, quiz_id).await?;
    let questions: Vec<PublicQuestion> = questions.into_iter().map(PublicQuestion::from).collect();

    Ok(Json(TakeQuizResponse {
        quiz: QuizView::from(quiz),
        questions,
    }))
}

/// Accepts a quiz submission.
///
/// Body is form-encoded, one `q-{questionId} = optionId` field per answered
/// question. The flow is: policy pre-check, snapshot read, pure scoring,
/// then the transactional recorder (which re-checks the policy atomically
/// before writing the result and its answer trail).
pub async fn submit_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    policy::ensure_can_attempt(&pool, quiz_id, user_id).await?;

    let questions = load_questions(&pool, quiz_id).await?;
    let submission = SubmissionInput::from_form(&form);
    let outcome = scoring::score_submission(&questions, &submission);

    let result = recorder::record_attempt(&pool, user_id, quiz_id, &outcome).await?;

    Ok(Json(SubmitResponse {
        result_id: result.id,
        score: result.score,
        total_questions: result.total_questions,
    }))
}

/// Row shape for the caller's result listing, before show_score gating.
#[derive(Debug, FromRow)]
struct OwnResultRow {
    id: i64,
    quiz_id: i64,
    quiz_title: String,
    score: i64,
    total_questions: i64,
    show_score: bool,
    completed_at: chrono::DateTime<chrono::Utc>,
}

/// Lists the caller's own results, newest first. The numeric score is
/// included only when the quiz's `show_score` flag is on.
pub async fn my_results(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let rows: Vec<OwnResultRow> = sqlx::query_as(
        r#"
        SELECT r.id, r.quiz_id, qz.title AS quiz_title, r.score,
               r.total_questions, qz.show_score, r.completed_at
        FROM results r
        JOIN quizzes qz ON qz.id = r.quiz_id
        WHERE r.user_id = $1
        ORDER BY r.completed_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list results for user {}: {:?}", user_id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    let results: Vec<OwnResult> = rows
        .into_iter()
        .map(|row| OwnResult {
            id: row.id,
            quiz_id: row.quiz_id,
            quiz_title: row.quiz_title,
            score: row.show_score.then_some(row.score),
            total_questions: row.total_questions,
            completed_at: row.completed_at,
        })
        .collect();

    Ok(Json(results))
}
