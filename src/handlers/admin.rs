// src/handlers/admin.rs

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use url::Url;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::quiz::load_questions,
    models::{
        question::{
            AnswerOption, CreateQuestionRequest, OptionInput, Question, QuestionWithOptions,
            UpdateQuestionRequest,
        },
        quiz::{AdminQuizSummary, CreateQuizRequest, Quiz, UpdateQuizRequest},
        result::{AnswerDetail, ResultWithUser, UserAnswer},
    },
    utils::html::sanitize_text,
};

fn validate_image_url(image_url: &Option<String>) -> Result<(), AppError> {
    if let Some(raw) = image_url {
        Url::parse(raw).map_err(|_| AppError::BadRequest("Invalid image URL".to_string()))?;
    }
    Ok(())
}

/// Lists all quizzes with question/attempt counts and the simple average
/// score percentage across results.
/// Admin only.
pub async fn admin_dashboard(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let quizzes: Vec<AdminQuizSummary> = sqlx::query_as(
        r#"
        SELECT
            q.id,
            q.title,
            q.description,
            q.duration_secs,
            q.is_visible,
            q.allow_reattempts,
            q.show_score,
            (SELECT COUNT(*) FROM questions qs WHERE qs.quiz_id = q.id) AS question_count,
            (SELECT COUNT(*) FROM results r WHERE r.quiz_id = q.id) AS attempt_count,
            (SELECT AVG(r.score::FLOAT8 * 100.0 / r.total_questions)
             FROM results r
             WHERE r.quiz_id = q.id AND r.total_questions > 0) AS avg_score_percent,
            q.created_at
        FROM quizzes q
        ORDER BY q.created_at DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load admin dashboard: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(quizzes))
}

/// Creates a new quiz.
/// Admin only.
pub async fn create_quiz(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let title = sanitize_text(&payload.title);
    let description = payload.description.as_deref().map(sanitize_text);

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO quizzes (title, description, duration_secs)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(&title)
    .bind(&description)
    .bind(payload.duration_secs)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create quiz: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Full admin view of one quiz: settings, questions with options
/// (correctness flags included), and all results with usernames.
#[derive(Debug, Serialize)]
pub struct QuizDetailsResponse {
    pub quiz: Quiz,
    pub questions: Vec<QuestionWithOptions>,
    pub results: Vec<ResultWithUser>,
}

/// Retrieves one quiz with its questions and results.
/// Admin only.
pub async fn quiz_details(
    State(pool): State<PgPool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
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
    .await?;

    let quiz = quiz.ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    let questions = load_questions(&pool, quiz_id).await?;

    let results: Vec<ResultWithUser> = sqlx::query_as(
        r#"
        SELECT r.id, r.user_id, u.username, r.score, r.total_questions, r.completed_at
        FROM results r
        JOIN users u ON u.id = r.user_id
        WHERE r.quiz_id = $1
        ORDER BY r.completed_at DESC
        "#,
    )
    .bind(quiz_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch results for quiz {}: {:?}", quiz_id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(QuizDetailsResponse {
        quiz,
        questions,
        results,
    }))
}

/// Partially updates quiz settings (title, description, duration,
/// visibility, reattempt policy, score visibility).
/// Admin only.
pub async fn update_quiz(
    State(pool): State<PgPool>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.is_empty() {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE quizzes SET ");
    let mut separated = builder.separated(", ");

    if let Some(title) = payload.title {
        separated.push("title = ");
        separated.push_bind_unseparated(sanitize_text(&title));
    }

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(sanitize_text(&description));
    }

    if let Some(duration_secs) = payload.duration_secs {
        separated.push("duration_secs = ");
        separated.push_bind_unseparated(duration_secs);
    }

    if let Some(is_visible) = payload.is_visible {
        separated.push("is_visible = ");
        separated.push_bind_unseparated(is_visible);
    }

    if let Some(allow_reattempts) = payload.allow_reattempts {
        separated.push("allow_reattempts = ");
        separated.push_bind_unseparated(allow_reattempts);
    }

    if let Some(show_score) = payload.show_score {
        separated.push("show_score = ");
        separated.push_bind_unseparated(show_score);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(quiz_id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update quiz {}: {:?}", quiz_id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a quiz by ID. Questions, options and results cascade.
/// Admin only.
pub async fn delete_quiz(
    State(pool): State<PgPool>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
        .bind(quiz_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete quiz {}: {:?}", quiz_id, e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Inserts the full option set of a question in one round-trip and returns
/// the created rows.
async fn insert_options(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    question_id: i64,
    options: &[OptionInput],
) -> Result<Vec<AnswerOption>, AppError> {
    let texts: Vec<String> = options.iter().map(|o| sanitize_text(&o.text)).collect();
    let correct_flags: Vec<bool> = options.iter().map(|o| o.is_correct).collect();

    let created: Vec<AnswerOption> = sqlx::query_as(
        r#"
        INSERT INTO options (question_id, text, is_correct)
        SELECT $1, t, c
        FROM UNNEST($2::TEXT[], $3::BOOL[]) AS u(t, c)
        RETURNING id, question_id, text, is_correct
        "#,
    )
    .bind(question_id)
    .bind(&texts)
    .bind(&correct_flags)
    .fetch_all(&mut **tx)
    .await?;

    Ok(created)
}

/// Adds a question with its options to a quiz, atomically.
/// Admin only.
pub async fn add_question(
    State(pool): State<PgPool>,
    Path(quiz_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    validate_image_url(&payload.image_url)?;

    let quiz_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM quizzes WHERE id = $1)")
        .bind(quiz_id)
        .fetch_one(&pool)
        .await?;

    if !quiz_exists {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }

    let mut tx = pool.begin().await?;

    let question: Question = sqlx::query_as(
        r#"
        INSERT INTO questions (quiz_id, text, image_url)
        VALUES ($1, $2, $3)
        RETURNING id, quiz_id, text, image_url, created_at
        "#,
    )
    .bind(quiz_id)
    .bind(sanitize_text(&payload.text))
    .bind(&payload.image_url)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let options = insert_options(&mut tx, question.id, &payload.options).await?;

    tx.commit().await?;

    let created = QuestionWithOptions {
        id: question.id,
        quiz_id: question.quiz_id,
        text: question.text,
        image_url: question.image_url,
        options,
    };

    Ok((StatusCode::CREATED, Json(created)))
}

/// Updates a question's text/image and, when `options` is supplied,
/// replaces its whole option set.
/// Admin only.
pub async fn update_question(
    State(pool): State<PgPool>,
    Path(question_id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    validate_image_url(&payload.image_url)?;

    let mut tx = pool.begin().await?;

    // Check existence
    sqlx::query_scalar::<_, i64>("SELECT id FROM questions WHERE id = $1")
        .bind(question_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    if let Some(text) = &payload.text {
        sqlx::query("UPDATE questions SET text = $1 WHERE id = $2")
            .bind(sanitize_text(text))
            .bind(question_id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(image_url) = &payload.image_url {
        sqlx::query("UPDATE questions SET image_url = $1 WHERE id = $2")
            .bind(image_url)
            .bind(question_id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(options) = &payload.options {
        sqlx::query("DELETE FROM options WHERE question_id = $1")
            .bind(question_id)
            .execute(&mut *tx)
            .await?;

        insert_options(&mut tx, question_id, options).await?;
    }

    tx.commit().await?;

    let refreshed: Question = sqlx::query_as(
        "SELECT id, quiz_id, text, image_url, created_at FROM questions WHERE id = $1",
    )
    .bind(question_id)
    .fetch_one(&pool)
    .await?;

    let options: Vec<AnswerOption> = sqlx::query_as(
        "SELECT id, question_id, text, is_correct FROM options WHERE question_id = $1 ORDER BY id",
    )
    .bind(question_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(QuestionWithOptions {
        id: refreshed.id,
        quiz_id: refreshed.quiz_id,
        text: refreshed.text,
        image_url: refreshed.image_url,
        options,
    }))
}

/// Deletes a question by ID. Its options cascade; answer trails keep their
/// snapshot of the question id.
/// Admin only.
pub async fn delete_question(
    State(pool): State<PgPool>,
    Path(question_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(question_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question {}: {:?}", question_id, e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Row shape for the result-details header.
#[derive(Debug, FromRow)]
struct ResultHeaderRow {
    id: i64,
    user_id: i64,
    username: String,
    quiz_id: i64,
    quiz_title: String,
    score: i64,
    total_questions: i64,
    completed_at: chrono::DateTime<chrono::Utc>,
}

/// Full admin view of one attempt: the result plus its answer trail.
#[derive(Debug, Serialize)]
pub struct ResultDetailsResponse {
    pub result: ResultWithUser,
    pub quiz_id: i64,
    pub quiz_title: String,
    pub answers: Vec<AnswerDetail>,
}

/// Retrieves one result with its full answer trail.
/// Admin only.
pub async fn result_details(
    State(pool): State<PgPool>,
    Path(result_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let header: Option<ResultHeaderRow> = sqlx::query_as(
        r#"
        SELECT r.id, r.user_id, u.username, r.quiz_id, qz.title AS quiz_title,
               r.score, r.total_questions, r.completed_at
        FROM results r
        JOIN users u ON u.id = r.user_id
        JOIN quizzes qz ON qz.id = r.quiz_id
        WHERE r.id = $1
        "#,
    )
    .bind(result_id)
    .fetch_optional(&pool)
    .await?;

    let header = header.ok_or(AppError::NotFound("Result not found".to_string()))?;

    let trail: Vec<UserAnswer> = sqlx::query_as(
        r#"
        SELECT id, result_id, question_id, selected_option_id, is_correct
        FROM user_answers
        WHERE result_id = $1
        ORDER BY id
        "#,
    )
    .bind(result_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch answer trail for result {}: {:?}", result_id, e);
        AppError::InternalServerError(e.to_string())
    })?;

    let question_ids: Vec<i64> = trail.iter().map(|a| a.question_id).collect();

    // The trail stores snapshots; the questions (and their options) may have
    // been edited or deleted since the attempt, so look up what still exists.
    let (mut questions, mut grouped_options): (HashMap<i64, Question>, HashMap<i64, Vec<AnswerOption>>) =
        if question_ids.is_empty() {
            (HashMap::new(), HashMap::new())
        } else {
            let questions: Vec<Question> = sqlx::query_as(
                "SELECT id, quiz_id, text, image_url, created_at FROM questions WHERE id = ANY($1)",
            )
            .bind(&question_ids)
            .fetch_all(&pool)
            .await?;

            let options: Vec<AnswerOption> = sqlx::query_as(
                r#"
                SELECT id, question_id, text, is_correct
                FROM options
                WHERE question_id = ANY($1)
                ORDER BY id
                "#,
            )
            .bind(&question_ids)
            .fetch_all(&pool)
            .await?;

            let mut grouped: HashMap<i64, Vec<AnswerOption>> = HashMap::new();
            for option in options {
                grouped.entry(option.question_id).or_default().push(option);
            }

            (questions.into_iter().map(|q| (q.id, q)).collect(), grouped)
        };

    let answers: Vec<AnswerDetail> = trail
        .into_iter()
        .map(|entry| {
            let question = questions.remove(&entry.question_id);
            AnswerDetail {
                options: grouped_options.remove(&entry.question_id).unwrap_or_default(),
                question_id: entry.question_id,
                question_text: question.as_ref().map(|q| q.text.clone()),
                question_image_url: question.and_then(|q| q.image_url),
                selected_option_id: entry.selected_option_id,
                is_correct: entry.is_correct,
            }
        })
        .collect();

    Ok(Json(ResultDetailsResponse {
        result: ResultWithUser {
            id: header.id,
            user_id: header.user_id,
            username: header.username,
            score: header.score,
            total_questions: header.total_questions,
            completed_at: header.completed_at,
        },
        quiz_id: header.quiz_id,
        quiz_title: header.quiz_title,
        answers,
    }))
}
