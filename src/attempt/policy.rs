// src/attempt/policy.rs

use sqlx::PgPool;

use crate::error::AppError;

/// Decides whether `user_id` may start or submit an attempt on `quiz_id`.
///
/// Reads current state on every call: the quiz's `allow_reattempts` flag and
/// whether any prior result exists for the pair. Callers run this both when
/// presenting a quiz and again at submission time; nothing is cached between
/// the two checks. This check alone is advisory under concurrency - the
/// recorder repeats it inside its transaction before writing anything.
pub async fn can_attempt(pool: &PgPool, quiz_id: i64, user_id: i64) -> Result<bool, AppError> {
    let allow_reattempts: Option<bool> =
        sqlx::query_scalar("SELECT allow_reattempts FROM quizzes WHERE id = $1")
            .bind(quiz_id)
            .fetch_optional(pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to load quiz {} for attempt check: {:?}", quiz_id, e);
                AppError::InternalServerError(e.to_string())
            })?;

    let allow_reattempts =
        allow_reattempts.ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    if allow_reattempts {
        return Ok(true);
    }

    let already_attempted: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM results WHERE quiz_id = $1 AND user_id = $2)",
    )
    .bind(quiz_id)
    .bind(user_id)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to check prior results: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(!already_attempted)
}

/// Same check, but failing with the user-facing rejection instead of a bool.
pub async fn ensure_can_attempt(pool: &PgPool, quiz_id: i64, user_id: i64) -> Result<(), AppError> {
    if can_attempt(pool, quiz_id, user_id).await? {
        Ok(())
    } else {
        Err(AppError::AttemptNotAllowed(
            "You have already attempted this quiz. Reattempts are not allowed.".to_string(),
        ))
    }
}
