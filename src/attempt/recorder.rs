// src/attempt/recorder.rs

use sqlx::PgPool;

use crate::attempt::scoring::ScoreOutcome;
use crate::error::AppError;
use crate::models::result::QuizResult;

/// Persists one scored attempt: a result row plus its full answer trail,
/// inside a single transaction.
///
/// The reattempt policy is re-checked here after taking a row lock on the
/// quiz, which serializes competing submissions for the same quiz. Two tabs
/// racing a non-reattemptable quiz therefore end with exactly one result; the
/// loser gets `AttemptNotAllowed` and nothing written. Any insert failure
/// rolls the whole unit back, so a result without its answer trail can never
/// become visible.
///
/// Returns the created result row, generated id included.
pub async fn record_attempt(
    pool: &PgPool,
    user_id: i64,
    quiz_id: i64,
    outcome: &ScoreOutcome,
) -> Result<QuizResult, AppError> {
    let mut tx = pool.begin().await?;

    // Lock the policy row for the duration of the transaction.
    let allow_reattempts: Option<bool> =
        sqlx::query_scalar("SELECT allow_reattempts FROM quizzes WHERE id = $1 FOR UPDATE")
            .bind(quiz_id)
            .fetch_optional(&mut *tx)
            .await?;

    let allow_reattempts =
        allow_reattempts.ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    if !allow_reattempts {
        let already_attempted: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM results WHERE quiz_id = $1 AND user_id = $2)",
        )
        .bind(quiz_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        if already_attempted {
            // Dropping the transaction rolls it back.
            return Err(AppError::AttemptNotAllowed(
                "You have already attempted this quiz. Reattempts are not allowed.".to_string(),
            ));
        }
    }

    let result: QuizResult = sqlx::query_as(
        r#"
        INSERT INTO results (user_id, quiz_id, score, total_questions)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, quiz_id, score, total_questions, completed_at
        "#,
    )
    .bind(user_id)
    .bind(quiz_id)
    .bind(outcome.score)
    .bind(outcome.total_questions)
    .fetch_one(&mut *tx)
    .await?;

    // Batch insert the answer trail, unanswered questions included, in one
    // round-trip via UNNEST.
    if !outcome.records.is_empty() {
        let question_ids: Vec<i64> = outcome.records.iter().map(|r| r.question_id).collect();
        let selected_option_ids: Vec<Option<i64>> = outcome
            .records
            .iter()
            .map(|r| r.selected_option_id)
            .collect();
        let correct_flags: Vec<bool> = outcome.records.iter().map(|r| r.is_correct).collect();

        sqlx::query(
            r#"
            INSERT INTO user_answers (result_id, question_id, selected_option_id, is_correct)
            SELECT $1, q, s, c
            FROM UNNEST($2::BIGINT[], $3::BIGINT[], $4::BOOL[]) AS t(q, s, c)
            "#,
        )
        .bind(result.id)
        .bind(&question_ids)
        .bind(&selected_option_ids)
        .bind(&correct_flags)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    tracing::info!(
        "recorded attempt: result={} quiz={} user={} score={}/{}",
        result.id,
        quiz_id,
        user_id,
        outcome.score,
        outcome.total_questions
    );

    Ok(result)
}
