// src/attempt/scoring.rs

use serde::Serialize;

use crate::attempt::submission::SubmissionInput;
use crate::models::question::QuestionWithOptions;

/// Per-question outcome of one scoring pass.
///
/// `selected_option_id` is None when the question was left unanswered; a
/// Some value that matches none of the question's options is kept as-is so
/// the answer trail still shows what the client actually sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerRecord {
    pub question_id: i64,
    pub selected_option_id: Option<i64>,
    pub is_correct: bool,
}

/// The scored submission: what gets persisted as one result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreOutcome {
    pub score: i64,
    pub total_questions: i64,
    pub records: Vec<AnswerRecord>,
}

/// Scores a submission against the question/option snapshot.
///
/// Pure function: no I/O, no randomness, no partial credit. A question
/// scores one point exactly when the submitted option id matches one of its
/// options and that option's own `is_correct` flag is set. Unanswered and
/// unmatched selections both score zero and are recorded as incorrect.
pub fn score_submission(
    questions: &[QuestionWithOptions],
    submission: &SubmissionInput,
) -> ScoreOutcome {
    let mut score = 0;
    let mut records = Vec::with_capacity(questions.len());

    for question in questions {
        let selected = submission.selection(question.id);

        let is_correct = match selected {
            Some(option_id) => question
                .options
                .iter()
                .find(|o| o.id == option_id)
                .is_some_and(|o| o.is_correct),
            None => false,
        };

        if is_correct {
            score += 1;
        }

        records.push(AnswerRecord {
            question_id: question.id,
            selected_option_id: selected,
            is_correct,
        });
    }

    ScoreOutcome {
        score,
        total_questions: questions.len() as i64,
        records,
    }
}
