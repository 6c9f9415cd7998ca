// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,
    pub text: String,
    pub image_url: Option<String>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'options' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub is_correct: bool,
}

/// A question together with its options, as read in one gateway operation.
/// This is the snapshot the scoring engine works against.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionWithOptions {
    pub id: i64,
    pub quiz_id: i64,
    pub text: String,
    pub image_url: Option<String>,
    pub options: Vec<AnswerOption>,
}

/// Option DTO for takers (excludes the correctness flag).
#[derive(Debug, Serialize)]
pub struct PublicOption {
    pub id: i64,
    pub text: String,
}

/// Question DTO for takers (correctness flags stripped from options).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    pub image_url: Option<String>,
    pub options: Vec<PublicOption>,
}

impl From<QuestionWithOptions> for PublicQuestion {
    fn from(question: QuestionWithOptions) -> Self {
        PublicQuestion {
            id: question.id,
            text: question.text,
            image_url: question.image_url,
            options: question
                .options
                .into_iter()
                .map(|o| PublicOption {
                    id: o.id,
                    text: o.text,
                })
                .collect(),
        }
    }
}

/// DTO for one option of a question being created or replaced.
#[derive(Debug, Deserialize, Serialize)]
pub struct OptionInput {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// DTO for creating a new question with its options.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
    #[validate(length(max = 1000))]
    pub image_url: Option<String>,
    #[validate(custom(function = validate_options))]
    pub options: Vec<OptionInput>,
}

/// DTO for updating a question. Fields are optional; supplying `options`
/// replaces the question's full option set.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub text: Option<String>,
    #[validate(length(max = 1000))]
    pub image_url: Option<String>,
    #[validate(custom(function = validate_options))]
    pub options: Option<Vec<OptionInput>>,
}

fn validate_options(options: &[OptionInput]) -> Result<(), validator::ValidationError> {
    if options.is_empty() {
        return Err(validator::ValidationError::new("options_cannot_be_empty"));
    }
    for opt in options {
        if opt.text.is_empty() || opt.text.len() > 500 {
            return Err(validator::ValidationError::new("option_text_length"));
        }
    }
    Ok(())
}
