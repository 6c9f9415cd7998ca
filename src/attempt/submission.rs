// src/attempt/submission.rs

use std::collections::HashMap;

/// A normalized submission: question id -> selected option id.
///
/// Built once at the transport boundary from the raw form body, so the
/// scoring engine never compares raw strings. Form fields are named
/// `q-{questionId}` with the selected option id as value; fields that do not
/// follow that shape, or whose ids fail to parse, are dropped and the
/// question counts as unanswered.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubmissionInput {
    selections: HashMap<i64, i64>,
}

impl SubmissionInput {
    pub fn from_form(form: &HashMap<String, String>) -> Self {
        let selections = form
            .iter()
            .filter_map(|(key, value)| {
                let question_id = key.strip_prefix("q-")?.trim().parse::<i64>().ok()?;
                let option_id = value.trim().parse::<i64>().ok()?;
                Some((question_id, option_id))
            })
            .collect();

        SubmissionInput { selections }
    }

    /// The option the user picked for `question_id`, if any.
    pub fn selection(&self, question_id: i64) -> Option<i64> {
        self.selections.get(&question_id).copied()
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_question_fields() {
        let input = SubmissionInput::from_form(&form(&[("q-1", "10"), ("q-2", "21")]));
        assert_eq!(input.len(), 2);
        assert_eq!(input.selection(1), Some(10));
        assert_eq!(input.selection(2), Some(21));
        assert_eq!(input.selection(3), None);
    }

    #[test]
    fn ignores_unrelated_fields() {
        let input = SubmissionInput::from_form(&form(&[("csrf_token", "abc"), ("q-5", "7")]));
        assert_eq!(input.len(), 1);
        assert_eq!(input.selection(5), Some(7));
    }

    #[test]
    fn drops_malformed_ids() {
        let input = SubmissionInput::from_form(&form(&[
            ("q-abc", "1"),
            ("q-3", "not-a-number"),
            ("q-", "2"),
        ]));
        assert!(input.is_empty());
    }

    #[test]
    fn tolerates_whitespace_around_ids() {
        let input = SubmissionInput::from_form(&form(&[("q-4", " 12 ")]));
        assert_eq!(input.selection(4), Some(12));
    }
}
