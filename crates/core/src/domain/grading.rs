//! Grading of a submitted answer batch against a test.
//!
//! The engine is pure: the caller loads the test's full question and answer
//! set into a [`TestPaper`], collapses the request into an [`AnswerSheet`] and
//! persists the resulting [`GradeReport`] itself.

use std::collections::{BTreeMap, HashMap, HashSet};

use thiserror::Error;

use super::{AnswerId, PassThreshold, QuestionId, Score};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmittedAnswer {
    pub question_id: QuestionId,
    pub selected_answer_id: AnswerId,
}

/// One selected answer per question.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSheet {
    selections: BTreeMap<QuestionId, AnswerId>,
}

impl AnswerSheet {
    /// Later entries for the same question replace earlier ones.
    pub fn collapse(submissions: impl IntoIterator<Item = SubmittedAnswer>) -> Self {
        let selections = submissions
            .into_iter()
            .map(|answer| (answer.question_id, answer.selected_answer_id))
            .collect();

        Self { selections }
    }

    pub fn selected(&self, question_id: QuestionId) -> Option<AnswerId> {
        self.selections.get(&question_id).copied()
    }

    pub fn question_ids(&self) -> impl Iterator<Item = QuestionId> + '_ {
        self.selections.keys().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperQuestion {
    pub id: QuestionId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperAnswer {
    pub id: AnswerId,
    pub question_id: QuestionId,
    pub text: String,
    pub is_correct: bool,
}

/// Every question of a test together with every answer option.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestPaper {
    pub questions: Vec<PaperQuestion>,
    pub answers: Vec<PaperAnswer>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub question_id: QuestionId,
    pub question_text: String,
    pub selected_answer_id: AnswerId,
    pub selected_answer_text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeReport {
    pub score: Score,
    pub passed: bool,
    pub correct: usize,
    pub total: usize,
    pub details: Vec<AnswerOutcome>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GradingError {
    #[error("invalid questions in answers: {}", join_ids(.0))]
    InvalidQuestionReference(Vec<QuestionId>),
    #[error("test has no questions and cannot be scored")]
    EmptyTest,
}

fn join_ids(ids: &[QuestionId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GradingEngine {
    threshold: PassThreshold,
}

impl GradingEngine {
    pub fn new(threshold: PassThreshold) -> Self {
        Self { threshold }
    }

    pub fn grade(
        &self,
        paper: &TestPaper,
        sheet: &AnswerSheet,
    ) -> Result<GradeReport, GradingError> {
        let questions: HashMap<QuestionId, &str> = paper
            .questions
            .iter()
            .map(|question| (question.id, question.text.as_str()))
            .collect();

        let unknown: Vec<QuestionId> = sheet
            .question_ids()
            .filter(|id| !questions.contains_key(id))
            .collect();
        if !unknown.is_empty() {
            return Err(GradingError::InvalidQuestionReference(unknown));
        }

        let total = questions.len();
        if total == 0 {
            return Err(GradingError::EmptyTest);
        }

        let selected: HashSet<AnswerId> = sheet.selections.values().copied().collect();
        let mut matched: Vec<&PaperAnswer> = paper
            .answers
            .iter()
            .filter(|answer| {
                selected.contains(&answer.id)
                    && sheet.selections.contains_key(&answer.question_id)
                    && questions.contains_key(&answer.question_id)
            })
            .collect();
        matched.sort_by_key(|answer| answer.id);

        let details: Vec<AnswerOutcome> = matched
            .into_iter()
            .map(|answer| AnswerOutcome {
                question_id: answer.question_id,
                question_text: questions
                    .get(&answer.question_id)
                    .copied()
                    .unwrap_or_default()
                    .to_string(),
                selected_answer_id: answer.id,
                selected_answer_text: answer.text.clone(),
                // The option must also be the one picked for its own question.
                is_correct: answer.is_correct
                    && sheet.selected(answer.question_id) == Some(answer.id),
            })
            .collect();

        let correct = details.iter().filter(|outcome| outcome.is_correct).count();
        let score = Score::from_ratio(correct, total).ok_or(GradingError::EmptyTest)?;

        Ok(GradeReport {
            score,
            passed: self.threshold.is_passed_by(score),
            correct,
            total,
            details,
        })
    }
}
