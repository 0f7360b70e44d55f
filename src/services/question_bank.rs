use uuid::Uuid;

use crate::db::models::{AnswerOption, Question, QuestionKind};
use crate::db::types::{ChoiceType, McqPolicy};
use crate::services::errors::{DomainError, DomainResult};

#[derive(Debug, Clone)]
pub(crate) struct OptionDraft {
    pub(crate) label: String,
    pub(crate) is_correct: bool,
}

impl Question {
    pub(crate) fn options(&self) -> &[AnswerOption] {
        match &self.kind {
            QuestionKind::SingleChoice { options }
            | QuestionKind::MultipleChoice { options, .. }
            | QuestionKind::TrueFalse { options } => options,
            QuestionKind::OpenResponse => &[],
        }
    }

    pub(crate) fn is_open_response(&self) -> bool {
        matches!(self.kind, QuestionKind::OpenResponse)
    }

    pub(crate) fn kind_label(&self) -> &'static str {
        match self.kind {
            QuestionKind::SingleChoice { .. } => "single_choice",
            QuestionKind::MultipleChoice { .. } => "multiple_choice",
            QuestionKind::TrueFalse { .. } => "true_false",
            QuestionKind::OpenResponse => "open_response",
        }
    }

    fn correct_count(&self) -> usize {
        self.options().iter().filter(|option| option.is_correct).count()
    }
}

pub(crate) fn build_choice_question(
    prompt: &str,
    points: f64,
    choice_type: ChoiceType,
    policy: Option<McqPolicy>,
    drafts: Vec<OptionDraft>,
    order_index: i32,
) -> DomainResult<Question> {
    validate_common(prompt, points)?;

    if drafts.iter().any(|draft| draft.label.trim().is_empty()) {
        return Err(DomainError::invalid_argument("answer option labels must not be empty"));
    }

    let options: Vec<AnswerOption> = drafts
        .into_iter()
        .map(|draft| AnswerOption {
            id: Uuid::new_v4().to_string(),
            label: draft.label.trim().to_string(),
            is_correct: draft.is_correct,
        })
        .collect();

    let kind = match choice_type {
        ChoiceType::Single => QuestionKind::SingleChoice { options },
        ChoiceType::TrueFalse => QuestionKind::TrueFalse { options },
        ChoiceType::Multiple => {
            QuestionKind::MultipleChoice { options, policy: policy.unwrap_or_default() }
        }
    };

    let question = Question {
        id: Uuid::new_v4().to_string(),
        prompt: prompt.trim().to_string(),
        points,
        order_index,
        kind,
    };

    let violations = structural_violations(&question);
    if let Some(first) = violations.into_iter().next() {
        return Err(DomainError::InvalidArgument(first));
    }

    Ok(question)
}

pub(crate) fn build_open_question(
    prompt: &str,
    points: f64,
    order_index: i32,
) -> DomainResult<Question> {
    validate_common(prompt, points)?;

    Ok(Question {
        id: Uuid::new_v4().to_string(),
        prompt: prompt.trim().to_string(),
        points,
        order_index,
        kind: QuestionKind::OpenResponse,
    })
}

/// Weight must be strictly positive; zero-point questions are rejected.
fn validate_common(prompt: &str, points: f64) -> DomainResult<()> {
    if prompt.trim().is_empty() {
        return Err(DomainError::invalid_argument("question prompt must not be empty"));
    }
    if !points.is_finite() || points <= 0.0 {
        return Err(DomainError::invalid_argument("question points must be positive"));
    }
    Ok(())
}

pub(crate) fn structural_violations(question: &Question) -> Vec<String> {
    let mut violations = Vec::new();

    if question.prompt.trim().is_empty() {
        violations.push("prompt is empty".to_string());
    }
    if !question.points.is_finite() || question.points <= 0.0 {
        violations.push(format!("points must be positive (got {:.2})", question.points));
    }

    let option_count = question.options().len();
    let correct = question.correct_count();

    match &question.kind {
        QuestionKind::OpenResponse => {}
        QuestionKind::SingleChoice { .. } => {
            check_choice_basics(option_count, correct, &mut violations);
            if correct != 1 {
                violations
                    .push(format!("single choice needs exactly one correct option (got {correct})"));
            }
        }
        QuestionKind::TrueFalse { .. } => {
            if option_count != 2 {
                violations
                    .push(format!("true/false needs exactly two options (got {option_count})"));
            }
            if correct != 1 {
                violations
                    .push(format!("true/false needs exactly one correct option (got {correct})"));
            }
        }
        QuestionKind::MultipleChoice { policy, .. } => {
            check_choice_basics(option_count, correct, &mut violations);
            if *policy == McqPolicy::AverageCorrectAndIncorrect && correct < 2 {
                violations.push(
                    "average_correct_and_incorrect policy needs at least two correct options"
                        .to_string(),
                );
            }
        }
    }

    violations
}

fn check_choice_basics(option_count: usize, correct: usize, violations: &mut Vec<String>) {
    if option_count < 2 {
        violations.push(format!("choice question needs at least two options (got {option_count})"));
    }
    if correct == 0 {
        violations.push("choice question has no correct option".to_string());
    }
}
