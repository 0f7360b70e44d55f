use std::collections::HashSet;

use crate::db::models::{AnswerOption, Question, QuestionKind};
use crate::db::types::McqPolicy;

/// Points for a stored answer, or `None` when the question needs a human.
pub(crate) fn grade_answer(question: &Question, content: &str) -> Option<f64> {
    match &question.kind {
        QuestionKind::OpenResponse => None,
        QuestionKind::SingleChoice { options } | QuestionKind::TrueFalse { options } => {
            Some(grade_single(options, content, question.points))
        }
        QuestionKind::MultipleChoice { options, policy } => {
            Some(grade_multiple(options, *policy, content, question.points))
        }
    }
}

fn grade_single(options: &[AnswerOption], content: &str, points: f64) -> f64 {
    let selected = content.trim();
    if selected.is_empty() {
        return 0.0;
    }

    let correct = options.iter().filter(|option| option.is_correct).collect::<Vec<_>>();
    if correct.len() != 1 {
        return 0.0;
    }

    if matches_option(correct[0], selected) {
        points
    } else {
        0.0
    }
}

fn grade_multiple(options: &[AnswerOption], policy: McqPolicy, content: &str, points: f64) -> f64 {
    let selected = resolve_selection(options, content);
    let correct_ids: HashSet<&str> = options
        .iter()
        .filter(|option| option.is_correct)
        .map(|option| option.id.as_str())
        .collect();

    if correct_ids.is_empty() {
        return 0.0;
    }

    let hits = selected.iter().filter(|id| correct_ids.contains(*id)).count();
    let misses = selected.len() - hits;

    match policy {
        McqPolicy::AllOrNothing => {
            if misses == 0 && hits == correct_ids.len() {
                points
            } else {
                0.0
            }
        }
        McqPolicy::AverageCorrect => points * hits as f64 / correct_ids.len() as f64,
        McqPolicy::AverageCorrectAndIncorrect => {
            let net = hits.saturating_sub(misses);
            points * net as f64 / correct_ids.len() as f64
        }
    }
}

/// Selected option ids. Unknown tokens are ignored and duplicates collapse.
fn resolve_selection<'a>(options: &'a [AnswerOption], content: &str) -> HashSet<&'a str> {
    split_selection(content)
        .filter_map(|token| {
            options
                .iter()
                .find(|option| matches_option(option, token))
                .map(|option| option.id.as_str())
        })
        .collect()
}

pub(crate) fn split_selection(content: &str) -> impl Iterator<Item = &str> {
    content
        .split(',')
        .map(|token| token.trim_matches(|c: char| c.is_whitespace() || matches!(c, '[' | ']' | '"')))
        .filter(|token| !token.is_empty())
}

fn matches_option(option: &AnswerOption, token: &str) -> bool {
    option.id == token || option.label == token
}
