//! Rule Evaluator: evalúa recursivamente la regla de un requisito contra un curso.

use serde::{Deserialize, Serialize};
use crate::algorithm::filters;
use crate::models::{Course, LogicalOperator, Rule};

pub const SPECIFICITY_TAKE_COURSES: u32 = 100;
pub const SPECIFICITY_TAKE_FROM_LIST: u32 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub matches: bool,
    pub specificity: u32,
}

impl MatchResult {
    pub const NO_MATCH: MatchResult = MatchResult { matches: false, specificity: 0 };

    fn matched(specificity: u32) -> Self {
        MatchResult { matches: true, specificity }
    }
}

/// Evalúa `rule` contra `course`.
///
/// - `take_courses`: 100 si el curso está en la lista
/// - `take_from_list`: 80 (hay elección entre alternativas)
/// - `take_any_courses`: especificidad del filtro
/// - `group{AND}`: todas las sub-reglas; mínimo de sus puntajes
/// - `group{OR}`: alguna sub-regla; máximo entre las que cumplen
pub fn evaluate_rule(rule: &Rule, course: &Course) -> MatchResult {
    match rule {
        Rule::TakeCourses { courses } => {
            if listed(courses, course) {
                MatchResult::matched(SPECIFICITY_TAKE_COURSES)
            } else {
                MatchResult::NO_MATCH
            }
        }
        Rule::TakeFromList { courses, .. } => {
            if listed(courses, course) {
                MatchResult::matched(SPECIFICITY_TAKE_FROM_LIST)
            } else {
                MatchResult::NO_MATCH
            }
        }
        Rule::TakeAnyCourses { filter, .. } => match filters::matched_specificity(course, filter) {
            Some(s) => MatchResult::matched(s),
            None => MatchResult::NO_MATCH,
        },
        Rule::Group { operator: LogicalOperator::And, rules } => {
            let mut lowest: Option<u32> = None;
            for sub in rules {
                let r = evaluate_rule(sub, course);
                if !r.matches {
                    return MatchResult::NO_MATCH;
                }
                lowest = Some(lowest.map_or(r.specificity, |l| l.min(r.specificity)));
            }
            lowest.map_or(MatchResult::NO_MATCH, MatchResult::matched)
        }
        Rule::Group { operator: LogicalOperator::Or, rules } => rules
            .iter()
            .map(|sub| evaluate_rule(sub, course))
            .filter(|r| r.matches)
            .map(|r| r.specificity)
            .max()
            .map_or(MatchResult::NO_MATCH, MatchResult::matched),
    }
}

fn listed(courses: &[String], course: &Course) -> bool {
    courses.iter().any(|c| c.trim() == course.course_id.trim())
}
