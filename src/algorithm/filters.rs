//! Filter Matcher: evalúa un curso contra un criterio `Filter` y calcula su
//! especificidad.
//!
//! La especificidad usa buckets fijos; un valor mayor significa un filtro
//! más estrecho. El asignador la usa para desempatar entre requisitos.

use crate::models::{Course, Filter, LogicalOperator, NumberConstraint};

pub const SPECIFICITY_ANY: u32 = 0;
pub const SPECIFICITY_ATTRIBUTE: u32 = 50;
pub const SPECIFICITY_SUFFIX: u32 = 60;
pub const SPECIFICITY_COURSE_LIST: u32 = 90;
pub const SPECIFICITY_SUBJECT_NUMBER: u32 = 100;

/// True si `course` satisface `filter`.
pub fn matches(course: &Course, filter: &Filter) -> bool {
    matched_specificity(course, filter).is_some()
}

/// Especificidad estática del filtro (sin curso). Para `composite{OR}` se
/// toma el máximo entre todos los sub-filtros.
pub fn specificity(filter: &Filter) -> u32 {
    match filter {
        Filter::Any => SPECIFICITY_ANY,
        Filter::CourseList { .. } => SPECIFICITY_COURSE_LIST,
        Filter::SubjectNumber { .. } => SPECIFICITY_SUBJECT_NUMBER,
        Filter::Attribute { .. } => SPECIFICITY_ATTRIBUTE,
        Filter::CourseNumberSuffix { .. } => SPECIFICITY_SUFFIX,
        // el lado numérico pesa como subject_number, el de atributos como attribute
        Filter::NumberAttribute { .. } => SPECIFICITY_SUBJECT_NUMBER.max(SPECIFICITY_ATTRIBUTE),
        Filter::Composite { operator: LogicalOperator::And, filters } => {
            filters.iter().map(specificity).min().unwrap_or(SPECIFICITY_ANY)
        }
        Filter::Composite { operator: LogicalOperator::Or, filters } => {
            filters.iter().map(specificity).max().unwrap_or(SPECIFICITY_ANY)
        }
    }
}

/// Especificidad del filtro para un curso concreto, o `None` si no hay match.
///
/// - `composite{AND}`: mínimo de los sub-filtros (todos deben cumplirse)
/// - `composite{OR}`: máximo entre los sub-filtros que efectivamente cumplen
pub fn matched_specificity(course: &Course, filter: &Filter) -> Option<u32> {
    match filter {
        Filter::Any => Some(SPECIFICITY_ANY),
        Filter::Composite { operator: LogicalOperator::And, filters } => {
            let mut lowest: Option<u32> = None;
            for f in filters {
                let s = matched_specificity(course, f)?;
                lowest = Some(lowest.map_or(s, |l| l.min(s)));
            }
            lowest
        }
        Filter::Composite { operator: LogicalOperator::Or, filters } => {
            filters.iter().filter_map(|f| matched_specificity(course, f)).max()
        }
        Filter::CourseList { courses } => {
            contains_id(courses, &course.course_id).then_some(SPECIFICITY_COURSE_LIST)
        }
        Filter::SubjectNumber { subjects, numbers, exclude } => {
            let ok = subject_in(subjects, &course.subject_code)
                && !contains_id(exclude, &course.course_id)
                && numbers
                    .as_ref()
                    .is_none_or(|ns| ns.iter().any(|n| number_constraint_matches(course, n)));
            ok.then(|| specificity(filter))
        }
        Filter::Attribute { attributes, attribute_type, exclude } => {
            let excluded = exclude
                .as_ref()
                .is_some_and(|ex| subject_in(&ex.subjects, &course.subject_code));
            let ok = !excluded
                && attributes
                    .iter()
                    .any(|a| course.has_attribute(a, attribute_type.as_deref()));
            ok.then(|| specificity(filter))
        }
        Filter::CourseNumberSuffix { suffixes, subjects, exclude } => {
            let number = course.course_number.trim().to_uppercase();
            let ok = suffixes
                .iter()
                .any(|s| !s.is_empty() && number.ends_with(&s.trim().to_uppercase()))
                && subjects.as_ref().is_none_or(|ss| subject_in(ss, &course.subject_code))
                && !contains_id(exclude, &course.course_id);
            ok.then(|| specificity(filter))
        }
        Filter::NumberAttribute { numbers, attributes, attribute_type, subjects, exclude } => {
            let ok = numbers.iter().any(|n| number_constraint_matches(course, n))
                && attributes
                    .iter()
                    .any(|a| course.has_attribute(a, attribute_type.as_deref()))
                && subjects.as_ref().is_none_or(|ss| subject_in(ss, &course.subject_code))
                && !contains_id(exclude, &course.course_id);
            ok.then(|| specificity(filter))
        }
    }
}

/// `specific`: pertenencia exacta del string; `range`: valor numérico en
/// `[min, max]` (sin `max` no hay cota superior).
pub fn number_constraint_matches(course: &Course, constraint: &NumberConstraint) -> bool {
    match constraint {
        NumberConstraint::Specific { values } => {
            let number = course.course_number.trim();
            values.iter().any(|v| v.trim() == number)
        }
        NumberConstraint::Range { min, max } => match course.number_value() {
            Some(n) => n >= *min && max.is_none_or(|m| n <= m),
            None => false,
        },
    }
}

fn subject_in(subjects: &[String], subject: &str) -> bool {
    let subject = subject.trim();
    subjects.iter().any(|s| s.trim().eq_ignore_ascii_case(subject))
}

fn contains_id(ids: &[String], course_id: &str) -> bool {
    ids.iter().any(|id| id.trim() == course_id.trim())
}
