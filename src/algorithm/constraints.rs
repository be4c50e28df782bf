//! Constraint Validator.
//!
//! Dos puntos de uso:
//! - antes de asignar (enforcement): tabla de doble conteo y compuerta de
//!   secciones (`require_course_from_sections`), consultadas por el asignador
//! - después de asignar (validation): conteos, sumas de créditos y rangos de
//!   número sobre los fulfillments en alcance; nunca lanzan error, cada
//!   restricción produce un `ConstraintResult`

use std::collections::{BTreeMap, HashSet};
use crate::algorithm::filters;
use crate::models::{
    Constraint, ConstraintResult, Course, LogicalOperator, ProgramRequirements, RangeOperator,
};

/// Identidad estable de un requisito dentro de una ejecución: índice del
/// programa (orden de adjunción) + id completo `sectionId.requirementId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequirementKey {
    pub program_index: usize,
    pub requirement_id: String,
}

/// Tabla `{courseId -> requisitos permitidos}` construida una vez por
/// ejecución a partir de todas las `allow_double_count` de los programas.
#[derive(Debug, Clone, Default)]
pub struct DoubleCountTable {
    entries: BTreeMap<String, Vec<RequirementKey>>,
}

impl DoubleCountTable {
    /// Los ids de requisito se resuelven dentro del programa que declara la
    /// restricción. `programs` debe venir en orden de adjunción.
    pub fn build<'a>(programs: impl IntoIterator<Item = &'a ProgramRequirements>) -> Self {
        let mut entries: BTreeMap<String, Vec<RequirementKey>> = BTreeMap::new();
        for (program_index, doc) in programs.into_iter().enumerate() {
            for constraint in doc.all_constraints() {
                if let Constraint::AllowDoubleCount { course_id, requirement_ids } = constraint {
                    let slot = entries.entry(course_id.trim().to_string()).or_default();
                    for id in requirement_ids {
                        let key = RequirementKey { program_index, requirement_id: id.trim().to_string() };
                        if !slot.contains(&key) {
                            slot.push(key);
                        }
                    }
                }
            }
        }
        DoubleCountTable { entries }
    }

    pub fn allowed(&self, course_id: &str) -> Option<&[RequirementKey]> {
        self.entries.get(course_id.trim()).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compuerta de secciones: `AND` exige fulfillments en todas las secciones
/// permitidas, `OR` en al menos una. `held_sections` son las secciones donde
/// el curso planificado ya tiene un fulfillment registrado.
pub fn section_gate_satisfied(allowed: &[String], operator: LogicalOperator, held_sections: &HashSet<String>) -> bool {
    match operator {
        LogicalOperator::And => allowed.iter().all(|s| held_sections.contains(s.trim())),
        LogicalOperator::Or => allowed.iter().any(|s| held_sections.contains(s.trim())),
    }
}

/// Un fulfillment en alcance de validación, ya unido con su curso de catálogo.
#[derive(Debug, Clone, Copy)]
pub struct FulfilledCourse<'a> {
    pub planned_course_id: &'a str,
    pub course: &'a Course,
    pub credits_applied: f64,
}

/// Evalúa una restricción de validación. Las de enforcement no producen
/// resultado (`None`).
pub fn check_constraint(constraint: &Constraint, fulfilled: &[FulfilledCourse<'_>]) -> Option<ConstraintResult> {
    let (satisfied, observed) = match constraint {
        Constraint::AllowDoubleCount { .. } | Constraint::RequireCourseFromSections { .. } => return None,
        Constraint::MinCourseCount { count, filter } => {
            let n = distinct_count(fulfilled, |c| filters::matches(c, filter));
            (n >= *count as usize, n as f64)
        }
        Constraint::MaxCourseCount { count, filter } => {
            let n = distinct_count(fulfilled, |c| filters::matches(c, filter));
            (n <= *count as usize, n as f64)
        }
        Constraint::MinCreditsFromCourses { min_credits, course_ids } => {
            let sum = credits_from(fulfilled, course_ids);
            (sum >= *min_credits, sum)
        }
        Constraint::MaxCreditsFromCourses { max_credits, course_ids } => {
            let sum = credits_from(fulfilled, course_ids);
            (sum <= *max_credits, sum)
        }
        Constraint::CourseNumberRange { subject_code, operator, min_number, max_number, min_count } => {
            let n = distinct_count(fulfilled, |c| {
                if !c.subject_code.trim().eq_ignore_ascii_case(subject_code.trim()) {
                    return false;
                }
                let Some(number) = c.number_value() else { return false };
                match operator {
                    RangeOperator::Above => number > *min_number,
                    RangeOperator::Below => number < *min_number,
                    RangeOperator::Between => {
                        number >= *min_number && max_number.is_none_or(|max| number <= max)
                    }
                }
            });
            (n >= *min_count as usize, n as f64)
        }
    };

    if !satisfied {
        tracing::debug!(?constraint, observed, "validation constraint not satisfied");
    }
    Some(ConstraintResult { constraint: constraint.clone(), satisfied, observed })
}

pub fn check_constraints(constraints: &[Constraint], fulfilled: &[FulfilledCourse<'_>]) -> Vec<ConstraintResult> {
    constraints.iter().filter_map(|c| check_constraint(c, fulfilled)).collect()
}

pub fn all_satisfied(results: &[ConstraintResult]) -> bool {
    results.iter().all(|r| r.satisfied)
}

/// Cantidad de cursos planificados distintos cuyo curso cumple `pred`.
fn distinct_count<F>(fulfilled: &[FulfilledCourse<'_>], pred: F) -> usize
where
    F: Fn(&Course) -> bool,
{
    fulfilled
        .iter()
        .filter(|f| pred(f.course))
        .map(|f| f.planned_course_id)
        .collect::<HashSet<_>>()
        .len()
}

fn credits_from(fulfilled: &[FulfilledCourse<'_>], course_ids: &[String]) -> f64 {
    fulfilled
        .iter()
        .filter(|f| course_ids.iter().any(|id| id.trim() == f.course.course_id.trim()))
        .map(|f| f.credits_applied)
        .sum()
}
