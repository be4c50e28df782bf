// Módulo de alto nivel del motor de requisitos.
// Declarar submódulos (archivos en la carpeta `src/algorithm`)
pub mod filters;
pub mod rules;
pub mod schema;
pub mod constraints;
pub mod assign;
pub mod progress;

// Reexportar sólo la API pública que se expone desde aquí
pub use assign::{assign_fulfillments, AssignmentInput, AssignmentOutcome, AttachedProgram, ProgramFulfillments};
pub use rules::{evaluate_rule, MatchResult};
pub use schema::validate_filter_schema;

use crate::models::{Course, Filter};

/// True si el curso satisface el filtro.
pub fn evaluate_course_filter(course: &Course, filter: &Filter) -> bool {
    filters::matches(course, filter)
}

/// Especificidad estática del filtro (0..=100).
pub fn calculate_filter_specificity(filter: &Filter) -> u32 {
    filters::specificity(filter)
}
