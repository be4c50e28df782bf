// Snapshots de progreso. Se recalculan en cada lectura a partir de
// fulfillments + requisitos + cursos planificados; nunca se persisten.

use serde::{Deserialize, Serialize};
use crate::models::{Constraint, CountType, LogicalOperator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl ProgressStatus {
    /// Bandas de estado a partir de créditos cumplidos vs requeridos.
    /// Sin créditos cumplidos siempre es `not_started`, aunque no se exijan.
    pub fn from_credits(fulfilled: f64, required: f64) -> Self {
        if fulfilled <= 0.0 {
            ProgressStatus::NotStarted
        } else if fulfilled >= required {
            ProgressStatus::Completed
        } else {
            ProgressStatus::InProgress
        }
    }

    /// Estado de un requisito. Uno de 0 créditos se completa al recibir un
    /// curso (con `creditsApplied = 0`).
    pub fn for_requirement(fulfilled: f64, required: f64, has_fulfillment: bool) -> Self {
        if required <= 0.0 {
            if has_fulfillment { ProgressStatus::Completed } else { ProgressStatus::NotStarted }
        } else {
            Self::from_credits(fulfilled, required)
        }
    }

    /// Combina estados hijos: `completed` si todos lo están, `in_progress`
    /// si alguno empezó. Sin hijos es `not_started`.
    pub fn combine<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = ProgressStatus>,
    {
        let mut any = false;
        let mut all_done = true;
        let mut started = false;
        for status in statuses {
            any = true;
            all_done &= status == ProgressStatus::Completed;
            started |= status != ProgressStatus::NotStarted;
        }
        if any && all_done {
            ProgressStatus::Completed
        } else if started {
            ProgressStatus::InProgress
        } else {
            ProgressStatus::NotStarted
        }
    }
}

/// `min(100, fulfilled / required * 100)`. Sin créditos exigidos es 100 o 0
/// según el estado.
pub fn completion_percentage(status: ProgressStatus, fulfilled: f64, required: f64) -> f64 {
    if required <= 0.0 {
        return if status == ProgressStatus::Completed { 100.0 } else { 0.0 };
    }
    (fulfilled / required * 100.0).clamp(0.0, 100.0)
}

/// Resultado de una restricción de validación.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintResult {
    pub constraint: Constraint,
    pub satisfied: bool,
    /// Valor observado (cantidad de cursos o créditos) comparado contra el límite.
    pub observed: f64,
}

/// Progreso de una regla; refleja la forma de la `Rule`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum RuleProgress {
    Group {
        operator: LogicalOperator,
        satisfied: bool,
        rules: Vec<RuleProgress>,
    },
    TakeCourses {
        satisfied: bool,
        required_courses: Vec<String>,
        taken_courses: Vec<String>,
    },
    TakeFromList {
        satisfied: bool,
        count_type: CountType,
        required: f64,
        fulfilled: f64,
        available_courses: Vec<String>,
        taken_courses: Vec<String>,
    },
    TakeAnyCourses {
        satisfied: bool,
        credits_required: f64,
        credits_fulfilled: f64,
        matching_courses: Vec<String>,
    },
}

impl RuleProgress {
    pub fn satisfied(&self) -> bool {
        match self {
            RuleProgress::Group { satisfied, .. }
            | RuleProgress::TakeCourses { satisfied, .. }
            | RuleProgress::TakeFromList { satisfied, .. }
            | RuleProgress::TakeAnyCourses { satisfied, .. } => *satisfied,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementProgress {
    /// Id completo `sectionId.requirementId`.
    pub requirement_id: String,
    pub title: String,
    pub credits_required: f64,
    pub credits_fulfilled: f64,
    pub status: ProgressStatus,
    pub percentage: f64,
    pub rule_progress: RuleProgress,
    pub fulfilled_by: Vec<String>,
    pub constraint_results: Vec<ConstraintResult>,
    pub constraints_satisfied: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionProgress {
    pub section_id: String,
    pub title: String,
    pub credits_required: f64,
    pub credits_fulfilled: f64,
    pub status: ProgressStatus,
    pub percentage: f64,
    pub requirements: Vec<RequirementProgress>,
    pub constraint_results: Vec<ConstraintResult>,
    pub constraints_satisfied: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramProgress {
    pub plan_program_id: String,
    pub program_id: String,
    pub program_name: String,
    pub credits_required: f64,
    pub credits_fulfilled: f64,
    pub status: ProgressStatus,
    pub percentage: f64,
    pub sections: Vec<SectionProgress>,
    pub constraint_results: Vec<ConstraintResult>,
    /// AND de todas las restricciones de validación (requisito, sección, programa).
    pub all_constraints_satisfied: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanProgressOverview {
    pub plan_id: String,
    pub overall_status: ProgressStatus,
    pub programs: Vec<ProgramProgress>,
    pub total_planned_credits: f64,
    /// Créditos de cursos con al menos un fulfillment, contando cada curso
    /// planificado una sola vez aunque cuente doble.
    pub distinct_credits_counted: f64,
}
