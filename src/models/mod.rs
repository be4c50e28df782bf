// Estructuras de datos principales: catálogo, planes y fulfillments.
//
// Los documentos de requisitos (reglas, filtros, restricciones) viven en
// `requirements`; los snapshots de progreso derivados en `progress`.

pub mod progress;
pub mod requirements;

pub use progress::*;
pub use requirements::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Curso del catálogo tal como lo entrega el pipeline de adquisición.
///
/// `attributes` agrupa los atributos ya parseados por tipo (p. ej. `axle`,
/// `core`). `requirements` es la expresión de prerrequisitos; se transporta
/// pero el motor no la interpreta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub course_id: String,
    pub subject_code: String,
    pub course_number: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub credits: f64,
    #[serde(default)]
    pub attributes: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub requirements: serde_json::Value,
}

impl Course {
    /// Valor numérico del número de curso: la secuencia inicial de dígitos
    /// ("3016W" -> 3016). `None` si el número no empieza con un dígito.
    pub fn number_value(&self) -> Option<u32> {
        leading_number(&self.course_number)
    }

    /// True si el curso lleva `attribute`, opcionalmente sólo dentro del
    /// grupo `attribute_type`.
    pub fn has_attribute(&self, attribute: &str, attribute_type: Option<&str>) -> bool {
        match attribute_type {
            Some(kind) => self
                .attributes
                .get(kind)
                .is_some_and(|values| values.iter().any(|v| v == attribute)),
            None => self
                .attributes
                .values()
                .any(|values| values.iter().any(|v| v == attribute)),
        }
    }
}

/// Parsea los dígitos iniciales de un número de curso.
pub fn leading_number(number: &str) -> Option<u32> {
    let digits: String = number
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u32>().ok()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Curso planificado dentro de un plan (una fila por semestre/curso).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedCourse {
    pub id: String,
    pub plan_id: String,
    pub course_id: String,
    pub semester_number: u32,
    pub credits: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramKind {
    Major,
    Minor,
    Core,
    #[default]
    Other,
}

/// Programa (major, minor, core) con su árbol de requisitos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: ProgramKind,
    pub requirements: ProgramRequirements,
}

/// Asociación plan <-> programa. `position` fija el orden de evaluación
/// entre programas del mismo plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanProgram {
    pub id: String,
    pub plan_id: String,
    pub program_id: String,
    #[serde(default)]
    pub position: u32,
}

/// Registro de asignación curso planificado -> requisito.
/// `requirement_id` usa la forma `sectionId.requirementId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fulfillment {
    pub planned_course_id: String,
    pub requirement_id: String,
    pub credits_applied: f64,
}
