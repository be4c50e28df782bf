// Persistencia de planes, catálogo, programas y fulfillments.
//
// El motor recibe un `PlanStore` inyectado: no hay singletons globales de
// acceso a datos. `MemoryStore` sirve para tests y el binario sin base de
// datos; `SqliteStore` persiste en SQLite.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::collections::HashMap;
use crate::algorithm::ProgramFulfillments;
use crate::error::EngineResult;
use crate::models::{Course, Fulfillment, Plan, PlanProgram, PlannedCourse, Program};

pub trait PlanStore: Send + Sync {
    fn plan(&self, plan_id: &str) -> EngineResult<Option<Plan>>;

    /// Cursos planificados del plan, sin orden garantizado.
    fn planned_courses(&self, plan_id: &str) -> EngineResult<Vec<PlannedCourse>>;

    /// Programas adjuntos al plan ordenados por `position` (y luego id).
    fn plan_programs(&self, plan_id: &str) -> EngineResult<Vec<PlanProgram>>;

    fn plan_program(&self, plan_program_id: &str) -> EngineResult<Option<PlanProgram>>;

    fn program(&self, program_id: &str) -> EngineResult<Option<Program>>;

    /// Cursos de catálogo encontrados entre `course_ids`, indexados por id.
    /// Los ids ausentes simplemente no aparecen en el mapa.
    fn courses(&self, course_ids: &[String]) -> EngineResult<HashMap<String, Course>>;

    /// Fulfillments de un plan-program en orden de registro.
    fn fulfillments(&self, plan_program_id: &str) -> EngineResult<Vec<Fulfillment>>;

    /// Reemplaza de forma atómica todos los fulfillments de los programas
    /// del plan por `sets`.
    fn replace_fulfillments(&self, plan_id: &str, sets: &[ProgramFulfillments]) -> EngineResult<()>;

    fn put_course(&self, course: Course) -> EngineResult<()>;
    fn put_program(&self, program: Program) -> EngineResult<()>;
    fn put_plan(&self, plan: Plan) -> EngineResult<()>;
    fn put_planned_course(&self, planned: PlannedCourse) -> EngineResult<()>;
    fn put_plan_program(&self, plan_program: PlanProgram) -> EngineResult<()>;
}

/// Ordena programas adjuntos: `position`, luego id.
pub(crate) fn sort_attachments(list: &mut [PlanProgram]) {
    list.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
}
