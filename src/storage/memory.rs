//! Store en memoria. Un único `RwLock` protege todas las tablas, así el
//! reemplazo de fulfillments de un plan es atómico frente a lectores.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use crate::algorithm::ProgramFulfillments;
use crate::error::{EngineError, EngineResult};
use crate::models::{Course, Fulfillment, Plan, PlanProgram, PlannedCourse, Program};
use crate::storage::{sort_attachments, PlanStore};

#[derive(Debug, Default)]
struct Tables {
    courses: HashMap<String, Course>,
    programs: HashMap<String, Program>,
    plans: HashMap<String, Plan>,
    planned_courses: HashMap<String, PlannedCourse>,
    plan_programs: HashMap<String, PlanProgram>,
    fulfillments: HashMap<String, Vec<Fulfillment>>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn read(&self) -> EngineResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| EngineError::Storage("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> EngineResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| EngineError::Storage("memory store lock poisoned".to_string()))
    }
}

impl PlanStore for MemoryStore {
    fn plan(&self, plan_id: &str) -> EngineResult<Option<Plan>> {
        Ok(self.read()?.plans.get(plan_id).cloned())
    }

    fn planned_courses(&self, plan_id: &str) -> EngineResult<Vec<PlannedCourse>> {
        Ok(self
            .read()?
            .planned_courses
            .values()
            .filter(|p| p.plan_id == plan_id)
            .cloned()
            .collect())
    }

    fn plan_programs(&self, plan_id: &str) -> EngineResult<Vec<PlanProgram>> {
        let mut list: Vec<PlanProgram> = self
            .read()?
            .plan_programs
            .values()
            .filter(|p| p.plan_id == plan_id)
            .cloned()
            .collect();
        sort_attachments(&mut list);
        Ok(list)
    }

    fn plan_program(&self, plan_program_id: &str) -> EngineResult<Option<PlanProgram>> {
        Ok(self.read()?.plan_programs.get(plan_program_id).cloned())
    }

    fn program(&self, program_id: &str) -> EngineResult<Option<Program>> {
        Ok(self.read()?.programs.get(program_id).cloned())
    }

    fn courses(&self, course_ids: &[String]) -> EngineResult<HashMap<String, Course>> {
        let tables = self.read()?;
        Ok(course_ids
            .iter()
            .filter_map(|id| tables.courses.get(id.trim()))
            .map(|c| (c.course_id.trim().to_string(), c.clone()))
            .collect())
    }

    fn fulfillments(&self, plan_program_id: &str) -> EngineResult<Vec<Fulfillment>> {
        Ok(self
            .read()?
            .fulfillments
            .get(plan_program_id)
            .cloned()
            .unwrap_or_default())
    }

    fn replace_fulfillments(&self, plan_id: &str, sets: &[ProgramFulfillments]) -> EngineResult<()> {
        let mut tables = self.write()?;
        let attached: Vec<String> = tables
            .plan_programs
            .values()
            .filter(|p| p.plan_id == plan_id)
            .map(|p| p.id.clone())
            .collect();
        for set in sets {
            if !attached.contains(&set.plan_program_id) {
                return Err(EngineError::not_found("plan program", set.plan_program_id.clone()));
            }
        }
        for id in &attached {
            tables.fulfillments.remove(id);
        }
        for set in sets {
            tables
                .fulfillments
                .insert(set.plan_program_id.clone(), set.fulfillments.clone());
        }
        Ok(())
    }

    fn put_course(&self, course: Course) -> EngineResult<()> {
        self.write()?.courses.insert(course.course_id.trim().to_string(), course);
        Ok(())
    }

    fn put_program(&self, program: Program) -> EngineResult<()> {
        self.write()?.programs.insert(program.id.clone(), program);
        Ok(())
    }

    fn put_plan(&self, plan: Plan) -> EngineResult<()> {
        self.write()?.plans.insert(plan.id.clone(), plan);
        Ok(())
    }

    fn put_planned_course(&self, planned: PlannedCourse) -> EngineResult<()> {
        self.write()?.planned_courses.insert(planned.id.clone(), planned);
        Ok(())
    }

    fn put_plan_program(&self, plan_program: PlanProgram) -> EngineResult<()> {
        self.write()?.plan_programs.insert(plan_program.id.clone(), plan_program);
        Ok(())
    }
}
