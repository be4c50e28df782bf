//! Operaciones de alto nivel sobre un `PlanStore`:
//! auto-asignación de fulfillments, progreso de un programa y overview del plan.
//!
//! Los algoritmos en `algorithm` son puros; aquí se leen los datos, se
//! serializan las escrituras por plan y se paraleliza el progreso.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use crate::algorithm::progress;
use crate::algorithm::{assign_fulfillments, AssignmentInput, AssignmentOutcome, AttachedProgram};
use crate::error::{EngineError, EngineResult};
use crate::models::{Course, Fulfillment, PlanProgram, PlanProgressOverview, PlannedCourse, Program, ProgramProgress};
use crate::storage::PlanStore;

/// Un lock por plan: a lo más una auto-asignación (leer, asignar,
/// reemplazar) corre a la vez para un mismo plan.
///
/// La tabla guarda `Weak`: un lock vive mientras alguna ejecución lo tenga,
/// y las entradas muertas se podan en cada `for_plan`.
#[derive(Debug, Default)]
pub struct PlanLocks {
    locks: Mutex<HashMap<String, Weak<Mutex<()>>>>,
}

impl PlanLocks {
    pub fn for_plan(&self, plan_id: &str) -> EngineResult<Arc<Mutex<()>>> {
        let mut guard = self
            .locks
            .lock()
            .map_err(|_| EngineError::Storage("plan lock table poisoned".to_string()))?;
        guard.retain(|_, weak| weak.strong_count() > 0);
        if let Some(lock) = guard.get(plan_id).and_then(Weak::upgrade) {
            return Ok(lock);
        }
        let lock = Arc::new(Mutex::new(()));
        guard.insert(plan_id.to_string(), Arc::downgrade(&lock));
        Ok(lock)
    }

    /// Planes con un lock vivo.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .map(|guard| guard.values().filter(|weak| weak.strong_count() > 0).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn PlanStore>,
    locks: Arc<PlanLocks>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").field("locks", &self.locks).finish_non_exhaustive()
    }
}

/// Datos de un programa adjunto ya cargados del store.
struct LoadedProgram {
    attachment: PlanProgram,
    program: Program,
}

impl Engine {
    pub fn new(store: Arc<dyn PlanStore>) -> Self {
        Engine { store, locks: Arc::new(PlanLocks::default()) }
    }

    pub fn store(&self) -> &dyn PlanStore {
        self.store.as_ref()
    }

    fn load_program(&self, attachment: PlanProgram) -> EngineResult<LoadedProgram> {
        let program = self
            .store
            .program(&attachment.program_id)?
            .ok_or_else(|| EngineError::not_found("program", attachment.program_id.clone()))?;
        Ok(LoadedProgram { attachment, program })
    }

    fn load_courses(&self, planned: &[PlannedCourse]) -> EngineResult<HashMap<String, Course>> {
        let mut ids: Vec<String> = planned.iter().map(|p| p.course_id.trim().to_string()).collect();
        ids.sort();
        ids.dedup();
        self.store.courses(&ids)
    }

    /// Recalcula y reemplaza todos los fulfillments del plan.
    pub fn auto_assign_fulfillments(&self, plan_id: &str) -> EngineResult<AssignmentOutcome> {
        if self.store.plan(plan_id)?.is_none() {
            return Err(EngineError::not_found("plan", plan_id));
        }
        let lock = self.locks.for_plan(plan_id)?;
        let _guard = lock
            .lock()
            .map_err(|_| EngineError::Storage(format!("lock for plan '{}' poisoned", plan_id)))?;
        let planned = self.store.planned_courses(plan_id)?;
        let loaded = self
            .store
            .plan_programs(plan_id)?
            .into_iter()
            .map(|a| self.load_program(a))
            .collect::<EngineResult<Vec<_>>>()?;
        let courses = self.load_courses(&planned)?;

        let attached: Vec<AttachedProgram<'_>> = loaded
            .iter()
            .map(|l| AttachedProgram {
                plan_program_id: &l.attachment.id,
                program_id: &l.program.id,
                requirements: &l.program.requirements,
            })
            .collect();
        let outcome = assign_fulfillments(&AssignmentInput {
            planned_courses: &planned,
            courses: &courses,
            programs: &attached,
        })?;

        self.store.replace_fulfillments(plan_id, &outcome.programs)?;
        tracing::info!(
            plan = plan_id,
            fulfillments = outcome.fulfillment_count(),
            unassigned = outcome.unassigned.len(),
            "fulfillments replaced"
        );
        Ok(outcome)
    }

    pub fn calculate_program_progress(&self, plan_program_id: &str) -> EngineResult<ProgramProgress> {
        let attachment = self
            .store
            .plan_program(plan_program_id)?
            .ok_or_else(|| EngineError::not_found("plan program", plan_program_id))?;
        let loaded = self.load_program(attachment)?;
        let planned = self.store.planned_courses(&loaded.attachment.plan_id)?;
        let courses = self.load_courses(&planned)?;
        let fulfillments = self.store.fulfillments(&loaded.attachment.id)?;
        progress::calculate_program_progress(&loaded.attachment.id, &loaded.program, &fulfillments, &planned, &courses)
    }

    /// Overview del plan. El progreso de cada programa se calcula en su
    /// propio hilo; el orden de salida es el de adjunción.
    pub fn aggregate_plan_progress(&self, plan_id: &str) -> EngineResult<PlanProgressOverview> {
        if self.store.plan(plan_id)?.is_none() {
            return Err(EngineError::not_found("plan", plan_id));
        }
        let planned = self.store.planned_courses(plan_id)?;
        let courses = self.load_courses(&planned)?;
        let mut loaded: Vec<(LoadedProgram, Vec<Fulfillment>)> = Vec::new();
        for attachment in self.store.plan_programs(plan_id)? {
            let fulfillments = self.store.fulfillments(&attachment.id)?;
            loaded.push((self.load_program(attachment)?, fulfillments));
        }

        let results: Vec<EngineResult<ProgramProgress>> = thread::scope(|scope| {
            let handles: Vec<_> = loaded
                .iter()
                .map(|(l, fulfillments)| {
                    let planned = &planned;
                    let courses = &courses;
                    scope.spawn(move || {
                        progress::calculate_program_progress(&l.attachment.id, &l.program, fulfillments, planned, courses)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| {
                    h.join()
                        .unwrap_or_else(|_| Err(EngineError::Storage("progress worker panicked".to_string())))
                })
                .collect()
        });
        let programs = results.into_iter().collect::<EngineResult<Vec<_>>>()?;

        let all_fulfillments: Vec<Fulfillment> = loaded.into_iter().flat_map(|(_, f)| f).collect();
        let overview = progress::aggregate_plan_progress(plan_id, programs, &planned, &all_fulfillments);
        tracing::info!(
            plan = plan_id,
            status = ?overview.overall_status,
            programs = overview.programs.len(),
            "plan progress aggregated"
        );
        Ok(overview)
    }
}
