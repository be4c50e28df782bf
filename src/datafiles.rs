//! Carga de datos semilla (catálogo, programas, planes) desde JSON.
//!
//! Archivos esperados en el directorio de datafiles:
//! - `courses.json`: lista de `Course`
//! - `programs.json`: lista de `Program` con su documento de requisitos
//! - `plans.json`: lista de planes con `programs` (adjuntos) y `plannedCourses`
//!
//! Un archivo ausente se omite; uno malformado es un error.

use std::fs;
use std::path::{Path, PathBuf};
use serde::Deserialize;
use crate::algorithm::schema::validate_program;
use crate::error::EngineResult;
use crate::models::{Course, Plan, PlanProgram, PlannedCourse, Program};
use crate::storage::PlanStore;

pub const COURSES_FILE: &str = "courses.json";
pub const PROGRAMS_FILE: &str = "programs.json";
pub const PLANS_FILE: &str = "plans.json";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedAttachment {
    id: String,
    program_id: String,
    #[serde(default)]
    position: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedPlannedCourse {
    id: String,
    course_id: String,
    semester_number: u32,
    #[serde(default)]
    credits: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedPlan {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    programs: Vec<SeedAttachment>,
    #[serde(default)]
    planned_courses: Vec<SeedPlannedCourse>,
}

/// Conteos de lo cargado, para el log de arranque.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub courses: usize,
    pub programs: usize,
    pub plans: usize,
    pub planned_courses: usize,
}

/// Resuelve el directorio de datafiles: primero el configurado (si existe),
/// luego `src/datafiles` y `datafiles` relativos al directorio actual.
pub fn get_datafiles_dir(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = configured {
        if p.is_dir() {
            return Some(p.to_path_buf());
        }
        tracing::warn!(path = %p.display(), "configured datafiles dir does not exist");
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    [cwd.join("src/datafiles"), cwd.join("datafiles")]
        .into_iter()
        .find(|candidate| candidate.join(PROGRAMS_FILE).is_file())
}

fn read_list<T: for<'de> Deserialize<'de>>(dir: &Path, name: &str) -> EngineResult<Vec<T>> {
    let path = dir.join(name);
    if !path.is_file() {
        tracing::info!(file = %path.display(), "seed file not present, skipping");
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Carga los tres archivos en `store`. Los programas se validan antes de
/// guardarse; un programa inválido aborta la carga.
pub fn load_into(dir: &Path, store: &dyn PlanStore) -> EngineResult<SeedSummary> {
    let courses: Vec<Course> = read_list(dir, COURSES_FILE)?;
    let programs: Vec<Program> = read_list(dir, PROGRAMS_FILE)?;
    let plans: Vec<SeedPlan> = read_list(dir, PLANS_FILE)?;

    for program in &programs {
        validate_program(&program.id, &program.requirements)?;
    }

    let mut summary = SeedSummary {
        courses: courses.len(),
        programs: programs.len(),
        plans: plans.len(),
        planned_courses: 0,
    };

    for course in courses {
        store.put_course(course)?;
    }
    for program in programs {
        store.put_program(program)?;
    }
    for plan in plans {
        for (i, attachment) in plan.programs.into_iter().enumerate() {
            store.put_plan_program(PlanProgram {
                id: attachment.id,
                plan_id: plan.id.clone(),
                program_id: attachment.program_id,
                position: attachment.position.unwrap_or(i as u32),
            })?;
        }
        for planned in plan.planned_courses {
            // sin créditos explícitos se toman los del catálogo
            let credits = match planned.credits {
                Some(c) => c,
                None => store
                    .courses(std::slice::from_ref(&planned.course_id))?
                    .get(planned.course_id.trim())
                    .map(|c| c.credits)
                    .unwrap_or(0.0),
            };
            store.put_planned_course(PlannedCourse {
                id: planned.id,
                plan_id: plan.id.clone(),
                course_id: planned.course_id,
                semester_number: planned.semester_number,
                credits,
            })?;
            summary.planned_courses += 1;
        }
        store.put_plan(Plan { id: plan.id, name: plan.name })?;
    }

    tracing::info!(
        dir = %dir.display(),
        courses = summary.courses,
        programs = summary.programs,
        plans = summary.plans,
        planned_courses = summary.planned_courses,
        "seed data loaded"
    );
    Ok(summary)
}
