// Helpers compartidos por los tests de integración.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use planpath::models::{Course, Plan, PlanProgram, PlannedCourse, Program, ProgramKind};
use planpath::storage::{MemoryStore, PlanStore};
use planpath::Engine;

pub const PLAN_ID: &str = "plan-1";

pub fn course(id: &str, credits: f64) -> Course {
    course_with_attrs(id, credits, &[])
}

pub fn course_with_attrs(id: &str, credits: f64, attrs: &[(&str, &str)]) -> Course {
    let (subject, number) = id.split_once(' ').expect("id con formato 'SUBJ 1234'");
    let mut attributes: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (kind, value) in attrs {
        attributes.entry(kind.to_string()).or_default().push(value.to_string());
    }
    Course {
        course_id: id.to_string(),
        subject_code: subject.to_string(),
        course_number: number.to_string(),
        title: String::new(),
        credits,
        attributes,
        requirements: serde_json::Value::Null,
    }
}

/// Programa a partir del JSON de su documento de requisitos.
pub fn program(id: &str, requirements: serde_json::Value) -> Program {
    Program {
        id: id.to_string(),
        name: id.to_string(),
        kind: ProgramKind::Major,
        requirements: serde_json::from_value(requirements).expect("documento de requisitos válido"),
    }
}

pub fn plan_program_id(program_id: &str) -> String {
    format!("pp-{}", program_id)
}

/// (plannedCourseId, courseId, semestre, créditos)
pub type PlannedRow<'a> = (&'a str, &'a str, u32, f64);

/// Carga un plan completo en `store`: catálogo, programas (adjuntos en el
/// orden dado) y cursos planificados.
pub fn seed(store: &dyn PlanStore, programs: &[Program], courses: &[Course], planned: &[PlannedRow<'_>]) {
    store.put_plan(Plan { id: PLAN_ID.to_string(), name: "Plan".to_string() }).unwrap();
    for c in courses {
        store.put_course(c.clone()).unwrap();
    }
    for (i, p) in programs.iter().enumerate() {
        store.put_program(p.clone()).unwrap();
        store
            .put_plan_program(PlanProgram {
                id: plan_program_id(&p.id),
                plan_id: PLAN_ID.to_string(),
                program_id: p.id.clone(),
                position: i as u32,
            })
            .unwrap();
    }
    for (id, course_id, semester, credits) in planned {
        store
            .put_planned_course(PlannedCourse {
                id: id.to_string(),
                plan_id: PLAN_ID.to_string(),
                course_id: course_id.to_string(),
                semester_number: *semester,
                credits: *credits,
            })
            .unwrap();
    }
}

pub fn memory_engine(programs: &[Program], courses: &[Course], planned: &[PlannedRow<'_>]) -> Engine {
    let store = Arc::new(MemoryStore::new());
    seed(store.as_ref(), programs, courses, planned);
    Engine::new(store)
}

/// Core: take_courses CS 1101 (3 cr). Electives: 6 cr de cualquier CS.
pub fn core_and_electives(extra_constraints: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "sections": [
            {"id": "core", "title": "Core", "creditsRequired": 3, "requirements": [
                {"id": "req1", "creditsRequired": 3, "rule": {"type": "take_courses", "courses": ["CS 1101"]}}
            ]},
            {"id": "electives", "title": "Electives", "creditsRequired": 6, "requirements": [
                {"id": "req1", "creditsRequired": 6, "rule": {"type": "take_any_courses", "credits": 6,
                    "filter": {"type": "subject_number", "subjects": ["CS"]}}}
            ]}
        ],
        "constraints": extra_constraints
    })
}
