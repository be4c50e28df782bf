// assign.rs - Fulfillment Assigner: reparte los cursos planificados de un
// plan entre los requisitos de todos sus programas.
//
// Pasada única, determinista y greedy:
//   1. validar cada programa (esquema + integridad) y calcular etapas de secciones
//   2. aplanar requisitos con identidad estable (programa, sección, requisito)
//      y un índice de declaración (orden de programa, sección, requisito)
//   3. construir la tabla de doble conteo
//   4. recorrer cursos por (semestre, courseId, id); para cada uno elegir el
//      requisito elegible de mayor especificidad (empate -> declaración)
//   5. registrar créditos con tope; aplicar doble conteo si corresponde
//
// No guarda estado entre ejecuciones: la salida es función pura de la entrada.

use std::collections::{HashMap, HashSet};
use serde::Serialize;
use crate::algorithm::constraints::{section_gate_satisfied, DoubleCountTable, RequirementKey};
use crate::algorithm::rules::evaluate_rule;
use crate::algorithm::schema::{section_stages, validate_program};
use crate::error::{EngineError, EngineResult};
use crate::models::{requirement_full_id, Course, Fulfillment, PlannedCourse, ProgramRequirements, Requirement};

const CREDIT_EPSILON: f64 = 1e-9;

/// Programa adjunto a un plan, en orden de adjunción.
#[derive(Debug, Clone, Copy)]
pub struct AttachedProgram<'a> {
    pub plan_program_id: &'a str,
    pub program_id: &'a str,
    pub requirements: &'a ProgramRequirements,
}

#[derive(Debug, Clone, Copy)]
pub struct AssignmentInput<'a> {
    pub planned_courses: &'a [PlannedCourse],
    /// Catálogo indexado por `courseId`.
    pub courses: &'a HashMap<String, Course>,
    pub programs: &'a [AttachedProgram<'a>],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramFulfillments {
    pub plan_program_id: String,
    pub fulfillments: Vec<Fulfillment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentOutcome {
    /// Un conjunto por programa adjunto, en orden de adjunción.
    pub programs: Vec<ProgramFulfillments>,
    /// Cursos planificados que no cumplen ningún requisito (no es error).
    pub unassigned: Vec<String>,
}

impl AssignmentOutcome {
    pub fn fulfillment_count(&self) -> usize {
        self.programs.iter().map(|p| p.fulfillments.len()).sum()
    }
}

struct Slot<'a> {
    key: RequirementKey,
    section_id: &'a str,
    requirement: &'a Requirement,
    declaration: usize,
    stage: usize,
    applied: f64,
    courses: usize,
}

impl Slot<'_> {
    fn room(&self) -> f64 {
        self.requirement.credits_required - self.applied
    }

    /// Un requisito de 0 créditos acepta un curso (con 0 créditos aplicados);
    /// el resto acepta mientras quede espacio.
    fn is_full(&self) -> bool {
        if self.requirement.credits_required <= 0.0 {
            self.courses > 0
        } else {
            self.room() <= CREDIT_EPSILON
        }
    }
}

/// Ejecuta la asignación completa para un plan.
pub fn assign_fulfillments(input: &AssignmentInput<'_>) -> EngineResult<AssignmentOutcome> {
    let mut slots: Vec<Slot<'_>> = Vec::new();
    for (program_index, program) in input.programs.iter().enumerate() {
        validate_program(program.program_id, program.requirements)?;
        let stages = section_stages(program.program_id, program.requirements)?;
        for section in &program.requirements.sections {
            let stage = stages.get(&section.id).copied().unwrap_or(0);
            for requirement in &section.requirements {
                slots.push(Slot {
                    key: RequirementKey {
                        program_index,
                        requirement_id: requirement_full_id(&section.id, &requirement.id),
                    },
                    section_id: section.id.as_str(),
                    requirement,
                    declaration: slots.len(),
                    stage,
                    applied: 0.0,
                    courses: 0,
                });
            }
        }
    }
    let slot_index: HashMap<RequirementKey, usize> =
        slots.iter().enumerate().map(|(i, s)| (s.key.clone(), i)).collect();

    let table = DoubleCountTable::build(input.programs.iter().map(|p| p.requirements));

    let mut ordered: Vec<&PlannedCourse> = input.planned_courses.iter().collect();
    ordered.sort_by(|a, b| {
        a.semester_number
            .cmp(&b.semester_number)
            .then_with(|| a.course_id.cmp(&b.course_id))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut buckets: Vec<Vec<Fulfillment>> = vec![Vec::new(); input.programs.len()];
    let mut unassigned: Vec<String> = Vec::new();

    for planned in ordered {
        let course = input
            .courses
            .get(planned.course_id.trim())
            .ok_or_else(|| EngineError::not_found("course", planned.course_id.clone()))?;

        // secciones (por programa) donde este curso planificado ya tiene fulfillment
        let mut held: HashMap<usize, HashSet<String>> = HashMap::new();

        let mut winner: Option<(u32, usize)> = None;
        for (i, slot) in slots.iter().enumerate() {
            if slot.is_full() || !gate_open(slot, &held) {
                continue;
            }
            let result = evaluate_rule(&slot.requirement.rule, course);
            if !result.matches {
                continue;
            }
            // mayor especificidad gana; en empate, el declarado antes (índice menor)
            let better = match winner {
                None => true,
                Some((best, _)) => result.specificity > best,
            };
            if better {
                winner = Some((result.specificity, i));
            }
        }

        let Some((specificity, won)) = winner else {
            tracing::warn!(planned_course = %planned.id, course = %course.course_id, "no requirement matched");
            unassigned.push(planned.id.clone());
            continue;
        };

        record(&mut slots[won], planned, &mut buckets, &mut held);
        tracing::debug!(
            planned_course = %planned.id,
            course = %course.course_id,
            requirement = %slots[won].key.requirement_id,
            specificity,
            "assigned"
        );

        let Some(allowed) = table.allowed(&course.course_id) else { continue };
        if !allowed.contains(&slots[won].key) {
            continue;
        }

        let mut extras: Vec<usize> = allowed
            .iter()
            .filter(|k| **k != slots[won].key)
            .filter_map(|k| slot_index.get(k).copied())
            .collect();
        // secciones base antes que las secciones con compuerta
        extras.sort_by_key(|&i| (slots[i].stage, slots[i].declaration));
        extras.dedup();

        for i in extras {
            let accepted = !slots[i].is_full()
                && gate_open(&slots[i], &held)
                && evaluate_rule(&slots[i].requirement.rule, course).matches;
            if !accepted {
                tracing::debug!(
                    planned_course = %planned.id,
                    requirement = %slots[i].key.requirement_id,
                    "double count rejected"
                );
                continue;
            }
            record(&mut slots[i], planned, &mut buckets, &mut held);
            tracing::debug!(
                planned_course = %planned.id,
                requirement = %slots[i].key.requirement_id,
                "double counted"
            );
        }
    }

    let outcome = AssignmentOutcome {
        programs: input
            .programs
            .iter()
            .zip(buckets)
            .map(|(p, fulfillments)| ProgramFulfillments {
                plan_program_id: p.plan_program_id.to_string(),
                fulfillments,
            })
            .collect(),
        unassigned,
    };
    tracing::info!(
        programs = input.programs.len(),
        planned_courses = input.planned_courses.len(),
        fulfillments = outcome.fulfillment_count(),
        unassigned = outcome.unassigned.len(),
        double_count_entries = table.len(),
        "assignment pass finished"
    );
    Ok(outcome)
}

fn gate_open(slot: &Slot<'_>, held: &HashMap<usize, HashSet<String>>) -> bool {
    match slot.requirement.section_gate() {
        None => true,
        Some((allowed, operator)) => match held.get(&slot.key.program_index) {
            Some(sections) => section_gate_satisfied(allowed, operator, sections),
            None => false,
        },
    }
}

fn record(
    slot: &mut Slot<'_>,
    planned: &PlannedCourse,
    buckets: &mut [Vec<Fulfillment>],
    held: &mut HashMap<usize, HashSet<String>>,
) {
    let credits = planned.credits.max(0.0).min(slot.room().max(0.0));
    slot.applied += credits;
    slot.courses += 1;
    buckets[slot.key.program_index].push(Fulfillment {
        planned_course_id: planned.id.clone(),
        requirement_id: slot.key.requirement_id.clone(),
        credits_applied: credits,
    });
    held.entry(slot.key.program_index)
        .or_default()
        .insert(slot.section_id.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Filter, Rule, Section};
    use std::collections::BTreeMap;

    fn course(id: &str) -> Course {
        let (subject, number) = id.split_once(' ').unwrap();
        Course {
            course_id: id.to_string(),
            subject_code: subject.to_string(),
            course_number: number.to_string(),
            title: String::new(),
            credits: 3.0,
            attributes: BTreeMap::new(),
            requirements: serde_json::Value::Null,
        }
    }

    fn planned(id: &str, course_id: &str, semester: u32, credits: f64) -> PlannedCourse {
        PlannedCourse {
            id: id.to_string(),
            plan_id: "plan".to_string(),
            course_id: course_id.to_string(),
            semester_number: semester,
            credits,
        }
    }

    fn req(id: &str, credits: f64, rule: Rule) -> Requirement {
        Requirement {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            credits_required: credits,
            rule,
            constraints: Vec::new(),
        }
    }

    fn cs_any() -> Rule {
        Rule::TakeAnyCourses {
            credits: 6.0,
            filter: Filter::SubjectNumber { subjects: vec!["CS".to_string()], numbers: None, exclude: vec![] },
        }
    }

    fn catalog(ids: &[&str]) -> HashMap<String, Course> {
        ids.iter().map(|id| (id.to_string(), course(id))).collect()
    }

    #[test]
    fn test_overflow_goes_to_next_requirement_with_room() {
        let doc = ProgramRequirements {
            sections: vec![Section {
                id: "electives".to_string(),
                title: String::new(),
                credits_required: 6.0,
                requirements: vec![req("a", 3.0, cs_any()), req("b", 3.0, cs_any())],
                constraints: vec![],
            }],
            constraints: vec![],
        };
        let courses = catalog(&["CS 2201", "CS 3251"]);
        let planned = vec![planned("p2", "CS 3251", 2, 3.0), planned("p1", "CS 2201", 1, 3.0)];
        let programs = [AttachedProgram { plan_program_id: "pp1", program_id: "cs", requirements: &doc }];
        let out = assign_fulfillments(&AssignmentInput { planned_courses: &planned, courses: &courses, programs: &programs }).unwrap();

        let f = &out.programs[0].fulfillments;
        assert_eq!(f.len(), 2);
        assert_eq!((f[0].planned_course_id.as_str(), f[0].requirement_id.as_str()), ("p1", "electives.a"));
        assert_eq!((f[1].planned_course_id.as_str(), f[1].requirement_id.as_str()), ("p2", "electives.b"));
    }

    #[test]
    fn test_partial_room_caps_credits() {
        let doc = ProgramRequirements {
            sections: vec![Section {
                id: "s".to_string(),
                title: String::new(),
                credits_required: 4.0,
                requirements: vec![req("r", 4.0, cs_any())],
                constraints: vec![],
            }],
            constraints: vec![],
        };
        let courses = catalog(&["CS 2201", "CS 3251"]);
        let planned = vec![planned("p1", "CS 2201", 1, 3.0), planned("p2", "CS 3251", 2, 3.0)];
        let programs = [AttachedProgram { plan_program_id: "pp1", program_id: "cs", requirements: &doc }];
        let out = assign_fulfillments(&AssignmentInput { planned_courses: &planned, courses: &courses, programs: &programs }).unwrap();
        let credits: Vec<f64> = out.programs[0].fulfillments.iter().map(|f| f.credits_applied).collect();
        assert_eq!(credits, vec![3.0, 1.0]);
    }

    #[test]
    fn test_missing_catalog_course_is_not_found() {
        let doc = ProgramRequirements::default();
        let courses = catalog(&[]);
        let planned = vec![planned("p1", "CS 9999", 1, 3.0)];
        let programs = [AttachedProgram { plan_program_id: "pp1", program_id: "cs", requirements: &doc }];
        let err = assign_fulfillments(&AssignmentInput { planned_courses: &planned, courses: &courses, programs: &programs }).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { kind: "course", .. }));
    }

    #[test]
    fn test_unmatched_course_is_reported_not_error() {
        let doc = ProgramRequirements {
            sections: vec![Section {
                id: "core".to_string(),
                title: String::new(),
                credits_required: 3.0,
                requirements: vec![req("r", 3.0, Rule::TakeCourses { courses: vec!["CS 1101".to_string()] })],
                constraints: vec![],
            }],
            constraints: vec![],
        };
        let courses = catalog(&["HIST 1000"]);
        let planned = vec![planned("p1", "HIST 1000", 1, 3.0)];
        let programs = [AttachedProgram { plan_program_id: "pp1", program_id: "cs", requirements: &doc }];
        let out = assign_fulfillments(&AssignmentInput { planned_courses: &planned, courses: &courses, programs: &programs }).unwrap();
        assert_eq!(out.fulfillment_count(), 0);
        assert_eq!(out.unassigned, vec!["p1".to_string()]);
    }
}
