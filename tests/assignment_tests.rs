mod common;

use std::collections::HashMap;
use common::*;
use planpath::EngineError;
use serde_json::json;

fn many_cs_courses() -> (Vec<planpath::models::Course>, Vec<(String, String)>) {
    let ids = ["CS 2201", "CS 3251", "CS 3270", "CS 3281"];
    let courses = ids.iter().map(|id| course(id, 3.0)).collect();
    let planned = ids
        .iter()
        .enumerate()
        .map(|(i, id)| (format!("pc{}", i + 1), id.to_string()))
        .collect();
    (courses, planned)
}

#[test]
fn test_auto_assign_is_idempotent() {
    let constraints = json!([
        {"type": "allow_double_count", "courseId": "CS 1101", "requirementIds": ["core.req1", "electives.req1"]}
    ]);
    let engine = memory_engine(
        &[program("cs", core_and_electives(constraints))],
        &[course("CS 1101", 3.0), course("CS 2201", 3.0), course("HIST 1000", 3.0)],
        &[("pc1", "CS 1101", 1, 3.0), ("pc2", "CS 2201", 2, 3.0), ("pc3", "HIST 1000", 2, 3.0)],
    );

    let first = engine.auto_assign_fulfillments(PLAN_ID).unwrap();
    let stored_first = engine.store().fulfillments(&plan_program_id("cs")).unwrap();
    let second = engine.auto_assign_fulfillments(PLAN_ID).unwrap();
    let stored_second = engine.store().fulfillments(&plan_program_id("cs")).unwrap();

    assert_eq!(first, second);
    assert_eq!(stored_first, stored_second);
    assert_eq!(first.unassigned, vec!["pc3".to_string()]);
}

#[test]
fn test_requirement_capacity_is_never_exceeded() {
    let (courses, planned) = many_cs_courses();
    let rows: Vec<PlannedRow<'_>> = planned.iter().map(|(id, c)| (id.as_str(), c.as_str(), 1, 3.0)).collect();
    let engine = memory_engine(&[program("cs", core_and_electives(json!([])))], &courses, &rows);

    let outcome = engine.auto_assign_fulfillments(PLAN_ID).unwrap();
    let mut applied: HashMap<&str, f64> = HashMap::new();
    for f in &outcome.programs[0].fulfillments {
        *applied.entry(f.requirement_id.as_str()).or_default() += f.credits_applied;
    }
    assert_eq!(applied.get("electives.req1"), Some(&6.0));
    // los dos restantes no caben en ningún requisito
    assert_eq!(outcome.unassigned.len(), 2);
}

#[test]
fn test_each_planned_course_assigned_at_most_once() {
    let (courses, planned) = many_cs_courses();
    let rows: Vec<PlannedRow<'_>> = planned.iter().map(|(id, c)| (id.as_str(), c.as_str(), 1, 3.0)).collect();
    let engine = memory_engine(&[program("cs", core_and_electives(json!([])))], &courses, &rows);

    let outcome = engine.auto_assign_fulfillments(PLAN_ID).unwrap();
    let mut per_course: HashMap<&str, usize> = HashMap::new();
    for f in &outcome.programs[0].fulfillments {
        *per_course.entry(f.planned_course_id.as_str()).or_default() += 1;
    }
    assert!(per_course.values().all(|&n| n == 1));
}

#[test]
fn test_earlier_semester_wins_scarce_credits() {
    let doc = json!({
        "sections": [
            {"id": "s", "creditsRequired": 4, "requirements": [
                {"id": "r", "creditsRequired": 4, "rule": {"type": "take_any_courses", "credits": 4,
                    "filter": {"type": "subject_number", "subjects": ["CS"]}}}
            ]}
        ]
    });
    let engine = memory_engine(
        &[program("cs", doc)],
        &[course("CS 1101", 3.0), course("CS 2201", 3.0)],
        // CS 2201 se cursa antes aunque su id ordene después
        &[("pc-a", "CS 1101", 3, 3.0), ("pc-b", "CS 2201", 1, 3.0)],
    );
    let outcome = engine.auto_assign_fulfillments(PLAN_ID).unwrap();
    let f = &outcome.programs[0].fulfillments;
    assert_eq!((f[0].planned_course_id.as_str(), f[0].credits_applied), ("pc-b", 3.0));
    assert_eq!((f[1].planned_course_id.as_str(), f[1].credits_applied), ("pc-a", 1.0));
}

#[test]
fn test_higher_specificity_beats_declaration_order() {
    let doc = json!({
        "sections": [
            {"id": "free", "creditsRequired": 3, "requirements": [
                {"id": "any", "creditsRequired": 3, "rule": {"type": "take_any_courses", "credits": 3, "filter": {"type": "any"}}}
            ]},
            {"id": "major", "creditsRequired": 3, "requirements": [
                {"id": "cs", "creditsRequired": 3, "rule": {"type": "take_any_courses", "credits": 3,
                    "filter": {"type": "subject_number", "subjects": ["CS"]}}}
            ]}
        ]
    });
    let engine = memory_engine(&[program("p", doc)], &[course("CS 2201", 3.0)], &[("pc1", "CS 2201", 1, 3.0)]);
    let outcome = engine.auto_assign_fulfillments(PLAN_ID).unwrap();
    assert_eq!(outcome.programs[0].fulfillments[0].requirement_id, "major.cs");
}

#[test]
fn test_ties_go_to_first_attached_program() {
    let take = |id: &str| {
        program(id, json!({
            "sections": [{"id": "core", "creditsRequired": 3, "requirements": [
                {"id": "intro", "creditsRequired": 3, "rule": {"type": "take_courses", "courses": ["CS 1101"]}}
            ]}]
        }))
    };
    let engine = memory_engine(&[take("zeta"), take("alpha")], &[course("CS 1101", 3.0)], &[("pc1", "CS 1101", 1, 3.0)]);
    let outcome = engine.auto_assign_fulfillments(PLAN_ID).unwrap();
    assert_eq!(outcome.programs[0].plan_program_id, plan_program_id("zeta"));
    assert_eq!(outcome.programs[0].fulfillments.len(), 1);
    assert!(outcome.programs[1].fulfillments.is_empty());
}

fn gated_program(gate_sections: &[&str]) -> planpath::models::Program {
    program("gated", json!({
        "sections": [
            {"id": "core", "creditsRequired": 3, "requirements": [
                {"id": "req1", "creditsRequired": 3, "rule": {"type": "take_courses", "courses": ["CS 1101"]}}
            ]},
            {"id": "math", "creditsRequired": 4, "requirements": [
                {"id": "calc", "creditsRequired": 4, "rule": {"type": "take_courses", "courses": ["MATH 1300"]}}
            ]},
            {"id": "writing", "creditsRequired": 6, "requirements": [
                {"id": "w", "creditsRequired": 6, "rule": {"type": "take_any_courses", "credits": 6, "filter": {"type": "any"}},
                 "constraints": [
                    {"type": "require_course_from_sections", "allowedSectionIds": gate_sections, "operator": "OR"}
                 ]}
            ]}
        ],
        "constraints": [
            {"type": "allow_double_count", "courseId": "CS 1101", "requirementIds": ["writing.w", "core.req1"]}
        ]
    }))
}

#[test]
fn test_gated_requirement_accepts_double_counted_course_from_allowed_section() {
    let engine = memory_engine(
        &[gated_program(&["core"])],
        &[course("CS 1101", 3.0), course("HIST 1000", 3.0)],
        &[("pc1", "CS 1101", 1, 3.0), ("pc2", "HIST 1000", 1, 3.0)],
    );
    let outcome = engine.auto_assign_fulfillments(PLAN_ID).unwrap();
    let ids: Vec<(&str, &str)> = outcome.programs[0]
        .fulfillments
        .iter()
        .map(|f| (f.planned_course_id.as_str(), f.requirement_id.as_str()))
        .collect();
    assert_eq!(ids, vec![("pc1", "core.req1"), ("pc1", "writing.w")]);
    // HIST 1000 no tiene fulfillment en core: la compuerta lo rechaza
    assert_eq!(outcome.unassigned, vec!["pc2".to_string()]);
}

#[test]
fn test_gated_requirement_rejects_course_outside_allowed_sections() {
    let engine = memory_engine(&[gated_program(&["math"])], &[course("CS 1101", 3.0)], &[("pc1", "CS 1101", 1, 3.0)]);
    let outcome = engine.auto_assign_fulfillments(PLAN_ID).unwrap();
    let ids: Vec<&str> = outcome.programs[0].fulfillments.iter().map(|f| f.requirement_id.as_str()).collect();
    assert_eq!(ids, vec!["core.req1"]);
}

#[test]
fn test_unknown_double_count_reference_aborts_assignment() {
    let constraints = json!([
        {"type": "allow_double_count", "courseId": "CS 1101", "requirementIds": ["core.req1", "electives.req2"]}
    ]);
    let engine = memory_engine(
        &[program("cs", core_and_electives(constraints))],
        &[course("CS 1101", 3.0)],
        &[("pc1", "CS 1101", 1, 3.0)],
    );
    let err = engine.auto_assign_fulfillments(PLAN_ID).unwrap_err();
    assert!(matches!(err, EngineError::DataIntegrity { .. }), "{}", err);
    assert!(err.to_string().contains("did you mean 'electives.req1'"));
    // nada se escribió
    assert!(engine.store().fulfillments(&plan_program_id("cs")).unwrap().is_empty());
}

#[test]
fn test_unknown_plan_is_not_found() {
    let engine = memory_engine(&[], &[], &[]);
    assert!(matches!(
        engine.auto_assign_fulfillments("missing"),
        Err(EngineError::NotFound { kind: "plan", .. })
    ));
}

#[test]
fn test_concurrent_auto_assign_on_one_plan_matches_single_run() {
    let constraints = json!([
        {"type": "allow_double_count", "courseId": "CS 1101", "requirementIds": ["core.req1", "electives.req1"]}
    ]);
    let (mut courses, planned) = many_cs_courses();
    courses.push(course("CS 1101", 3.0));
    let mut rows: Vec<PlannedRow<'_>> = planned.iter().map(|(id, c)| (id.as_str(), c.as_str(), 2, 3.0)).collect();
    rows.push(("pc0", "CS 1101", 1, 3.0));
    let programs = [program("cs", core_and_electives(constraints))];

    let single = memory_engine(&programs, &courses, &rows);
    let expected = single.auto_assign_fulfillments(PLAN_ID).unwrap();

    let engine = memory_engine(&programs, &courses, &rows);
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let engine = engine.clone();
            std::thread::spawn(move || engine.auto_assign_fulfillments(PLAN_ID))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().expect("hilo de asignación").unwrap(), expected);
    }

    let stored = engine.store().fulfillments(&plan_program_id("cs")).unwrap();
    assert_eq!(stored, expected.programs[0].fulfillments);
}
