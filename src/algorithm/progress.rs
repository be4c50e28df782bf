// progress.rs - Progress Calculator y agregación a nivel de plan.
//
// Todo se deriva de los fulfillments ya registrados: no se vuelve a
// ejecutar la asignación. Requisito -> sección -> programa -> plan.

use std::collections::HashMap;
use crate::algorithm::constraints::{all_satisfied, check_constraints, FulfilledCourse};
use crate::algorithm::filters;
use crate::algorithm::schema::validate_program;
use crate::error::EngineResult;
use crate::models::{
    completion_percentage, requirement_full_id, Course, CountType, Fulfillment, LogicalOperator,
    PlanProgressOverview, PlannedCourse, Program, ProgramProgress, ProgressStatus, Requirement,
    RequirementProgress, Rule, RuleProgress, SectionProgress,
};

/// Calcula el snapshot de progreso de un programa adjunto a un plan.
///
/// `fulfillments` son los del plan-program; `planned_courses` los del plan.
/// Un fulfillment cuyo curso planificado (o curso de catálogo) ya no existe
/// se ignora con un warning.
pub fn calculate_program_progress(
    plan_program_id: &str,
    program: &Program,
    fulfillments: &[Fulfillment],
    planned_courses: &[PlannedCourse],
    courses: &HashMap<String, Course>,
) -> EngineResult<ProgramProgress> {
    validate_program(&program.id, &program.requirements)?;

    let planned_by_id: HashMap<&str, &PlannedCourse> =
        planned_courses.iter().map(|p| (p.id.as_str(), p)).collect();

    // requirement_id -> cursos que lo cumplen, en orden de registro
    let mut by_requirement: HashMap<&str, Vec<FulfilledCourse<'_>>> = HashMap::new();
    for f in fulfillments {
        let Some(planned) = planned_by_id.get(f.planned_course_id.as_str()) else {
            tracing::warn!(plan_program = plan_program_id, planned_course = %f.planned_course_id, "fulfillment references a missing planned course");
            continue;
        };
        let Some(course) = courses.get(planned.course_id.trim()) else {
            tracing::warn!(plan_program = plan_program_id, course = %planned.course_id, "fulfillment references a course missing from the catalog");
            continue;
        };
        if program.requirements.requirement(&f.requirement_id).is_none() {
            tracing::warn!(plan_program = plan_program_id, requirement = %f.requirement_id, "fulfillment references an unknown requirement");
            continue;
        }
        by_requirement.entry(f.requirement_id.as_str()).or_default().push(FulfilledCourse {
            planned_course_id: planned.id.as_str(),
            course,
            credits_applied: f.credits_applied,
        });
    }

    let mut program_scope: Vec<FulfilledCourse<'_>> = Vec::new();
    let mut sections = Vec::with_capacity(program.requirements.sections.len());
    let mut all_ok = true;

    for section in &program.requirements.sections {
        let mut section_scope: Vec<FulfilledCourse<'_>> = Vec::new();
        let mut requirements = Vec::with_capacity(section.requirements.len());
        for requirement in &section.requirements {
            let full_id = requirement_full_id(&section.id, &requirement.id);
            let fulfilled = by_requirement.get(full_id.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            let progress = requirement_progress(full_id, requirement, fulfilled);
            all_ok &= progress.constraints_satisfied;
            section_scope.extend_from_slice(fulfilled);
            requirements.push(progress);
        }

        let credits_required: f64 = requirements.iter().map(|r| r.credits_required).sum();
        let credits_fulfilled: f64 = requirements.iter().map(|r| r.credits_fulfilled).sum();
        let constraint_results = check_constraints(&section.constraints, &section_scope);
        let constraints_satisfied = all_satisfied(&constraint_results);
        all_ok &= constraints_satisfied;
        program_scope.extend(section_scope);

        let status = rollup_status(credits_fulfilled, credits_required, requirements.iter().map(|r| r.status));
        sections.push(SectionProgress {
            section_id: section.id.clone(),
            title: section.title.clone(),
            credits_required,
            credits_fulfilled,
            status,
            percentage: completion_percentage(status, credits_fulfilled, credits_required),
            requirements,
            constraint_results,
            constraints_satisfied,
        });
    }

    let credits_required: f64 = sections.iter().map(|s| s.credits_required).sum();
    let credits_fulfilled: f64 = sections.iter().map(|s| s.credits_fulfilled).sum();
    let constraint_results = check_constraints(&program.requirements.constraints, &program_scope);
    all_ok &= all_satisfied(&constraint_results);
    let status = rollup_status(credits_fulfilled, credits_required, sections.iter().map(|s| s.status));

    let progress = ProgramProgress {
        plan_program_id: plan_program_id.to_string(),
        program_id: program.id.clone(),
        program_name: program.name.clone(),
        credits_required,
        credits_fulfilled,
        status,
        percentage: completion_percentage(status, credits_fulfilled, credits_required),
        sections,
        constraint_results,
        all_constraints_satisfied: all_ok,
    };
    tracing::debug!(
        plan_program = plan_program_id,
        program = %program.id,
        status = ?progress.status,
        fulfilled = progress.credits_fulfilled,
        required = progress.credits_required,
        "program progress computed"
    );
    Ok(progress)
}

/// Sección o programa: bandas por créditos; si no exigen créditos, el
/// estado sale de sus hijos.
fn rollup_status<I>(fulfilled: f64, required: f64, children: I) -> ProgressStatus
where
    I: IntoIterator<Item = ProgressStatus>,
{
    if required <= 0.0 {
        ProgressStatus::combine(children)
    } else {
        ProgressStatus::from_credits(fulfilled, required)
    }
}

fn requirement_progress(full_id: String, requirement: &Requirement, fulfilled: &[FulfilledCourse<'_>]) -> RequirementProgress {
    let applied: f64 = fulfilled.iter().map(|f| f.credits_applied).sum();
    let credits_fulfilled = applied.min(requirement.credits_required);
    let constraint_results = check_constraints(&requirement.constraints, fulfilled);
    let constraints_satisfied = all_satisfied(&constraint_results);

    let mut fulfilled_by: Vec<String> = Vec::new();
    for f in fulfilled {
        if !fulfilled_by.iter().any(|id| id == f.planned_course_id) {
            fulfilled_by.push(f.planned_course_id.to_string());
        }
    }

    let status = ProgressStatus::for_requirement(credits_fulfilled, requirement.credits_required, !fulfilled.is_empty());
    RequirementProgress {
        requirement_id: full_id,
        title: requirement.title.clone(),
        credits_required: requirement.credits_required,
        credits_fulfilled,
        status,
        percentage: completion_percentage(status, credits_fulfilled, requirement.credits_required),
        rule_progress: rule_progress(&requirement.rule, fulfilled),
        fulfilled_by,
        constraint_results,
        constraints_satisfied,
    }
}

/// Progreso de la regla con la misma forma que la regla.
pub fn rule_progress(rule: &Rule, fulfilled: &[FulfilledCourse<'_>]) -> RuleProgress {
    match rule {
        Rule::Group { operator, rules } => {
            let rules: Vec<RuleProgress> = rules.iter().map(|r| rule_progress(r, fulfilled)).collect();
            let satisfied = match operator {
                LogicalOperator::And => rules.iter().all(RuleProgress::satisfied),
                LogicalOperator::Or => rules.iter().any(RuleProgress::satisfied),
            };
            RuleProgress::Group { operator: *operator, satisfied, rules }
        }
        Rule::TakeCourses { courses } => {
            let taken_courses: Vec<String> = courses
                .iter()
                .filter(|id| taken(fulfilled, id))
                .map(|id| id.trim().to_string())
                .collect();
            RuleProgress::TakeCourses {
                satisfied: taken_courses.len() == courses.len(),
                required_courses: courses.clone(),
                taken_courses,
            }
        }
        Rule::TakeFromList { count, count_type, courses } => {
            let in_list: Vec<&FulfilledCourse<'_>> = fulfilled
                .iter()
                .filter(|f| courses.iter().any(|id| id.trim() == f.course.course_id.trim()))
                .collect();
            let mut taken_courses: Vec<String> = Vec::new();
            for f in &in_list {
                if !taken_courses.contains(&f.course.course_id) {
                    taken_courses.push(f.course.course_id.clone());
                }
            }
            let value = match count_type {
                CountType::Courses => taken_courses.len() as f64,
                CountType::Credits => in_list.iter().map(|f| f.credits_applied).sum(),
            };
            let required = f64::from(*count);
            RuleProgress::TakeFromList {
                satisfied: value >= required,
                count_type: *count_type,
                required,
                fulfilled: value,
                available_courses: courses.clone(),
                taken_courses,
            }
        }
        Rule::TakeAnyCourses { credits, filter } => {
            let mut matching_courses: Vec<String> = Vec::new();
            let mut credits_fulfilled = 0.0;
            for f in fulfilled.iter().filter(|f| filters::matches(f.course, filter)) {
                credits_fulfilled += f.credits_applied;
                if !matching_courses.contains(&f.course.course_id) {
                    matching_courses.push(f.course.course_id.clone());
                }
            }
            RuleProgress::TakeAnyCourses {
                satisfied: credits_fulfilled >= *credits,
                credits_required: *credits,
                credits_fulfilled,
                matching_courses,
            }
        }
    }
}

fn taken(fulfilled: &[FulfilledCourse<'_>], course_id: &str) -> bool {
    fulfilled.iter().any(|f| f.course.course_id.trim() == course_id.trim())
}

/// Estado global del plan a partir del estado de cada programa.
pub fn overall_status(programs: &[ProgramProgress]) -> ProgressStatus {
    ProgressStatus::combine(programs.iter().map(|p| p.status))
}

/// Arma el overview de un plan. `fulfillments` son todos los del plan (de
/// todos sus programas); un curso que cuenta doble aporta sus créditos una
/// sola vez a `distinct_credits_counted`.
pub fn aggregate_plan_progress(
    plan_id: &str,
    programs: Vec<ProgramProgress>,
    planned_courses: &[PlannedCourse],
    fulfillments: &[Fulfillment],
) -> PlanProgressOverview {
    let total_planned_credits: f64 = planned_courses.iter().map(|p| p.credits).sum();

    let mut best: HashMap<&str, f64> = HashMap::new();
    for f in fulfillments {
        let entry = best.entry(f.planned_course_id.as_str()).or_insert(0.0);
        *entry = entry.max(f.credits_applied);
    }
    let distinct_credits_counted: f64 = planned_courses
        .iter()
        .filter_map(|p| best.get(p.id.as_str()))
        .sum();

    PlanProgressOverview {
        plan_id: plan_id.to_string(),
        overall_status: overall_status(&programs),
        programs,
        total_planned_credits,
        distinct_credits_counted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Filter, ProgramKind, ProgramRequirements, Section};
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

    fn fc<'a>(pc: &'a str, c: &'a Course, credits: f64) -> FulfilledCourse<'a> {
        FulfilledCourse { planned_course_id: pc, course: c, credits_applied: credits }
    }

    #[test]
    fn test_take_from_list_counts_courses_or_credits() {
        let a = course("MATH 2300");
        let b = course("MATH 2400");
        let list = vec!["MATH 2300".to_string(), "MATH 2400".to_string(), "MATH 2600".to_string()];
        let by_courses = Rule::TakeFromList { count: 2, count_type: CountType::Courses, courses: list.clone() };
        let by_credits = Rule::TakeFromList { count: 8, count_type: CountType::Credits, courses: list };
        let done = [fc("p1", &a, 3.0), fc("p2", &b, 3.0)];
        assert!(rule_progress(&by_courses, &done).satisfied());
        assert!(!rule_progress(&by_credits, &done).satisfied());
    }

    #[test]
    fn test_group_or_progress() {
        let a = course("CS 1101");
        let rule = Rule::Group {
            operator: LogicalOperator::Or,
            rules: vec![
                Rule::TakeCourses { courses: vec!["CS 1101".to_string()] },
                Rule::TakeCourses { courses: vec!["CS 1104".to_string()] },
            ],
        };
        let p = rule_progress(&rule, &[fc("p1", &a, 3.0)]);
        assert!(p.satisfied());
        let RuleProgress::Group { rules, .. } = p else { panic!("group esperado") };
        assert!(!rules[1].satisfied());
    }

    #[test]
    fn test_program_progress_caps_and_sums() {
        let program = Program {
            id: "cs".to_string(),
            name: "Computer Science".to_string(),
            kind: ProgramKind::Major,
            requirements: ProgramRequirements {
                sections: vec![Section {
                    id: "electives".to_string(),
                    title: "Electives".to_string(),
                    credits_required: 6.0,
                    requirements: vec![Requirement {
                        id: "req1".to_string(),
                        title: "CS electives".to_string(),
                        description: String::new(),
                        credits_required: 6.0,
                        rule: Rule::TakeAnyCourses {
                            credits: 6.0,
                            filter: Filter::SubjectNumber { subjects: vec!["CS".to_string()], numbers: None, exclude: vec![] },
                        },
                        constraints: vec![],
                    }],
                    constraints: vec![],
                }],
                constraints: vec![],
            },
        };
        let courses: HashMap<String, Course> = [("CS 2201".to_string(), course("CS 2201"))].into_iter().collect();
        let planned = vec![PlannedCourse {
            id: "p1".to_string(),
            plan_id: "plan".to_string(),
            course_id: "CS 2201".to_string(),
            semester_number: 1,
            credits: 3.0,
        }];
        let fulfillments = vec![
            Fulfillment { planned_course_id: "p1".to_string(), requirement_id: "electives.req1".to_string(), credits_applied: 3.0 },
            Fulfillment { planned_course_id: "ghost".to_string(), requirement_id: "electives.req1".to_string(), credits_applied: 3.0 },
        ];
        let p = calculate_program_progress("pp1", &program, &fulfillments, &planned, &courses).unwrap();
        assert_eq!(p.credits_fulfilled, 3.0);
        assert_eq!(p.credits_required, 6.0);
        assert_eq!(p.status, ProgressStatus::InProgress);
        assert_eq!(p.sections[0].requirements[0].fulfilled_by, vec!["p1".to_string()]);
        assert!(p.all_constraints_satisfied);
    }

    #[test]
    fn test_overall_status_bands() {
        assert_eq!(overall_status(&[]), ProgressStatus::NotStarted);
    }
}
