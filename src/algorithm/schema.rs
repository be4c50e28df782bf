//! Validación de esquema e integridad de los documentos de requisitos.
//!
//! Se ejecuta antes de cualquier matching: un árbol malformado se rechaza
//! aquí y nunca aparece como un "no match" silencioso a mitad de recursión.

use std::collections::{HashMap, HashSet};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    requirement_full_id, Constraint, Filter, NumberConstraint, ProgramRequirements, RangeOperator,
    Rule,
};

/// Valida un filtro en JSON crudo. `None` si es válido; si no, una
/// descripción del problema.
pub fn validate_filter_schema(value: &serde_json::Value) -> Option<String> {
    let filter: Filter = match serde_json::from_value(value.clone()) {
        Ok(f) => f,
        Err(e) => return Some(format!("invalid filter: {}", e)),
    };
    validate_filter(&filter, "filter").err().map(|e| e.to_string())
}

pub fn validate_filter(filter: &Filter, path: &str) -> EngineResult<()> {
    match filter {
        Filter::Any => Ok(()),
        Filter::SubjectNumber { subjects, numbers, .. } => {
            non_empty(subjects, path, "subjects")?;
            if let Some(ns) = numbers {
                non_empty(ns, path, "numbers")?;
                validate_numbers(ns, path)?;
            }
            Ok(())
        }
        Filter::Attribute { attributes, .. } => non_empty(attributes, path, "attributes"),
        Filter::CourseList { courses } => non_empty(courses, path, "courses"),
        Filter::CourseNumberSuffix { suffixes, .. } => {
            non_empty(suffixes, path, "suffixes")?;
            if suffixes.iter().any(|s| s.trim().is_empty()) {
                return Err(EngineError::schema(path, "suffixes must not contain empty strings"));
            }
            Ok(())
        }
        Filter::NumberAttribute { numbers, attributes, .. } => {
            non_empty(numbers, path, "numbers")?;
            non_empty(attributes, path, "attributes")?;
            validate_numbers(numbers, path)
        }
        Filter::Composite { filters, .. } => {
            if filters.len() < 2 {
                return Err(EngineError::schema(path, "composite filter needs at least 2 filters"));
            }
            for (i, f) in filters.iter().enumerate() {
                validate_filter(f, &format!("{}.filters[{}]", path, i))?;
            }
            Ok(())
        }
    }
}

fn validate_numbers(numbers: &[NumberConstraint], path: &str) -> EngineResult<()> {
    for (i, n) in numbers.iter().enumerate() {
        let here = format!("{}.numbers[{}]", path, i);
        match n {
            NumberConstraint::Specific { values } => non_empty(values, &here, "values")?,
            NumberConstraint::Range { min, max: Some(max) } if max < min => {
                return Err(EngineError::schema(here, format!("range max {} is below min {}", max, min)));
            }
            NumberConstraint::Range { .. } => {}
        }
    }
    Ok(())
}

pub fn validate_rule(rule: &Rule, path: &str) -> EngineResult<()> {
    match rule {
        Rule::Group { rules, .. } => {
            non_empty(rules, path, "rules")?;
            for (i, r) in rules.iter().enumerate() {
                validate_rule(r, &format!("{}.rules[{}]", path, i))?;
            }
            Ok(())
        }
        Rule::TakeCourses { courses } => non_empty(courses, path, "courses"),
        Rule::TakeFromList { count, courses, .. } => {
            non_empty(courses, path, "courses")?;
            if *count == 0 {
                return Err(EngineError::schema(path, "take_from_list count must be positive"));
            }
            Ok(())
        }
        Rule::TakeAnyCourses { credits, filter } => {
            if !credits.is_finite() || *credits < 0.0 {
                return Err(EngineError::schema(path, "take_any_courses credits must be >= 0"));
            }
            validate_filter(filter, &format!("{}.filter", path))
        }
    }
}

pub fn validate_constraint(constraint: &Constraint, path: &str) -> EngineResult<()> {
    match constraint {
        Constraint::AllowDoubleCount { course_id, requirement_ids } => {
            if course_id.trim().is_empty() {
                return Err(EngineError::schema(path, "allow_double_count needs a courseId"));
            }
            if requirement_ids.len() < 2 {
                return Err(EngineError::schema(path, "allow_double_count needs at least 2 requirementIds"));
            }
            Ok(())
        }
        Constraint::RequireCourseFromSections { allowed_section_ids, .. } => {
            non_empty(allowed_section_ids, path, "allowedSectionIds")
        }
        Constraint::MinCourseCount { filter, .. } | Constraint::MaxCourseCount { filter, .. } => {
            validate_filter(filter, &format!("{}.filter", path))
        }
        Constraint::MinCreditsFromCourses { min_credits: credits, course_ids }
        | Constraint::MaxCreditsFromCourses { max_credits: credits, course_ids } => {
            non_empty(course_ids, path, "courseIds")?;
            if !credits.is_finite() || *credits < 0.0 {
                return Err(EngineError::schema(path, "credit bound must be >= 0"));
            }
            Ok(())
        }
        Constraint::CourseNumberRange { subject_code, operator, min_number, max_number, .. } => {
            if subject_code.trim().is_empty() {
                return Err(EngineError::schema(path, "course_number_range needs a subjectCode"));
            }
            match (operator, max_number) {
                (RangeOperator::Between, None) => {
                    Err(EngineError::schema(path, "operator 'between' requires maxNumber"))
                }
                (RangeOperator::Between, Some(max)) if max < min_number => Err(EngineError::schema(
                    path,
                    format!("maxNumber {} is below minNumber {}", max, min_number),
                )),
                _ => Ok(()),
            }
        }
    }
}

/// Valida un programa completo: esquema de reglas/filtros/restricciones y
/// las reglas de integridad (ids duplicados, referencias colgantes, ciclos
/// entre secciones).
pub fn validate_program(program_id: &str, doc: &ProgramRequirements) -> EngineResult<()> {
    let mut section_ids: HashSet<&str> = HashSet::new();
    let mut full_ids: HashSet<String> = HashSet::new();

    for section in &doc.sections {
        // el id completo de un requisito es `sectionId.requirementId`
        if section.id.trim().is_empty() || section.id.contains('.') {
            return Err(EngineError::schema(
                format!("sections[{}]", section.id),
                "section id must be non-empty and must not contain '.'",
            ));
        }
        if !section_ids.insert(section.id.as_str()) {
            return Err(EngineError::integrity(program_id, format!("duplicate section id '{}'", section.id)));
        }
        for (i, c) in section.constraints.iter().enumerate() {
            validate_constraint(c, &format!("{}.constraints[{}]", section.id, i))?;
        }
        for req in &section.requirements {
            let full_id = requirement_full_id(&section.id, &req.id);
            if !full_ids.insert(full_id.clone()) {
                return Err(EngineError::integrity(program_id, format!("duplicate requirement id '{}'", full_id)));
            }
            if !req.credits_required.is_finite() || req.credits_required < 0.0 {
                return Err(EngineError::schema(&full_id, "creditsRequired must be >= 0"));
            }
            validate_rule(&req.rule, &format!("{}.rule", full_id))?;
            for (i, c) in req.constraints.iter().enumerate() {
                validate_constraint(c, &format!("{}.constraints[{}]", full_id, i))?;
            }
        }
    }
    for (i, c) in doc.constraints.iter().enumerate() {
        validate_constraint(c, &format!("constraints[{}]", i))?;
    }

    for constraint in doc.all_constraints() {
        match constraint {
            Constraint::AllowDoubleCount { course_id, requirement_ids } => {
                for id in requirement_ids {
                    if !full_ids.contains(id.trim()) {
                        return Err(EngineError::integrity(
                            program_id,
                            format!(
                                "allow_double_count for '{}' references unknown requirement '{}'{}",
                                course_id,
                                id,
                                suggestion(id, full_ids.iter().map(String::as_str))
                            ),
                        ));
                    }
                }
            }
            Constraint::RequireCourseFromSections { allowed_section_ids, .. } => {
                for id in allowed_section_ids {
                    if !section_ids.contains(id.trim()) {
                        return Err(EngineError::integrity(
                            program_id,
                            format!(
                                "require_course_from_sections references unknown section '{}'{}",
                                id,
                                suggestion(id, section_ids.iter().copied())
                            ),
                        ));
                    }
                }
            }
            _ => {}
        }
    }

    section_stages(program_id, doc).map(|_| ())
}

/// Etapa de cada sección según el grafo de `require_course_from_sections`:
/// una sección cuyos requisitos dependen de otras queda en una etapa
/// posterior a todas ellas. Un ciclo es un error de integridad.
pub fn section_stages(program_id: &str, doc: &ProgramRequirements) -> EngineResult<HashMap<String, usize>> {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();
    for section in &doc.sections {
        nodes.insert(section.id.as_str(), graph.add_node(section.id.as_str()));
    }

    for section in &doc.sections {
        let target = nodes[section.id.as_str()];
        for req in &section.requirements {
            if let Some((allowed, _)) = req.section_gate() {
                for id in allowed {
                    if id.trim() == section.id {
                        continue;
                    }
                    if let Some(&source) = nodes.get(id.trim()) {
                        graph.update_edge(source, target, ());
                    }
                }
            }
        }
    }

    let order = toposort(&graph, None).map_err(|cycle| {
        EngineError::integrity(
            program_id,
            format!("require_course_from_sections forms a cycle through section '{}'", graph[cycle.node_id()]),
        )
    })?;

    let mut depth: HashMap<NodeIndex, usize> = HashMap::new();
    for node in order {
        let d = graph
            .neighbors_directed(node, petgraph::Direction::Incoming)
            .map(|p| depth.get(&p).copied().unwrap_or(0) + 1)
            .max()
            .unwrap_or(0);
        depth.insert(node, d);
    }

    Ok(depth.into_iter().map(|(n, d)| (graph[n].to_string(), d)).collect())
}

fn non_empty<T>(items: &[T], path: &str, field: &str) -> EngineResult<()> {
    if items.is_empty() {
        Err(EngineError::schema(path, format!("'{}' must not be empty", field)))
    } else {
        Ok(())
    }
}

fn suggestion<'a>(wanted: &str, candidates: impl Iterator<Item = &'a str>) -> String {
    let mut best: Option<(usize, &str)> = None;
    for candidate in candidates {
        let distance = strsim::levenshtein(wanted.trim(), candidate);
        if distance <= 3 && best.is_none_or(|(d, c)| distance < d || (distance == d && candidate < c)) {
            best = Some((distance, candidate));
        }
    }
    match best {
        Some((_, c)) => format!(" (did you mean '{}'?)", c),
        None => String::new(),
    }
}
