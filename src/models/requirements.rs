//! Documento de requisitos de un programa.
//!
//! Estructura (ejemplo):
//! ```text
//! ProgramRequirements
//!   - sections[]            (orden de declaración = orden de desempate)
//!       - requirements[]    (id único dentro del programa)
//!           - rule          (group | take_courses | take_from_list | take_any_courses)
//!           - constraints[]
//!       - constraints[]
//!   - constraints[]
//! ```
//!
//! Todas las variantes usan el campo `"type"` como discriminador. Un tag
//! desconocido falla en la deserialización; nunca llega al evaluador.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramRequirements {
    pub sections: Vec<Section>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
}

impl ProgramRequirements {
    pub fn section(&self, section_id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == section_id)
    }

    /// Busca un requisito por su id completo `sectionId.requirementId`.
    pub fn requirement(&self, full_id: &str) -> Option<(&Section, &Requirement)> {
        let (section_id, requirement_id) = full_id.split_once('.')?;
        let section = self.section(section_id)?;
        let requirement = section.requirements.iter().find(|r| r.id == requirement_id)?;
        Some((section, requirement))
    }

    /// Ids completos de todos los requisitos, en orden de declaración.
    pub fn requirement_ids(&self) -> Vec<String> {
        self.sections
            .iter()
            .flat_map(|s| s.requirements.iter().map(move |r| requirement_full_id(&s.id, &r.id)))
            .collect()
    }

    /// Todas las restricciones del documento (programa, secciones y requisitos).
    pub fn all_constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter().chain(self.sections.iter().flat_map(|s| {
            s.constraints
                .iter()
                .chain(s.requirements.iter().flat_map(|r| r.constraints.iter()))
        }))
    }
}

pub fn requirement_full_id(section_id: &str, requirement_id: &str) -> String {
    format!("{}.{}", section_id, requirement_id)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub credits_required: f64,
    pub requirements: Vec<Requirement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub credits_required: f64,
    pub rule: Rule,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
}

impl Requirement {
    /// Restricción `require_course_from_sections` del requisito, si existe.
    pub fn section_gate(&self) -> Option<(&[String], LogicalOperator)> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::RequireCourseFromSections { allowed_section_ids, operator } => {
                Some((allowed_section_ids.as_slice(), *operator))
            }
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOperator {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountType {
    Courses,
    Credits,
}

/// Regla que decide qué cursos pueden satisfacer un requisito.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Rule {
    Group {
        operator: LogicalOperator,
        rules: Vec<Rule>,
    },
    TakeCourses {
        courses: Vec<String>,
    },
    TakeFromList {
        count: u32,
        count_type: CountType,
        courses: Vec<String>,
    },
    TakeAnyCourses {
        credits: f64,
        filter: Filter,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NumberConstraint {
    Specific { values: Vec<String> },
    Range { min: u32, max: Option<u32> },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeExclude {
    #[serde(default)]
    pub subjects: Vec<String>,
}

/// Predicado sobre un curso (sigla, número, atributos).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Filter {
    Any,
    SubjectNumber {
        subjects: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        numbers: Option<Vec<NumberConstraint>>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        exclude: Vec<String>,
    },
    Attribute {
        attributes: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribute_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exclude: Option<AttributeExclude>,
    },
    CourseList {
        courses: Vec<String>,
    },
    CourseNumberSuffix {
        suffixes: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subjects: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        exclude: Vec<String>,
    },
    NumberAttribute {
        numbers: Vec<NumberConstraint>,
        attributes: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribute_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subjects: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        exclude: Vec<String>,
    },
    Composite {
        operator: LogicalOperator,
        filters: Vec<Filter>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeOperator {
    Above,
    Below,
    Between,
}

/// Restricciones auxiliares. Las dos primeras alteran la asignación
/// (enforcement); el resto sólo se verifican después (validation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Constraint {
    AllowDoubleCount {
        course_id: String,
        requirement_ids: Vec<String>,
    },
    RequireCourseFromSections {
        allowed_section_ids: Vec<String>,
        operator: LogicalOperator,
    },
    MinCourseCount {
        count: u32,
        filter: Filter,
    },
    MaxCourseCount {
        count: u32,
        filter: Filter,
    },
    MinCreditsFromCourses {
        min_credits: f64,
        course_ids: Vec<String>,
    },
    MaxCreditsFromCourses {
        max_credits: f64,
        course_ids: Vec<String>,
    },
    CourseNumberRange {
        subject_code: String,
        operator: RangeOperator,
        min_number: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_number: Option<u32>,
        min_count: u32,
    },
}

impl Constraint {
    pub fn is_enforcement(&self) -> bool {
        matches!(
            self,
            Constraint::AllowDoubleCount { .. } | Constraint::RequireCourseFromSections { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_program_document() {
        let json = r#"
        {
            "sections": [
                {
                    "id": "core",
                    "title": "Core",
                    "creditsRequired": 3,
                    "requirements": [
                        {
                            "id": "req1",
                            "title": "Intro",
                            "description": "",
                            "creditsRequired": 3,
                            "rule": {"type": "take_courses", "courses": ["CS 1101"]}
                        }
                    ]
                },
                {
                    "id": "electives",
                    "title": "Electives",
                    "creditsRequired": 6,
                    "requirements": [
                        {
                            "id": "req1",
                            "title": "CS electives",
                            "creditsRequired": 6,
                            "rule": {
                                "type": "take_any_courses",
                                "credits": 6,
                                "filter": {
                                    "type": "subject_number",
                                    "subjects": ["CS"],
                                    "numbers": [{"type": "range", "min": 2000}]
                                }
                            },
                            "constraints": [
                                {"type": "require_course_from_sections", "allowedSectionIds": ["core"], "operator": "OR"}
                            ]
                        }
                    ]
                }
            ],
            "constraints": [
                {"type": "allow_double_count", "courseId": "CS 1101", "requirementIds": ["core.req1", "electives.req1"]}
            ]
        }
        "#;
        let doc: ProgramRequirements = serde_json::from_str(json).expect("documento válido");
        assert_eq!(doc.requirement_ids(), vec!["core.req1", "electives.req1"]);
        let (section, req) = doc.requirement("electives.req1").unwrap();
        assert_eq!(section.id, "electives");
        assert_eq!(req.section_gate().map(|(ids, op)| (ids.len(), op)), Some((1, LogicalOperator::Or)));
        assert_eq!(doc.all_constraints().count(), 2);
    }

    #[test]
    fn test_unknown_rule_tag_is_rejected() {
        let json = r#"{"type": "take_some_courses", "courses": []}"#;
        assert!(serde_json::from_str::<Rule>(json).is_err());
    }

    #[test]
    fn test_filter_missing_field_is_rejected() {
        let json = r#"{"type": "course_list"}"#;
        assert!(serde_json::from_str::<Filter>(json).is_err());
    }
}
