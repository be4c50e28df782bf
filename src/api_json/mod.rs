use serde::{Deserialize, Serialize};
use crate::algorithm::schema::{validate_filter, validate_rule};
use crate::error::{EngineError, EngineResult};
use crate::models::{Course, Filter, Rule};

/// Cuerpo de `POST /rules/evaluate`.
///
/// ```json
/// {
///   "rule": {"type": "take_courses", "courses": ["CS 1101"]},
///   "course": {"courseId": "CS 1101", "subjectCode": "CS", "courseNumber": "1101", "credits": 3}
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEvaluationRequest {
    pub rule: Rule,
    pub course: Course,
}

/// Cuerpo de `POST /filters/evaluate`.
///
/// ```json
/// {
///   "filter": {"type": "subject_number", "subjects": ["CS"]},
///   "course": {"courseId": "CS 2201", "subjectCode": "CS", "courseNumber": "2201"}
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterEvaluationRequest {
    pub filter: Filter,
    pub course: Course,
}

/// Cuerpo de `POST /filters/specificity` y `POST /filters/validate`:
/// `{"filter": {...}}`. El filtro queda crudo para que `validate` pueda
/// describir el error en vez de rechazar el cuerpo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterDocument {
    pub filter: serde_json::Value,
}

fn from_body<T: for<'de> Deserialize<'de>>(body: serde_json::Value) -> EngineResult<T> {
    serde_json::from_value(body).map_err(|e| EngineError::schema("body", e.to_string()))
}

pub fn parse_rule_evaluation(body: serde_json::Value) -> EngineResult<RuleEvaluationRequest> {
    let req: RuleEvaluationRequest = from_body(body)?;
    validate_rule(&req.rule, "rule")?;
    Ok(req)
}

pub fn parse_filter_evaluation(body: serde_json::Value) -> EngineResult<FilterEvaluationRequest> {
    let req: FilterEvaluationRequest = from_body(body)?;
    validate_filter(&req.filter, "filter")?;
    Ok(req)
}

pub fn parse_filter_document(body: serde_json::Value) -> EngineResult<FilterDocument> {
    from_body(body)
}

/// Parsea y valida el filtro de un `FilterDocument`.
pub fn parse_filter(doc: &FilterDocument) -> EngineResult<Filter> {
    let filter: Filter = serde_json::from_value(doc.filter.clone())
        .map_err(|e| EngineError::schema("filter", e.to_string()))?;
    validate_filter(&filter, "filter")?;
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_rule_evaluation_ok() {
        let body = json!({
            "rule": {"type": "take_courses", "courses": ["CS 1101"]},
            "course": {"courseId": "CS 1101", "subjectCode": "CS", "courseNumber": "1101", "credits": 3}
        });
        let req = parse_rule_evaluation(body).unwrap();
        assert_eq!(req.course.course_id, "CS 1101");
    }

    #[test]
    fn test_unknown_rule_type_is_schema_error() {
        let body = json!({
            "rule": {"type": "take_some", "courses": ["CS 1101"]},
            "course": {"courseId": "CS 1101", "subjectCode": "CS", "courseNumber": "1101"}
        });
        assert!(matches!(parse_rule_evaluation(body), Err(EngineError::Schema { .. })));
    }

    #[test]
    fn test_empty_take_courses_is_schema_error() {
        let body = json!({
            "rule": {"type": "take_courses", "courses": []},
            "course": {"courseId": "CS 1101", "subjectCode": "CS", "courseNumber": "1101"}
        });
        assert!(matches!(parse_rule_evaluation(body), Err(EngineError::Schema { .. })));
    }

    #[test]
    fn test_filter_document_keeps_raw_filter() {
        let doc = parse_filter_document(json!({"filter": {"type": "bogus"}})).unwrap();
        assert!(parse_filter(&doc).is_err());
        let doc = parse_filter_document(json!({"filter": {"type": "any"}})).unwrap();
        assert_eq!(parse_filter(&doc).unwrap(), Filter::Any);
    }
}
