use actix_web::{web, HttpResponse, Responder};
use serde_json::json;
use crate::algorithm::{calculate_filter_specificity, evaluate_course_filter, evaluate_rule, validate_filter_schema};
use crate::api_json::{parse_filter, parse_filter_document, parse_filter_evaluation, parse_rule_evaluation};
use crate::server_handlers::error_response;

/// POST /rules/evaluate
/// Body `{rule, course}` -> `{matches, specificity}`.
pub async fn rules_evaluate_handler(body: web::Json<serde_json::Value>) -> impl Responder {
    match parse_rule_evaluation(body.into_inner()) {
        Ok(req) => HttpResponse::Ok().json(evaluate_rule(&req.rule, &req.course)),
        Err(e) => error_response(&e),
    }
}

/// POST /filters/evaluate
pub async fn filters_evaluate_handler(body: web::Json<serde_json::Value>) -> impl Responder {
    match parse_filter_evaluation(body.into_inner()) {
        Ok(req) => HttpResponse::Ok().json(json!({"matches": evaluate_course_filter(&req.course, &req.filter)})),
        Err(e) => error_response(&e),
    }
}

/// POST /filters/specificity
pub async fn filters_specificity_handler(body: web::Json<serde_json::Value>) -> impl Responder {
    let filter = match parse_filter_document(body.into_inner()).and_then(|doc| parse_filter(&doc)) {
        Ok(f) => f,
        Err(e) => return error_response(&e),
    };
    HttpResponse::Ok().json(json!({"specificity": calculate_filter_specificity(&filter)}))
}

/// POST /filters/validate
/// Always 200 when the body has a `filter`: `{"valid": bool, "error": string|null}`.
pub async fn filters_validate_handler(body: web::Json<serde_json::Value>) -> impl Responder {
    let doc = match parse_filter_document(body.into_inner()) {
        Ok(d) => d,
        Err(e) => return error_response(&e),
    };
    let error = validate_filter_schema(&doc.filter);
    HttpResponse::Ok().json(json!({"valid": error.is_none(), "error": error}))
}
