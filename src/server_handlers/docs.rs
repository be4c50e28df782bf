use actix_web::{HttpResponse, Responder};
use serde_json::json;

pub async fn health_handler() -> impl Responder {
    HttpResponse::Ok().json(json!({"status": "ok", "version": env!("CARGO_PKG_VERSION")}))
}

pub async fn help_handler() -> impl Responder {
    let rule_example = json!({
        "rule": {"type": "take_any_courses", "credits": 6, "filter": {"type": "subject_number", "subjects": ["CS"]}},
        "course": {"courseId": "CS 2201", "subjectCode": "CS", "courseNumber": "2201", "credits": 3}
    });

    let help = json!({
        "description": "Motor de requisitos: asigna cursos planificados a requisitos de programas y calcula progreso.",
        "routes": {
            "POST /rules/evaluate": "body {rule, course} -> {matches, specificity}",
            "POST /filters/evaluate": "body {filter, course} -> {matches}",
            "POST /filters/specificity": "body {filter} -> {specificity}",
            "POST /filters/validate": "body {filter} -> {valid, error}",
            "POST /plans/{planId}/fulfillments/auto-assign": "recalcula y reemplaza los fulfillments del plan",
            "GET /plan-programs/{planProgramId}/progress": "progreso de un programa adjunto",
            "GET /plans/{planId}/progress": "overview de progreso del plan",
            "GET /health": "liveness"
        },
        "rule_example": rule_example,
        "errors": {"400": "schema", "404": "not found", "422": "data integrity", "500": "storage"}
    });

    HttpResponse::Ok().json(help)
}
