use actix_web::{web, HttpResponse, Responder};
use crate::server::AppState;
use crate::server_handlers::run_blocking;

/// GET /plan-programs/{planProgramId}/progress
pub async fn program_progress_handler(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let plan_program_id = path.into_inner();
    match run_blocking(&state, move |engine| engine.calculate_program_progress(&plan_program_id)).await {
        Ok(progress) => HttpResponse::Ok().json(progress),
        Err(resp) => resp,
    }
}

/// GET /plans/{planId}/progress
pub async fn plan_progress_handler(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let plan_id = path.into_inner();
    match run_blocking(&state, move |engine| engine.aggregate_plan_progress(&plan_id)).await {
        Ok(overview) => HttpResponse::Ok().json(overview),
        Err(resp) => resp,
    }
}
