use actix_web::{web, HttpResponse, Responder};
use crate::server::AppState;
use crate::server_handlers::run_blocking;

/// POST /plans/{planId}/fulfillments/auto-assign
/// Replaces every fulfillment of the plan and returns the new sets plus the
/// planned courses that matched nothing.
pub async fn auto_assign_handler(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let plan_id = path.into_inner();
    let start = std::time::Instant::now();
    let plan_for_job = plan_id.clone();
    match run_blocking(&state, move |engine| engine.auto_assign_fulfillments(&plan_for_job)).await {
        Ok(outcome) => {
            tracing::info!(plan = %plan_id, elapsed_ms = start.elapsed().as_millis() as u64, "auto-assign request served");
            HttpResponse::Ok().json(outcome)
        }
        Err(resp) => resp,
    }
}
