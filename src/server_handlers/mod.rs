pub mod evaluate;
pub mod fulfillments;
pub mod progress;
pub mod docs;

pub use evaluate::*;
pub use fulfillments::*;
pub use progress::*;
pub use docs::*;

use actix_web::HttpResponse;
use serde_json::json;
use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::server::AppState;

/// Maps an engine error to its HTTP status with body `{"error": message}`.
pub fn error_response(e: &EngineError) -> HttpResponse {
    let body = json!({"error": e.to_string()});
    match e {
        EngineError::Schema { .. } => HttpResponse::BadRequest().json(body),
        EngineError::NotFound { .. } => HttpResponse::NotFound().json(body),
        EngineError::DataIntegrity { .. } => HttpResponse::UnprocessableEntity().json(body),
        EngineError::Storage(_) => {
            tracing::error!(error = %e, "storage failure");
            HttpResponse::InternalServerError().json(body)
        }
    }
}

/// Runs an engine job on the blocking pool, bounded by the state's semaphore.
pub(crate) async fn run_blocking<T, F>(state: &AppState, job: F) -> Result<T, HttpResponse>
where
    F: FnOnce(Engine) -> EngineResult<T> + Send + 'static,
    T: Send + 'static,
{
    let permit = match state.permits.clone().acquire_owned().await {
        Ok(p) => p,
        Err(_) => return Err(HttpResponse::InternalServerError().json(json!({"error": "failed to acquire semaphore"}))),
    };
    let engine = state.engine.clone();

    let blocking_handle = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        job(engine)
    });

    match blocking_handle.await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(error_response(&e)),
        Err(e) => Err(HttpResponse::InternalServerError().json(json!({"error": format!("task join error: {}", e)}))),
    }
}
