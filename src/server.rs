use actix_web::{web, App, HttpServer};
use std::sync::Arc;
use tokio::sync::Semaphore;
use crate::config::Settings;
use crate::datafiles;
use crate::engine::Engine;
use crate::error::EngineResult;
use crate::server_handlers::{
    auto_assign_handler, filters_evaluate_handler, filters_specificity_handler, filters_validate_handler,
    health_handler, help_handler, plan_progress_handler, program_progress_handler, rules_evaluate_handler,
};
use crate::storage::{MemoryStore, PlanStore, SqliteStore};

/// Shared state for every worker: the engine and the permits that bound
/// concurrent blocking engine jobs.
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: Engine,
    pub permits: Arc<Semaphore>,
}

impl AppState {
    pub fn new(engine: Engine, workers: usize) -> Self {
        AppState { engine, permits: Arc::new(Semaphore::new(workers.max(1))) }
    }
}

/// Open the configured store and load seed data if a datafiles dir is found.
pub fn build_state(settings: &Settings) -> EngineResult<AppState> {
    let store: Arc<dyn PlanStore> = match &settings.db_url {
        Some(url) => Arc::new(SqliteStore::open_url(url)?),
        None => {
            tracing::info!("PLANPATH_DB_URL not set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    match datafiles::get_datafiles_dir(settings.datafiles_dir.as_deref()) {
        Some(dir) => {
            datafiles::load_into(&dir, store.as_ref())?;
        }
        None => tracing::info!("no datafiles dir found, starting without seed data"),
    }

    Ok(AppState::new(Engine::new(store), settings.workers))
}

/// Route table, shared by `run_server` and the HTTP tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/rules/evaluate", web::post().to(rules_evaluate_handler))
        .route("/filters/evaluate", web::post().to(filters_evaluate_handler))
        .route("/filters/specificity", web::post().to(filters_specificity_handler))
        .route("/filters/validate", web::post().to(filters_validate_handler))
        .route("/plans/{plan_id}/fulfillments/auto-assign", web::post().to(auto_assign_handler))
        .route("/plans/{plan_id}/progress", web::get().to(plan_progress_handler))
        .route("/plan-programs/{plan_program_id}/progress", web::get().to(program_progress_handler))
        .route("/health", web::get().to(health_handler))
        .route("/help", web::get().to(help_handler));
}

pub async fn run_server(settings: Settings) -> std::io::Result<()> {
    let state = build_state(&settings).map_err(std::io::Error::other)?;
    let data = web::Data::new(state);

    tracing::info!(bind = %settings.bind, workers = settings.workers, "starting http server");
    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .configure(configure)
    })
    .bind(settings.bind)?
    .run()
    .await
}
