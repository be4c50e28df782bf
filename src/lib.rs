// Biblioteca raíz del crate `planpath`.
// Motor de cumplimiento de requisitos y progreso para planes de estudio.
pub mod algorithm;
pub mod api_json;
pub mod config;
pub mod datafiles;
pub mod engine;
pub mod error;
pub mod models;
pub mod server;
pub mod server_handlers;
pub mod storage;

/// Ejecuta el servidor HTTP (reexport para facilitar uso desde `main`)
pub use server::run_server;
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
