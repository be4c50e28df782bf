use thiserror::Error;

/// Errors surfaced by the engine and its stores.
///
/// "No requirement matched this course" is not an error: it shows up as an
/// unassigned course and as unmet requirements in progress.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed rule, filter or constraint tree.
    #[error("schema error at {path}: {message}")]
    Schema { path: String, message: String },

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// Program data that would make an assignment meaningless.
    #[error("data integrity error in program '{program_id}': {message}")]
    DataIntegrity { program_id: String, message: String },

    #[error("storage error: {0}")]
    Storage(String),
}

impl EngineError {
    pub fn schema(path: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Schema { path: path.into(), message: message.into() }
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        EngineError::NotFound { kind, id: id.into() }
    }

    pub fn integrity(program_id: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::DataIntegrity { program_id: program_id.into(), message: message.into() }
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(e: rusqlite::Error) -> Self {
        EngineError::Storage(format!("sqlite: {}", e))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Storage(format!("json: {}", e))
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Storage(format!("io: {}", e))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
