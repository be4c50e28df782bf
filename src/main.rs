// --- planpath: motor de requisitos - Archivo principal ---

use planpath::config::Settings;
use planpath::run_server;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("planpath=info,actix_web=info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    tracing::info!("=== planpath (API) ===");
    tracing::info!("Iniciando servidor en http://{}", settings.bind);
    run_server(settings).await
}
