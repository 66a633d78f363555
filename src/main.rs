use log::*;
use service::{config::Config, logging::Logger};
use std::process::ExitCode;
use web::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::new();

    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to start logger: {}", e);
        return ExitCode::FAILURE;
    }

    info!(
        "Starting up Messenger Platform webhook receiver in {} mode",
        config.runtime_env()
    );
    debug!("{:?}", config);

    let app_state = match AppState::from_config(config) {
        Ok(app_state) => app_state,
        Err(e) => {
            error!("Failed to initialize: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = web::init_server(app_state).await {
        error!("Server stopped with error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
