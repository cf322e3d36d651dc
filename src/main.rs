use churn_repro::{
    config::{Config, RunMode},
    startup,
};
use tracing::error;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    startup::init_tracing();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let result = match config.mode {
        RunMode::Celery => startup::run_celery(&config).await,
        RunMode::Simulate => startup::run_simulated(&config).await,
    };

    if let Err(e) = result {
        error!("Run failed: {}", e);
        std::process::exit(1);
    }
}
