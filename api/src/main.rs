use piano_venues::{init_tracing, run_server, shutdown_tracing, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let result = match AppConfig::from_env() {
        Ok(config) => run_server(config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Server exited with error");
    }
    shutdown_tracing();
    result
}
