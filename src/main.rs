use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn parse_port_env(name: &str) -> Option<u16> {
    match std::env::var(name) {
        Ok(val) => val.parse::<u16>().ok(),
        Err(_) => None,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let http_port = parse_port_env("LCAGATE_HTTP_PORT").unwrap_or(7878);
    let data_dir = std::env::var("LCAGATE_DATA_DIR").unwrap_or_else(|_| "data".to_string());
    info!(
        target: "lcagate",
        "lcagate starting: RUST_LOG='{}', http_port={}, data_dir='{}'",
        rust_log, http_port, data_dir
    );

    lcagate::server::run_with_port(http_port, &data_dir).await
}
