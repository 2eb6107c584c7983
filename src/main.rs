use std::env;

use tracing_subscriber::EnvFilter;
use url_vault::{config, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = config::load()?;
    config.print_summary();

    server::run(config).await
}

/// Installs the global subscriber from `RUST_LOG` and `LOG_FORMAT`.
///
/// Runs before configuration is loaded so that warnings raised while
/// loading it are not lost.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if env::var("LOG_FORMAT").is_ok_and(|format| format == "json") {
        builder.json().init();
    } else {
        builder.init();
    }
}
