#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use clap::Parser;
    use tracing_subscriber::EnvFilter;
    use workorder_core::server::{self, ServerConfig};

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::parse();
    if let Err(e) = server::run(config) {
        tracing::error!(error = %e, "server stopped");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}
