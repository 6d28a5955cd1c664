use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_PASSWORD: &str = "ASR2026!";

/// Password gate in front of the work-order form.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Serve the ASR work-order form behind a shared password")]
pub struct ServerConfig {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Shared password accepted by /api/login
    #[arg(long, env = "PASSWORD", default_value = DEFAULT_PASSWORD, hide_env_values = true)]
    pub password: String,

    /// Directory holding login.html, index.html and the form assets
    #[arg(long, env = "PUBLIC_DIR", default_value = "public")]
    pub public_dir: PathBuf,

    /// Address to bind
    #[arg(long = "bind", env = "BIND_ADDR", default_value = "0.0.0.0")]
    pub bind_addr: String,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}
