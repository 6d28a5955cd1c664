pub mod config;
pub mod routes;
pub mod session;

pub use config::ServerConfig;
pub use routes::{handle, RouteRequest, RouteResponse};
pub use session::SessionStore;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("public directory not found: {0}")]
    PublicDir(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn header_value(request: &tiny_http::Request, name: &str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str().to_string())
}

/// Answer requests from `server` until it shuts down.
pub fn serve(server: &tiny_http::Server, config: &ServerConfig, sessions: &mut SessionStore) {
    for mut request in server.incoming_requests() {
        let mut body = Vec::new();
        if let Err(e) = request.as_reader().read_to_end(&mut body) {
            tracing::warn!(error = %e, "failed to read request body");
            let reply = tiny_http::Response::from_string("Bad Request").with_status_code(400);
            if let Err(e) = request.respond(reply) {
                tracing::warn!(error = %e, "failed to send response");
            }
            continue;
        }

        let method = request.method().to_string();
        let url = request.url().to_string();
        let auth = header_value(&request, routes::AUTH_HEADER);
        let content_type = header_value(&request, "content-type");

        let response = routes::handle(
            &RouteRequest {
                method: &method,
                url: &url,
                auth_header: auth.as_deref(),
                content_type: content_type.as_deref(),
                body: &body,
            },
            config,
            sessions,
        );

        // The query string can carry a session token; log the path only.
        let path = url.split('?').next().unwrap_or_default();
        tracing::info!(%method, path, status = response.status, "request");

        let mut reply =
            tiny_http::Response::from_data(response.body).with_status_code(response.status);
        match tiny_http::Header::from_bytes(&b"Content-Type"[..], response.content_type.as_bytes())
        {
            Ok(header) => reply = reply.with_header(header),
            Err(()) => tracing::warn!(content_type = response.content_type, "invalid header"),
        }
        if let Err(e) = request.respond(reply) {
            tracing::warn!(error = %e, "failed to send response");
        }
    }
}

/// Bind the configured address and serve forever.
pub fn run(config: ServerConfig) -> Result<(), ServerError> {
    let public_dir = config.public_dir.canonicalize()?;
    if !public_dir.is_dir() {
        return Err(ServerError::PublicDir(public_dir));
    }
    let addr = config.listen_addr();
    let server = tiny_http::Server::http(&addr).map_err(|e| ServerError::Bind {
        addr: addr.clone(),
        reason: e.to_string(),
    })?;
    tracing::info!(%addr, public_dir = %public_dir.display(), "ASR work order form running");
    tracing::info!("visit http://localhost:{} to access the form", config.port);

    let mut sessions = SessionStore::new();
    serve(&server, &config, &mut sessions);
    Ok(())
}
