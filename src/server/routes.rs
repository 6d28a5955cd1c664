use crate::server::config::ServerConfig;
use crate::server::session::SessionStore;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Component, Path, PathBuf};
use url::{form_urlencoded, Url};

pub const LOGIN_PAGE: &str = "login.html";
pub const FORM_PAGE: &str = "index.html";
pub const AUTH_HEADER: &str = "x-auth-token";

pub struct RouteRequest<'a> {
    pub method: &'a str,
    /// Request target as sent by the client, query string included.
    pub url: &'a str,
    pub auth_header: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub body: &'a [u8],
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl RouteResponse {
    pub fn json(status: u16, value: Value) -> Self {
        Self {
            status,
            content_type: "application/json; charset=utf-8",
            body: value.to_string().into_bytes(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            content_type: "text/plain; charset=utf-8",
            body: b"Not Found".to_vec(),
        }
    }

    pub fn json_body(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "json" | "map" => "application/json; charset=utf-8",
        "webmanifest" => "application/manifest+json",
        "txt" => "text/plain; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        "wasm" => "application/wasm",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

/// Resolve `url_path` under `root`, refusing anything that would leave it.
pub fn resolve_static(root: &Path, url_path: &str) -> Option<PathBuf> {
    let relative = Path::new(url_path.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    if relative
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
    {
        return None;
    }

    let root = root.canonicalize().ok()?;
    let mut target = root.join(relative).canonicalize().ok()?;
    if !target.starts_with(&root) {
        return None;
    }
    if target.is_dir() {
        target = target.join(FORM_PAGE);
    }
    target.is_file().then_some(target)
}

fn serve_file(path: &Path) -> RouteResponse {
    match std::fs::read(path) {
        Ok(body) => RouteResponse {
            status: 200,
            content_type: content_type_for(path),
            body,
        },
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "static file unreadable");
            RouteResponse::not_found()
        }
    }
}

fn serve_static(root: &Path, url_path: &str) -> RouteResponse {
    match resolve_static(root, url_path) {
        Some(path) => serve_file(&path),
        None => RouteResponse::not_found(),
    }
}

#[derive(Deserialize)]
struct LoginBody {
    #[serde(default)]
    password: Option<Value>,
}

/// Password from a JSON or form-encoded body. `Err` only for a JSON body
/// that does not parse.
fn login_password(req: &RouteRequest) -> Result<Option<String>, String> {
    if req.body.is_empty() {
        return Ok(None);
    }
    let mime = req
        .content_type
        .and_then(|ct| ct.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase())
        .unwrap_or_default();
    match mime.as_str() {
        "application/json" => serde_json::from_slice::<LoginBody>(req.body)
            .map(|b| b.password.and_then(|p| p.as_str().map(str::to_string)))
            .map_err(|e| format!("login_body_invalid:{e}")),
        "application/x-www-form-urlencoded" => Ok(form_urlencoded::parse(req.body)
            .find(|(k, _)| k == "password")
            .map(|(_, v)| v.into_owned())),
        _ => Ok(None),
    }
}

fn login(req: &RouteRequest, config: &ServerConfig, sessions: &mut SessionStore) -> RouteResponse {
    let password = match login_password(req) {
        Ok(password) => password,
        Err(e) => {
            tracing::debug!(error = %e, "malformed login body");
            return RouteResponse::json(400, json!({ "error": "Invalid request body" }));
        }
    };
    if password.as_deref() == Some(config.password.as_str()) {
        let token = sessions.issue();
        tracing::info!(active_sessions = sessions.len(), "login accepted");
        RouteResponse::json(200, json!({ "success": true, "token": token }))
    } else {
        tracing::warn!("login rejected");
        RouteResponse::json(401, json!({ "error": "Invalid password" }))
    }
}

fn unauthorized() -> RouteResponse {
    RouteResponse::json(401, json!({ "error": "Unauthorized" }))
}

pub fn handle(req: &RouteRequest, config: &ServerConfig, sessions: &mut SessionStore) -> RouteResponse {
    let parsed = match Url::parse("http://localhost/").and_then(|base| base.join(req.url)) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!(url = req.url, error = %e, "unparseable request target");
            return RouteResponse::json(400, json!({ "error": "Bad request" }));
        }
    };
    let path = parsed.path();

    let token = req
        .auth_header
        .map(str::to_string)
        .filter(|t| !t.is_empty())
        .or_else(|| {
            parsed
                .query_pairs()
                .find(|(k, _)| k == "token")
                .map(|(_, v)| v.into_owned())
        });
    let authorized = token.as_deref().is_some_and(|t| sessions.is_valid(t));

    match (req.method, path) {
        ("GET", "/") => serve_static(&config.public_dir, LOGIN_PAGE),
        ("POST", "/api/login") => login(req, config, sessions),
        ("GET", "/form") => serve_static(&config.public_dir, FORM_PAGE),
        ("GET", "/api/session") => {
            if authorized {
                RouteResponse::json(200, json!({ "valid": true }))
            } else {
                unauthorized()
            }
        }
        ("POST", "/api/logout") => match token.filter(|_| authorized) {
            Some(token) => {
                sessions.revoke(&token);
                tracing::info!(active_sessions = sessions.len(), "logout");
                RouteResponse::json(200, json!({ "success": true }))
            }
            None => unauthorized(),
        },
        ("GET" | "HEAD", _) => serve_static(&config.public_dir, path),
        _ => RouteResponse::not_found(),
    }
}
