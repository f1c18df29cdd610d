//! # Endpoints estáticos y de introspección
//! src/static_files/mod.rs
//!
//! - `GET /health`
//! - `GET /openapi.yaml` (desde el directorio público)
//! - `GET /AUTHORS` (desde el directorio público)

use crate::clock::{iso8601, Clock};
use crate::error::ServiceError;
use crate::http::{Response, StatusCode};
use serde_json::json;
use std::io::ErrorKind;
use std::path::Path;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Handler para `/health`
pub fn health(clock: &dyn Clock) -> Response {
    Response::success(json!({
        "status": "healthy",
        "version": VERSION,
        "timestamp": iso8601(&clock.now()),
    }))
}

/// Handler para `/openapi.yaml`; sin caché
pub fn openapi(public_dir: &Path) -> Result<Response, ServiceError> {
    let content = read_public(public_dir, "openapi.yaml", "OpenAPI specification not found")?;
    Ok(Response::new(StatusCode::Ok)
        .with_header("Content-Type", "application/x-yaml")
        .with_header("Cache-Control", "no-cache, no-store, must-revalidate")
        .with_header("Pragma", "no-cache")
        .with_header("Expires", "0")
        .with_body_bytes(content))
}

/// Handler para `/AUTHORS`; cacheable por 24 horas
pub fn authors(public_dir: &Path) -> Result<Response, ServiceError> {
    let content = read_public(public_dir, "AUTHORS", "AUTHORS file not found")?;
    Ok(Response::new(StatusCode::Ok)
        .with_header("Content-Type", "text/plain")
        .with_header("Cache-Control", "public, max-age=86400")
        .with_body_bytes(content))
}

fn read_public(public_dir: &Path, file: &str, missing: &str) -> Result<Vec<u8>, ServiceError> {
    let path = public_dir.join(file);
    std::fs::read(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ServiceError::NotFound(missing.to_string()),
        _ => ServiceError::Internal(format!("reading {}: {}", path.display(), e)),
    })
}
