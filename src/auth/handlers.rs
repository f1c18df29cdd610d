//! # Handlers HTTP de autenticación
//! src/auth/handlers.rs
//!
//! - `POST /auth`
//! - extracción del token de sesión de un request

use crate::auth::service::AuthService;
use crate::clock::iso8601;
use crate::error::ServiceError;
use crate::http::{JsonBody, Request, Response};
use serde_json::json;

/// Handler para `POST /auth`
///
/// # Ejemplo de response
/// ```json
/// {"message": "Authentication successful", "session_id": "9f0c…", "expires_at": "2024-01-01T01:00:00Z", "success": true}
/// ```
pub fn login(request: &Request, auth: &AuthService) -> Result<Response, ServiceError> {
    let body = JsonBody::parse(request)?;
    body.require(&["username", "password"])?;

    let username = body.text("username").unwrap_or_default();
    let password = body.text("password").unwrap_or_default();
    let session = auth.authenticate(&username, &password)?;

    Ok(Response::success(json!({
        "message": "Authentication successful",
        "session_id": session.id,
        "expires_at": iso8601(&session.expires_at(auth.session_timeout())),
    })))
}

/// Token de sesión del request
///
/// Primero `Authorization: Bearer <token>`; si no está, el query parameter
/// `session_id`.
pub fn session_token(request: &Request) -> Option<&str> {
    let bearer = request
        .header("authorization")
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    bearer.or_else(|| request.query_param("session_id"))
}
