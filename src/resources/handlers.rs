//! # Handlers HTTP de recursos
//! src/resources/handlers.rs
//!
//! Implementa los endpoints protegidos:
//! - `POST /resources`
//! - `GET /resources`
//! - `GET /resources/{id}`
//! - `GET /resources/status?job_id=`
//! - `GET /resources/stats`

use crate::clock::iso8601;
use crate::error::ServiceError;
use crate::http::{JsonBody, Request, Response, StatusCode};
use crate::resources::service::{ResourceService, RESOURCE_NOT_FOUND};
use crate::router::RouteMatch;
use serde_json::json;

pub const JOB_ID_REQUIRED: &str = "job_id parameter is required";

/// Handler para `POST /resources`
///
/// Responde 202 con el job `pending`; el recurso aparece después del delay.
///
/// # Ejemplo de response
/// ```json
/// {"message": "Resource creation initiated", "job_id": "4be1…", "status": "pending", "estimated_completion": "2024-01-01T00:00:05Z"}
/// ```
pub fn create(request: &Request, service: &ResourceService) -> Result<Response, ServiceError> {
    let body = JsonBody::parse(request)?;
    body.require(&["name"])?;

    let job = service.create_async(&body.text("name").unwrap_or_default())?;

    Ok(Response::json(
        StatusCode::Accepted,
        &json!({
            "message": "Resource creation initiated",
            "job_id": job.id,
            "status": job.status,
            "estimated_completion": iso8601(&job.estimated_completion),
        }),
    ))
}

/// Handler para `GET /resources`
pub fn index(service: &ResourceService) -> Result<Response, ServiceError> {
    let resources = service.list_all()?;
    Ok(Response::success(json!({
        "total": resources.len(),
        "resources": resources,
    })))
}

/// Handler para `GET /resources/{id}`
pub fn show(route: &RouteMatch, service: &ResourceService) -> Result<Response, ServiceError> {
    // El patrón solo captura dígitos; un id fuera de rango no puede existir
    let id = route
        .param("id")
        .and_then(|raw| raw.parse::<u64>().ok())
        .ok_or_else(|| ServiceError::NotFound(RESOURCE_NOT_FOUND.to_string()))?;

    let resource = service.find_by_id(id)?;
    Ok(Response::success(json!({ "resource": resource })))
}

/// Handler para `GET /resources/status?job_id=ID`
pub fn job_status(request: &Request, service: &ResourceService) -> Result<Response, ServiceError> {
    let job_id = request
        .query_param("job_id")
        .ok_or_else(|| ServiceError::Validation(JOB_ID_REQUIRED.to_string()))?;

    let job = service.get_job_status(job_id)?;
    Ok(Response::success(json!({ "job": job })))
}

/// Handler para `GET /resources/stats`
pub fn stats(service: &ResourceService) -> Result<Response, ServiceError> {
    let stats = service.stats()?;
    Ok(Response::success(json!({ "stats": stats })))
}
