//! # Errores del servicio
//! src/error.rs
//!
//! Taxonomía:
//! - `Validation` → 400
//! - `Unauthorized` → 401
//! - `NotFound` → 404
//! - `Internal` → 500 (el detalle solo va al log)
//!
//! `ServerError` agrupa las fallas de arranque del proceso.

use crate::config::ConfigError;
use crate::http::StatusCode;
use crate::router::RouteError;
use std::io;
use thiserror::Error;

/// Fallas de los stores en memoria
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Un thread entró en pánico con el lock tomado
    #[error("{store} store lock poisoned")]
    LockPoisoned { store: &'static str },

    /// Se alcanzó el máximo de recursos configurado
    #[error("resource store is full (max {max} resources)")]
    CapacityExceeded { max: usize },
}

/// Resultado de las operaciones de servicio
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BadRequest,
            ServiceError::Unauthorized(_) => StatusCode::Unauthorized,
            ServiceError::NotFound(_) => StatusCode::NotFound,
            ServiceError::Internal(_) => StatusCode::InternalServerError,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        ServiceError::Internal(error.to_string())
    }
}

/// Fallas al arrancar el servidor
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid route table: {0}")]
    Routes(#[from] RouteError),

    #[error(transparent)]
    Io(#[from] io::Error),
}
