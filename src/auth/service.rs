//! # Servicio de autenticación
//! src/auth/service.rs
//!
//! Valida el par de credenciales configurado y emite/valida sesiones a
//! través del [`SessionStore`].

use crate::auth::session::{short_id, Session, SessionStore};
use crate::clock::SharedClock;
use crate::config::Config;
use crate::error::ServiceError;
use sha2::{Digest, Sha256};
use std::time::Duration;

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const NO_SESSION_ID: &str = "No session ID provided";
pub const INVALID_SESSION: &str = "Invalid or expired session";

/// Configuración del servicio de autenticación
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
    pub session_timeout: Duration,
}

impl AuthConfig {
    /// Crea una configuración desde el Config principal
    pub fn from_config(config: &Config) -> Self {
        Self {
            username: config.username.clone(),
            password: config.password.clone(),
            session_timeout: Duration::from_secs(config.session_timeout_secs),
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    sessions: SessionStore,
    username: [u8; 32],
    password: [u8; 32],
}

impl AuthService {
    pub fn new(config: AuthConfig, clock: SharedClock) -> Self {
        Self {
            sessions: SessionStore::new(clock, config.session_timeout),
            username: digest(&config.username),
            password: digest(&config.password),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn session_timeout(&self) -> Duration {
        self.sessions.timeout()
    }

    /// Compara contra el par configurado; si coincide crea una sesión
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Session, ServiceError> {
        // Se evalúan ambos lados siempre para no filtrar cuál de los dos falló
        let user_ok = constant_time_eq(&digest(username), &self.username);
        let pass_ok = constant_time_eq(&digest(password), &self.password);
        if !(user_ok & pass_ok) {
            tracing::info!(username = %username, "authentication rejected");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let session = self.sessions.create(username)?;
        tracing::info!(username = %username, session = %short_id(&session.id), "authentication succeeded");
        Ok(session)
    }

    /// Valida un id de sesión (ausente o vacío cuenta como no provisto)
    pub fn validate_session(&self, session_id: Option<&str>) -> Result<Session, ServiceError> {
        let id = match session_id {
            Some(id) if !id.is_empty() => id,
            _ => return Err(ServiceError::Unauthorized(NO_SESSION_ID.to_string())),
        };

        self.sessions
            .find_valid(id)?
            .ok_or_else(|| ServiceError::Unauthorized(INVALID_SESSION.to_string()))
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    let mut diff = 0u8;
    for (left, right) in a.iter().zip(b.iter()) {
        diff |= left ^ right;
    }
    diff == 0
}
