//! # Sesiones y su store
//! src/auth/session.rs
//!
//! Una sesión es válida mientras `now < created_at + timeout`. La expiración
//! se evalúa al leer: `find_valid` borra y descarta las sesiones vencidas.
//! `cleanup_expired` solo libera memoria de sesiones abandonadas.

use crate::clock::{add_duration, iso8601_format, SharedClock};
use crate::error::StoreError;
use crate::ids::{random_token, SESSION_TOKEN_BYTES};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Sesión autenticada
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: String,
    pub username: String,
    #[serde(with = "iso8601_format")]
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Instante desde el cual la sesión deja de ser válida
    pub fn expires_at(&self, timeout: Duration) -> DateTime<Utc> {
        add_duration(self.created_at, timeout)
    }

    /// Vencida cuando `now >= created_at + timeout`
    pub fn is_expired_at(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now >= self.expires_at(timeout)
    }
}

/// Store thread-safe de sesiones
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
    clock: SharedClock,
    timeout: Duration,
}

impl SessionStore {
    pub fn new(clock: SharedClock, timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            clock,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Session>>, StoreError> {
        self.sessions
            .lock()
            .map_err(|_| StoreError::LockPoisoned { store: "session" })
    }

    /// Crea y guarda una sesión nueva con un token aleatorio
    pub fn create(&self, username: &str) -> Result<Session, StoreError> {
        let mut sessions = self.lock()?;
        loop {
            let id = random_token(SESSION_TOKEN_BYTES);
            // Una colisión de 256 bits no debería ocurrir; si ocurre, se genera otro token
            if let Entry::Vacant(slot) = sessions.entry(id.clone()) {
                let session = Session {
                    id,
                    username: username.to_string(),
                    created_at: self.clock.now(),
                };
                slot.insert(session.clone());
                tracing::debug!(
                    session = %short_id(&session.id),
                    username = %session.username,
                    "session created"
                );
                return Ok(session);
            }
        }
    }

    /// Busca una sesión vigente; si está vencida la elimina y retorna `None`
    pub fn find_valid(&self, id: &str) -> Result<Option<Session>, StoreError> {
        let mut sessions = self.lock()?;
        let now = self.clock.now();

        let expired = match sessions.get(id) {
            None => return Ok(None),
            Some(session) => session.is_expired_at(now, self.timeout),
        };
        if expired {
            sessions.remove(id);
            tracing::debug!(session = %short_id(id), "expired session removed on lookup");
            return Ok(None);
        }
        Ok(sessions.get(id).cloned())
    }

    /// Elimina una sesión; no falla si no existe
    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.lock()?.remove(id);
        Ok(())
    }

    /// Elimina todas las sesiones vencidas y retorna cuántas se borraron
    pub fn cleanup_expired(&self) -> Result<usize, StoreError> {
        let mut sessions = self.lock()?;
        let now = self.clock.now();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(now, self.timeout));
        Ok(before - sessions.len())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.lock()?.is_empty())
    }
}

/// Prefijo de 8 caracteres para logs; nunca se loguea el token completo
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
