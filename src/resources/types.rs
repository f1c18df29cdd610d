//! # Tipos del sistema de recursos
//! src/resources/types.rs
//!
//! Define el recurso (inmutable) y el job que sigue su creación diferida.

use crate::clock::iso8601_format;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Recurso creado; no cambia después de su creación
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub id: u64,
    pub name: String,
    #[serde(with = "iso8601_format")]
    pub created_at: DateTime<Utc>,
}

/// Estado de un job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Esperando a que venza el delay de creación
    Pending,

    /// La tarea diferida está creando el recurso
    Processing,

    /// Recurso creado; `resource_id` apunta a él
    Completed,

    /// La creación falló; ver `error_message`
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Transición de estado no permitida
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid job transition from {from} to {to}")]
pub struct TransitionError {
    pub from: &'static str,
    pub to: &'static str,
}

/// Registro de un trabajo de creación asíncrona
///
/// Transiciones válidas: `pending → processing → completed | failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    pub id: String,
    pub resource_name: String,
    pub status: JobStatus,
    #[serde(with = "iso8601_format")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "iso8601_format")]
    pub estimated_completion: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Job {
    pub fn new(
        id: String,
        resource_name: String,
        created_at: DateTime<Utc>,
        estimated_completion: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            resource_name,
            status: JobStatus::Pending,
            created_at,
            estimated_completion,
            resource_id: None,
            error_message: None,
        }
    }

    fn transition(&mut self, expected: JobStatus, to: JobStatus) -> Result<(), TransitionError> {
        if self.status != expected {
            return Err(TransitionError {
                from: self.status.as_str(),
                to: to.as_str(),
            });
        }
        self.status = to;
        Ok(())
    }

    /// pending → processing
    pub fn start_processing(&mut self) -> Result<(), TransitionError> {
        self.transition(JobStatus::Pending, JobStatus::Processing)
    }

    /// processing → completed
    pub fn complete(&mut self, resource_id: u64) -> Result<(), TransitionError> {
        self.transition(JobStatus::Processing, JobStatus::Completed)?;
        self.resource_id = Some(resource_id);
        Ok(())
    }

    /// processing → failed
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(JobStatus::Processing, JobStatus::Failed)?;
        self.error_message = Some(message.into());
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.status == JobStatus::Pending
    }

    pub fn is_processing(&self) -> bool {
        self.status == JobStatus::Processing
    }

    pub fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.status == JobStatus::Failed
    }
}

/// Contadores agregados de `/resources/stats`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ResourceStats {
    pub total_resources: usize,
    /// pending + processing
    pub pending_jobs: usize,
    pub completed_jobs: usize,
    pub failed_jobs: usize,
}
