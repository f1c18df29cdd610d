//! # Sistema de recursos
//! src/resources/mod.rs
//!
//! Creación asíncrona de recursos seguida por jobs:
//!
//! ```text
//! POST /resources → Job(pending) ─delay→ processing → completed | failed
//! GET /resources/status?job_id=… → snapshot del job
//! ```

pub mod handlers;
pub mod service;
pub mod storage;
pub mod types;

pub use service::{ResourceConfig, ResourceService};
pub use storage::{JobStore, ResourceStore};
pub use types::{Job, JobStatus, Resource, ResourceStats, TransitionError};
