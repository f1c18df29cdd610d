//! # Servicio de recursos
//! src/resources/service.rs
//!
//! Valida la entrada, crea el job `pending` y programa la tarea diferida que
//! materializa el recurso:
//!
//! ```text
//! create_async ──► Job(pending) ──(delay)──► processing ──► completed | failed
//! ```
//!
//! La tarea diferida es la única que escribe sobre su job después de creado.

use crate::clock::SharedClock;
use crate::config::Config;
use crate::error::{ServiceError, StoreError};
use crate::resources::storage::{JobStore, ResourceStore};
use crate::resources::types::{Job, Resource, ResourceStats};
use crate::scheduler::{panic_message, DelayScheduler, TaskHandle};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

pub const NAME_REQUIRED: &str = "Resource name is required";
pub const NAME_TOO_LONG: &str = "Resource name too long";
pub const RESOURCE_NOT_FOUND: &str = "Resource not found";
pub const JOB_NOT_FOUND: &str = "Job not found";

/// Largo máximo del nombre, en caracteres, después de recortar espacios
pub const MAX_NAME_CHARS: usize = 255;

/// Configuración del servicio de recursos
#[derive(Debug, Clone)]
pub struct ResourceConfig {
    /// Espera antes de materializar el recurso
    pub creation_delay: Duration,

    /// `None` = sin límite
    pub max_resources: Option<usize>,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            creation_delay: Duration::from_secs(5),
            max_resources: None,
        }
    }
}

impl ResourceConfig {
    /// Crea una configuración desde el Config principal
    pub fn from_config(config: &Config) -> Self {
        Self {
            creation_delay: Duration::from_secs(config.creation_delay_secs),
            max_resources: (config.max_resources > 0).then_some(config.max_resources),
        }
    }
}

#[derive(Clone)]
pub struct ResourceService {
    resources: ResourceStore,
    jobs: JobStore,
    scheduler: Arc<DelayScheduler>,
    creation_delay: Duration,
}

impl ResourceService {
    pub fn new(config: ResourceConfig, clock: SharedClock, scheduler: Arc<DelayScheduler>) -> Self {
        Self {
            resources: ResourceStore::with_capacity_limit(clock.clone(), config.max_resources),
            jobs: JobStore::new(clock, config.creation_delay),
            scheduler,
            creation_delay: config.creation_delay,
        }
    }

    pub fn resources(&self) -> &ResourceStore {
        &self.resources
    }

    pub fn jobs(&self) -> &JobStore {
        &self.jobs
    }

    pub fn creation_delay(&self) -> Duration {
        self.creation_delay
    }

    /// Inicia la creación asíncrona y retorna el job `pending` de inmediato
    pub fn create_async(&self, name: &str) -> Result<Job, ServiceError> {
        self.create_async_with_handle(name).map(|(job, _)| job)
    }

    /// Igual que [`create_async`](Self::create_async), pero también retorna
    /// el handle de la tarea diferida
    pub fn create_async_with_handle(&self, name: &str) -> Result<(Job, TaskHandle), ServiceError> {
        let name = validate_name(name)?;
        let job = self.jobs.create(name)?;
        tracing::info!(job_id = %job.id, resource_name = %job.resource_name, "resource creation scheduled");

        let resources = self.resources.clone();
        let jobs = self.jobs.clone();
        let snapshot = job.clone();
        let scheduled = self
            .scheduler
            .schedule(self.creation_delay, move || materialize(&resources, &jobs, snapshot));

        match scheduled {
            Ok(handle) => Ok((job, handle)),
            Err(e) => {
                // Sin tarea diferida el job quedaría pending para siempre
                let mut orphan = job;
                fail_job(&self.jobs, &mut orphan, &e.to_string())?;
                tracing::error!(job_id = %orphan.id, error = %e, "could not schedule resource creation");
                Err(ServiceError::Internal(e.to_string()))
            }
        }
    }

    /// Todos los recursos, ordenados por fecha de creación (desempate por id)
    pub fn list_all(&self) -> Result<Vec<Resource>, ServiceError> {
        let mut resources = self.resources.all()?;
        resources.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(resources)
    }

    pub fn find_by_id(&self, id: u64) -> Result<Resource, ServiceError> {
        self.resources
            .find_by_id(id)?
            .ok_or_else(|| ServiceError::NotFound(RESOURCE_NOT_FOUND.to_string()))
    }

    pub fn get_job_status(&self, job_id: &str) -> Result<Job, ServiceError> {
        self.jobs
            .find_by_id(job_id)?
            .ok_or_else(|| ServiceError::NotFound(JOB_NOT_FOUND.to_string()))
    }

    /// Snapshot calculado recorriendo los stores
    pub fn stats(&self) -> Result<ResourceStats, ServiceError> {
        let mut stats = ResourceStats {
            total_resources: self.resources.count()?,
            ..ResourceStats::default()
        };

        for job in self.jobs.all()? {
            if job.is_pending() || job.is_processing() {
                stats.pending_jobs += 1;
            } else if job.is_completed() {
                stats.completed_jobs += 1;
            } else if job.is_failed() {
                stats.failed_jobs += 1;
            }
        }
        Ok(stats)
    }
}

/// Recorta y valida el nombre
fn validate_name(name: &str) -> Result<&str, ServiceError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation(NAME_REQUIRED.to_string()));
    }
    if trimmed.chars().count() > MAX_NAME_CHARS {
        return Err(ServiceError::Validation(NAME_TOO_LONG.to_string()));
    }
    Ok(trimmed)
}

/// Lleva el job a `failed` y lo persiste
///
/// Un job `pending` pasa antes por `processing`; uno ya terminado no se toca.
fn fail_job(jobs: &JobStore, job: &mut Job, reason: &str) -> Result<(), StoreError> {
    let started = if job.is_pending() {
        job.start_processing()
    } else {
        Ok(())
    };
    let failed = started.and_then(|()| job.fail(format!("Failed to create resource: {}", reason)));

    match failed {
        Ok(()) => {
            jobs.update(job)?;
            tracing::info!(job_id = %job.id, status = job.status.as_str(), "job transition");
            Ok(())
        }
        Err(e) => {
            tracing::error!(job_id = %job.id, error = %e, "job already finished, not marking it failed");
            Ok(())
        }
    }
}

/// Último recurso de la tarea diferida: si ni el fallo se puede guardar, queda en el log
fn abandon(jobs: &JobStore, mut job: Job, reason: &str) {
    if let Err(e) = fail_job(jobs, &mut job, reason) {
        tracing::error!(job_id = %job.id, error = %e, "could not persist failed job");
    }
}

/// Cuerpo de la tarea diferida
fn materialize(resources: &ResourceStore, jobs: &JobStore, mut job: Job) {
    if let Err(e) = job.start_processing() {
        tracing::error!(job_id = %job.id, error = %e, "deferred task found job in unexpected state");
        abandon(jobs, job, &e.to_string());
        return;
    }
    if let Err(e) = jobs.update(&job) {
        tracing::error!(job_id = %job.id, error = %e, "could not persist job transition");
        abandon(jobs, job, &e.to_string());
        return;
    }
    tracing::info!(job_id = %job.id, status = job.status.as_str(), "job transition");

    let created = catch_unwind(AssertUnwindSafe(|| resources.create(&job.resource_name)))
        .map_err(|panic| panic_message(panic.as_ref()))
        .and_then(|result| result.map_err(|e| e.to_string()));

    let resource = match created {
        Ok(resource) => resource,
        Err(reason) => {
            tracing::warn!(job_id = %job.id, %reason, "resource creation failed");
            abandon(jobs, job, &reason);
            return;
        }
    };

    if let Err(e) = job.complete(resource.id) {
        tracing::error!(job_id = %job.id, error = %e, "invalid job transition");
        return;
    }
    match jobs.update(&job) {
        Ok(()) => tracing::info!(
            job_id = %job.id,
            status = job.status.as_str(),
            resource_id = ?job.resource_id,
            "job transition"
        ),
        Err(e) => tracing::error!(job_id = %job.id, error = %e, "could not persist job transition"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::resources::types::JobStatus;
    use crate::scheduler::TaskOutcome;
    use std::thread;
    use std::time::Instant;

    const WAIT: Duration = Duration::from_secs(5);

    fn service_with(config: ResourceConfig) -> (Arc<ManualClock>, ResourceService) {
        let clock = Arc::new(ManualClock::new());
        let scheduler = Arc::new(DelayScheduler::new("test-deferred", 2).unwrap());
        (clock.clone(), ResourceService::new(config, clock, scheduler))
    }

    fn service(delay: Duration) -> ResourceService {
        service_with(ResourceConfig {
            creation_delay: delay,
            max_resources: None,
        })
        .1
    }

    // ==================== Validación ====================

    #[test]
    fn test_name_required() {
        let service = service(Duration::ZERO);
        for name in ["", "   ", "\t\n"] {
            assert_eq!(
                service.create_async(name).unwrap_err(),
                ServiceError::Validation("Resource name is required".to_string())
            );
        }
        assert_eq!(service.jobs().count().unwrap(), 0);
    }

    #[test]
    fn test_name_too_long() {
        let service = service(Duration::ZERO);
        assert_eq!(
            service.create_async(&"a".repeat(256)).unwrap_err(),
            ServiceError::Validation("Resource name too long".to_string())
        );
        assert!(service.create_async(&"a".repeat(255)).is_ok());
    }

    #[test]
    fn test_name_length_counts_characters() {
        let service = service(Duration::ZERO);
        // 255 caracteres de 2 bytes
        assert!(service.create_async(&"ñ".repeat(255)).is_ok());
        assert!(service.create_async(&"ñ".repeat(256)).is_err());
    }

    #[test]
    fn test_name_is_trimmed() {
        let service = service(Duration::from_secs(3600));
        let job = service.create_async("  X  ").unwrap();

        assert_eq!(job.resource_name, "X");
        assert_eq!(service.get_job_status(&job.id).unwrap().resource_name, "X");
    }

    // ==================== Ciclo de vida ====================

    #[test]
    fn test_create_returns_pending_then_completes() {
        let service = service(Duration::from_millis(100));
        let (job, handle) = service.create_async_with_handle("Widget").unwrap();

        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(service.get_job_status(&job.id).unwrap().status, JobStatus::Pending);

        assert_eq!(handle.wait_timeout(WAIT), Some(TaskOutcome::Completed));

        let done = service.get_job_status(&job.id).unwrap();
        assert_eq!(done.status, JobStatus::Completed);
        let resource = service.find_by_id(done.resource_id.unwrap()).unwrap();
        assert_eq!(resource.name, "Widget");
        assert_eq!(done.error_message, None);
    }

    #[test]
    fn test_estimated_completion_uses_delay() {
        let (clock, service) = service_with(ResourceConfig {
            creation_delay: Duration::from_secs(5),
            max_resources: None,
        });
        let job = service.create_async("Widget").unwrap();

        assert_eq!(job.created_at, clock.now());
        assert_eq!((job.estimated_completion - job.created_at).num_seconds(), 5);
    }

    #[test]
    fn test_full_store_fails_job() {
        let (_, service) = service_with(ResourceConfig {
            creation_delay: Duration::ZERO,
            max_resources: Some(1),
        });

        let (_, first) = service.create_async_with_handle("one").unwrap();
        first.wait_timeout(WAIT).unwrap();

        let (job, second) = service.create_async_with_handle("two").unwrap();
        assert_eq!(second.wait_timeout(WAIT), Some(TaskOutcome::Completed));

        let failed = service.get_job_status(&job.id).unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.resource_id, None);
        assert_eq!(
            failed.error_message.as_deref(),
            Some("Failed to create resource: resource store is full (max 1 resources)")
        );
    }

    #[test]
    fn test_concurrent_creations_unique_ids() {
        let service = service(Duration::ZERO);
        let handles: Vec<_> = (0..40)
            .map(|i| service.create_async_with_handle(&format!("r{}", i)).unwrap())
            .collect();

        for (_, handle) in &handles {
            assert_eq!(handle.wait_timeout(WAIT), Some(TaskOutcome::Completed));
        }

        let mut ids: Vec<u64> = handles
            .iter()
            .map(|(job, _)| service.get_job_status(&job.id).unwrap().resource_id.unwrap())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=40).collect::<Vec<_>>());
    }

    #[test]
    fn test_schedule_failure_marks_job_failed() {
        let service = service(Duration::ZERO);
        service.scheduler.shutdown();

        let err = service.create_async("Widget").unwrap_err();
        assert!(matches!(err, ServiceError::Internal(_)));

        let jobs = service.jobs().all().unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].is_failed());
    }

    #[test]
    fn test_unschedulable_delay_fails_job() {
        let service = service(Duration::from_secs(u64::MAX));

        let err = service.create_async("Widget").unwrap_err();
        assert!(matches!(err, ServiceError::Internal(_)));

        let jobs = service.jobs().all().unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].is_failed());
        assert!(jobs[0]
            .error_message
            .as_deref()
            .unwrap()
            .starts_with("Failed to create resource: delay of"));
        assert_eq!(service.stats().unwrap().pending_jobs, 0);
    }

    #[test]
    fn test_processing_is_visible_while_resource_is_created() {
        let service = service(Duration::ZERO);

        // Con el store de recursos bloqueado la tarea se queda en processing
        let held = service.resources().hold();
        let (job, handle) = service.create_async_with_handle("Widget").unwrap();

        let deadline = Instant::now() + WAIT;
        let mut observed = vec![job.status];
        loop {
            let status = service.get_job_status(&job.id).unwrap().status;
            if observed.last() != Some(&status) {
                observed.push(status);
            }
            if status == JobStatus::Processing {
                break;
            }
            assert!(Instant::now() < deadline, "job never reached processing");
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!handle.is_finished());

        drop(held);
        assert_eq!(handle.wait_timeout(WAIT), Some(TaskOutcome::Completed));
        observed.push(service.get_job_status(&job.id).unwrap().status);

        assert_eq!(
            observed,
            vec![JobStatus::Pending, JobStatus::Processing, JobStatus::Completed]
        );
    }

    #[test]
    fn test_fail_job_from_each_state() {
        let service = service(Duration::from_secs(3600));
        let jobs = service.jobs();

        // pending → processing → failed
        let mut pending = jobs.create("a").unwrap();
        fail_job(jobs, &mut pending, "boom").unwrap();
        let stored = jobs.find_by_id(&pending.id).unwrap().unwrap();
        assert!(stored.is_failed());
        assert_eq!(
            stored.error_message.as_deref(),
            Some("Failed to create resource: boom")
        );

        // processing → failed
        let mut processing = jobs.create("b").unwrap();
        processing.start_processing().unwrap();
        jobs.update(&processing).unwrap();
        fail_job(jobs, &mut processing, "boom").unwrap();
        assert!(jobs.find_by_id(&processing.id).unwrap().unwrap().is_failed());

        // Un job completado no se reabre
        let mut done = jobs.create("c").unwrap();
        done.start_processing().unwrap();
        done.complete(9).unwrap();
        jobs.update(&done).unwrap();
        fail_job(jobs, &mut done, "late").unwrap();
        let stored = jobs.find_by_id(&done.id).unwrap().unwrap();
        assert!(stored.is_completed());
        assert_eq!(stored.resource_id, Some(9));
        assert_eq!(stored.error_message, None);
    }

    #[test]
    fn test_materialize_fails_job_it_cannot_start() {
        let service = service(Duration::from_secs(3600));
        let mut job = service.jobs().create("Widget").unwrap();
        job.start_processing().unwrap();
        service.jobs().update(&job).unwrap();

        // Snapshot ya en processing: no se puede volver a iniciar
        materialize(service.resources(), service.jobs(), job.clone());

        let stored = service.get_job_status(&job.id).unwrap();
        assert!(stored.is_failed());
        assert_eq!(service.resources().count().unwrap(), 0);
    }

    // ==================== Consultas ====================

    #[test]
    fn test_find_by_id_not_found() {
        let service = service(Duration::ZERO);
        assert_eq!(
            service.find_by_id(42).unwrap_err(),
            ServiceError::NotFound("Resource not found".to_string())
        );
    }

    #[test]
    fn test_get_job_status_not_found() {
        let service = service(Duration::ZERO);
        assert_eq!(
            service.get_job_status("nope").unwrap_err(),
            ServiceError::NotFound("Job not found".to_string())
        );
    }

    #[test]
    fn test_list_all_sorted_by_creation_time() {
        let (clock, service) = service_with(ResourceConfig::default());

        service.resources().create("first").unwrap();
        clock.advance(Duration::from_secs(10));
        service.resources().create("second").unwrap();
        // Mismo instante: desempata el id
        service.resources().create("third").unwrap();

        let names: Vec<String> = service
            .list_all()
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_stats_snapshot() {
        let service = service(Duration::from_secs(3600));

        // 1 recurso creado directamente
        service.resources().create("direct").unwrap();

        // 1 job pending
        service.create_async("waiting").unwrap();

        // 1 job completado a mano
        let mut done = service.jobs().create("done").unwrap();
        done.start_processing().unwrap();
        done.complete(1).unwrap();
        service.jobs().update(&done).unwrap();

        assert_eq!(
            service.stats().unwrap(),
            ResourceStats {
                total_resources: 1,
                pending_jobs: 1,
                completed_jobs: 1,
                failed_jobs: 0,
            }
        );
    }

    #[test]
    fn test_stats_counts_processing_as_pending() {
        let service = service(Duration::from_secs(3600));
        let mut job = service.jobs().create("busy").unwrap();
        job.start_processing().unwrap();
        service.jobs().update(&job).unwrap();

        assert_eq!(service.stats().unwrap().pending_jobs, 1);
    }
}
