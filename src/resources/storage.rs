//! # Stores en memoria de recursos y jobs
//! src/resources/storage.rs
//!
//! Ambos stores son `Clone` baratos: comparten el mapa interno vía `Arc`.

use crate::clock::{add_duration, SharedClock};
use crate::error::StoreError;
use crate::ids::{random_token, JOB_TOKEN_BYTES};
use crate::resources::types::{Job, Resource};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Store de recursos con ids enteros crecientes
#[derive(Clone)]
pub struct ResourceStore {
    resources: Arc<Mutex<HashMap<u64, Resource>>>,

    /// Último id asignado
    last_id: Arc<AtomicU64>,

    clock: SharedClock,

    /// `None` = sin límite
    max_resources: Option<usize>,
}

impl ResourceStore {
    pub fn new(clock: SharedClock) -> Self {
        Self::with_capacity_limit(clock, None)
    }

    pub fn with_capacity_limit(clock: SharedClock, max_resources: Option<usize>) -> Self {
        Self {
            resources: Arc::new(Mutex::new(HashMap::new())),
            last_id: Arc::new(AtomicU64::new(0)),
            clock,
            max_resources,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<u64, Resource>>, StoreError> {
        self.resources
            .lock()
            .map_err(|_| StoreError::LockPoisoned { store: "resource" })
    }

    /// Asigna el siguiente id y guarda el recurso
    ///
    /// El id se toma con el lock del mapa tomado: si el store está lleno no
    /// se consume ningún id, así que la secuencia no tiene huecos.
    pub fn create(&self, name: &str) -> Result<Resource, StoreError> {
        let mut resources = self.lock()?;
        if let Some(max) = self.max_resources {
            if resources.len() >= max {
                return Err(StoreError::CapacityExceeded { max });
            }
        }

        let id = self.last_id.fetch_add(1, Ordering::SeqCst) + 1;
        let resource = Resource {
            id,
            name: name.to_string(),
            created_at: self.clock.now(),
        };
        resources.insert(id, resource.clone());
        Ok(resource)
    }

    /// Toma el lock del mapa; mientras viva el guard ninguna creación avanza
    #[cfg(test)]
    pub(crate) fn hold(&self) -> MutexGuard<'_, HashMap<u64, Resource>> {
        self.resources.lock().unwrap()
    }

    pub fn find_by_id(&self, id: u64) -> Result<Option<Resource>, StoreError> {
        Ok(self.lock()?.get(&id).cloned())
    }

    /// Todos los recursos, sin orden garantizado
    pub fn all(&self) -> Result<Vec<Resource>, StoreError> {
        Ok(self.lock()?.values().cloned().collect())
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.len())
    }
}

/// Store de jobs indexado por id opaco
#[derive(Clone)]
pub struct JobStore {
    jobs: Arc<Mutex<HashMap<String, Job>>>,
    clock: SharedClock,

    /// Delay configurado; define `estimated_completion`
    creation_delay: Duration,
}

impl JobStore {
    pub fn new(clock: SharedClock, creation_delay: Duration) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            clock,
            creation_delay,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Job>>, StoreError> {
        self.jobs
            .lock()
            .map_err(|_| StoreError::LockPoisoned { store: "job" })
    }

    /// Crea un job `pending` con id nuevo
    pub fn create(&self, resource_name: &str) -> Result<Job, StoreError> {
        let mut jobs = self.lock()?;
        loop {
            let id = random_token(JOB_TOKEN_BYTES);
            if let Entry::Vacant(slot) = jobs.entry(id.clone()) {
                let created_at = self.clock.now();
                let job = Job::new(
                    id,
                    resource_name.to_string(),
                    created_at,
                    add_duration(created_at, self.creation_delay),
                );
                slot.insert(job.clone());
                return Ok(job);
            }
        }
    }

    pub fn find_by_id(&self, id: &str) -> Result<Option<Job>, StoreError> {
        Ok(self.lock()?.get(id).cloned())
    }

    /// Reemplaza el registro guardado con este snapshot (gana la última escritura)
    pub fn update(&self, job: &Job) -> Result<(), StoreError> {
        self.lock()?.insert(job.id.clone(), job.clone());
        Ok(())
    }

    pub fn all(&self) -> Result<Vec<Job>, StoreError> {
        Ok(self.lock()?.values().cloned().collect())
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.len())
    }
}
