//! # Pool de Workers
//! src/scheduler/pool.rs
//!
//! Cola FIFO thread-safe (VecDeque + Condvar) atendida por un número fijo de
//! threads con nombre. La cola puede ser acotada: si está llena, `submit`
//! retorna `PoolError::QueueFull` sin bloquear a quien llama.

use crate::scheduler::panic_message;
use std::collections::VecDeque;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

/// Tarea encolable
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Errores al encolar
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("queue is full (max capacity: {capacity})")]
    QueueFull { capacity: usize },

    #[error("worker pool is shut down")]
    ShutDown,

    /// El delay no se puede representar como instante
    #[error("delay of {delay:?} is out of range")]
    DelayOutOfRange { delay: Duration },
}

struct PoolState {
    tasks: VecDeque<Task>,
    shutting_down: bool,
}

struct Shared {
    state: Mutex<PoolState>,

    /// Notifica a los workers cuando hay tareas o cuando se apaga el pool
    available: Condvar,

    /// `None` = sin límite
    capacity: Option<usize>,
}

impl Shared {
    // Las tareas corren fuera del lock, así que un pánico nunca deja el
    // estado a medias: es seguro recuperar el guard envenenado.
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Pool de threads con cola compartida
pub struct WorkerPool {
    name: String,
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Crea un pool con cola acotada a `capacity` tareas en espera
    pub fn bounded(name: &str, workers: usize, capacity: usize) -> io::Result<Self> {
        Self::start(name, workers, Some(capacity))
    }

    /// Crea un pool cuya cola no rechaza tareas
    pub fn unbounded(name: &str, workers: usize) -> io::Result<Self> {
        Self::start(name, workers, None)
    }

    fn start(name: &str, workers: usize, capacity: Option<usize>) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState {
                tasks: VecDeque::new(),
                shutting_down: false,
            }),
            available: Condvar::new(),
            capacity,
        });

        let pool = Self {
            name: name.to_string(),
            shared,
            workers: Mutex::new(Vec::with_capacity(workers)),
        };

        for i in 0..workers.max(1) {
            let shared = Arc::clone(&pool.shared);
            let worker_name = format!("{}-{}", name, i);
            let handle = thread::Builder::new()
                .name(worker_name.clone())
                .spawn(move || Self::worker_loop(worker_name, shared))?;
            pool.workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(handle);
        }

        tracing::debug!(pool = %name, workers = workers.max(1), ?capacity, "worker pool started");
        Ok(pool)
    }

    /// Encola una tarea
    pub fn submit<F>(&self, task: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.shared.lock();
        if state.shutting_down {
            return Err(PoolError::ShutDown);
        }
        if let Some(capacity) = self.shared.capacity {
            if state.tasks.len() >= capacity {
                return Err(PoolError::QueueFull { capacity });
            }
        }

        state.tasks.push_back(Box::new(task));
        self.shared.available.notify_one();
        Ok(())
    }

    /// Tareas en espera (no incluye las que se están ejecutando)
    pub fn queued(&self) -> usize {
        self.shared.lock().tasks.len()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.shared.capacity
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deja de aceptar tareas, drena la cola y espera a los workers
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.lock();
            if state.shutting_down {
                return;
            }
            state.shutting_down = true;
        }
        self.shared.available.notify_all();

        let handles: Vec<JoinHandle<()>> = self
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        let current = thread::current().id();
        for handle in handles {
            // Un worker que suelta la última referencia al pool no puede esperarse a sí mismo
            if handle.thread().id() == current {
                continue;
            }
            let _ = handle.join();
        }
        tracing::debug!(pool = %self.name, "worker pool stopped");
    }

    fn worker_loop(name: String, shared: Arc<Shared>) {
        tracing::trace!(worker = %name, "worker started");

        loop {
            let task = {
                let mut state = shared.lock();
                loop {
                    if let Some(task) = state.tasks.pop_front() {
                        break Some(task);
                    }
                    if state.shutting_down {
                        break None;
                    }
                    state = shared
                        .available
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            };

            let Some(task) = task else {
                break;
            };

            if let Err(panic) = catch_unwind(AssertUnwindSafe(task)) {
                tracing::error!(worker = %name, panic = %panic_message(panic.as_ref()), "task panicked");
            }
        }

        tracing::trace!(worker = %name, "worker exiting");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
