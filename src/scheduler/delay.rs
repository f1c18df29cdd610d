//! # Scheduler de tareas diferidas
//! src/scheduler/delay.rs
//!
//! Un thread temporizador mantiene un heap de tareas ordenadas por instante
//! de vencimiento; cuando una vence la pasa al [`WorkerPool`], así la espera
//! nunca ocupa un worker ni bloquea al request que la programó.
//!
//! Cada tarea programada devuelve un [`TaskHandle`] que permite esperar su
//! finalización.

use crate::scheduler::pool::{PoolError, WorkerPool};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::io;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Cómo terminó una tarea programada
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Corrió hasta el final
    Completed,

    /// Corrió y entró en pánico
    Panicked,

    /// Se descartó sin correr (scheduler apagado antes del vencimiento)
    Dropped,
}

#[derive(Debug)]
struct Signal {
    outcome: Mutex<Option<TaskOutcome>>,
    done: Condvar,
}

impl Signal {
    fn lock(&self) -> MutexGuard<'_, Option<TaskOutcome>> {
        self.outcome.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self, outcome: TaskOutcome) {
        let mut slot = self.lock();
        if slot.is_none() {
            *slot = Some(outcome);
        }
        self.done.notify_all();
    }
}

/// Marca la tarea como terminada al soltarse, corra o no corra
struct Completion {
    signal: Arc<Signal>,
    outcome: TaskOutcome,
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.signal.finish(self.outcome);
    }
}

/// Handle para esperar una tarea diferida
#[derive(Debug, Clone)]
pub struct TaskHandle {
    signal: Arc<Signal>,
}

impl TaskHandle {
    /// Bloquea hasta que la tarea termine
    pub fn wait(&self) -> TaskOutcome {
        let mut slot = self.signal.lock();
        loop {
            if let Some(outcome) = *slot {
                return outcome;
            }
            slot = self
                .signal
                .done
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Como `wait`, pero retorna `None` si vence el timeout
    pub fn wait_timeout(&self, timeout: Duration) -> Option<TaskOutcome> {
        let slot = self.signal.lock();
        let (slot, _) = self
            .signal
            .done
            .wait_timeout_while(slot, timeout, |outcome| outcome.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        *slot
    }

    pub fn is_finished(&self) -> bool {
        self.signal.lock().is_some()
    }
}

struct Scheduled {
    due: Instant,
    /// Desempate FIFO para vencimientos iguales
    seq: u64,
    task: Box<dyn FnOnce() + Send + 'static>,
}

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due
            .cmp(&other.due)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

struct TimerState {
    /// Min-heap por vencimiento
    heap: BinaryHeap<Reverse<Scheduled>>,
    next_seq: u64,
    shutting_down: bool,
}

struct TimerShared {
    state: Mutex<TimerState>,
    changed: Condvar,
}

impl TimerShared {
    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Ejecuta tareas una sola vez, después de un delay, en un pool propio
pub struct DelayScheduler {
    shared: Arc<TimerShared>,
    pool: Arc<WorkerPool>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl DelayScheduler {
    /// Crea el scheduler con `workers` threads para ejecutar las tareas vencidas
    pub fn new(name: &str, workers: usize) -> io::Result<Self> {
        let pool = Arc::new(WorkerPool::unbounded(name, workers)?);
        let shared = Arc::new(TimerShared {
            state: Mutex::new(TimerState {
                heap: BinaryHeap::new(),
                next_seq: 0,
                shutting_down: false,
            }),
            changed: Condvar::new(),
        });

        let timer = {
            let shared = Arc::clone(&shared);
            let pool = Arc::clone(&pool);
            thread::Builder::new()
                .name(format!("{}-timer", name))
                .spawn(move || Self::timer_loop(shared, pool))?
        };

        Ok(Self {
            shared,
            pool,
            timer: Mutex::new(Some(timer)),
        })
    }

    /// Programa `task` para correr una vez, no antes de `delay`
    pub fn schedule<F>(&self, delay: Duration, task: F) -> Result<TaskHandle, PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let signal = Arc::new(Signal {
            outcome: Mutex::new(None),
            done: Condvar::new(),
        });
        let mut completion = Completion {
            signal: Arc::clone(&signal),
            outcome: TaskOutcome::Dropped,
        };

        let wrapped = move || {
            let result = catch_unwind(AssertUnwindSafe(task));
            completion.outcome = match result {
                Ok(()) => TaskOutcome::Completed,
                Err(_) => TaskOutcome::Panicked,
            };
            drop(completion);
            // El pool registra el pánico en el log
            if let Err(panic) = result {
                resume_unwind(panic);
            }
        };

        let due = Instant::now()
            .checked_add(delay)
            .ok_or(PoolError::DelayOutOfRange { delay })?;

        let mut state = self.shared.lock();
        if state.shutting_down {
            return Err(PoolError::ShutDown);
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(Reverse(Scheduled {
            due,
            seq,
            task: Box::new(wrapped),
        }));
        self.shared.changed.notify_one();

        Ok(TaskHandle { signal })
    }

    /// Tareas que todavía no vencieron
    pub fn pending(&self) -> usize {
        self.shared.lock().heap.len()
    }

    /// Descarta las tareas sin vencer y espera a que terminen las que ya corren
    pub fn shutdown(&self) {
        let dropped = {
            let mut state = self.shared.lock();
            if state.shutting_down {
                return;
            }
            state.shutting_down = true;
            std::mem::take(&mut state.heap)
        };
        self.shared.changed.notify_all();

        if !dropped.is_empty() {
            tracing::warn!(count = dropped.len(), "discarding deferred tasks that never became due");
        }
        drop(dropped);

        let timer = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(timer) = timer {
            let _ = timer.join();
        }
        self.pool.shutdown();
    }

    fn timer_loop(shared: Arc<TimerShared>, pool: Arc<WorkerPool>) {
        let mut state = shared.lock();
        loop {
            if state.shutting_down {
                break;
            }

            let now = Instant::now();
            let next_due = state.heap.peek().map(|Reverse(next)| next.due);
            match next_due {
                Some(due) if due <= now => {
                    if let Some(Reverse(scheduled)) = state.heap.pop() {
                        if let Err(e) = pool.submit(scheduled.task) {
                            tracing::error!(error = %e, "failed to hand deferred task to pool");
                        }
                    }
                }
                Some(due) => {
                    state = shared
                        .changed
                        .wait_timeout(state, due - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
                None => {
                    state = shared
                        .changed
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }
}

impl Drop for DelayScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
