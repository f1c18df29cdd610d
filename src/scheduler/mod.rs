//! # Ejecución concurrente
//! src/scheduler/mod.rs
//!
//! - [`WorkerPool`]: cola de tareas + threads fijos (conexiones y tareas vencidas)
//! - [`DelayScheduler`]: tareas de una sola ejecución después de un delay

pub mod delay;
pub mod pool;

pub use delay::{DelayScheduler, TaskHandle, TaskOutcome};
pub use pool::{PoolError, WorkerPool};

use std::any::Any;

/// Extrae el mensaje de un payload de pánico
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
