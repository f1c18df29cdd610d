//! # Resource API
//! src/lib.rs
//!
//! Servicio HTTP/1.x implementado desde cero sobre threads: autenticación por
//! sesión y creación asíncrona de recursos, todo en memoria.
//!
//! ## Arquitectura
//!
//! - `http`: parsing de requests, construcción de responses, gzip
//! - `router`: tabla (método, path) → `Action`
//! - `auth`: sesiones con vencimiento y credenciales configuradas
//! - `resources`: recursos, jobs y la tarea diferida que los completa
//! - `scheduler`: pool de workers y scheduler con delay
//! - `static_files`: `/health`, `/openapi.yaml`, `/AUTHORS`
//! - `server`: dispatcher y servidor TCP
//! - `config`, `clock`, `ids`, `error`: soporte
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use resource_api::config::Config;
//! use resource_api::server::Server;
//!
//! let server = Server::bind(&Config::default()).expect("bind");
//! server.run().expect("server loop");
//! ```

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod ids;
pub mod resources;
pub mod router;
pub mod scheduler;
pub mod server;
pub mod static_files;

use tracing_subscriber::EnvFilter;

/// Inicializa el logging; `RUST_LOG` tiene prioridad sobre `log_level`
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("resource_api={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .init();
}
