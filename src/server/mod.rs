//! # Módulo del servidor
//! src/server/mod.rs
//!
//! - `dispatcher`: ruteo, autenticación y frontera de errores por request
//! - `tcp`: socket, pool de conexiones, backpressure y purga de sesiones

pub mod dispatcher;
pub mod tcp;

pub use dispatcher::Dispatcher;
pub use tcp::{Server, ServerConfig};
