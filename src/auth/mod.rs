//! # Autenticación
//! src/auth/mod.rs
//!
//! Un único par de credenciales configurado; las sesiones viven en memoria y
//! vencen `session_timeout` después de creadas.

pub mod handlers;
pub mod service;
pub mod session;

pub use service::{AuthConfig, AuthService};
pub use session::{Session, SessionStore};
