//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del servicio con soporte para argumentos CLI y variables de
//! entorno. Los componentes no leen este struct directamente: cada uno
//! recibe su propia configuración (`AuthConfig`, `ResourceConfig`,
//! `ServerConfig`) construida con `from_config`.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./resource_api --port 8080 \
//!   --workers 8 \
//!   --session-timeout 3600 \
//!   --creation-delay 5
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 SESSION_TIMEOUT=600 RESOURCE_CREATION_DELAY=2 ./resource_api
//! ```

use clap::{Parser, ValueEnum};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Entorno de ejecución; en `development` los errores 500 sugieren revisar los logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Environment {
    Development,
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Valores de configuración inválidos
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be >= 1")]
    MustBePositive(&'static str),

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Configuración del servicio
#[derive(Debug, Clone, Parser)]
#[command(name = "resource_api")]
#[command(about = "Servicio HTTP de recursos con sesiones y creación asíncrona")]
#[command(version)]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    // === Workers ===

    /// Threads que atienden conexiones
    #[arg(long, default_value = "8", env = "WORKERS")]
    pub workers: usize,

    /// Conexiones en espera antes de responder 503
    #[arg(long = "queue-capacity", default_value = "256", env = "QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Threads que ejecutan las creaciones diferidas
    #[arg(long = "deferred-workers", default_value = "2", env = "DEFERRED_WORKERS")]
    pub deferred_workers: usize,

    /// Sugerencia de reintento (segundos) en respuestas 503
    #[arg(long = "retry-after", default_value = "5", env = "RETRY_AFTER")]
    pub retry_after_secs: u64,

    // === Sesiones ===

    /// Duración de una sesión en segundos
    #[arg(long = "session-timeout", default_value = "3600", env = "SESSION_TIMEOUT")]
    pub session_timeout_secs: u64,

    /// Cada cuántos segundos se purgan sesiones vencidas (0 = nunca)
    #[arg(long = "session-sweep-interval", default_value = "300", env = "SESSION_SWEEP_INTERVAL")]
    pub session_sweep_interval_secs: u64,

    /// Usuario aceptado por /auth
    #[arg(long, default_value = "admin", env = "DEFAULT_USERNAME")]
    pub username: String,

    /// Contraseña aceptada por /auth
    #[arg(long, default_value = "password", env = "DEFAULT_PASSWORD", hide_env_values = true)]
    pub password: String,

    // === Recursos ===

    /// Segundos entre POST /resources y la creación del recurso
    #[arg(long = "creation-delay", default_value = "5", env = "RESOURCE_CREATION_DELAY")]
    pub creation_delay_secs: u64,

    /// Máximo de recursos en memoria (0 = sin límite)
    #[arg(long = "max-resources", default_value = "0", env = "MAX_RESOURCES")]
    pub max_resources: usize,

    // === Varios ===

    /// Directorio con openapi.yaml y AUTHORS
    #[arg(long = "public-dir", default_value = "./public", env = "PUBLIC_DIR")]
    pub public_dir: PathBuf,

    #[arg(long, value_enum, default_value = "production", env = "APP_ENV")]
    pub environment: Environment,

    /// Nivel de log por defecto (RUST_LOG tiene prioridad)
    #[arg(long = "log-level", default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,
}

impl Config {
    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use resource_api::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::MustBePositive("workers"));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::MustBePositive("queue capacity"));
        }
        if self.deferred_workers == 0 {
            return Err(ConfigError::MustBePositive("deferred workers"));
        }
        if self.session_timeout_secs == 0 {
            return Err(ConfigError::MustBePositive("session timeout"));
        }
        if self.username.is_empty() {
            return Err(ConfigError::Empty("username"));
        }
        if self.password.is_empty() {
            return Err(ConfigError::Empty("password"));
        }
        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    /// Registra un resumen de la configuración (nunca la contraseña)
    pub fn log_summary(&self) {
        tracing::info!(
            address = %self.address(),
            environment = %self.environment,
            workers = self.workers,
            queue_capacity = self.queue_capacity,
            deferred_workers = self.deferred_workers,
            "network"
        );
        tracing::info!(
            session_timeout_secs = self.session_timeout_secs,
            session_sweep_interval_secs = self.session_sweep_interval_secs,
            creation_delay_secs = self.creation_delay_secs,
            max_resources = self.max_resources,
            public_dir = %self.public_dir.display(),
            username = %self.username,
            "service"
        );
    }
}

impl Default for Config {
    /// Configuración por defecto (la misma que sin argumentos ni env)
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            workers: 8,
            queue_capacity: 256,
            deferred_workers: 2,
            retry_after_secs: 5,
            session_timeout_secs: 3600,
            session_sweep_interval_secs: 300,
            username: "admin".to_string(),
            password: "password".to_string(),
            creation_delay_secs: 5,
            max_resources: 0,
            public_dir: PathBuf::from("./public"),
            environment: Environment::Production,
            log_level: "info".to_string(),
        }
    }
}
