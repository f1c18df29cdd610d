//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Mapea (método, path) a una [`Action`] del servicio.
//!
//! ```text
//! Request → Router → Action (+ params) → Handler → Response
//! ```
//!
//! Las reglas se evalúan en orden de declaración y gana la primera que
//! coincide: las rutas literales más específicas deben declararse antes que
//! los patrones con captura del mismo método.

use crate::http::Method;
use regex::Regex;
use std::collections::HashMap;
use thiserror::Error;

/// Acciones que sabe despachar el servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    AuthLogin,
    ResourcesIndex,
    ResourcesCreate,
    ResourcesJobStatus,
    ResourcesStats,
    ResourcesShow,
    StaticOpenapi,
    StaticAuthors,
    StaticHealth,
}

impl Action {
    /// Nombre estable para logs
    pub fn name(&self) -> &'static str {
        match self {
            Action::AuthLogin => "auth_login",
            Action::ResourcesIndex => "resources_index",
            Action::ResourcesCreate => "resources_create",
            Action::ResourcesJobStatus => "resources_job_status",
            Action::ResourcesStats => "resources_stats",
            Action::ResourcesShow => "resources_show",
            Action::StaticOpenapi => "static_openapi",
            Action::StaticAuthors => "static_authors",
            Action::StaticHealth => "static_health",
        }
    }
}

/// Errores al construir la tabla de rutas
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid route pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("route pattern {pattern} must have exactly one capture group")]
    CaptureCount { pattern: String },
}

/// Patrón de path: literal o expresión con un único grupo de captura
#[derive(Debug, Clone)]
pub enum RoutePattern {
    Exact(String),
    Capture { regex: Regex, param: &'static str },
}

impl RoutePattern {
    pub fn exact(path: &str) -> Self {
        RoutePattern::Exact(path.to_string())
    }

    /// Crea un patrón con captura; el valor capturado queda en `param`
    ///
    /// ```
    /// use resource_api::router::RoutePattern;
    ///
    /// assert!(RoutePattern::capture(r"^/resources/(\d+)$", "id").is_ok());
    /// assert!(RoutePattern::capture(r"^/resources/\d+$", "id").is_err());
    /// ```
    pub fn capture(pattern: &str, param: &'static str) -> Result<Self, RouteError> {
        let regex = Regex::new(pattern)?;
        // captures_len incluye el grupo 0 (match completo)
        if regex.captures_len() != 2 {
            return Err(RouteError::CaptureCount {
                pattern: pattern.to_string(),
            });
        }
        Ok(RoutePattern::Capture { regex, param })
    }

    fn matches(&self, path: &str) -> Option<HashMap<&'static str, String>> {
        match self {
            RoutePattern::Exact(literal) => (literal == path).then(HashMap::new),
            RoutePattern::Capture { regex, param } => {
                let captures = regex.captures(path)?;
                let value = captures.get(1)?.as_str().to_string();
                Some(HashMap::from([(*param, value)]))
            }
        }
    }
}

/// Resultado de un match exitoso
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub action: Action,
    pub params: HashMap<&'static str, String>,
}

impl RouteMatch {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(|s| s.as_str())
    }
}

/// Tabla ordenada de reglas (método, patrón, acción)
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<(Method, RoutePattern, Action)>,
}

impl Router {
    /// Crea un router vacío
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Tabla de rutas del servicio
    pub fn standard() -> Result<Self, RouteError> {
        let mut router = Router::new();
        router.register(Method::POST, RoutePattern::exact("/auth"), Action::AuthLogin);
        router.register(Method::GET, RoutePattern::exact("/resources"), Action::ResourcesIndex);
        router.register(Method::POST, RoutePattern::exact("/resources"), Action::ResourcesCreate);
        router.register(
            Method::GET,
            RoutePattern::exact("/resources/status"),
            Action::ResourcesJobStatus,
        );
        router.register(
            Method::GET,
            RoutePattern::exact("/resources/stats"),
            Action::ResourcesStats,
        );
        router.register(
            Method::GET,
            RoutePattern::capture(r"^/resources/(\d+)$", "id")?,
            Action::ResourcesShow,
        );
        router.register(Method::GET, RoutePattern::exact("/openapi.yaml"), Action::StaticOpenapi);
        router.register(Method::GET, RoutePattern::exact("/AUTHORS"), Action::StaticAuthors);
        router.register(Method::GET, RoutePattern::exact("/health"), Action::StaticHealth);
        Ok(router)
    }

    /// Agrega una regla al final de la tabla
    pub fn register(&mut self, method: Method, pattern: RoutePattern, action: Action) {
        self.routes.push((method, pattern, action));
    }

    /// Busca la primera regla que coincide con el método y el path
    ///
    /// `None` significa "sin ruta"; quien llama lo traduce a 404.
    pub fn match_route(&self, method: Method, path: &str) -> Option<RouteMatch> {
        self.routes
            .iter()
            .filter(|(route_method, _, _)| *route_method == method)
            .find_map(|(_, pattern, action)| {
                pattern.matches(path).map(|params| RouteMatch {
                    action: *action,
                    params,
                })
            })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard() -> Router {
        Router::standard().unwrap()
    }

    #[test]
    fn test_router_creation() {
        let router = Router::new();
        assert!(router.is_empty());
        assert_eq!(standard().len(), 9);
    }

    #[test]
    fn test_exact_routes() {
        let router = standard();

        let m = router.match_route(Method::POST, "/auth").unwrap();
        assert_eq!(m.action, Action::AuthLogin);
        assert!(m.params.is_empty());

        assert_eq!(
            router.match_route(Method::GET, "/resources").unwrap().action,
            Action::ResourcesIndex
        );
        assert_eq!(
            router.match_route(Method::POST, "/resources").unwrap().action,
            Action::ResourcesCreate
        );
        assert_eq!(
            router.match_route(Method::GET, "/health").unwrap().action,
            Action::StaticHealth
        );
    }

    #[test]
    fn test_capture_route() {
        let m = standard().match_route(Method::GET, "/resources/42").unwrap();

        assert_eq!(m.action, Action::ResourcesShow);
        assert_eq!(m.param("id"), Some("42"));
    }

    #[test]
    fn test_literal_declared_before_capture_wins() {
        let router = standard();

        let status = router.match_route(Method::GET, "/resources/status").unwrap();
        assert_eq!(status.action, Action::ResourcesJobStatus);
        assert!(status.params.is_empty());

        let stats = router.match_route(Method::GET, "/resources/stats").unwrap();
        assert_eq!(stats.action, Action::ResourcesStats);
    }

    #[test]
    fn test_declaration_order_decides() {
        // Con un patrón que acepta cualquier segmento, el orden es lo único
        // que separa la ruta literal del catch-all
        let mut literal_first = Router::new();
        literal_first.register(Method::GET, RoutePattern::exact("/items/status"), Action::ResourcesJobStatus);
        literal_first.register(
            Method::GET,
            RoutePattern::capture(r"^/items/([^/]+)$", "id").unwrap(),
            Action::ResourcesShow,
        );
        assert_eq!(
            literal_first.match_route(Method::GET, "/items/status").unwrap().action,
            Action::ResourcesJobStatus
        );

        let mut capture_first = Router::new();
        capture_first.register(
            Method::GET,
            RoutePattern::capture(r"^/items/([^/]+)$", "id").unwrap(),
            Action::ResourcesShow,
        );
        capture_first.register(Method::GET, RoutePattern::exact("/items/status"), Action::ResourcesJobStatus);
        let m = capture_first.match_route(Method::GET, "/items/status").unwrap();
        assert_eq!(m.action, Action::ResourcesShow);
        assert_eq!(m.param("id"), Some("status"));
    }

    // ==================== Sin match ====================

    #[test]
    fn test_no_match() {
        let router = standard();

        assert!(router.match_route(Method::GET, "/nonexistent").is_none());
        assert!(router.match_route(Method::GET, "/resources/abc").is_none());
        assert!(router.match_route(Method::GET, "/resources/42/extra").is_none());
        assert!(router.match_route(Method::GET, "/resources/").is_none());
    }

    #[test]
    fn test_method_must_match() {
        let router = standard();

        assert!(router.match_route(Method::GET, "/auth").is_none());
        assert!(router.match_route(Method::DELETE, "/resources/1").is_none());
        assert!(router.match_route(Method::POST, "/resources/status").is_none());
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(matches!(
            RoutePattern::capture(r"^/a/(\d+)/(\d+)$", "id"),
            Err(RouteError::CaptureCount { .. })
        ));
        assert!(matches!(
            RoutePattern::capture(r"^/a/(\d+$", "id"),
            Err(RouteError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_action_names() {
        assert_eq!(Action::ResourcesShow.name(), "resources_show");
        assert_eq!(Action::AuthLogin.name(), "auth_login");
    }
}
