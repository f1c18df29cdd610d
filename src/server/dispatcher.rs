//! # Dispatcher
//! src/server/dispatcher.rs
//!
//! Ciclo de cada request:
//!
//! ```text
//! recibido → ruteado → (autenticado si es protegido) → handler → respuesta
//!               │               │                        │
//!              404             401                  400/404/500
//! ```
//!
//! El handler corre dentro de `catch_unwind`: un pánico se convierte en 500 y
//! el detalle queda solo en el log.

use crate::auth::handlers::{self as auth_handlers, session_token};
use crate::auth::{AuthConfig, AuthService};
use crate::clock::SharedClock;
use crate::config::{Config, Environment};
use crate::error::{ServerError, ServiceError};
use crate::http::{Request, Response, StatusCode};
use crate::resources::handlers as resource_handlers;
use crate::resources::{ResourceConfig, ResourceService};
use crate::router::{Action, RouteMatch, Router};
use crate::scheduler::{panic_message, DelayScheduler};
use crate::static_files;
use serde_json::json;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

/// Todo path que empiece con este prefijo requiere sesión
pub const PROTECTED_PREFIX: &str = "/resources";

pub const INTERNAL_ERROR: &str = "Internal server error";
pub const INTERNAL_ERROR_DEV: &str = "Internal server error - check logs for details";

pub struct Dispatcher {
    router: Router,
    auth: AuthService,
    resources: ResourceService,
    clock: SharedClock,
    public_dir: PathBuf,
    environment: Environment,
}

impl Dispatcher {
    pub fn new(
        router: Router,
        auth: AuthService,
        resources: ResourceService,
        clock: SharedClock,
        public_dir: PathBuf,
        environment: Environment,
    ) -> Self {
        Self {
            router,
            auth,
            resources,
            clock,
            public_dir,
            environment,
        }
    }

    /// Arma el dispatcher completo (servicios, stores y scheduler) desde el Config
    pub fn from_config(config: &Config, clock: SharedClock) -> Result<Self, ServerError> {
        let scheduler = Arc::new(DelayScheduler::new("deferred", config.deferred_workers)?);
        let auth = AuthService::new(AuthConfig::from_config(config), clock.clone());
        let resources = ResourceService::new(
            ResourceConfig::from_config(config),
            clock.clone(),
            scheduler,
        );

        Ok(Self::new(
            Router::standard()?,
            auth,
            resources,
            clock,
            config.public_dir.clone(),
            config.environment,
        ))
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn resources(&self) -> &ResourceService {
        &self.resources
    }

    /// Procesa un request ya parseado y produce la respuesta
    pub fn dispatch(&self, request: &Request) -> Response {
        let Some(route) = self.router.match_route(request.method(), request.path()) else {
            return Response::error(StatusCode::NotFound, "Not Found");
        };

        if is_protected(request.path()) {
            match self.auth.validate_session(session_token(request)) {
                Ok(_) => {}
                Err(ServiceError::Unauthorized(message)) => {
                    tracing::debug!(path = %request.path(), reason = %message, "request rejected");
                    return Response::json(StatusCode::Unauthorized, &json!({ "error": message }));
                }
                Err(e) => return self.error_response(route.action, e),
            }
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| self.handle(&route, request)));
        match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => self.error_response(route.action, e),
            Err(panic) => {
                tracing::error!(
                    action = route.action.name(),
                    panic = %panic_message(panic.as_ref()),
                    "handler panicked"
                );
                self.internal_error()
            }
        }
    }

    fn handle(&self, route: &RouteMatch, request: &Request) -> Result<Response, ServiceError> {
        match route.action {
            Action::AuthLogin => auth_handlers::login(request, &self.auth),
            Action::ResourcesIndex => resource_handlers::index(&self.resources),
            Action::ResourcesCreate => resource_handlers::create(request, &self.resources),
            Action::ResourcesJobStatus => resource_handlers::job_status(request, &self.resources),
            Action::ResourcesStats => resource_handlers::stats(&self.resources),
            Action::ResourcesShow => resource_handlers::show(route, &self.resources),
            Action::StaticOpenapi => static_files::openapi(&self.public_dir),
            Action::StaticAuthors => static_files::authors(&self.public_dir),
            Action::StaticHealth => Ok(static_files::health(self.clock.as_ref())),
        }
    }

    fn error_response(&self, action: Action, error: ServiceError) -> Response {
        match error {
            ServiceError::Internal(detail) => {
                tracing::error!(action = action.name(), error = %detail, "internal error");
                self.internal_error()
            }
            other => Response::error(other.status(), &other.to_string()),
        }
    }

    fn internal_error(&self) -> Response {
        let message = match self.environment {
            Environment::Development => INTERNAL_ERROR_DEV,
            Environment::Production => INTERNAL_ERROR,
        };
        Response::json(StatusCode::InternalServerError, &json!({ "error": message }))
    }
}

pub fn is_protected(path: &str) -> bool {
    path.starts_with(PROTECTED_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::http::Method;
    use crate::router::RoutePattern;
    use crate::scheduler::TaskOutcome;
    use std::time::Duration;

    fn config() -> Config {
        Config {
            creation_delay_secs: 0,
            session_timeout_secs: 60,
            ..Config::default()
        }
    }

    fn dispatcher() -> (Arc<ManualClock>, Dispatcher) {
        let clock = Arc::new(ManualClock::new());
        let dispatcher = Dispatcher::from_config(&config(), clock.clone()).unwrap();
        (clock, dispatcher)
    }

    fn request(method: &str, target: &str, headers: &[(&str, &str)], body: &str) -> Request {
        let mut raw = format!("{} {} HTTP/1.0\r\n", method, target);
        for (name, value) in headers {
            raw.push_str(&format!("{}: {}\r\n", name, value));
        }
        raw.push_str(&format!("Content-Length: {}\r\n\r\n{}", body.len(), body));
        Request::parse(raw.as_bytes()).unwrap()
    }

    fn login(dispatcher: &Dispatcher) -> String {
        let response = dispatcher.dispatch(&request(
            "POST",
            "/auth",
            &[],
            r#"{"username":"admin","password":"password"}"#,
        ));
        assert_eq!(response.status(), StatusCode::Ok);
        response.body_json().unwrap()["session_id"]
            .as_str()
            .unwrap()
            .to_string()
    }

    // ==================== Routing ====================

    #[test]
    fn test_unknown_route_is_404() {
        let (_, dispatcher) = dispatcher();
        let response = dispatcher.dispatch(&request("GET", "/nonexistent", &[], ""));

        assert_eq!(response.status(), StatusCode::NotFound);
        assert_eq!(
            response.body_json().unwrap(),
            json!({"error": "Not Found", "success": false})
        );
    }

    #[test]
    fn test_unknown_protected_route_is_404_before_auth() {
        let (_, dispatcher) = dispatcher();
        let response = dispatcher.dispatch(&request("DELETE", "/resources/1", &[], ""));
        assert_eq!(response.status(), StatusCode::NotFound);
    }

    #[test]
    fn test_public_routes_need_no_session() {
        let (_, dispatcher) = dispatcher();
        let response = dispatcher.dispatch(&request("GET", "/health", &[], ""));
        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.body_json().unwrap()["status"], "healthy");
    }

    // ==================== Autenticación ====================

    #[test]
    fn test_protected_without_session() {
        let (_, dispatcher) = dispatcher();
        let response = dispatcher.dispatch(&request("GET", "/resources", &[], ""));

        assert_eq!(response.status(), StatusCode::Unauthorized);
        assert_eq!(
            response.body_json().unwrap(),
            json!({"error": "No session ID provided"})
        );
    }

    #[test]
    fn test_protected_with_unknown_session() {
        let (_, dispatcher) = dispatcher();
        let response = dispatcher.dispatch(&request(
            "GET",
            "/resources",
            &[("Authorization", "Bearer bogus")],
            "",
        ));

        assert_eq!(response.status(), StatusCode::Unauthorized);
        assert_eq!(
            response.body_json().unwrap()["error"],
            "Invalid or expired session"
        );
    }

    #[test]
    fn test_rejected_request_never_reaches_handler() {
        let (_, dispatcher) = dispatcher();
        let response = dispatcher.dispatch(&request(
            "POST",
            "/resources",
            &[],
            r#"{"name":"Widget"}"#,
        ));

        assert_eq!(response.status(), StatusCode::Unauthorized);
        assert_eq!(dispatcher.resources().jobs().count().unwrap(), 0);
    }

    #[test]
    fn test_session_via_header_and_query() {
        let (_, dispatcher) = dispatcher();
        let session = login(&dispatcher);

        let bearer = format!("Bearer {}", session);
        let response = dispatcher.dispatch(&request(
            "GET",
            "/resources",
            &[("Authorization", bearer.as_str())],
            "",
        ));
        assert_eq!(response.status(), StatusCode::Ok);

        let response = dispatcher.dispatch(&request(
            "GET",
            &format!("/resources?session_id={}", session),
            &[],
            "",
        ));
        assert_eq!(response.status(), StatusCode::Ok);
    }

    #[test]
    fn test_session_expires() {
        let (clock, dispatcher) = dispatcher();
        let session = login(&dispatcher);
        let bearer = format!("Bearer {}", session);
        let list = || {
            dispatcher.dispatch(&request("GET", "/resources", &[("Authorization", bearer.as_str())], ""))
        };

        clock.advance(Duration::from_secs(59));
        assert_eq!(list().status(), StatusCode::Ok);

        clock.advance(Duration::from_secs(1));
        assert_eq!(list().status(), StatusCode::Unauthorized);
    }

    // ==================== Errores ====================

    #[test]
    fn test_malformed_json_is_400() {
        let (_, dispatcher) = dispatcher();
        let response = dispatcher.dispatch(&request("POST", "/auth", &[], "{nope"));

        assert_eq!(response.status(), StatusCode::BadRequest);
        assert_eq!(
            response.body_json().unwrap(),
            json!({"error": "Invalid JSON format", "success": false})
        );
    }

    /// Reloj que entra en pánico: `/health` es el único handler que lo usa
    struct PanickingClock;

    impl crate::clock::Clock for PanickingClock {
        fn now(&self) -> chrono::DateTime<chrono::Utc> {
            panic!("clock exploded")
        }
    }

    fn dispatcher_with(environment: Environment, clock: SharedClock) -> Dispatcher {
        let (_, base) = dispatcher();
        Dispatcher {
            clock,
            environment,
            ..base
        }
    }

    #[test]
    fn test_handler_panic_becomes_500() {
        let dispatcher = dispatcher_with(Environment::Production, Arc::new(PanickingClock));
        let response = dispatcher.dispatch(&request("GET", "/health", &[], ""));

        assert_eq!(response.status(), StatusCode::InternalServerError);
        assert_eq!(
            response.body_json().unwrap(),
            json!({"error": "Internal server error"})
        );

        // El dispatcher sigue atendiendo después del pánico
        let response = dispatcher.dispatch(&request("GET", "/nonexistent", &[], ""));
        assert_eq!(response.status(), StatusCode::NotFound);
    }

    #[test]
    fn test_internal_error_message_in_development() {
        let dispatcher = dispatcher_with(Environment::Development, Arc::new(PanickingClock));
        let response = dispatcher.dispatch(&request("GET", "/health", &[], ""));

        assert_eq!(response.status(), StatusCode::InternalServerError);
        assert_eq!(
            response.body_json().unwrap(),
            json!({"error": "Internal server error - check logs for details"})
        );
    }

    #[test]
    fn test_show_without_param_is_not_found() {
        let (_, base) = dispatcher();
        let mut router = Router::new();
        router.register(Method::GET, RoutePattern::exact("/lookup"), Action::ResourcesShow);
        let dispatcher = Dispatcher { router, ..base };

        let response = dispatcher.dispatch(&request("GET", "/lookup", &[], ""));
        assert_eq!(response.status(), StatusCode::NotFound);
    }

    #[test]
    fn test_missing_public_file_is_404() {
        let (_, dispatcher) = dispatcher();
        let dispatcher = Dispatcher {
            public_dir: PathBuf::from("/definitely/not/here"),
            ..dispatcher
        };
        let response = dispatcher.dispatch(&request("GET", "/AUTHORS", &[], ""));
        assert_eq!(response.status(), StatusCode::NotFound);
    }

    // ==================== Flujo completo ====================

    #[test]
    fn test_create_then_poll_until_completed() {
        let (_, dispatcher) = dispatcher();
        let bearer = format!("Bearer {}", login(&dispatcher));
        let auth = [("Authorization", bearer.as_str())];

        // Crear directamente con handle para esperar sin sleeps
        let (job, handle) = dispatcher.resources().create_async_with_handle("Widget").unwrap();
        assert_eq!(handle.wait_timeout(Duration::from_secs(5)), Some(TaskOutcome::Completed));

        let response = dispatcher.dispatch(&request(
            "GET",
            &format!("/resources/status?job_id={}", job.id),
            &auth,
            "",
        ));
        let body = response.body_json().unwrap();
        assert_eq!(body["job"]["status"], "completed");

        let resource_id = body["job"]["resource_id"].as_u64().unwrap();
        let response = dispatcher.dispatch(&request(
            "GET",
            &format!("/resources/{}", resource_id),
            &auth,
            "",
        ));
        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.body_json().unwrap()["resource"]["name"], "Widget");
    }

    #[test]
    fn test_is_protected() {
        assert!(is_protected("/resources"));
        assert!(is_protected("/resources/1"));
        assert!(is_protected("/resources/status"));
        assert!(!is_protected("/auth"));
        assert!(!is_protected("/health"));
    }
}
