//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! El thread aceptador entrega cada conexión a un [`WorkerPool`] acotado. Si la
//! cola está llena responde 503 con `Retry-After` en el mismo thread, sin
//! bloquear. Un thread aparte purga periódicamente las sesiones vencidas.

use crate::auth::SessionStore;
use crate::clock::{SharedClock, SystemClock};
use crate::config::Config;
use crate::error::ServerError;
use crate::http::request::find_header_end;
use crate::http::{Request, Response, StatusCode};
use crate::ids::random_token;
use crate::scheduler::{PoolError, WorkerPool};
use crate::server::dispatcher::Dispatcher;
use crate::static_files::VERSION;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Tamaño máximo de un request (headers + body)
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024;

const READ_CHUNK: usize = 8192;

/// Configuración de la capa TCP
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub workers: usize,
    pub queue_capacity: usize,
    pub retry_after: Duration,
    /// `None` = sin purga periódica
    pub session_sweep_interval: Option<Duration>,
    pub max_request_bytes: usize,
    pub read_timeout: Duration,
}

impl ServerConfig {
    /// Crea una configuración desde el Config principal
    pub fn from_config(config: &Config) -> Self {
        Self {
            address: config.address(),
            workers: config.workers,
            queue_capacity: config.queue_capacity,
            retry_after: Duration::from_secs(config.retry_after_secs),
            session_sweep_interval: (config.session_sweep_interval_secs > 0)
                .then(|| Duration::from_secs(config.session_sweep_interval_secs)),
            max_request_bytes: MAX_REQUEST_BYTES,
            read_timeout: Duration::from_secs(5),
        }
    }
}

/// Servidor HTTP/1.x: una respuesta por conexión
pub struct Server {
    config: ServerConfig,
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    pool: WorkerPool,
}

impl Server {
    /// Crea el servidor con el reloj del sistema y abre el socket
    pub fn bind(config: &Config) -> Result<Self, ServerError> {
        Self::bind_with_clock(config, Arc::new(SystemClock))
    }

    pub fn bind_with_clock(config: &Config, clock: SharedClock) -> Result<Self, ServerError> {
        config.validate()?;
        let server_config = ServerConfig::from_config(config);
        let dispatcher = Arc::new(Dispatcher::from_config(config, clock)?);
        let pool = WorkerPool::bounded("http", server_config.workers, server_config.queue_capacity)?;
        let listener = TcpListener::bind(&server_config.address)?;

        Ok(Self {
            config: server_config,
            listener,
            dispatcher,
            pool,
        })
    }

    /// Dirección real del socket (útil con puerto 0)
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Loop de aceptación; solo retorna si el pool se apaga
    pub fn run(&self) -> io::Result<()> {
        tracing::info!(address = %self.local_addr()?, "server listening");

        if let Some(interval) = self.config.session_sweep_interval {
            Self::spawn_session_sweeper(self.dispatcher.auth().sessions().clone(), interval)?;
        }

        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            // Copia del socket para poder responder 503 si la tarea se rechaza
            let overflow = stream.try_clone();
            let dispatcher = Arc::clone(&self.dispatcher);
            let config = self.config.clone();

            match self.pool.submit(move || {
                if let Err(e) = handle_connection(stream, &dispatcher, &config) {
                    tracing::warn!(error = %e, "connection error");
                }
            }) {
                Ok(()) => {}
                Err(PoolError::QueueFull { capacity }) => {
                    tracing::warn!(capacity, "connection queue full, rejecting with 503");
                    if let Ok(mut stream) = overflow {
                        let _ = reject_busy(&mut stream, self.config.retry_after);
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "connection pool unavailable, stopping accept loop");
                    break;
                }
            }
        }

        Ok(())
    }

    fn spawn_session_sweeper(sessions: SessionStore, interval: Duration) -> io::Result<()> {
        thread::Builder::new()
            .name("session-sweeper".to_string())
            .spawn(move || loop {
                thread::sleep(interval);
                match sessions.cleanup_expired() {
                    Ok(0) => {}
                    Ok(removed) => tracing::debug!(removed, "expired sessions swept"),
                    Err(e) => tracing::error!(error = %e, "session sweep failed"),
                }
            })?;
        Ok(())
    }
}

/// Resultado de leer un request del socket
enum RawRequest {
    /// El cliente cerró sin enviar nada
    Closed,
    TooLarge,
    Complete(Vec<u8>),
}

/// Lee headers y luego el body hasta completar `Content-Length`
fn read_request(stream: &mut TcpStream, max_bytes: usize) -> io::Result<RawRequest> {
    let mut buffer = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let read = stream.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
        if buffer.len() > max_bytes {
            return Ok(RawRequest::TooLarge);
        }

        if let Some(end) = find_header_end(&buffer) {
            let expected = (end + 4).saturating_add(declared_content_length(&buffer[..end]));
            if expected > max_bytes {
                return Ok(RawRequest::TooLarge);
            }
            if buffer.len() >= expected {
                break;
            }
        }
    }

    if buffer.is_empty() {
        Ok(RawRequest::Closed)
    } else {
        Ok(RawRequest::Complete(buffer))
    }
}

/// `Content-Length` declarado en los headers; 0 si falta o es inválido
/// (el parser reporta el error después)
fn declared_content_length(head: &[u8]) -> usize {
    String::from_utf8_lossy(head)
        .split("\r\n")
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

fn handle_connection(mut stream: TcpStream, dispatcher: &Dispatcher, config: &ServerConfig) -> io::Result<()> {
    let start = Instant::now();
    let request_id = random_token(8);
    stream.set_read_timeout(Some(config.read_timeout))?;

    let raw = match read_request(&mut stream, config.max_request_bytes)? {
        RawRequest::Closed => {
            tracing::trace!(request_id = %request_id, "peer closed without sending data");
            return Ok(());
        }
        RawRequest::TooLarge => {
            let response = Response::error(StatusCode::PayloadTooLarge, "Request too large");
            return send(&mut stream, response, &request_id, "-", "-", start);
        }
        RawRequest::Complete(raw) => raw,
    };

    match Request::parse(&raw) {
        Ok(request) => {
            let response = dispatcher
                .dispatch(&request)
                .compress_for(request.header("accept-encoding"));
            send(
                &mut stream,
                response,
                &request_id,
                request.method().as_str(),
                request.path(),
                start,
            )
        }
        Err(e) => {
            tracing::debug!(request_id = %request_id, error = %e, "parse error");
            let response = Response::error(StatusCode::BadRequest, &format!("Invalid: {}", e));
            send(&mut stream, response, &request_id, "-", "-", start)
        }
    }
}

fn send(
    stream: &mut TcpStream,
    mut response: Response,
    request_id: &str,
    method: &str,
    path: &str,
    start: Instant,
) -> io::Result<()> {
    add_common_headers(&mut response, request_id);
    stream.write_all(&response.to_bytes())?;
    stream.flush()?;

    tracing::info!(
        request_id = %request_id,
        method,
        path,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_secs_f64() * 1000.0,
        "request handled"
    );
    Ok(())
}

fn add_common_headers(response: &mut Response, request_id: &str) {
    response.add_header("Server", &format!("resource_api/{}", VERSION));
    response.add_header("Connection", "close");
    response.add_header("X-Request-Id", request_id);
}

fn reject_busy(stream: &mut TcpStream, retry_after: Duration) -> io::Result<()> {
    let mut response = Response::error(StatusCode::ServiceUnavailable, "Server busy, retry later")
        .with_header("Retry-After", &retry_after.as_secs().to_string());
    add_common_headers(&mut response, &random_token(8));
    stream.write_all(&response.to_bytes())?;
    stream.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn ephemeral_config() -> Config {
        Config {
            port: 0,
            workers: 2,
            creation_delay_secs: 0,
            ..Config::default()
        }
    }

    fn start() -> SocketAddr {
        let server = Server::bind_with_clock(&ephemeral_config(), Arc::new(ManualClock::new())).unwrap();
        let addr = server.local_addr().unwrap();
        thread::spawn(move || server.run());
        addr
    }

    fn roundtrip(addr: SocketAddr, raw: &[u8]) -> String {
        let mut client = TcpStream::connect(addr).unwrap();
        client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        client.write_all(raw).unwrap();
        client.shutdown(std::net::Shutdown::Write).unwrap();

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[test]
    fn test_common_headers() {
        let text = roundtrip(start(), b"GET /health HTTP/1.0\r\n\r\n");

        assert!(text.starts_with("HTTP/1.0 200 OK"));
        assert!(text.contains("Connection: close"));
        assert!(text.contains("X-Request-Id:"));
        assert!(text.contains("Server: resource_api/"));
    }

    #[test]
    fn test_parse_error() {
        let text = roundtrip(start(), b"\x00\x01\x02\x03garbage\r\n\r\n");
        assert!(text.contains("400 Bad Request"));
        assert!(text.contains("Invalid:"));
    }

    #[test]
    fn test_body_split_across_writes() {
        let addr = start();
        let body = r#"{"username":"admin","password":"password"}"#;
        let head = format!("POST /auth HTTP/1.0\r\nContent-Length: {}\r\n\r\n", body.len());

        let mut client = TcpStream::connect(addr).unwrap();
        client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        client.write_all(head.as_bytes()).unwrap();
        client.flush().unwrap();
        thread::sleep(Duration::from_millis(50));
        client.write_all(body.as_bytes()).unwrap();

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        let text = String::from_utf8_lossy(&buf);
        assert!(text.contains("200 OK"), "got: {}", text);
        assert!(text.contains("session_id"));
    }

    #[test]
    fn test_declared_content_length_too_large() {
        let addr = start();
        let raw = format!(
            "POST /resources HTTP/1.0\r\nContent-Length: {}\r\n\r\n",
            MAX_REQUEST_BYTES + 1
        );
        let text = roundtrip(addr, raw.as_bytes());
        assert!(text.contains("413 Payload Too Large"));
    }

    #[test]
    fn test_peer_closed_immediately() {
        let addr = start();
        let client = TcpStream::connect(addr).unwrap();
        client.shutdown(std::net::Shutdown::Both).unwrap();

        // El servidor sigue atendiendo
        let text = roundtrip(addr, b"GET /health HTTP/1.0\r\n\r\n");
        assert!(text.contains("200 OK"));
    }

    #[test]
    fn test_declared_content_length() {
        assert_eq!(declared_content_length(b"POST / HTTP/1.0\r\ncontent-length: 12"), 12);
        assert_eq!(declared_content_length(b"POST / HTTP/1.0\r\nContent-Length: x"), 0);
        assert_eq!(declared_content_length(b"GET / HTTP/1.0"), 0);
    }

    #[test]
    fn test_server_config_from_config() {
        let mut config = Config::default();
        config.session_sweep_interval_secs = 0;
        let server_config = ServerConfig::from_config(&config);

        assert_eq!(server_config.address, "127.0.0.1:8080");
        assert_eq!(server_config.session_sweep_interval, None);
        assert_eq!(server_config.retry_after, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = Config {
            workers: 0,
            ..ephemeral_config()
        };
        assert!(matches!(
            Server::bind_with_clock(&config, Arc::new(ManualClock::new())),
            Err(ServerError::Config(_))
        ));
    }
}
