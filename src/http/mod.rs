//! # Módulo HTTP
//!
//! Framing HTTP/1.x mínimo para el servicio, sin librerías de alto nivel:
//!
//! - Parsing de requests (request line, headers, body por `Content-Length`)
//! - Construcción de responses JSON y compresión gzip
//! - Lectura de bodies JSON
//! - Códigos de estado
//!
//! El servidor no mantiene conexiones persistentes: cada respuesta sale con
//! `Connection: close`.

pub mod body;
pub mod request;
pub mod response;
pub mod status;

// Permite usar `http::Request` en vez de `http::request::Request`
pub use body::JsonBody;
pub use request::{Method, ParseError, Request};
pub use response::Response;
pub use status::StatusCode;
