//! # Construcción de Respuestas HTTP
//!
//! API para construir respuestas y convertirlas a bytes para el socket.
//!
//! ## Ejemplo de uso
//!
//! ```
//! use resource_api::http::{Response, StatusCode};
//! use serde_json::json;
//!
//! let response = Response::json(StatusCode::Accepted, &json!({"job_id": "abc"}));
//! let bytes = response.to_bytes();
//! assert!(bytes.starts_with(b"HTTP/1.0 202 Accepted\r\n"));
//! ```

use super::StatusCode;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Write;

/// Respuesta HTTP completa
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,

    /// Usamos HashMap para evitar duplicados
    headers: HashMap<String, String>,

    body: Vec<u8>,
}

impl Response {
    /// Crea una respuesta sin headers ni body
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Agrega un header (si ya existe, se sobrescribe)
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    /// Versión mutable de `with_header`
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Establece el body y calcula `Content-Length`
    pub fn with_body(self, body: &str) -> Self {
        self.with_body_bytes(body.as_bytes().to_vec())
    }

    pub fn with_body_bytes(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self.headers
            .insert("Content-Length".to_string(), self.body.len().to_string());
        self
    }

    /// Respuesta JSON con el status indicado
    pub fn json(status: StatusCode, value: &Value) -> Self {
        Self::new(status)
            .with_header("Content-Type", "application/json")
            .with_body(&value.to_string())
    }

    /// Respuesta exitosa: agrega `"success": true` al objeto
    ///
    /// ```
    /// use resource_api::http::{Response, StatusCode};
    /// use serde_json::json;
    ///
    /// let response = Response::success(json!({"total": 0}));
    /// let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
    /// assert_eq!(body["success"], true);
    /// assert_eq!(body["total"], 0);
    /// ```
    pub fn success(mut value: Value) -> Self {
        if let Some(object) = value.as_object_mut() {
            object.insert("success".to_string(), Value::Bool(true));
        }
        Self::json(StatusCode::Ok, &value)
    }

    /// Error con formato `{"error": "mensaje", "success": false}`
    pub fn error(status: StatusCode, message: &str) -> Self {
        Self::json(status, &json!({ "error": message, "success": false }))
    }

    /// Comprime el body con gzip si el cliente lo acepta
    ///
    /// No hace nada si el body está vacío o ya viene codificado.
    pub fn compress_for(mut self, accept_encoding: Option<&str>) -> Self {
        let accepts_gzip = accept_encoding
            .map(|value| {
                value
                    .split(',')
                    .any(|coding| coding.trim().split(';').next() == Some("gzip"))
            })
            .unwrap_or(false);
        if !accepts_gzip || self.body.is_empty() || self.headers.contains_key("Content-Encoding") {
            return self;
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        let compressed = encoder
            .write_all(&self.body)
            .and_then(|_| encoder.finish());
        match compressed {
            Ok(bytes) => {
                self.add_header("Content-Encoding", "gzip");
                self.add_header("Vary", "Accept-Encoding");
                self.with_body_bytes(bytes)
            }
            // Si falla la compresión se envía el body original
            Err(_) => self,
        }
    }

    /// Serializa la respuesta completa: status line, headers, línea vacía y body
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(self.body.len() + 256);

        result.extend_from_slice(format!("HTTP/1.0 {}\r\n", self.status).as_bytes());
        for (name, value) in &self.headers {
            result.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }
        result.extend_from_slice(b"\r\n");
        result.extend_from_slice(&self.body);

        result
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body parseado como JSON (útil en tests y logs)
    pub fn body_json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}
