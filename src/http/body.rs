//! # Body JSON
//! src/http/body.rs
//!
//! Lectura de bodies JSON de los endpoints que reciben datos. Un body vacío
//! equivale a `{}`; cualquier cosa que no sea un objeto JSON es inválida.

use crate::error::ServiceError;
use crate::http::Request;
use serde_json::{Map, Value};

pub const INVALID_JSON: &str = "Invalid JSON format";

/// Campos de un body JSON ya parseado
#[derive(Debug, Clone, Default)]
pub struct JsonBody {
    fields: Map<String, Value>,
}

impl JsonBody {
    /// Parsea el body del request como objeto JSON
    pub fn parse(request: &Request) -> Result<Self, ServiceError> {
        let raw = request.body();
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        match serde_json::from_slice::<Value>(raw) {
            Ok(Value::Object(fields)) => Ok(Self { fields }),
            _ => Err(ServiceError::Validation(INVALID_JSON.to_string())),
        }
    }

    /// Valor del campo como texto; `None` si falta o es `null`
    ///
    /// Los valores no textuales (números, booleanos) se convierten a su forma JSON.
    pub fn text(&self, name: &str) -> Option<String> {
        match self.fields.get(name)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Verifica que todos los campos estén presentes y no sean solo espacios
    pub fn require(&self, names: &[&str]) -> Result<(), ServiceError> {
        let missing: Vec<String> = names
            .iter()
            .filter(|name| {
                self.text(name)
                    .map(|value| value.trim().is_empty())
                    .unwrap_or(true)
            })
            .map(|name| format!("'{}'", name))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )))
        }
    }
}
