//! # Códigos de Estado HTTP
//!
//! Códigos que produce el servicio, agrupados como en el RFC 1945:
//!
//! - **2xx**: Éxito (200 OK, 202 Accepted)
//! - **4xx**: Error del cliente (400, 401, 404, 413)
//! - **5xx**: Error del servidor (500, 503)

/// Códigos de estado HTTP que soporta el servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK - La petición fue exitosa
    Ok = 200,

    /// 202 Accepted - Trabajo aceptado, se completa en segundo plano
    Accepted = 202,

    /// 400 Bad Request - Parámetros inválidos o body malformado
    BadRequest = 400,

    /// 401 Unauthorized - Sesión ausente, inválida o expirada
    Unauthorized = 401,

    /// 404 Not Found - Ruta o recurso no encontrado
    NotFound = 404,

    /// 413 Payload Too Large - El request excede el tamaño máximo aceptado
    PayloadTooLarge = 413,

    /// 500 Internal Server Error - Falla inesperada
    InternalServerError = 500,

    /// 503 Service Unavailable - Cola de conexiones llena
    ServiceUnavailable = 503,
}

impl StatusCode {
    /// Convierte el código a su valor numérico
    ///
    /// # Ejemplo
    /// ```
    /// use resource_api::http::StatusCode;
    /// assert_eq!(StatusCode::Accepted.as_u16(), 202);
    /// ```
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Texto de razón (reason phrase) asociado al código
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Accepted => "Accepted",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::NotFound => "Not Found",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }

    /// Verifica si el código indica éxito (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.as_u16())
    }

    /// Verifica si el código indica error del servidor (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.as_u16())
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}
