//! # Generación de identificadores opacos
//! src/ids.rs

use rand::rngs::OsRng;
use rand::RngCore;

/// Bytes aleatorios de un id de sesión (64 caracteres hex)
pub const SESSION_TOKEN_BYTES: usize = 32;

/// Bytes aleatorios de un id de job (32 caracteres hex)
pub const JOB_TOKEN_BYTES: usize = 16;

/// Genera un token hex de `bytes` bytes desde el RNG del sistema operativo
///
/// ```
/// let token = resource_api::ids::random_token(16);
/// assert_eq!(token.len(), 32);
/// assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
/// ```
pub fn random_token(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buffer);
    hex::encode(buffer)
}
