//! Cross-cutting HTTP layers: CORS policy and response security headers.

pub mod cors;
pub mod security_headers;
