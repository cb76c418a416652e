//! Shared types for the Imagen request gateway.

mod base64_serde;

pub mod enums;
pub mod models;
