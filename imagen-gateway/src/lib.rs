//! Core library for the Imagen request gateway.

pub mod capabilities;
pub mod client;
pub mod error;
pub mod models;
pub mod normalize;
pub mod service;

#[cfg(test)]
mod test_support;

pub use imagen_gateway_types as types;

pub use client::{Client, ClientBuilder, ClientCache, Credentials, HttpOptions};
pub use error::{Error, Result};
pub use service::{ImagePayload, ImageService};
