#![allow(dead_code)]

use imagen_gateway::{Client, Credentials};

pub const IMAGEN_MODEL: &str = "imagen-3.0-generate-001";
pub const LEGACY_MODEL: &str = "imagegeneration@002";

pub fn predict_path(model: &str) -> String {
    format!("/v1beta1/projects/proj/locations/us-central1/publishers/google/models/{model}:predict")
}

pub fn build_test_client(base_url: &str) -> Client {
    Client::builder()
        .project("proj")
        .location("us-central1")
        .base_url(base_url)
        .credentials(Credentials::AccessToken("test-token".into()))
        .build()
        .unwrap()
}
