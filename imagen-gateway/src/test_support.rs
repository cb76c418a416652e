use std::sync::Mutex;

use crate::client::{
    ApiClient, AuthProvider, ClientConfig, ClientInner, Credentials, HttpOptions,
};

static ENV_LOCK: Mutex<()> = Mutex::new(());

pub fn with_env(vars: &[(&str, Option<&str>)], f: impl FnOnce()) {
    let _guard = ENV_LOCK.lock().unwrap();
    let backup: Vec<(String, Option<String>)> = vars
        .iter()
        .map(|(key, _)| ((*key).to_string(), std::env::var(key).ok()))
        .collect();
    for (key, value) in vars {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }
    f();
    for (key, value) in backup {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }
}

pub fn test_client_inner(project: &str, location: &str) -> ClientInner {
    let config = ClientConfig {
        project: project.to_string(),
        location: location.to_string(),
        http_options: HttpOptions::default(),
        credentials: Credentials::AccessToken("test-token".into()),
        auth_scopes: Vec::new(),
    };
    let api_client = ApiClient::new(&config);
    ClientInner {
        http: reqwest::Client::new(),
        config,
        api_client,
        auth_provider: AuthProvider::AccessToken("test-token".into()),
    }
}
