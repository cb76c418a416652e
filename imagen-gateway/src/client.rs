//! Client configuration, credentials, and the single-flight handle cache.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Client as HttpClient;
use tokio::sync::OnceCell;

use crate::error::{Error, Result};
use google_cloud_auth::credentials::{
    Builder as AuthBuilder, CacheableResource, Credentials as GoogleCredentials,
};
use http::Extensions;

/// Environment key for the Google Cloud project identifier.
pub const ENV_PROJECT_ID: &str = "GCP_PROJECT_ID";
/// Environment key for the Vertex AI region.
pub const ENV_LOCATION: &str = "GCP_LOCATION";
/// Environment key for the service-account credentials reference.
pub const ENV_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
/// Environment key overriding the upstream base URL.
pub const ENV_BASE_URL: &str = "IMAGEN_BASE_URL";

const DEFAULT_LOCATION: &str = "us-central1";
const VERTEX_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Vertex AI 客户端。
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub http: HttpClient,
    pub config: ClientConfig,
    pub api_client: ApiClient,
    pub(crate) auth_provider: AuthProvider,
}

/// 客户端配置。
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Google Cloud 项目 ID。
    pub project: String,
    /// Vertex AI 区域。
    pub location: String,
    /// HTTP 配置。
    pub http_options: HttpOptions,
    /// 认证信息。
    pub credentials: Credentials,
    /// OAuth scopes（ADC 使用）。
    pub auth_scopes: Vec<String>,
}

/// 认证方式。
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Application Default Credentials（读取环境凭据）。
    ApplicationDefault,
    /// 预签发的访问令牌（测试或短生命周期部署用）。
    AccessToken(String),
}

/// HTTP 配置。
#[derive(Debug, Clone, Default)]
pub struct HttpOptions {
    pub timeout: Option<u64>,
    pub headers: HashMap<String, String>,
    pub base_url: Option<String>,
    pub api_version: Option<String>,
}

impl Client {
    /// 创建新客户端。
    ///
    /// # Errors
    /// 当配置无效或构建客户端失败时返回错误。
    pub fn new(project: impl Into<String>, location: impl Into<String>) -> Result<Self> {
        Self::builder().project(project).location(location).build()
    }

    /// 从环境变量创建客户端。
    ///
    /// 所有缺失的必需键会在同一个错误里列出。
    ///
    /// # Errors
    /// 当必需环境变量缺失或构建客户端失败时返回错误。
    pub fn from_env() -> Result<Self> {
        let project = read_env(ENV_PROJECT_ID);
        let credentials = read_env(ENV_CREDENTIALS);

        let mut missing = Vec::new();
        if project.is_none() {
            missing.push(ENV_PROJECT_ID.to_string());
        }
        if credentials.is_none() {
            missing.push(ENV_CREDENTIALS.to_string());
        }
        if !missing.is_empty() {
            return Err(Error::Configuration { missing });
        }

        let location = read_env(ENV_LOCATION).unwrap_or_else(|| DEFAULT_LOCATION.to_string());
        let mut builder = Self::builder()
            .project(project.unwrap_or_default())
            .location(location);
        if let Some(base_url) = read_env(ENV_BASE_URL) {
            builder = builder.base_url(base_url);
        }
        builder.build()
    }

    /// 创建 Builder。
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// 访问 Images API。
    #[must_use]
    pub fn images(&self) -> crate::models::Images {
        crate::models::Images::new(self.inner.clone())
    }
}

/// 客户端 Builder。
#[derive(Default)]
pub struct ClientBuilder {
    project: Option<String>,
    location: Option<String>,
    credentials: Option<Credentials>,
    http_options: HttpOptions,
    auth_scopes: Option<Vec<String>>,
}

impl ClientBuilder {
    /// 设置项目 ID。
    #[must_use]
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// 设置区域。
    #[must_use]
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// 设置认证方式（ADC 或访问令牌）。
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// 设置请求超时（秒）。
    #[must_use]
    pub const fn timeout(mut self, secs: u64) -> Self {
        self.http_options.timeout = Some(secs);
        self
    }

    /// 增加默认 HTTP 头。
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.http_options.headers.insert(key.into(), value.into());
        self
    }

    /// 设置自定义基础 URL。
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http_options.base_url = Some(base_url.into());
        self
    }

    /// 设置 API 版本。
    #[must_use]
    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.http_options.api_version = Some(api_version.into());
        self
    }

    /// 设置 OAuth scopes。
    #[must_use]
    pub fn auth_scopes(mut self, scopes: Vec<String>) -> Self {
        self.auth_scopes = Some(scopes);
        self
    }

    /// 构建客户端。
    ///
    /// # Errors
    /// 当配置不完整、参数无效或构建 HTTP 客户端失败时返回错误。
    pub fn build(self) -> Result<Client> {
        let Self {
            project,
            location,
            credentials,
            http_options,
            auth_scopes,
        } = self;

        let project = project
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| Error::InvalidConfig {
                message: "Project is required for Vertex AI".into(),
            })?;
        let location = location
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string());

        let headers = Self::build_headers(&http_options)?;
        let http = Self::build_http_client(&http_options, headers)?;

        let credentials = credentials.unwrap_or(Credentials::ApplicationDefault);
        let auth_scopes = auth_scopes.unwrap_or_else(|| vec![VERTEX_SCOPE.to_string()]);
        let config = ClientConfig {
            project,
            location,
            http_options,
            credentials: credentials.clone(),
            auth_scopes,
        };

        let auth_provider = build_auth_provider(&credentials)?;
        let api_client = ApiClient::new(&config);

        Ok(Client {
            inner: Arc::new(ClientInner {
                http,
                config,
                api_client,
                auth_provider,
            }),
        })
    }

    fn build_headers(http_options: &HttpOptions) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (key, value) in &http_options.headers {
            let name =
                HeaderName::from_bytes(key.as_bytes()).map_err(|_| Error::InvalidConfig {
                    message: format!("Invalid header name: {key}"),
                })?;
            let value = HeaderValue::from_str(value).map_err(|_| Error::InvalidConfig {
                message: format!("Invalid header value for {key}"),
            })?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    fn build_http_client(http_options: &HttpOptions, headers: HeaderMap) -> Result<HttpClient> {
        let mut http_builder = HttpClient::builder();
        if let Some(timeout) = http_options.timeout {
            http_builder = http_builder.timeout(Duration::from_secs(timeout));
        }
        if !headers.is_empty() {
            http_builder = http_builder.default_headers(headers);
        }
        Ok(http_builder.build()?)
    }
}

fn build_auth_provider(credentials: &Credentials) -> Result<AuthProvider> {
    match credentials {
        Credentials::AccessToken(token) => {
            if token.trim().is_empty() {
                return Err(Error::InvalidConfig {
                    message: "Access token must not be empty".into(),
                });
            }
            Ok(AuthProvider::AccessToken(token.clone()))
        }
        Credentials::ApplicationDefault => Ok(AuthProvider::ApplicationDefault(Arc::new(
            OnceCell::new(),
        ))),
    }
}

fn read_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Clone)]
pub(crate) enum AuthProvider {
    AccessToken(String),
    ApplicationDefault(Arc<OnceCell<Arc<GoogleCredentials>>>),
}

impl AuthProvider {
    async fn headers(&self, scopes: &[&str]) -> Result<HeaderMap> {
        match self {
            Self::AccessToken(token) => {
                let mut header =
                    HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| Error::Auth {
                        message: "Invalid access token".into(),
                    })?;
                header.set_sensitive(true);
                let mut headers = HeaderMap::new();
                headers.insert(AUTHORIZATION, header);
                Ok(headers)
            }
            Self::ApplicationDefault(cell) => {
                let credentials = cell
                    .get_or_try_init(|| async {
                        AuthBuilder::default()
                            .with_scopes(scopes.iter().copied())
                            .build()
                            .map(Arc::new)
                            .map_err(|err| Error::Auth {
                                message: format!("ADC init failed: {err}"),
                            })
                    })
                    .await?;
                let headers = credentials
                    .headers(Extensions::new())
                    .await
                    .map_err(|err| Error::Auth {
                        message: format!("ADC header fetch failed: {err}"),
                    })?;
                match headers {
                    CacheableResource::New { data, .. } => Ok(data),
                    CacheableResource::NotModified => Err(Error::Auth {
                        message: "ADC header fetch returned NotModified without cached headers"
                            .into(),
                    }),
                }
            }
        }
    }
}

impl ClientInner {
    /// 发送请求并自动注入鉴权头。
    ///
    /// # Errors
    /// 当请求构建、鉴权头获取或网络请求失败时返回错误。
    pub async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let mut request = request.build()?;
        let scopes: Vec<&str> = self.config.auth_scopes.iter().map(String::as_str).collect();
        let headers = self.auth_provider.headers(&scopes).await?;
        for (name, value) in &headers {
            if request.headers().contains_key(name) {
                continue;
            }
            let mut value = value.clone();
            if name == AUTHORIZATION {
                value.set_sensitive(true);
            }
            request.headers_mut().insert(name.clone(), value);
        }
        Ok(self.http.execute(request).await?)
    }
}

pub(crate) struct ApiClient {
    pub base_url: String,
    pub api_version: String,
}

impl ApiClient {
    /// 创建 API 客户端配置。
    pub fn new(config: &ClientConfig) -> Self {
        let base_url = config.http_options.base_url.as_deref().map_or_else(
            || {
                let location = config.location.as_str();
                if location.is_empty() {
                    "https://aiplatform.googleapis.com/".to_string()
                } else {
                    format!("https://{location}-aiplatform.googleapis.com/")
                }
            },
            normalize_base_url,
        );

        let api_version = config
            .http_options
            .api_version
            .clone()
            .unwrap_or_else(|| "v1beta1".to_string());

        Self {
            base_url,
            api_version,
        }
    }
}

fn normalize_base_url(base_url: &str) -> String {
    let mut value = base_url.trim().to_string();
    if !value.ends_with('/') {
        value.push('/');
    }
    value
}

/// Process-lifetime, single-flight cache for the upstream client handle.
///
/// 首个调用者执行初始化并缓存；后续调用复用同一句柄，进程内永不失效。
/// The slot is a value, not a global, so tests inject fresh caches.
pub struct ClientCache {
    cell: OnceCell<Client>,
}

impl ClientCache {
    /// 创建空缓存。
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
        }
    }

    /// 以现成客户端预填充缓存（依赖注入用）。
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self {
            cell: OnceCell::new_with(Some(client)),
        }
    }

    /// 获取缓存的客户端，首次调用时从环境初始化。
    ///
    /// # Errors
    /// 当必需配置缺失或客户端构建失败时返回错误。
    pub async fn get(&self) -> Result<&Client> {
        self.get_or_try_init(|| async { Client::from_env() }).await
    }

    /// 获取缓存的客户端，槽为空时运行 `init`。
    ///
    /// Concurrent first callers collapse into a single successful `init`.
    ///
    /// # Errors
    /// 透传 `init` 的错误；失败不会填充缓存。
    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<&Client>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Client>>,
    {
        self.cell.get_or_try_init(init).await
    }
}

impl Default for ClientCache {
    fn default() -> Self {
        Self::new()
    }
}
