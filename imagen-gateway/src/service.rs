//! Orchestration facade: one request, one upstream call.

use tracing::{debug, info};

use crate::client::{Client, ClientCache};
use crate::error::{Error, Result};
use crate::models::extract_image;
use crate::normalize::normalize;
use imagen_gateway_types::models::RawOptions;

/// Environment key selecting the Imagen model.
pub const ENV_MODEL: &str = "IMAGEN_MODEL";

/// 默认的 Imagen 模型。
pub const DEFAULT_MODEL: &str = "imagen-3.0-generate-001";

/// Generated image payload handed back to the transport layer.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

/// 图像生成服务门面。
///
/// Owns the single-flight client cache; the cache is created once per
/// service value and lives for the process lifetime.
pub struct ImageService {
    cache: ClientCache,
    model: String,
}

impl ImageService {
    /// 使用默认模型创建服务。
    #[must_use]
    pub fn new() -> Self {
        Self::with_model(DEFAULT_MODEL)
    }

    /// 指定模型创建服务。
    #[must_use]
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            cache: ClientCache::new(),
            model: model.into(),
        }
    }

    /// 从环境读取模型名创建服务（`IMAGEN_MODEL`，默认 imagen-3.0-generate-001）。
    #[must_use]
    pub fn from_env() -> Self {
        let model = std::env::var(ENV_MODEL)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Self::with_model(model)
    }

    /// 以现成客户端创建服务（依赖注入用，跳过环境初始化）。
    #[must_use]
    pub fn with_client(model: impl Into<String>, client: Client) -> Self {
        Self {
            cache: ClientCache::with_client(client),
            model: model.into(),
        }
    }

    /// 当前使用的模型名。
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// 生成一张图像并返回原始字节。
    ///
    /// # Errors
    /// - `Validation`：提示词缺失或选项格式非法。
    /// - `Configuration`：部署配置缺失；不会发起上游调用。
    /// - `Upstream` / `EmptyResponse` / `MissingImageData`：上游失败或未返回可用图像。
    pub async fn generate(&self, prompt: &str, options: &RawOptions) -> Result<ImagePayload> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(Error::Validation {
                message: "prompt is required".into(),
            });
        }

        let client = self.cache.get().await?;
        let params = normalize(options)?;
        debug!(model = %self.model, ?params, "canonical parameters resolved");

        let response = client.images().generate(&self.model, prompt, &params).await?;
        let (bytes, mime_type) = extract_image(response)?;
        info!(model = %self.model, bytes = bytes.len(), "image generated");

        Ok(ImagePayload { bytes, mime_type })
    }
}

impl Default for ImageService {
    fn default() -> Self {
        Self::new()
    }
}
