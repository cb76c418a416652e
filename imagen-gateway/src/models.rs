//! Imagen invocation: predict bodies, response parsing, byte extraction.

use std::sync::Arc;

use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::capabilities::{sizing_for, SizingCapabilities, SizingMode};
use crate::client::ClientInner;
use crate::error::{Error, Result};
use imagen_gateway_types::models::{
    CanonicalParams, GenerateImagesResponse, GeneratedImage, Image, Sizing,
};

/// Images API。
pub struct Images {
    pub(crate) inner: Arc<ClientInner>,
}

impl Images {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// 生成图像（单次上游调用，无重试）。
    ///
    /// # Errors
    /// 当请求构建、网络请求失败或上游返回非 2xx 时返回错误。
    pub async fn generate(
        &self,
        model: impl Into<String>,
        prompt: impl Into<String>,
        params: &CanonicalParams,
    ) -> Result<GenerateImagesResponse> {
        let model = model.into();
        let prompt = prompt.into();
        let body = build_predict_body(&model, &prompt, params);
        let url = build_predict_url(&self.inner, &model);
        debug!(%model, %url, "sending predict request");

        let request = self.inner.http.post(url).json(&body);
        let response = self.inner.send(request).await?;
        if !response.status().is_success() {
            return Err(Error::Upstream {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let value = response.json::<Value>().await?;
        Ok(parse_generate_images_response(&value))
    }
}

fn transform_model_name(model: &str) -> String {
    if model.starts_with("projects/") || model.starts_with("publishers/") {
        model.to_string()
    } else {
        format!("publishers/google/models/{model}")
    }
}

fn build_predict_url(inner: &ClientInner, model: &str) -> String {
    let model = transform_model_name(model);
    let base = &inner.api_client.base_url;
    let version = &inner.api_client.api_version;
    format!(
        "{base}{version}/projects/{}/locations/{}/{model}:predict",
        inner.config.project, inner.config.location
    )
}

fn build_predict_body(model: &str, prompt: &str, params: &CanonicalParams) -> Value {
    let mut instance = Map::new();
    instance.insert("prompt".to_string(), Value::String(prompt.to_string()));

    let mut root = Map::new();
    root.insert(
        "instances".to_string(),
        Value::Array(vec![Value::Object(instance)]),
    );

    let mut parameters = Map::new();
    parameters.insert(
        "sampleCount".to_string(),
        Value::Number(Number::from(params.number_of_images)),
    );
    apply_sizing(&mut parameters, &params.sizing, sizing_for(model));
    parameters.insert(
        "safetySetting".to_string(),
        Value::String(params.safety_filter_level.clone()),
    );
    if let Some(value) = &params.negative_prompt {
        parameters.insert("negativePrompt".to_string(), Value::String(value.clone()));
    }
    if let Some(value) = &params.person_generation {
        parameters.insert(
            "personGeneration".to_string(),
            Value::String(value.clone()),
        );
    }
    if let Some(value) = &params.language {
        parameters.insert("language".to_string(), Value::String(value.clone()));
    }
    root.insert("parameters".to_string(), Value::Object(parameters));

    Value::Object(root)
}

/// Translate the resolved sizing into the first wire shape the model
/// accepts, in priority order size-string, dimensions-pair, ratio-token.
///
/// 仅当模型只接受比例令牌时，显式尺寸才折算为最近的受支持比例；
/// 无任何匹配时不发送尺寸参数，交给上游默认值。
fn apply_sizing(parameters: &mut Map<String, Value>, sizing: &Sizing, caps: SizingCapabilities) {
    match sizing {
        Sizing::Explicit(dims) => match caps.preferred() {
            Some(SizingMode::SizeString) => {
                parameters.insert("size".to_string(), Value::String(dims.size_string()));
            }
            Some(SizingMode::DimensionsPair) => {
                parameters.insert("width".to_string(), Value::Number(Number::from(dims.width)));
                parameters.insert(
                    "height".to_string(),
                    Value::Number(Number::from(dims.height)),
                );
            }
            Some(SizingMode::AspectRatioToken) => {
                parameters.insert(
                    "aspectRatio".to_string(),
                    Value::String(dims.aspect_ratio().as_str().to_string()),
                );
            }
            None => {}
        },
        Sizing::Ratio(ratio) => {
            if caps.accepts_aspect_ratio {
                parameters.insert(
                    "aspectRatio".to_string(),
                    Value::String(ratio.as_str().to_string()),
                );
            }
        }
    }
}

fn parse_generate_images_response(value: &Value) -> GenerateImagesResponse {
    let predictions = value
        .get("predictions")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut generated_images = Vec::new();
    for item in predictions {
        generated_images.push(parse_generated_image(&item));
    }

    GenerateImagesResponse { generated_images }
}

fn parse_generated_image(value: &Value) -> GeneratedImage {
    let image = serde_json::from_value::<Image>(value.clone()).ok();
    let rai_filtered_reason = value
        .get("raiFilteredReason")
        .and_then(Value::as_str)
        .map(ToString::to_string);

    GeneratedImage {
        image,
        rai_filtered_reason,
    }
}

/// 提取首张图像的字节与 MIME 类型；多余图像被丢弃，不算错误。
///
/// # Errors
/// - `EmptyResponse`：上游未返回任何图像。
/// - `MissingImageData`：首张图像没有任何已知字段下的字节负载。
pub fn extract_image(mut response: GenerateImagesResponse) -> Result<(Vec<u8>, Option<String>)> {
    if response.generated_images.is_empty() {
        return Err(Error::EmptyResponse);
    }
    let first = response.generated_images.swap_remove(0);
    let image = first.image.ok_or(Error::MissingImageData)?;
    let bytes = image.image_bytes.ok_or(Error::MissingImageData)?;
    Ok((bytes, image.mime_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use imagen_gateway_types::enums::AspectRatio;
    use imagen_gateway_types::models::Dimensions;
    use serde_json::json;

    fn explicit(width: u32, height: u32) -> CanonicalParams {
        CanonicalParams {
            sizing: Sizing::Explicit(Dimensions { width, height }),
            ..Default::default()
        }
    }

    #[test]
    fn ratio_models_receive_aspect_ratio_tokens() {
        let body = build_predict_body("imagen-3.0-generate-001", "a fox", &explicit(1920, 1080));
        let parameters = body.get("parameters").unwrap();
        assert_eq!(
            parameters.get("aspectRatio").and_then(Value::as_str),
            Some("16:9")
        );
        assert!(parameters.get("size").is_none());
        assert_eq!(
            parameters.get("sampleCount").and_then(Value::as_i64),
            Some(1)
        );
        assert_eq!(
            parameters.get("safetySetting").and_then(Value::as_str),
            Some("block_few")
        );
    }

    #[test]
    fn inference_only_fires_for_ratio_models() {
        // Legacy models take the explicit pair verbatim.
        let body = build_predict_body("imagegeneration@002", "a fox", &explicit(10, 7));
        let parameters = body.get("parameters").unwrap();
        assert_eq!(
            parameters.get("size").and_then(Value::as_str),
            Some("10x7")
        );
        assert!(parameters.get("aspectRatio").is_none());
    }

    #[test]
    fn ratio_sizing_is_skipped_for_size_only_models() {
        let params = CanonicalParams {
            sizing: Sizing::Ratio(AspectRatio::SixteenByNine),
            ..Default::default()
        };
        let body = build_predict_body("imagegeneration@002", "a fox", &params);
        let parameters = body.get("parameters").unwrap();
        assert!(parameters.get("size").is_none());
        assert!(parameters.get("aspectRatio").is_none());
        assert!(parameters.get("width").is_none());
    }

    #[test]
    fn unknown_models_get_no_sizing_parameter() {
        let body = build_predict_body("mystery-model", "a fox", &explicit(1024, 768));
        let parameters = body.get("parameters").unwrap();
        assert!(parameters.get("size").is_none());
        assert!(parameters.get("aspectRatio").is_none());
    }

    #[test]
    fn passthrough_parameters_reach_the_wire() {
        let params = CanonicalParams {
            negative_prompt: Some("blurry".to_string()),
            person_generation: Some("allow_adult".to_string()),
            language: Some("ja".to_string()),
            ..Default::default()
        };
        let body = build_predict_body("imagen-3.0-generate-001", "a fox", &params);
        let parameters = body.get("parameters").unwrap();
        assert_eq!(
            parameters.get("negativePrompt").and_then(Value::as_str),
            Some("blurry")
        );
        assert_eq!(
            parameters.get("personGeneration").and_then(Value::as_str),
            Some("allow_adult")
        );
        assert_eq!(
            parameters.get("language").and_then(Value::as_str),
            Some("ja")
        );
    }

    #[test]
    fn prompt_lands_in_the_instance() {
        let body = build_predict_body(
            "imagen-3.0-generate-001",
            "a red fox in snow",
            &CanonicalParams::default(),
        );
        let instances = body.get("instances").and_then(Value::as_array).unwrap();
        assert_eq!(
            instances[0].get("prompt").and_then(Value::as_str),
            Some("a red fox in snow")
        );
    }

    #[test]
    fn response_parsing_reads_predictions() {
        let response = parse_generate_images_response(&json!({
            "predictions": [
                {"bytesBase64Encoded": "AQID", "mimeType": "image/png"},
                {"raiFilteredReason": "blocked"}
            ]
        }));
        assert_eq!(response.generated_images.len(), 2);
        assert_eq!(
            response.generated_images[1].rai_filtered_reason.as_deref(),
            Some("blocked")
        );
    }

    #[test]
    fn extract_image_returns_first_payload() {
        let response = parse_generate_images_response(&json!({
            "predictions": [
                {"bytesBase64Encoded": "AQID", "mimeType": "image/png"},
                {"bytesBase64Encoded": "BAUG", "mimeType": "image/jpeg"}
            ]
        }));
        let (bytes, mime_type) = extract_image(response).unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
        assert_eq!(mime_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn extract_image_accepts_fallback_field() {
        let response = parse_generate_images_response(&json!({
            "predictions": [{"imageBytes": "AQID"}]
        }));
        let (bytes, mime_type) = extract_image(response).unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
        assert!(mime_type.is_none());
    }

    #[test]
    fn extract_image_empty_response_errors() {
        let response = parse_generate_images_response(&json!({"predictions": []}));
        assert!(matches!(
            extract_image(response),
            Err(Error::EmptyResponse)
        ));

        let response = parse_generate_images_response(&json!({}));
        assert!(matches!(
            extract_image(response),
            Err(Error::EmptyResponse)
        ));
    }

    #[test]
    fn extract_image_missing_bytes_errors() {
        let response = parse_generate_images_response(&json!({
            "predictions": [{"raiFilteredReason": "blocked"}]
        }));
        assert!(matches!(
            extract_image(response),
            Err(Error::MissingImageData)
        ));
    }

    #[test]
    fn predict_url_uses_project_and_location() {
        let inner = crate::test_support::test_client_inner("proj", "us-central1");
        let url = build_predict_url(&inner, "imagen-3.0-generate-001");
        assert_eq!(
            url,
            "https://us-central1-aiplatform.googleapis.com/v1beta1/projects/proj/locations/us-central1/publishers/google/models/imagen-3.0-generate-001:predict"
        );

        let url = build_predict_url(&inner, "publishers/google/models/imagen-3.0-generate-001");
        assert!(url.ends_with("publishers/google/models/imagen-3.0-generate-001:predict"));
        assert!(!url.contains("publishers/google/models/publishers"));
    }
}
