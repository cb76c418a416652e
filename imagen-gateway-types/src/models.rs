//! Request and response types for image generation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::base64_serde;
use crate::enums::AspectRatio;

/// Default safety filter level applied when the caller supplies none.
pub const DEFAULT_SAFETY_FILTER_LEVEL: &str = "block_few";

/// Raw option mapping as received from the caller.
///
/// Unknown keys are ignored by normalization; no shape is guaranteed beyond
/// map semantics.
pub type RawOptions = serde_json::Map<String, Value>;

/// 显式像素尺寸，宽高均为正整数。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// `"WIDTHxHEIGHT"` 形式的字符串。
    #[must_use]
    pub fn size_string(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    /// 折算到受支持的宽高比。
    #[must_use]
    pub fn aspect_ratio(&self) -> AspectRatio {
        AspectRatio::from_dimensions(self.width, self.height)
    }
}

/// Sizing resolved from a request: exactly one representation survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sizing {
    /// A supported aspect-ratio token.
    Ratio(AspectRatio),
    /// An explicit width/height pair, kept verbatim for models that accept
    /// dimensions directly.
    Explicit(Dimensions),
}

impl Sizing {
    /// The ratio this sizing collapses to when only tokens are accepted.
    #[must_use]
    pub fn as_ratio(&self) -> AspectRatio {
        match self {
            Self::Ratio(ratio) => *ratio,
            Self::Explicit(dims) => dims.aspect_ratio(),
        }
    }
}

impl Default for Sizing {
    fn default() -> Self {
        Self::Ratio(AspectRatio::Square)
    }
}

/// 规范化后的上游请求参数。
///
/// Passthrough fields carry no content validation; the upstream service is
/// the authority on their values.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalParams {
    pub sizing: Sizing,
    pub safety_filter_level: String,
    pub negative_prompt: Option<String>,
    pub person_generation: Option<String>,
    pub language: Option<String>,
    /// Always 1: this gateway guarantees single-image responses.
    pub number_of_images: i32,
}

impl Default for CanonicalParams {
    fn default() -> Self {
        Self {
            sizing: Sizing::default(),
            safety_filter_level: DEFAULT_SAFETY_FILTER_LEVEL.to_string(),
            negative_prompt: None,
            person_generation: None,
            language: None,
            number_of_images: 1,
        }
    }
}

/// A single image payload returned by the model.
///
/// 字节在公开字段 `bytesBase64Encoded` 或旧版内部字段 `imageBytes` 下返回。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "bytesBase64Encoded",
        alias = "imageBytes",
        with = "base64_serde::option"
    )]
    pub image_bytes: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// 生成图像输出。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Image>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rai_filtered_reason: Option<String>,
}

/// 图像生成响应。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerateImagesResponse {
    #[serde(default)]
    pub generated_images: Vec<GeneratedImage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn image_decodes_public_field() {
        let image: Image =
            serde_json::from_value(json!({"bytesBase64Encoded": "AQID", "mimeType": "image/png"}))
                .unwrap();
        assert_eq!(image.image_bytes.as_deref(), Some(&[1u8, 2, 3][..]));
        assert_eq!(image.mime_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn image_decodes_fallback_internal_field() {
        let image: Image = serde_json::from_value(json!({"imageBytes": "AQID"})).unwrap();
        assert_eq!(image.image_bytes.as_deref(), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn canonical_params_defaults() {
        let params = CanonicalParams::default();
        assert_eq!(params.sizing, Sizing::Ratio(AspectRatio::Square));
        assert_eq!(params.safety_filter_level, DEFAULT_SAFETY_FILTER_LEVEL);
        assert_eq!(params.number_of_images, 1);
        assert!(params.negative_prompt.is_none());
    }

    #[test]
    fn sizing_collapses_to_ratio() {
        let sizing = Sizing::Explicit(Dimensions {
            width: 1920,
            height: 1080,
        });
        assert_eq!(sizing.as_ratio(), AspectRatio::SixteenByNine);
        assert_eq!(
            Sizing::Ratio(AspectRatio::ThreeByFour).as_ratio(),
            AspectRatio::ThreeByFour
        );
    }

    #[test]
    fn dimensions_size_string() {
        let dims = Dimensions {
            width: 640,
            height: 480,
        };
        assert_eq!(dims.size_string(), "640x480");
    }
}
