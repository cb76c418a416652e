//! Request normalization: loose caller options to canonical upstream params.

use serde_json::Value;

use imagen_gateway_types::enums::AspectRatio;
use imagen_gateway_types::models::{CanonicalParams, Dimensions, RawOptions, Sizing};

use crate::error::{Error, Result};

/// 将原始请求选项规范化为上游可用的参数记录。
///
/// Sizing keys are resolved in a fixed order (`aspect_ratio`, `size`,
/// `image_dimensions`, `width`/`height`); the first present key wins and the
/// rest are ignored. Unknown keys are dropped silently.
///
/// # Errors
/// `Error::Validation` on malformed or contradictory sizing input.
pub fn normalize(raw: &RawOptions) -> Result<CanonicalParams> {
    let sizing = resolve_sizing(raw)?;

    let mut params = CanonicalParams {
        sizing,
        ..Default::default()
    };
    if let Some(value) = string_option(raw, "safety_filter_level") {
        params.safety_filter_level = value;
    }
    params.negative_prompt = string_option(raw, "negative_prompt");
    params.person_generation = string_option(raw, "person_generation");
    params.language = string_option(raw, "language");
    // number_of_images stays 1 regardless of caller input.

    Ok(params)
}

fn resolve_sizing(raw: &RawOptions) -> Result<Sizing> {
    if let Some(value) = non_null(raw, "aspect_ratio") {
        let token = value.as_str().ok_or_else(|| Error::Validation {
            message: "aspect_ratio must be a string".into(),
        })?;
        if !token.is_empty() {
            return ratio_from_token(token);
        }
    }

    if let Some(value) = non_null(raw, "size") {
        return Ok(Sizing::Explicit(parse_size_value(value)?));
    }

    if let Some(value) = non_null(raw, "image_dimensions") {
        return Ok(Sizing::Explicit(parse_size_value(value)?));
    }

    match (non_null(raw, "width"), non_null(raw, "height")) {
        (Some(width), Some(height)) => Ok(Sizing::Explicit(Dimensions {
            width: to_positive_int(width)?,
            height: to_positive_int(height)?,
        })),
        (None, None) => Ok(Sizing::Ratio(AspectRatio::Square)),
        _ => Err(Error::Validation {
            message: "width and height must be provided together".into(),
        }),
    }
}

fn ratio_from_token(token: &str) -> Result<Sizing> {
    if let Some(ratio) = AspectRatio::parse(token) {
        return Ok(Sizing::Ratio(ratio));
    }
    // Out-of-set ratios collapse onto the nearest supported member.
    let (width, height) = split_ratio_token(token).ok_or_else(|| Error::Validation {
        message: format!("invalid aspect_ratio: {token}"),
    })?;
    Ok(Sizing::Ratio(AspectRatio::from_dimensions(width, height)))
}

fn split_ratio_token(token: &str) -> Option<(u32, u32)> {
    let (width, height) = token.split_once(':')?;
    let width = width.trim().parse::<u32>().ok()?;
    let height = height.trim().parse::<u32>().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    Some((width, height))
}

fn parse_size_value(value: &Value) -> Result<Dimensions> {
    match value {
        Value::String(text) => parse_size_string(text),
        Value::Object(map) => {
            let width = map
                .get("width")
                .filter(|value| !value.is_null())
                .ok_or_else(missing_dimension_member)?;
            let height = map
                .get("height")
                .filter(|value| !value.is_null())
                .ok_or_else(missing_dimension_member)?;
            Ok(Dimensions {
                width: to_positive_int(width)?,
                height: to_positive_int(height)?,
            })
        }
        _ => Err(Error::Validation {
            message: "Unsupported image dimension format".into(),
        }),
    }
}

fn missing_dimension_member() -> Error {
    Error::Validation {
        message: "image_dimensions requires 'width' and 'height'".into(),
    }
}

fn parse_size_string(text: &str) -> Result<Dimensions> {
    let lowered = text.trim().to_ascii_lowercase();
    let parts: Vec<&str> = lowered.split('x').collect();
    if parts.len() != 2 {
        return Err(Error::Validation {
            message: "size/image_dimensions must follow 'WIDTHxHEIGHT' format".into(),
        });
    }
    Ok(Dimensions {
        width: parse_positive_part(parts[0])?,
        height: parse_positive_part(parts[1])?,
    })
}

fn parse_positive_part(part: &str) -> Result<u32> {
    part.trim()
        .parse::<u32>()
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| Error::Validation {
            message: "width and height must be positive integers".into(),
        })
}

fn to_positive_int(value: &Value) -> Result<u32> {
    let number = match value {
        Value::Number(num) => num.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    number
        .filter(|value| *value > 0)
        .and_then(|value| u32::try_from(value).ok())
        .ok_or_else(|| Error::Validation {
            message: "width and height must be positive integers".into(),
        })
}

fn string_option(raw: &RawOptions, key: &str) -> Option<String> {
    non_null(raw, key)?.as_str().map(ToString::to_string)
}

fn non_null<'a>(raw: &'a RawOptions, key: &str) -> Option<&'a Value> {
    raw.get(key).filter(|value| !value.is_null())
}
