use serde_json::json;
use std::path::{Path, PathBuf};

use imagen_gateway::ImageService;

fn extension_from_mime(mime: &str) -> &str {
    match mime {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        _ => "bin",
    }
}

fn output_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("IMAGEN_OUTPUT_DIR") {
        return PathBuf::from(dir);
    }
    Path::new(env!("CARGO_MANIFEST_DIR")).join("output")
}

#[tokio::main]
async fn main() -> imagen_gateway::Result<()> {
    let service = ImageService::from_env();
    let options = json!({
        "aspect_ratio": "16:9",
        "negative_prompt": "text, watermark"
    });

    let image = service
        .generate(
            "A futuristic smart kitchen with high-tech appliances, studio lighting",
            options.as_object().unwrap(),
        )
        .await?;

    let dir = output_dir();
    std::fs::create_dir_all(&dir).expect("create output dir");
    let ext = image
        .mime_type
        .as_deref()
        .map(extension_from_mime)
        .unwrap_or("jpg");
    let filename = dir.join(format!("generated.{ext}"));
    std::fs::write(&filename, &image.bytes).expect("write image file");
    println!("saved {} (可用 IMAGEN_OUTPUT_DIR 覆盖输出目录)", filename.display());
    Ok(())
}
