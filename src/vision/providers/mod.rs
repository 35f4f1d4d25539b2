mod chat_completions;
mod gemini;

pub use chat_completions::ChatCompletionsVision;
pub use gemini::GeminiVision;

use crate::structs::ImageAsset;
use base64::{Engine as _, engine::general_purpose};

/// Sniffed MIME type and base64 payload of an image. The declared media type
/// is only used when sniffing fails.
pub(crate) fn encode_image(asset: &ImageAsset) -> (String, String) {
    let mime_type = infer::get(asset.bytes())
        .map_or_else(|| asset.media_type().to_string(), |kind| kind.mime_type().to_string());
    (mime_type, general_purpose::STANDARD.encode(asset.bytes()))
}

/// `data:` URL for inline image transport.
pub(crate) fn data_url(asset: &ImageAsset) -> String {
    let (mime_type, b64) = encode_image(asset);
    format!("data:{mime_type};base64,{b64}")
}
