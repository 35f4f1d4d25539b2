use crate::error::ProviderError;
use crate::fallback::Named;
use crate::structs::ImageAsset;
use crate::vision::orchestrator::VisionProvider;
use crate::vision::providers::encode_image;
use crate::vision::structs::VisionAnswer;
use async_trait::async_trait;
use bon::bon;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const GEMINI_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const ANSWER_CONFIDENCE: f64 = 0.8;

/// Google Gemini `generateContent` with the image sent inline.
pub struct GeminiVision {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[bon]
impl GeminiVision {
    #[builder(start_fn = with_api_key)]
    pub fn new(
        #[builder(start_fn)] api_key: &str,
        base_url: Option<String>,
        model: Option<String>,
        http: Option<Client>,
    ) -> Self {
        Self {
            http: http.unwrap_or_default(),
            api_key: api_key.to_string(),
            base_url: base_url
                .unwrap_or_else(|| GEMINI_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }
}

fn build_request(asset: &ImageAsset, instruction: &str) -> GenerateRequest {
    let (mime_type, data) = encode_image(asset);
    GenerateRequest {
        contents: vec![Content {
            parts: vec![
                RequestPart::Text {
                    text: instruction.to_string(),
                },
                RequestPart::InlineData {
                    inline_data: InlineData { mime_type, data },
                },
            ],
        }],
    }
}

fn parse_response(response: GenerateResponse) -> Result<VisionAnswer, ProviderError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ProviderError::Malformed(format!("prompt blocked: {reason}")));
    }
    let analysis = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ProviderError::Malformed("response contained no text".to_string()))?;
    Ok(VisionAnswer {
        analysis,
        confidence: ANSWER_CONFIDENCE,
    })
}

impl Named for GeminiVision {
    fn name(&self) -> &str {
        "gemini"
    }
}

#[async_trait]
impl VisionProvider for GeminiVision {
    async fn analyze(&self, asset: &ImageAsset, instruction: &str) -> Result<VisionAnswer, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&build_request(asset, instruction))
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(ProviderError::from_status(
                status,
                response.text().await.unwrap_or_default(),
            ));
        }
        parse_response(response.json().await?)
    }
}
