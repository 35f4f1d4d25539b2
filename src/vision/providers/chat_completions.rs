use crate::error::ProviderError;
use crate::fallback::Named;
use crate::structs::ImageAsset;
use crate::vision::orchestrator::VisionProvider;
use crate::vision::providers::data_url;
use crate::vision::structs::VisionAnswer;
use async_trait::async_trait;
use bon::bon;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const OPENAI_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// The API reports no confidence of its own.
const ANSWER_CONFIDENCE: f64 = 0.85;

/// Any OpenAI-compatible `/v1/chat/completions` endpoint with image input.
pub struct ChatCompletionsVision {
    http: Client,
    name: String,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: Vec<MessagePart>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum MessagePart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[bon]
impl ChatCompletionsVision {
    /// An API key is optional so that local, unauthenticated servers work too.
    #[builder]
    pub fn new(
        api_key: Option<String>,
        base_url: Option<String>,
        model: Option<String>,
        #[builder(default = "openai".to_string())] name: String,
        #[builder(default = 800)] max_tokens: u32,
        http: Option<Client>,
    ) -> Self {
        Self {
            http: http.unwrap_or_default(),
            name,
            base_url: base_url
                .unwrap_or_else(|| OPENAI_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens,
        }
    }

    fn build_request(&self, asset: &ImageAsset, instruction: &str) -> ChatRequest<'_> {
        ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: vec![
                    MessagePart::Text {
                        text: instruction.to_string(),
                    },
                    MessagePart::ImageUrl {
                        image_url: ImageUrl {
                            url: data_url(asset),
                        },
                    },
                ],
            }],
            max_tokens: self.max_tokens,
        }
    }
}

fn parse_response(response: ChatResponse) -> Result<VisionAnswer, ProviderError> {
    let analysis = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ProviderError::Malformed("response contained no text".to_string()))?;
    Ok(VisionAnswer {
        analysis,
        confidence: ANSWER_CONFIDENCE,
    })
}

impl Named for ChatCompletionsVision {
    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl VisionProvider for ChatCompletionsVision {
    async fn analyze(&self, asset: &ImageAsset, instruction: &str) -> Result<VisionAnswer, ProviderError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let mut request = self.http.post(url).json(&self.build_request(asset, instruction));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
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
