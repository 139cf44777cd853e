/// Chat-completion client, the single point of entry for all text-generation
/// calls. Speaks the OpenAI-compatible `/chat/completions` wire format.
///
/// Model: gemini-2.0-flash (hardcoded — do not make configurable to prevent drift)
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// The model used for all chat-completion calls.
pub const MODEL: &str = "gemini-2.0-flash";
const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Chat API returned empty content")]
    EmptyContent,
}

impl ChatError {
    /// Upstream status code, when the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ChatError::Api { status, .. } => Some(*status),
            ChatError::Http(e) => e.status().map(|s| s.as_u16()),
            ChatError::EmptyContent => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    /// Omitted when the caller supplied no budget (upstream default applies).
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ChatClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Issues a single-message user completion and returns the generated text.
    pub async fn complete(
        &self,
        prompt: &str,
        max_tokens: Option<u32>,
    ) -> Result<String, ChatError> {
        let request_body = ChatRequest {
            model: MODEL,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
            max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ChatError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat_response: ChatResponse = response.json().await?;
        let content = extract_content(chat_response)?;

        debug!("Chat completion succeeded ({} chars)", content.len());
        Ok(content)
    }
}

/// Pulls the generated text out of the first choice, rejecting empty responses.
fn extract_content(response: ChatResponse) -> Result<String, ChatError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.is_empty())
        .ok_or(ChatError::EmptyContent)
}
