use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::core::completion::{CompletionBackend, CompletionRequest};
use crate::core::error::ServiceError;

/// Chat-completions client for OpenAI-compatible endpoints.
pub struct OpenAiBackend {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(base_url: &str, model: &str, api_key: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("tickerbrief/0.1")
            .build()?;
        Ok(OpenAiBackend {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }
}

#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize, Debug)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize, Debug)]
struct ChatReply {
    content: Option<String>,
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    #[instrument(name = "Completion", skip(self, request), fields(prompt = %request.prompt_id))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.instructions,
                },
                ChatMessage {
                    role: "user",
                    content: &request.input,
                },
            ],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("X-Prompt-Id", &request.prompt_id)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            debug!(%status, "Completion request rejected");
            return Err(ServiceError::from_status(status, message));
        }

        let text = response.text().await?;
        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| ServiceError::InvalidResponse(format!("Failed to parse reply: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ServiceError::InvalidResponse("Empty completion".to_string()))
    }
}
