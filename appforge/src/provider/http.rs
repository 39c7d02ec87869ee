//! HTTP backends for the configured provider

use appforge_sdk::{
    async_trait, CancellationToken, ChatMessage, GenerationOptions, ProviderError, Role,
    TextGenerationProvider,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::{ForgeConfig, ProviderConfig};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct HttpProvider {
    client: reqwest::Client,
    config: ProviderConfig,
    timeout: Duration,
}

impl HttpProvider {
    pub fn new(config: &ForgeConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProviderError::Misconfigured(e.to_string()))?;
        Ok(Self {
            client,
            config: config.provider.clone(),
            timeout: config.provider_timeout,
        })
    }

    fn request(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> reqwest::RequestBuilder {
        let max_tokens = options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);

        match &self.config {
            ProviderConfig::OpenAi {
                api_key,
                model,
                base_url,
            } => self
                .client
                .post(base_url.as_deref().unwrap_or(OPENAI_URL))
                .bearer_auth(api_key)
                .json(&chat_request(model, messages, options, max_tokens)),
            ProviderConfig::Local { endpoint, model } => self
                .client
                .post(endpoint)
                .json(&chat_request(model, messages, options, max_tokens)),
            ProviderConfig::Anthropic {
                api_key,
                model,
                base_url,
            } => {
                let mut system = options.system.clone().unwrap_or_default();
                let mut turns = Vec::with_capacity(messages.len());
                for message in messages {
                    match message.role {
                        Role::System => {
                            if !system.is_empty() {
                                system.push_str("\n\n");
                            }
                            system.push_str(&message.content);
                        }
                        Role::User | Role::Assistant => turns.push(WireMessage {
                            role: message.role,
                            content: &message.content,
                        }),
                    }
                }

                self.client
                    .post(base_url.as_deref().unwrap_or(ANTHROPIC_URL))
                    .header("x-api-key", api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(&AnthropicRequest {
                        model,
                        messages: turns,
                        system: (!system.is_empty()).then_some(system),
                        max_tokens,
                        temperature: options.temperature,
                    })
            }
        }
    }

    async fn send(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<String, ProviderError> {
        let response = self
            .request(messages, options)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(200).collect();
            return Err(ProviderError::Unavailable(format!("HTTP {}: {}", status, preview)));
        }

        let text = match &self.config {
            ProviderConfig::Anthropic { .. } => {
                let body: AnthropicResponse = response
                    .json()
                    .await
                    .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
                body.content
                    .into_iter()
                    .filter(|block| block.kind == "text")
                    .filter_map(|block| block.text)
                    .collect::<String>()
            }
            _ => {
                let body: ChatResponse = response
                    .json()
                    .await
                    .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
                body.choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
                    .unwrap_or_default()
            }
        };

        if text.trim().is_empty() {
            return Err(ProviderError::Unavailable("empty completion".to_string()));
        }
        Ok(text)
    }
}

#[async_trait]
impl TextGenerationProvider for HttpProvider {
    fn name(&self) -> &str {
        self.config.label()
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
        cancel: &CancellationToken,
    ) -> Result<String, ProviderError> {
        debug!(
            provider = self.config.label(),
            model = self.config.model(),
            temperature = options.temperature,
            "sending completion request"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProviderError::Cancelled),
            result = tokio::time::timeout(self.timeout, self.send(messages, options)) => {
                result.map_err(|_| ProviderError::Timeout(self.timeout.as_secs()))?
            }
        }
    }
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

fn chat_request<'a>(
    model: &'a str,
    messages: &'a [ChatMessage],
    options: &'a GenerationOptions,
    max_tokens: u32,
) -> ChatRequest<'a> {
    let mut wire: Vec<WireMessage<'a>> = Vec::with_capacity(messages.len() + 1);
    if let Some(system) = &options.system {
        wire.push(WireMessage {
            role: Role::System,
            content: system,
        });
    }
    wire.extend(messages.iter().map(|m| WireMessage {
        role: m.role,
        content: &m.content,
    }));

    ChatRequest {
        model,
        messages: wire,
        temperature: options.temperature,
        max_tokens,
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}
