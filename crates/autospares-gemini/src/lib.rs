// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Gemini provider adapter for the AutoSpares shopping assistant.
//!
//! Implements [`ProviderAdapter`] over the `generateContent` endpoint with
//! function calling.

pub mod client;
pub mod types;

use async_trait::async_trait;
use autospares_config::StoreConfig;
use autospares_core::types::{
    ProviderRequest, ProviderResponse, Turn, TurnPart, TurnRole,
};
use autospares_core::{AdapterType, HealthStatus, PluginAdapter, ProviderAdapter, StoreError};
use tracing::{debug, info};

use crate::client::GeminiClient;
use crate::types::{
    Content, FunctionCallPart, FunctionDeclaration, FunctionResponsePart, GenerateContentRequest,
    GenerateContentResponse, GenerationConfig, Part, ToolSet,
};

/// Prompt used when neither `chat.system_prompt_file` nor `chat.system_prompt` is set.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are the shopping assistant for AutoSpares Kenya, an auto parts store. \
Help customers find the right parts for their vehicles using the catalog tools.

Rules:
- When the customer asks about their cart or wants to check out, call get_cart_status first. Never guess cart contents.
- Use search_products or get_products before recommending a part, and quote prices in KSh.
- Ask for the vehicle make, model and year when compatibility matters.
- To place an order, collect first name, last name, email, phone and delivery address, then call create_order.
- Payments are made with M-Pesa. Call initiate_mpesa_payment with a Kenyan phone number once an order exists.
- Keep answers short and friendly.";

/// Gemini provider implementing [`ProviderAdapter`].
///
/// API key resolution order: config -> `GEMINI_API_KEY` env var -> error.
pub struct GeminiProvider {
    client: GeminiClient,
    system_prompt: String,
    generation: GenerationConfig,
}

impl GeminiProvider {
    /// Creates a provider from configuration.
    ///
    /// The system prompt is read from `chat.system_prompt_file` if it exists,
    /// then `chat.system_prompt`, then [`DEFAULT_SYSTEM_PROMPT`].
    pub async fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let api_key = resolve_api_key(&config.gemini.api_key)?;
        let system_prompt =
            load_system_prompt(&config.chat.system_prompt, &config.chat.system_prompt_file).await;

        let client = GeminiClient::new(
            &api_key,
            config.gemini.model.clone(),
            config.gemini.base_url.clone(),
            config.gemini.max_retries,
        )?;

        info!(model = %config.gemini.model, "Gemini provider initialized");

        Ok(Self {
            client,
            system_prompt,
            generation: GenerationConfig {
                temperature: config.gemini.temperature,
                top_k: config.gemini.top_k,
                top_p: config.gemini.top_p,
                max_output_tokens: config.gemini.max_output_tokens,
            },
        })
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn to_api_request(&self, request: &ProviderRequest) -> GenerateContentRequest {
        let system = request
            .system_instruction
            .clone()
            .unwrap_or_else(|| self.system_prompt.clone());

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(vec![ToolSet {
                function_declarations: request
                    .tools
                    .iter()
                    .map(|t| FunctionDeclaration {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    })
                    .collect(),
            }])
        };

        GenerateContentRequest {
            contents: request.turns.iter().map(to_content).collect(),
            system_instruction: Some(Content::system(system)),
            tools,
            generation_config: self.generation.clone(),
        }
    }
}

fn to_content(turn: &Turn) -> Content {
    let role = match turn.role {
        TurnRole::User => "user",
        TurnRole::Model => "model",
    };
    Content {
        role: Some(role.to_string()),
        parts: turn.parts.iter().map(to_part).collect(),
    }
}

fn to_part(part: &TurnPart) -> Part {
    match part {
        TurnPart::Text { text } => Part::text(text.clone()),
        TurnPart::FunctionCall { name, args } => Part {
            function_call: Some(FunctionCallPart {
                name: name.clone(),
                args: args.clone(),
            }),
            ..Default::default()
        },
        TurnPart::FunctionResponse { name, response } => Part {
            function_response: Some(FunctionResponsePart {
                name: name.clone(),
                response: response.clone(),
            }),
            ..Default::default()
        },
    }
}

/// First candidate's parts; no candidates yields an empty response.
fn from_api_response(response: GenerateContentResponse) -> ProviderResponse {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return ProviderResponse::default();
    };

    let parts = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|part| {
            if let Some(call) = part.function_call {
                Some(TurnPart::FunctionCall {
                    name: call.name,
                    args: call.args,
                })
            } else if let Some(resp) = part.function_response {
                Some(TurnPart::FunctionResponse {
                    name: resp.name,
                    response: resp.response,
                })
            } else {
                part.text.map(|text| TurnPart::Text { text })
            }
        })
        .collect();

    ProviderResponse {
        parts,
        finish_reason: candidate.finish_reason,
    }
}

#[async_trait]
impl PluginAdapter for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, StoreError> {
        // No API call: health checks must not spend quota.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), StoreError> {
        debug!("Gemini provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for GeminiProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, StoreError> {
        let api_request = self.to_api_request(&request);
        let response = self.client.generate_content(&api_request).await?;
        if let Some(usage) = &response.usage_metadata {
            debug!(
                prompt_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                "Gemini usage"
            );
        }
        Ok(from_api_response(response))
    }
}

/// Resolves the API key from config or environment.
fn resolve_api_key(config_key: &Option<String>) -> Result<String, StoreError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    std::env::var("GEMINI_API_KEY").map_err(|_| {
        StoreError::Config(
            "Gemini API key not found. Set gemini.api_key in config or GEMINI_API_KEY environment variable.".into(),
        )
    })
}

/// Loads the system prompt following priority: file > inline > default.
async fn load_system_prompt(inline_prompt: &Option<String>, prompt_file: &Option<String>) -> String {
    if let Some(file_path) = prompt_file {
        match tokio::fs::read_to_string(file_path).await {
            Ok(content) => {
                let trimmed = content.trim().to_string();
                if !trimmed.is_empty() {
                    info!(path = file_path, "loaded system prompt from file");
                    return trimmed;
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = file_path,
                    error = %e,
                    "failed to read system prompt file, falling back"
                );
            }
        }
    }

    if let Some(prompt) = inline_prompt
        && !prompt.is_empty()
    {
        return prompt.clone();
    }

    DEFAULT_SYSTEM_PROMPT.to_string()
}
