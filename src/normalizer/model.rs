use std::time::Duration;

use async_openai::{config::OpenAIConfig, types::CreateCompletionRequestArgs, Client as OpenAIClient};
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::options::GenerationOptions;
use ollama_rs::Ollama;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::TARGET_NORMALIZER;

#[derive(Clone)]
pub enum LLMClient {
    Ollama(Ollama),
    OpenAI(OpenAIClient<OpenAIConfig>),
}

#[derive(Clone)]
pub struct LLMParams {
    pub client: LLMClient,
    pub model: String,
    pub temperature: f32,
}

impl LLMParams {
    pub fn from_config(endpoint: &str, model: &str) -> Self {
        let ollama = Ollama::new(endpoint.to_string(), 11434);
        LLMParams {
            client: LLMClient::Ollama(ollama),
            model: model.to_string(),
            temperature: 0.2,
        }
    }
}

/// Mirrors the teacher's retry/timeout shape exactly but with the attempt
/// count brought down to two (§4.3's "two attempts with short backoff"),
/// since the Normalizer must fail fast into its always-available
/// deterministic path rather than stall the processor loop.
pub async fn generate_llm_response(prompt: &str, params: &LLMParams) -> Option<String> {
    let max_retries = 2;
    let mut backoff = 1u64;

    for attempt in 0..max_retries {
        debug!(target: TARGET_NORMALIZER, attempt, "querying model");
        let response = match &params.client {
            LLMClient::Ollama(ollama) => {
                let mut request = GenerationRequest::new(params.model.clone(), prompt.to_string());
                request.options = Some(GenerationOptions::default().temperature(params.temperature));
                match timeout(Duration::from_secs(30), ollama.generate(request)).await {
                    Ok(Ok(response)) => Some(response.response),
                    Ok(Err(e)) => {
                        warn!(target: TARGET_NORMALIZER, error = %e, "ollama generation error");
                        None
                    }
                    Err(_) => {
                        warn!(target: TARGET_NORMALIZER, "ollama request timed out");
                        None
                    }
                }
            }
            LLMClient::OpenAI(client) => {
                let request = match CreateCompletionRequestArgs::default()
                    .model(params.model.clone())
                    .prompt(prompt)
                    .temperature(params.temperature)
                    .build()
                {
                    Ok(request) => request,
                    Err(e) => {
                        warn!(target: TARGET_NORMALIZER, error = %e, "failed to build request");
                        continue;
                    }
                };
                match timeout(Duration::from_secs(30), client.completions().create(request)).await {
                    Ok(Ok(response)) => response.choices.first().map(|c| c.text.clone()),
                    Ok(Err(e)) => {
                        warn!(target: TARGET_NORMALIZER, error = %e, "openai generation error");
                        None
                    }
                    Err(_) => {
                        warn!(target: TARGET_NORMALIZER, "openai request timed out");
                        None
                    }
                }
            }
        };

        if let Some(text) = response {
            if !text.trim().is_empty() {
                return Some(text);
            }
        }

        if attempt < max_retries - 1 {
            sleep(Duration::from_secs(backoff)).await;
            backoff *= 2;
        }
    }

    warn!(target: TARGET_NORMALIZER, "no model response after all retries");
    None
}
