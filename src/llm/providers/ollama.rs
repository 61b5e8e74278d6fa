use async_trait::async_trait;

use crate::errors::{ScoutError, ScoutResult};
use crate::llm::prompt::{encode_images, system_instruction, Criteria, MAX_OUTPUT_TOKENS};
use crate::llm::provider::VisionProvider;
use crate::llm::providers::{http_client, log_usage, send_json, ProviderSettings};
use crate::llm::types::{EvaluationRequest, ProviderPayload, RawResponse, Usage};

/// Local inference via `/api/generate`. No message roles: instruction and
/// prompt are concatenated into one prompt string, images go alongside as
/// raw base64.
pub struct OllamaProvider {
    settings: ProviderSettings,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(settings: ProviderSettings) -> Self {
        let client = http_client(settings.request_timeout);
        Self { settings, client }
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.settings.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl VisionProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.settings.model
    }

    fn build_request(
        &self,
        request: &EvaluationRequest,
        criteria: &Criteria,
    ) -> ScoutResult<ProviderPayload> {
        let images: Vec<String> = encode_images(&request.images)?
            .into_iter()
            .map(|img| img.data)
            .collect();
        let prompt = format!("{}\n\n{}", system_instruction(criteria), request.prompt);

        let body = serde_json::json!({
            "model": self.settings.model,
            "prompt": prompt,
            "images": images,
            "stream": false,
            "format": "json",
            "options": { "num_predict": MAX_OUTPUT_TOKENS },
        });

        Ok(ProviderPayload {
            endpoint: self.generate_url(),
            body,
        })
    }

    async fn invoke(&self, payload: ProviderPayload) -> ScoutResult<RawResponse> {
        tracing::debug!(provider = "ollama", model = %self.settings.model, "sending evaluation request");

        let request = self.client.post(&payload.endpoint);
        let json = send_json(self.name(), request, &payload.body).await?;

        if let Some(err) = json.get("error").and_then(|e| e.as_str()) {
            return Err(ScoutError::ProviderInvocation {
                provider: self.name().to_string(),
                message: err.to_string(),
            });
        }

        let text = json["response"]
            .as_str()
            .ok_or_else(|| ScoutError::ProviderInvocation {
                provider: self.name().to_string(),
                message: "response has no 'response' field".into(),
            })?
            .to_string();

        let usage = match (json["prompt_eval_count"].as_u64(), json["eval_count"].as_u64()) {
            (None, None) => None,
            (input, output) => Some(Usage {
                input_tokens: input.unwrap_or(0),
                output_tokens: output.unwrap_or(0),
            }),
        };
        log_usage(self.name(), &self.settings.model, usage, &self.settings.pricing);

        tracing::info!(provider = "ollama", content_len = text.len(), "evaluation response received");
        Ok(RawResponse { text, usage })
    }
}
