use async_trait::async_trait;

use crate::errors::{ScoutError, ScoutResult};
use crate::llm::prompt::{encode_images, system_instruction, Criteria, MAX_OUTPUT_TOKENS};
use crate::llm::provider::VisionProvider;
use crate::llm::providers::{http_client, log_usage, send_json, ProviderSettings};
use crate::llm::types::{EvaluationRequest, ProviderPayload, RawResponse, Usage};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Messages API: system text in its own field, images before the prompt in
/// the user turn.
pub struct AnthropicProvider {
    settings: ProviderSettings,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(settings: ProviderSettings) -> Self {
        let client = http_client(settings.request_timeout);
        Self { settings, client }
    }
}

#[async_trait]
impl VisionProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.settings.model
    }

    fn build_request(
        &self,
        request: &EvaluationRequest,
        criteria: &Criteria,
    ) -> ScoutResult<ProviderPayload> {
        let mut content: Vec<serde_json::Value> = encode_images(&request.images)?
            .into_iter()
            .map(|img| {
                serde_json::json!({
                    "type": "image",
                    "source": {
                        "type": "base64",
                        "media_type": img.media_type,
                        "data": img.data,
                    }
                })
            })
            .collect();
        content.push(serde_json::json!({ "type": "text", "text": request.prompt }));

        let body = serde_json::json!({
            "model": self.settings.model,
            "system": system_instruction(criteria),
            "messages": [{ "role": "user", "content": content }],
            "max_tokens": MAX_OUTPUT_TOKENS,
            "stream": false,
        });

        Ok(ProviderPayload {
            endpoint: self.settings.api_base.clone(),
            body,
        })
    }

    async fn invoke(&self, payload: ProviderPayload) -> ScoutResult<RawResponse> {
        tracing::debug!(provider = "anthropic", model = %self.settings.model, "sending evaluation request");

        let request = self
            .client
            .post(&payload.endpoint)
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);
        let json = send_json(self.name(), request, &payload.body).await?;

        // The answer is the last text block.
        let text = json["content"]
            .as_array()
            .and_then(|blocks| {
                blocks
                    .iter()
                    .rev()
                    .find(|b| b["type"].as_str() == Some("text"))
                    .and_then(|b| b["text"].as_str())
            })
            .ok_or_else(|| ScoutError::ProviderInvocation {
                provider: self.name().to_string(),
                message: "response has no text block".into(),
            })?
            .to_string();

        let usage = json.get("usage").map(|u| Usage {
            input_tokens: u["input_tokens"].as_u64().unwrap_or(0),
            output_tokens: u["output_tokens"].as_u64().unwrap_or(0),
        });
        log_usage(self.name(), &self.settings.model, usage, &self.settings.pricing);

        tracing::info!(provider = "anthropic", content_len = text.len(), "evaluation response received");
        Ok(RawResponse { text, usage })
    }
}
