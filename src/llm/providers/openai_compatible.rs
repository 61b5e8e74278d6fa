use async_trait::async_trait;

use crate::errors::{ScoutError, ScoutResult};
use crate::llm::prompt::{encode_images, system_instruction, Criteria, MAX_OUTPUT_TOKENS};
use crate::llm::provider::VisionProvider;
use crate::llm::providers::{http_client, log_usage, send_json, ProviderSettings};
use crate::llm::types::{
    ChatMessage, ContentPart, EvaluationRequest, ImageUrl, MessageContent, ProviderPayload,
    RawResponse, Usage,
};

/// Chat-completions API with image parts and a JSON-only system message.
pub struct OpenAiCompatibleProvider {
    id: String,
    settings: ProviderSettings,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(id: String, settings: ProviderSettings) -> Self {
        let client = http_client(settings.request_timeout);
        Self {
            id,
            settings,
            client,
        }
    }
}

#[async_trait]
impl VisionProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.id
    }

    fn model(&self) -> &str {
        &self.settings.model
    }

    fn build_request(
        &self,
        request: &EvaluationRequest,
        criteria: &Criteria,
    ) -> ScoutResult<ProviderPayload> {
        let mut parts = vec![ContentPart::Text {
            text: request.prompt.clone(),
        }];
        parts.extend(
            encode_images(&request.images)?
                .into_iter()
                .map(|img| ContentPart::ImageUrl {
                    image_url: ImageUrl { url: img.data_url() },
                }),
        );

        let messages = vec![
            ChatMessage {
                role: "system".into(),
                content: MessageContent::Text(system_instruction(criteria)),
            },
            ChatMessage {
                role: "user".into(),
                content: MessageContent::Parts(parts),
            },
        ];

        let body = serde_json::json!({
            "model": self.settings.model,
            "messages": messages,
            "max_tokens": MAX_OUTPUT_TOKENS,
            "stream": false,
            "response_format": { "type": "json_object" },
        });

        Ok(ProviderPayload {
            endpoint: self.settings.api_base.clone(),
            body,
        })
    }

    async fn invoke(&self, payload: ProviderPayload) -> ScoutResult<RawResponse> {
        tracing::debug!(provider = %self.id, model = %self.settings.model, "sending evaluation request");

        let request = self
            .client
            .post(&payload.endpoint)
            .bearer_auth(&self.settings.api_key);
        let json = send_json(&self.id, request, &payload.body).await?;

        let text = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ScoutError::ProviderInvocation {
                provider: self.id.clone(),
                message: "response has no message content".into(),
            })?
            .to_string();

        let usage = json.get("usage").map(|u| Usage {
            input_tokens: u["prompt_tokens"].as_u64().unwrap_or(0),
            output_tokens: u["completion_tokens"].as_u64().unwrap_or(0),
        });
        log_usage(&self.id, &self.settings.model, usage, &self.settings.pricing);

        tracing::info!(provider = %self.id, content_len = text.len(), "evaluation response received");
        Ok(RawResponse { text, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::Pricing;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(api_base: String) -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::new(
            "openai".into(),
            ProviderSettings {
                api_base,
                model: "gpt-4o".into(),
                api_key: "sk-test".into(),
                pricing: Pricing {
                    input_per_mtok: 5.0,
                    output_per_mtok: 15.0,
                },
                request_timeout: Duration::from_secs(5),
            },
        )
    }

    fn request_with_image() -> (tempfile::TempDir, EvaluationRequest) {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("abc.png");
        std::fs::write(&image, b"png-bytes").unwrap();
        let req = EvaluationRequest {
            prompt: "Is this a fit?".into(),
            images: vec![image],
        };
        (dir, req)
    }

    #[test]
    fn payload_has_system_criteria_and_inline_image() {
        let (_dir, req) = request_with_image();
        let p = provider("http://unused".into());
        let payload = p
            .build_request(&req, &Criteria::new("Must write Rust"))
            .unwrap();

        let body = &payload.body;
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");
        assert!(body["messages"][0]["content"]
            .as_str()
            .unwrap()
            .contains("Must write Rust"));
        assert_eq!(body["messages"][1]["content"][0]["text"], "Is this a fit?");
        assert!(body["messages"][1]["content"][1]["image_url"]["url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn invoke_returns_content_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "{\"is_good_fit\": false, \"personalized_intro_message\": \"\"}"}}],
                "usage": {"prompt_tokens": 1200, "completion_tokens": 20}
            })))
            .mount(&server)
            .await;

        let p = provider(format!("{}/v1/chat/completions", server.uri()));
        let (_dir, req) = request_with_image();
        let payload = p.build_request(&req, &Criteria::new("x")).unwrap();
        let raw = p.invoke(payload).await.unwrap();

        assert!(raw.text.contains("is_good_fit"));
        assert_eq!(
            raw.usage,
            Some(Usage {
                input_tokens: 1200,
                output_tokens: 20
            })
        );
    }

    #[tokio::test]
    async fn non_success_status_is_invocation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let p = provider(server.uri());
        let payload = ProviderPayload {
            endpoint: server.uri(),
            body: serde_json::json!({}),
        };
        match p.invoke(payload).await {
            Err(ScoutError::ProviderInvocation { provider, message }) => {
                assert_eq!(provider, "openai");
                assert!(message.contains("429"));
                assert!(message.contains("rate limited"));
            }
            other => panic!("expected invocation error, got {other:?}"),
        }
    }
}
