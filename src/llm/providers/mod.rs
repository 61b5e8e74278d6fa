pub mod anthropic;
pub mod ollama;
pub mod openai_compatible;

use std::time::Duration;

use crate::errors::{ScoutError, ScoutResult};
use crate::llm::types::{Pricing, Usage};

/// Strings longer than this are assumed to be inline image data when logging.
const LOG_STRING_LIMIT: usize = 512;

/// Connection settings shared by every variant.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub api_base: String,
    pub model: String,
    pub api_key: String,
    pub pricing: Pricing,
    pub request_timeout: Duration,
}

pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Copy of a request body with large strings (base64 images) replaced, for
/// debug logging only.
pub(crate) fn sanitized_for_log(body: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;
    match body {
        Value::String(s) if s.len() > LOG_STRING_LIMIT => {
            Value::String(format!("<omitted {} bytes>", s.len()))
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitized_for_log).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), sanitized_for_log(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Sends a prepared request and returns the parsed JSON body, folding every
/// transport, status and decoding failure into `ProviderInvocation`.
pub(crate) async fn send_json(
    provider: &str,
    request: reqwest::RequestBuilder,
    body: &serde_json::Value,
) -> ScoutResult<serde_json::Value> {
    let invocation_error = |message: String| ScoutError::ProviderInvocation {
        provider: provider.to_string(),
        message,
    };

    tracing::debug!(
        provider,
        body = %serde_json::to_string(&sanitized_for_log(body)).unwrap_or_default(),
        "request body (sanitized, base64 omitted)"
    );

    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| invocation_error(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let err_body = response.text().await.unwrap_or_default();
        return Err(invocation_error(format!("{status}: {err_body}")));
    }

    response
        .json::<serde_json::Value>()
        .await
        .map_err(|e| invocation_error(format!("invalid response body: {e}")))
}

pub(crate) fn log_usage(provider: &str, model: &str, usage: Option<Usage>, pricing: &Pricing) {
    match usage {
        Some(usage) => tracing::info!(
            provider,
            model,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            total_tokens = usage.total(),
            estimated_cost_usd = %format!("{:.6}", usage.estimated_cost(pricing)),
            "provider usage"
        ),
        None => tracing::debug!(provider, model, "provider reported no usage"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizer_replaces_only_large_strings() {
        let big = "A".repeat(LOG_STRING_LIMIT + 1);
        let body = serde_json::json!({
            "model": "gpt-4o",
            "messages": [{"content": [{"image_url": {"url": big}}]}],
            "images": [big],
        });
        let clean = sanitized_for_log(&body);
        assert_eq!(clean["model"], "gpt-4o");
        assert_eq!(
            clean["messages"][0]["content"][0]["image_url"]["url"],
            format!("<omitted {} bytes>", LOG_STRING_LIMIT + 1)
        );
        assert!(clean["images"][0].as_str().unwrap().starts_with("<omitted"));
    }
}
