use async_trait::async_trait;

use crate::errors::ScoutResult;
use crate::llm::prompt::Criteria;
use crate::llm::types::{EvaluationRequest, ProviderPayload, RawResponse};

/// A vision-capable evaluation backend. Each variant formats the request its
/// own way, but every payload embeds the criteria verbatim, asks for the
/// two-field JSON decision only, and inlines every image as base64.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Provider identifier (`openai`, `anthropic`, `ollama`).
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    fn build_request(
        &self,
        request: &EvaluationRequest,
        criteria: &Criteria,
    ) -> ScoutResult<ProviderPayload>;

    /// Posts the payload. The only network suspension point of the pipeline.
    /// Usage and cost are logged here, never returned to the caller's control flow.
    async fn invoke(&self, payload: ProviderPayload) -> ScoutResult<RawResponse>;
}
