use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What to ask about one profile. Built fresh per profile.
#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    pub prompt: String,
    pub images: Vec<PathBuf>,
}

/// Base64 image ready to inline into a provider payload.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub media_type: &'static str,
    pub data: String,
}

impl EncodedImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// Provider-native request, ready to post.
#[derive(Debug, Clone)]
pub struct ProviderPayload {
    pub endpoint: String,
    pub body: serde_json::Value,
}

/// Provider output before normalisation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub text: String,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Usage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    pub fn estimated_cost(&self, pricing: &Pricing) -> f64 {
        (self.input_tokens as f64 / 1_000_000.0) * pricing.input_per_mtok
            + (self.output_tokens as f64 / 1_000_000.0) * pricing.output_per_mtok
    }
}

/// USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pricing {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
}

// ── OpenAI-compatible chat wire types ──────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}
