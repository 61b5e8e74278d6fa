use serde_json::Value;

use crate::errors::{ScoutError, ScoutResult};
use crate::llm::types::RawResponse;

/// Normalized verdict for one profile.
///
/// `intro_message` is only ever non-empty when `is_good_fit` is true.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Decision {
    pub is_good_fit: bool,
    pub intro_message: String,
}

impl Decision {
    pub fn new(is_good_fit: bool, intro_message: impl Into<String>) -> Self {
        let intro_message = if is_good_fit {
            intro_message.into()
        } else {
            String::new()
        };
        Self {
            is_good_fit,
            intro_message,
        }
    }

    /// Synthetic negative decision used when evaluation could not complete.
    pub fn rejected() -> Self {
        Self::default()
    }

    fn from_object(value: &Value) -> Self {
        // Only a real JSON bool counts; "true" or 1 stay negative.
        let is_good_fit = value
            .get("is_good_fit")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let intro_message = value
            .get("personalized_intro_message")
            .and_then(Value::as_str)
            .unwrap_or_default();
        Self::new(is_good_fit, intro_message)
    }
}

fn parse_object(text: &str) -> Option<Value> {
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(Value::is_object)
}

/// Repairs a provider's raw text into a [`Decision`].
///
/// The whole text is parsed first; failing that, the span from the first `{`
/// to the last `}`. Missing or mistyped fields fall back to a negative
/// decision instead of erroring.
pub fn normalize(raw: &RawResponse) -> ScoutResult<Decision> {
    let text = raw.text.trim();

    let parsed = parse_object(text).or_else(|| {
        let start = text.find('{')?;
        let end = text.rfind('}')?;
        (start < end).then(|| parse_object(&text[start..=end])).flatten()
    });

    match parsed {
        Some(value) => Ok(Decision::from_object(&value)),
        None => {
            let preview: String = text.chars().take(120).collect();
            Err(ScoutError::DecisionParse(format!(
                "no JSON object in provider output: {preview:?}"
            )))
        }
    }
}
