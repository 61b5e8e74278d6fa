use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine as _;

use crate::errors::ScoutResult;
use crate::llm::types::EncodedImage;

/// Cap on provider output tokens for every evaluation call.
pub const MAX_OUTPUT_TOKENS: u32 = 500;

const MISSING_CRITERIA: &str = "No criteria file found";

/// User-authored description of the profiles worth pursuing. Loaded once per
/// run and shared read-only by every evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criteria(Arc<str>);

impl Criteria {
    pub fn new(text: impl Into<String>) -> Self {
        Self(Arc::from(text.into()))
    }

    /// Reads the criteria file. A missing file is not fatal: the run goes on
    /// with a placeholder and a warning.
    pub fn load(path: &Path) -> ScoutResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                tracing::info!(path = %path.display(), chars = text.len(), "criteria loaded");
                Ok(Self::new(text))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "criteria file not found, evaluating without criteria");
                Ok(Self::new(MISSING_CRITERIA))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// JSON-only instruction shared by every provider variant. Embeds the
/// criteria verbatim.
pub fn system_instruction(criteria: &Criteria) -> String {
    format!(
        "You are a JSON-only response bot. You must respond with ONLY valid JSON, no other text.

I will give you a profile of a potential cofounder and you will tell me if they will be a good fit for me.
Here is my criteria:
{criteria}

You MUST respond with ONLY this JSON format:
{{
    \"is_good_fit\": true/false,
    \"personalized_intro_message\": \"message or empty string\"
}}

Rules:
1. If is_good_fit is false, set personalized_intro_message to \"\"
2. If is_good_fit is true, write a concise, informal, friendly message personalized to the profile, mentioning that our profiles are a good match and asking for a quick zoom call
3. Respond with ONLY the JSON, no other text, no explanations
4. Ensure the JSON is valid and properly formatted",
        criteria = criteria.as_str()
    )
}

/// Reads and base64-encodes every image, preserving order.
pub fn encode_images(paths: &[PathBuf]) -> ScoutResult<Vec<EncodedImage>> {
    paths
        .iter()
        .map(|path| -> ScoutResult<EncodedImage> {
            let bytes = std::fs::read(path)?;
            Ok(EncodedImage {
                media_type: media_type_for(path),
                data: base64::engine::general_purpose::STANDARD.encode(bytes),
            })
        })
        .collect()
}

fn media_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_embeds_criteria_verbatim() {
        let criteria = Criteria::new("Technical cofounder, based in Berlin.\nLoves Rust.");
        let text = system_instruction(&criteria);
        assert!(text.contains("Technical cofounder, based in Berlin.\nLoves Rust."));
        assert!(text.contains("\"is_good_fit\""));
        assert!(text.contains("\"personalized_intro_message\""));
    }

    #[test]
    fn missing_criteria_file_falls_back() {
        let criteria = Criteria::load(Path::new("/nonexistent/criteria.txt")).unwrap();
        assert_eq!(criteria.as_str(), MISSING_CRITERIA);
    }

    #[test]
    fn encodes_images_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.jpg");
        std::fs::write(&a, b"first").unwrap();
        std::fs::write(&b, b"second").unwrap();

        let images = encode_images(&[a, b]).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].media_type, "image/png");
        assert_eq!(images[0].data, "Zmlyc3Q=");
        assert_eq!(images[1].media_type, "image/jpeg");
        assert_eq!(images[1].data_url(), "data:image/jpeg;base64,c2Vjb25k");
    }
}
