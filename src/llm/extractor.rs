//! Menu text extraction via a vision model

use async_trait::async_trait;

use super::client::{ChatClient, ChatMessage, ChatRequest};
use super::types::ExtractionError;

const SYSTEM_PROMPT: &str = "You are given an image of a menu. Your job is to extract all the text \
from the menu, including item names, prices, and descriptions. Please maintain the original \
formatting and structure of the menu. ONLY RETURN THE EXTRACTED TEXT, NO ADDITIONAL COMMENTARY.";

const USER_PROMPT: &str = "Please extract all text from this menu image.";

const MAX_TOKENS: u32 = 4096;

/// Turns a menu photo into raw text
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text(&self, image_url: &str) -> Result<String, ExtractionError>;
}

/// Vision-model transcription
pub struct VisionTextExtractor {
    client: ChatClient,
    model: String,
}

impl VisionTextExtractor {
    pub fn new(client: ChatClient, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }

    fn request(&self, image_url: &str) -> ChatRequest {
        ChatRequest::new(
            &self.model,
            vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user_with_image(USER_PROMPT, image_url),
            ],
            MAX_TOKENS,
        )
    }
}

#[async_trait]
impl TextExtractor for VisionTextExtractor {
    async fn extract_text(&self, image_url: &str) -> Result<String, ExtractionError> {
        tracing::info!(model = %self.model, image_url = %image_url, "Extracting menu text");

        let content = self
            .client
            .complete(&self.request(image_url))
            .await
            .map_err(|e| ExtractionError::Upstream(e.to_string()))?
            .ok_or(ExtractionError::Empty)?;

        tracing::debug!(chars = content.len(), "Menu text extracted");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;

    #[test]
    fn test_request_shape() {
        let client = ChatClient::new(&ModelConfig::default()).unwrap();
        let extractor = VisionTextExtractor::new(client, "vision-model");
        let json = serde_json::to_value(extractor.request("https://x/img.png")).unwrap();

        assert_eq!(json["model"], "vision-model");
        assert_eq!(json["max_tokens"], 4096);
        assert_eq!(json["temperature"], 0.0);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"][1]["image_url"]["url"], "https://x/img.png");
    }

    #[tokio::test]
    async fn test_missing_key_is_upstream_error() {
        let client = ChatClient::new(&ModelConfig::default()).unwrap();
        let extractor = VisionTextExtractor::new(client, "vision-model");

        let err = extractor.extract_text("https://x/img.png").await.unwrap_err();
        assert!(matches!(err, ExtractionError::Upstream(ref msg) if msg.contains("TOGETHER_API_KEY")));
    }
}
