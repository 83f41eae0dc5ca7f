//! Menu structuring via a text model

use async_trait::async_trait;

use super::client::{ChatClient, ChatMessage, ChatRequest};
use super::types::{MenuItem, MenuParseError};

const SYSTEM_PROMPT: &str = "You are a helpful assistant that converts menu text into structured \
JSON. Always respond with valid JSON only.";

const MAX_TOKENS: u32 = 2048;

/// Turns raw menu text into dishes
#[async_trait]
pub trait MenuParser: Send + Sync {
    async fn parse_menu(&self, raw_text: &str) -> Result<Vec<MenuItem>, MenuParseError>;
}

/// Language-model menu parser
pub struct LlmMenuParser {
    client: ChatClient,
    model: String,
}

impl LlmMenuParser {
    pub fn new(client: ChatClient, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }

    fn request(&self, raw_text: &str) -> ChatRequest {
        let prompt = format!(
            "Convert the following menu text into a JSON array of menu items. Each item should \
             have a name, price, and optional description:\n\n{}\n\nONLY RETURN THE JSON ARRAY, \
             NO ADDITIONAL TEXT.",
            raw_text
        );

        ChatRequest::new(
            &self.model,
            vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(&prompt)],
            MAX_TOKENS,
        )
        .json_only()
    }
}

#[async_trait]
impl MenuParser for LlmMenuParser {
    async fn parse_menu(&self, raw_text: &str) -> Result<Vec<MenuItem>, MenuParseError> {
        tracing::info!(model = %self.model, chars = raw_text.len(), "Parsing menu text");

        let content = self
            .client
            .complete(&self.request(raw_text))
            .await
            .map_err(|e| MenuParseError::Upstream(e.to_string()))?
            .ok_or_else(|| MenuParseError::Upstream("No content in response".to_string()))?;

        let items = parse_menu_response(&content)?;
        tracing::info!(items = items.len(), "Menu parsed");
        Ok(items)
    }
}

/// Decode a model answer that is either `[...]` or `{"menu": [...]}`
pub fn parse_menu_response(content: &str) -> Result<Vec<MenuItem>, MenuParseError> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| MenuParseError::Parse(e.to_string()))?;

    let entries = match value {
        serde_json::Value::Array(entries) => entries,
        serde_json::Value::Object(mut object) => match object.remove("menu") {
            Some(serde_json::Value::Array(entries)) => entries,
            _ => {
                return Err(MenuParseError::Parse(
                    "Response is not an array of menu items".to_string(),
                ))
            }
        },
        _ => {
            return Err(MenuParseError::Parse(
                "Response is not an array of menu items".to_string(),
            ))
        }
    };

    let mut items = Vec::with_capacity(entries.len());
    for entry in entries {
        let mut item: MenuItem = serde_json::from_value(entry)
            .map_err(|e| MenuParseError::Parse(format!("Invalid menu item: {}", e)))?;

        item.name = item.name.trim().to_string();
        if item.name.is_empty() {
            tracing::warn!(price = %item.price, "Dropping menu item without a name");
            continue;
        }
        // Images are attached later, never by the model
        item.image_url = None;
        items.push(item);
    }

    Ok(items)
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}
