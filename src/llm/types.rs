//! Menu types

use serde::{Deserialize, Deserializer, Serialize};

/// One dish parsed from a menu
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    /// Dish name, never blank
    #[serde(default)]
    pub name: String,

    /// Price as printed on the menu
    #[serde(default, deserialize_with = "price_from_any")]
    pub price: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Validated (proxied) photo or the placeholder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl MenuItem {
    pub fn new(name: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            price: price.into(),
            description: None,
            image_url: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }
}

/// Models are inconsistent about prices: "10", 10, 10.5 and null all occur
fn price_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Text extraction errors
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Error calling vision model: {0}")]
    Upstream(String),

    #[error("No text extracted from the image")]
    Empty,
}

/// Menu parsing errors
#[derive(Debug, thiserror::Error)]
pub enum MenuParseError {
    /// The model answered, but not with a menu
    #[error("Failed to parse JSON response: {0}")]
    Parse(String),

    /// The model call itself failed
    #[error("Error calling menu parser: {0}")]
    Upstream(String),
}

impl MenuParseError {
    /// Whether sending the same text again could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_item_wire_format() {
        let item = MenuItem::new("Tacos", "10").with_image_url("/api/image-proxy?url=x");
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "name": "Tacos", "price": "10", "imageUrl": "/api/image-proxy?url=x" })
        );
    }

    #[test]
    fn test_price_accepts_numbers_and_null() {
        let items: Vec<MenuItem> = serde_json::from_str(
            r#"[{"name":"A","price":10},{"name":"B","price":4.5},{"name":"C","price":null},{"name":"D"}]"#,
        )
        .unwrap();

        let prices: Vec<&str> = items.iter().map(|i| i.price.as_str()).collect();
        assert_eq!(prices, vec!["10", "4.5", "", ""]);
    }

    #[test]
    fn test_retryable() {
        assert!(MenuParseError::Upstream("timeout".into()).is_retryable());
        assert!(!MenuParseError::Parse("not json".into()).is_retryable());
    }
}
