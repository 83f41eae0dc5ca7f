//! Language-model adapters
//!
//! Both the vision transcription and the menu structuring steps go through
//! an OpenAI-compatible chat completions API (Together AI by default).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use menu_vision_server::llm::{ChatClient, LlmMenuParser, MenuParser};
//!
//! let client = ChatClient::new(&config.models)?;
//! let parser = LlmMenuParser::new(client, &config.models.parser_model);
//! let items = parser.parse_menu("Tacos $10\nSoup $5").await?;
//! ```

mod client;
mod extractor;
mod parser;
mod types;

pub use client::{ChatClient, ChatMessage, ChatRequest, LlmError};
pub use extractor::{TextExtractor, VisionTextExtractor};
pub use parser::{parse_menu_response, LlmMenuParser, MenuParser};
pub use types::{ExtractionError, MenuItem, MenuParseError};
