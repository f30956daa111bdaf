//! Conversational fallback for messages that are neither tips nor help requests.
//!
//! The chatbot is a plain text-in/text-out collaborator:
//! - `ChatClient` - pluggable trait the interpreter depends on
//! - `CleverbotClient` - HTTP client for the Cleverbot `getreply` API
//!
//! Replies are returned verbatim; the bot never acts on anything the chatbot says.

pub mod chat;

pub use chat::{ChatClient, CleverbotClient};
