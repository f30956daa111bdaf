//! Slack Integration - slash-command interpreter
//!
//! This crate turns a `/changetip` slash-command delivery into a reply:
//! - **Commands** (`commands`) - field mapping, routing, reply formatting
//! - **Mentions** (`mention`) - Slack's raw `<@U123>` mention encoding
//!
//! # Routing
//!
//! ```text
//! fields → new sender?        → greeting
//!        → no mention?        → help | chatbot reply
//!        → unknown receiver?  → unknown-receiver notice
//!        → noop?              → acknowledgement
//!        → TipService         → tip-result text (+debug dump)
//! ```
//!
//! # Key Types
//!
//! - `CommandInterpreter` - routes one delivery through the collaborators
//! - `CommandFields` - the form-encoded fields Slack posts
//! - `CommandReply` - JSON body returned to Slack

pub mod commands;
pub mod mention;

pub use commands::{CommandFields, CommandInterpreter, CommandReply, CommandRoute};
