//! Tipping service integration.
//!
//! - `TipService` is the seam the slash-command interpreter talks to.
//! - `ChangeTipClient` submits tips to the ChangeTip bot API over HTTPS.
//! - `context_uid` derives the deduplication token ChangeTip uses to reject
//!   re-delivered webhooks.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;
use tipbot_core::domain::tip::{TipRequest, TipResponse};
use tipbot_core::errors::ApplicationError;

pub mod changetip;
pub mod context;

pub use changetip::ChangeTipClient;
pub use context::context_uid;

#[derive(Debug, Error)]
pub enum TipError {
    #[error("tipping service request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("tipping service returned an unreadable body (status {status}): {message}")]
    Decode { status: u16, message: String },
}

impl From<TipError> for ApplicationError {
    fn from(value: TipError) -> Self {
        Self::Integration(value.to_string())
    }
}

#[async_trait]
pub trait TipService: Send + Sync {
    async fn send_tip(&self, request: &TipRequest) -> Result<TipResponse, TipError>;

    /// Deduplication token for a webhook delivery.
    fn unique_id(&self, fields: &BTreeMap<String, String>) -> String {
        context_uid(fields)
    }
}
