use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use tipbot_core::config::ChangeTipConfig;
use tipbot_core::domain::tip::{TipRequest, TipResponse};
use tracing::{debug, warn};

use crate::{TipError, TipService};

pub struct ChangeTipClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
    channel: String,
}

#[derive(Serialize)]
struct TipPayload<'a> {
    channel: &'a str,
    #[serde(flatten)]
    request: &'a TipRequest,
}

impl ChangeTipClient {
    pub fn new(config: &ChangeTipConfig) -> Result<Self, TipError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(TipError::Transport)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            channel: config.channel.clone(),
        })
    }

    fn tip_url(&self) -> String {
        format!("{}/v2/tip/", self.base_url)
    }
}

#[async_trait]
impl TipService for ChangeTipClient {
    // Business failures (duplicate, invalid sender, ...) come back as non-2xx responses with a
    // JSON body; those are returned as regular responses for the caller to interpret.
    async fn send_tip(&self, request: &TipRequest) -> Result<TipResponse, TipError> {
        let payload = TipPayload { channel: &self.channel, request };

        let response = self
            .client
            .post(self.tip_url())
            .query(&[("api_key", self.api_key.expose_secret())])
            .json(&payload)
            .send()
            .await
            .map_err(TipError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(TipError::Transport)?;
        let raw: Value = serde_json::from_str(&body).map_err(|error| {
            warn!(
                event_name = "tipping.changetip.decode_failed",
                context_uid = %request.context_uid,
                status = status.as_u16(),
                error = %error,
                "changetip returned a non-JSON body"
            );
            TipError::Decode { status: status.as_u16(), message: error.to_string() }
        })?;

        if !raw.is_object() {
            return Err(TipError::Decode {
                status: status.as_u16(),
                message: "expected a JSON object".to_string(),
            });
        }

        debug!(
            event_name = "tipping.changetip.response",
            context_uid = %request.context_uid,
            status = status.as_u16(),
            "changetip responded"
        );

        Ok(TipResponse::from_value(raw))
    }
}
