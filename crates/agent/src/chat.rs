use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tipbot_core::config::ChatConfig;
use tracing::debug;

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn ask(&self, text: &str) -> Result<String>;
}

pub struct CleverbotClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

#[derive(Debug, Deserialize)]
struct CleverbotReply {
    output: Option<String>,
}

impl CleverbotClient {
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build cleverbot http client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ChatClient for CleverbotClient {
    async fn ask(&self, text: &str) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/getreply", self.base_url))
            .query(&[("key", self.api_key.expose_secret()), ("input", text)])
            .send()
            .await
            .context("cleverbot request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("cleverbot returned {status}"));
        }

        let reply: CleverbotReply =
            response.json().await.context("failed to decode cleverbot reply")?;
        debug!(event_name = "agent.chat.reply", status = status.as_u16(), "cleverbot replied");

        reply.output.ok_or_else(|| anyhow!("cleverbot reply has no `output` field"))
    }
}
