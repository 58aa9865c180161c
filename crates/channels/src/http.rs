//! HTTP delivery to out-of-process plugins.
//!
//! Wire contract: `POST {base_url}/deliver` with a JSON body
//! `{"channelId", "userId", "content"}`. Any 2xx answer is success.

use std::time::Duration;

use {
    reqwest::{Client, header::CONTENT_TYPE},
    serde::Serialize,
    tracing::debug,
    url::Url,
};

use crate::{Error, PluginRecord, Result};

/// Body of a delivery request.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRequest<'a> {
    pub channel_id: &'a str,
    pub user_id: &'a str,
    pub content: &'a str,
}

/// Build `{base_url}/deliver`, adding the `/` separator only when the base
/// does not already end with one.
pub fn delivery_url(base_url: &str) -> Result<Url> {
    let raw = if base_url.ends_with('/') {
        format!("{base_url}deliver")
    } else {
        format!("{base_url}/deliver")
    };
    Url::parse(&raw).map_err(|source| Error::InvalidUrl {
        base_url: base_url.to_string(),
        source,
    })
}

/// One-shot HTTP delivery client. No retries.
#[derive(Debug, Clone)]
pub struct HttpDelivery {
    client: Client,
}

impl HttpDelivery {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Build a client whose every request is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// POST `request` to the plugin's `/deliver` endpoint.
    pub async fn send(&self, plugin: &PluginRecord, request: &DeliveryRequest<'_>) -> Result<()> {
        let url = delivery_url(&plugin.base_url)?;
        let body = serde_json::to_vec(request)?;

        debug!(plugin_id = %plugin.id, %url, channel_id = request.channel_id, "posting delivery");
        let resp = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                plugin_id: plugin.id.clone(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
