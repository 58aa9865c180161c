use std::collections::BTreeSet;

use {anyhow::Result, async_trait::async_trait};

/// A channel handler living in the same process as the router.
#[async_trait]
pub trait ChannelPlugin: Send + Sync {
    /// Plugin identifier, used in logs and route listings.
    fn id(&self) -> &str;

    /// Channel ids this plugin owns once registered.
    fn channel_ids(&self) -> &BTreeSet<String>;

    /// Send a message to one of the plugin's channels.
    ///
    /// The recipient user id is not part of the in-process contract; only
    /// HTTP delivery forwards it.
    async fn send(&self, channel_id: &str, message: &str) -> Result<()>;
}
