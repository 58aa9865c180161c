use portico_common::FromMessage;

pub type Result<T> = std::result::Result<T, Error>;

/// Why a delivery attempt failed.
///
/// These never leave [`crate::DeliveryRouter::deliver`], which reports every
/// failure as `false`; they exist so the failure can be logged with detail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no plugin accepts channel {channel_id}")]
    NoRoute { channel_id: String },

    #[error("invalid delivery url for base {base_url}: {source}")]
    InvalidUrl {
        base_url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("plugin {plugin_id} answered {status}")]
    Status { plugin_id: String, status: u16 },

    #[error("in-process plugin {plugin_id} failed: {message}")]
    Plugin { plugin_id: String, message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Message(String),
}

impl Error {
    #[must_use]
    pub fn no_route(channel_id: impl Into<String>) -> Self {
        Self::NoRoute {
            channel_id: channel_id.into(),
        }
    }

    #[must_use]
    pub fn plugin(plugin_id: impl Into<String>, source: &anyhow::Error) -> Self {
        Self::Plugin {
            plugin_id: plugin_id.into(),
            message: format!("{source:#}"),
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

portico_common::impl_context!();
