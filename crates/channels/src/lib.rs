//! Outbound channel delivery.
//!
//! A channel is owned by one plugin at a time. In-process plugins register
//! with the [`DeliveryRouter`] and are called directly; every other channel
//! is looked up in a [`PluginRegistry`] and reached with an HTTP `POST` to
//! the owning plugin's `/deliver` endpoint.

pub mod error;
pub mod http;
pub mod plugin;
pub mod registry;
pub mod router;

pub use {
    error::{Error, Result},
    http::{DeliveryRequest, HttpDelivery, delivery_url},
    plugin::ChannelPlugin,
    registry::{DeliveryMode, FilePluginRegistry, PluginRecord, PluginRegistry, StaticPluginRegistry},
    router::DeliveryRouter,
};
