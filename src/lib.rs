//! # hue_items_rs
//!
//! An async Rust library keeping home-automation items and Philips Hue
//! bridges in sync over the Hue v1 REST API.
//!
//! Items of the host's tree are bound to lamp or bridge attributes through
//! their `hue_*` configuration. Changes of send items become bridge commands;
//! the bridge's confirmation and periodic polling update the listen items.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use hue_items_rs::{Hue, ItemConf, PluginConfig};
//!
//! async fn start(items: Vec<(Arc<dyn hue_items_rs::Item>, HashMap<String, String>)>)
//!     -> Result<(), Box<dyn std::error::Error>>
//! {
//!     let conf = HashMap::from([
//!         ("hue_ip".to_string(), "192.168.1.20".to_string()),
//!         ("hue_user".to_string(), "a1b2c3...".to_string()),
//!     ]);
//!     let mut hue = Hue::connect(&PluginConfig::from_conf(&conf)?)?;
//!
//!     // parse phase: collect the returned bindings and route item changes
//!     // to `Hue::dispatch`
//!     for (item, item_conf) in items {
//!         let binding = hue.parse_item(item, &ItemConf::from_conf(&item_conf)?)?;
//!     }
//!
//!     let hue = Arc::new(hue);
//!     hue.run();
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Write path**: send items produce `PUT` commands via [`Hue::update_item`],
//!   with brightness restore on power on and RGB to CIE xy conversion
//! - **Poll path**: [`Hue::update_lamps`] and [`Hue::update_bridges`] mirror
//!   bridge state into listen items
//! - **Dimming**: DPT3 relative dimming through host fades with [`Hue::dim`]
//! - **Pairing**: register user tokens with [`Hue::authorize_user`]
//! - **Diagnostics**: per bridge request history and [`Hue::diagnostics`]
//!
//! ## Feature Flags
//!
//! - `reqwest-transport` (default): [`ReqwestTransport`] and [`Hue::connect`]

mod auth;
mod bridge;
mod coerce;
mod command;
mod config;
mod dim;
mod errors;
mod history;
mod item;
mod plugin;
mod poller;
mod reconcile;
mod registry;
#[cfg(test)]
mod testing;
pub mod transport;
mod types;

// Re-export public API
pub use auth::generate_user;
pub use bridge::{Bridge, BridgeClient};
pub use coerce::{cast_by_classification, clamp_int, to_wire};
pub use command::{Command, Target};
pub use config::{BridgeConfig, DimConfig, ItemConf, PluginConfig, Settings, WritePolicy};
pub use errors::Error;
pub use history::{HistoryEntry, HistorySummary, MessageHistory, MessageType};
pub use item::{FADE_ORIGIN, Item, PLUGIN_ORIGIN};
pub use plugin::{Binding, Hue};
pub use registry::{
    BridgeKey, DimBinding, DimHandle, LampKey, Registry, RegistrySummary, SendBinding, SendHandle,
};
#[cfg(feature = "reqwest-transport")]
pub use transport::ReqwestTransport;
pub use transport::{HttpResponse, Method, Request, Transport, TransportError};
pub use types::{
    Attribute, Capabilities, Classification, ColorConverter, ItemValue, Rgb, TransitionTime,
    WideGamut,
};
