//! Plugin and item configuration.
//!
//! Hosts hand configuration over as string maps; both structs deserialize
//! from those maps and are validated once, so later consumers only see fully
//! resolved values.

use std::collections::HashMap;
use std::time::Duration;

use log::{error, warn};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};

use crate::errors::Error;
use crate::types::TransitionTime;

type Result<T> = std::result::Result<T, Error>;

/// Plugin wide configuration, as found in the host's plugin section.
///
/// ```
/// use std::collections::HashMap;
/// use hue_items_rs::PluginConfig;
///
/// let conf = HashMap::from([
///     ("hue_ip".to_string(), "10.0.0.2, 10.0.0.3".to_string()),
///     ("hue_user".to_string(), "alice,bob".to_string()),
///     ("cycle_lamps".to_string(), "2".to_string()),
/// ]);
/// let settings = PluginConfig::from_conf(&conf).unwrap().resolve().unwrap();
/// assert_eq!(settings.bridges.len(), 2);
/// assert_eq!(settings.bridges[1].port, 80);
/// assert_eq!(settings.lamp_cycle.as_secs(), 5);
/// ```
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    #[serde(default = "PluginConfig::default_ip")]
    pub hue_ip: String,
    #[serde(default)]
    pub hue_user: String,
    #[serde(default)]
    pub hue_port: String,
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "PluginConfig::default_cycle_lamps")]
    pub cycle_lamps: u64,
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "PluginConfig::default_cycle_bridges")]
    pub cycle_bridges: u64,
    #[serde_as(as = "DisplayFromStr")]
    #[serde(
        rename = "default_transitionTime",
        default = "PluginConfig::default_transition_time"
    )]
    pub default_transition_time: f64,
    #[serde_as(as = "DisplayFromStr")]
    #[serde(default = "PluginConfig::default_suppress")]
    pub suppress_when_off: bool,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            hue_ip: Self::default_ip(),
            hue_user: String::new(),
            hue_port: String::new(),
            cycle_lamps: Self::default_cycle_lamps(),
            cycle_bridges: Self::default_cycle_bridges(),
            default_transition_time: Self::default_transition_time(),
            suppress_when_off: Self::default_suppress(),
        }
    }
}

impl PluginConfig {
    pub const DEFAULT_PORT: u16 = 80;
    pub const MIN_CYCLE_LAMPS: u64 = 5;
    pub const MIN_CYCLE_BRIDGES: u64 = 10;

    fn default_ip() -> String {
        "Philips-hue".to_string()
    }

    fn default_cycle_lamps() -> u64 {
        10
    }

    fn default_cycle_bridges() -> u64 {
        60
    }

    fn default_transition_time() -> f64 {
        0.1
    }

    fn default_suppress() -> bool {
        true
    }

    pub fn from_conf(conf: &HashMap<String, String>) -> Result<Self> {
        let value = serde_json::to_value(conf).map_err(Error::JsonDump)?;
        serde_json::from_value(value).map_err(|e| Error::Config(e.to_string()))
    }

    /// Validates the configuration, logging and repairing what can be
    /// repaired.
    pub fn resolve(&self) -> Result<Settings> {
        Ok(Settings {
            bridges: self.bridges()?,
            lamp_cycle: Self::floored("cycle_lamps", self.cycle_lamps, Self::MIN_CYCLE_LAMPS),
            bridge_cycle: Self::floored(
                "cycle_bridges",
                self.cycle_bridges,
                Self::MIN_CYCLE_BRIDGES,
            ),
            default_transition: self.default_transition(),
            policy: WritePolicy {
                suppress_when_off: self.suppress_when_off,
            },
        })
    }

    fn bridges(&self) -> Result<Vec<BridgeConfig>> {
        let ips = split_list(&self.hue_ip);
        let users = split_list(&self.hue_user);
        let ports = split_list(&self.hue_port);

        if ips.is_empty() {
            return Err(Error::Config("no bridge configured in hue_ip".into()));
        }

        let mut count = ips.len().min(users.len().max(1));
        if !ports.is_empty() {
            count = count.min(ports.len());
        }
        if ips.len() != users.len() || (!ports.is_empty() && ports.len() != ips.len()) {
            error!(
                "hue_ip ({}), hue_user ({}) and hue_port ({}) differ in length, using the first {count} bridge(s)",
                ips.len(),
                users.len(),
                ports.len()
            );
        }

        (0..count)
            .map(|idx| {
                let port = match ports.get(idx) {
                    Some(port) => port.parse().map_err(|_| {
                        Error::Config(format!("invalid hue_port {port:?} for bridge {idx}"))
                    })?,
                    None => Self::DEFAULT_PORT,
                };
                let user = users.get(idx).cloned().unwrap_or_default();
                if user.is_empty() {
                    warn!("bridge {idx} has no hue_user, requests will be rejected");
                }
                Ok(BridgeConfig {
                    ip: ips[idx].clone(),
                    port,
                    user,
                })
            })
            .collect()
    }

    fn floored(name: &str, value: u64, min: u64) -> Duration {
        if value < min {
            warn!("{name} of {value}s is below the minimum, using {min}s");
            Duration::from_secs(min)
        } else {
            Duration::from_secs(value)
        }
    }

    fn default_transition(&self) -> TransitionTime {
        match TransitionTime::from_seconds(self.default_transition_time) {
            Some(tt) => tt,
            None => {
                warn!(
                    "default_transitionTime {} is invalid, using 0",
                    self.default_transition_time
                );
                TransitionTime::new()
            }
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Address and credentials of one bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub ip: String,
    pub port: u16,
    pub user: String,
}

/// How the write path treats attribute changes on lamps that are off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritePolicy {
    /// Drop color and generic attribute writes while the lamp is off.
    pub suppress_when_off: bool,
}

impl Default for WritePolicy {
    fn default() -> Self {
        Self {
            suppress_when_off: true,
        }
    }
}

/// Validated plugin configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub bridges: Vec<BridgeConfig>,
    pub lamp_cycle: Duration,
    pub bridge_cycle: Duration,
    pub default_transition: TransitionTime,
    pub policy: WritePolicy,
}

/// Per item configuration, the `hue_*` keys of an item.
#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemConf {
    #[serde(rename = "hue_send", default)]
    pub send: Option<String>,
    #[serde(rename = "hue_listen", default)]
    pub listen: Option<String>,
    #[serde(rename = "hue_bridge", default)]
    pub bridge: Option<String>,
    #[serde(rename = "hue_lamp", alias = "hue_id", default)]
    pub lamp: Option<String>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(rename = "hue_transitionTime")]
    pub transition_time: Option<f64>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(rename = "hue_dim_max")]
    pub dim_max: Option<f64>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(rename = "hue_dim_step")]
    pub dim_step: Option<f64>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(rename = "hue_dim_time")]
    pub dim_time: Option<f64>,
}

impl ItemConf {
    /// Reads the `hue_*` keys of an item's configuration, ignoring the rest.
    ///
    /// `hue_lamp` takes precedence over its older spelling `hue_id`.
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use hue_items_rs::ItemConf;
    ///
    /// let conf = HashMap::from([
    ///     ("hue_send".to_string(), "bri".to_string()),
    ///     ("hue_id".to_string(), "3".to_string()),
    ///     ("hue_transitionTime".to_string(), "0.5".to_string()),
    ///     ("knx_dpt".to_string(), "5".to_string()),
    /// ]);
    /// let item = ItemConf::from_conf(&conf).unwrap();
    /// assert_eq!(item.lamp.as_deref(), Some("3"));
    /// assert_eq!(item.transition_time, Some(0.5));
    /// ```
    pub fn from_conf(conf: &HashMap<String, String>) -> Result<Self> {
        let mut value = serde_json::to_value(conf).map_err(Error::JsonDump)?;
        if let (Some(lamp), Some(map)) = (conf.get("hue_lamp"), value.as_object_mut()) {
            if let Some(id) = map.remove("hue_id") {
                warn!("both hue_lamp ({lamp}) and hue_id ({id}) set, using hue_lamp");
            }
        }
        serde_json::from_value(value).map_err(|e| Error::Config(e.to_string()))
    }

    /// Resolves `hue_bridge` against the configured bridge count, falling
    /// back to bridge 0 on invalid input.
    pub fn bridge_index(&self, bridge_count: usize) -> usize {
        let Some(raw) = self.bridge.as_deref() else {
            return 0;
        };
        match raw.trim().parse::<usize>() {
            Ok(idx) if idx < bridge_count => idx,
            _ => {
                error!("hue_bridge {raw:?} is not a configured bridge, using bridge 0");
                0
            }
        }
    }

    /// The item's transition time, or `default` when unset or invalid.
    pub fn transition(&self, default: TransitionTime) -> TransitionTime {
        match self.transition_time {
            None => default,
            Some(seconds) => TransitionTime::from_seconds(seconds).unwrap_or_else(|| {
                warn!("hue_transitionTime {seconds} is invalid, using the default");
                default
            }),
        }
    }
}

/// Fully resolved dimmer controller parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimConfig {
    pub max: f64,
    pub step: f64,
    pub time: f64,
}

impl DimConfig {
    pub const DEFAULT_STEP: f64 = 25.0;
    pub const DEFAULT_TIME: f64 = 1.0;

    /// Returns None unless the item is a dimmer controller (`hue_dim_max`).
    pub fn from_item_conf(conf: &ItemConf) -> Option<Self> {
        conf.dim_max.map(|max| DimConfig {
            max,
            step: conf.dim_step.unwrap_or(Self::DEFAULT_STEP),
            time: conf.dim_time.unwrap_or(Self::DEFAULT_TIME),
        })
    }
}
