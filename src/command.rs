//! Commands sent to bridges and the write path's planning rules.
//!
//! Planning is a pure function of the registry, the bound item values and
//! the classification table: planning the same state twice yields the same
//! command.

use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::{Map, Value, json};

use crate::coerce::{clamp_int, to_wire};
use crate::config::WritePolicy;
use crate::item::Item;
use crate::registry::{BridgeKey, LampKey, Registry, SendHandle};
use crate::types::{Attribute, Classification, ColorConverter, Rgb};

/// Endpoint a command is sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Lamp { bridge: usize, lamp: String },
    Group { bridge: usize, group: u32 },
    Config { bridge: usize },
}

impl Target {
    /// All scene commands address group 0, the group of all lamps.
    pub const ALL_LAMPS: u32 = 0;

    pub fn bridge(&self) -> usize {
        match self {
            Target::Lamp { bridge, .. } | Target::Group { bridge, .. } | Target::Config { bridge } => {
                *bridge
            }
        }
    }

    pub fn path(&self) -> String {
        match self {
            Target::Lamp { lamp, .. } => format!("/lights/{lamp}/state"),
            Target::Group { group, .. } => format!("/groups/{group}/action"),
            Target::Config { .. } => "/config".to_string(),
        }
    }
}

/// A `PUT` body bound for one target.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub target: Target,
    pub body: Map<String, Value>,
}

impl Command {
    fn new(target: Target) -> Self {
        Command {
            target,
            body: Map::new(),
        }
    }

    fn with(mut self, key: &str, value: Value) -> Self {
        self.body.insert(key.to_string(), value);
        self
    }
}

/// Translates a changed send binding into the command to send, if any.
pub(crate) struct Planner<'a> {
    pub registry: &'a Registry,
    pub converter: &'a dyn ColorConverter,
    pub policy: WritePolicy,
}

impl Planner<'_> {
    pub fn plan(&self, handle: &SendHandle) -> Option<Command> {
        match handle {
            SendHandle::Lamp(key) => self.plan_lamp(key),
            SendHandle::Bridge(key) => self.plan_bridge(key),
        }
    }

    fn plan_lamp(&self, key: &LampKey) -> Option<Command> {
        let Some(binding) = self.registry.send_by_key(key) else {
            warn!("no send binding for {key}");
            return None;
        };
        let attr = key.attribute;
        if attr.classification() == Classification::Group {
            return self.group_command(key.bridge, attr, &binding.item);
        }

        let command = Command::new(Target::Lamp {
            bridge: key.bridge,
            lamp: key.lamp.clone(),
        });
        let command = match attr {
            Attribute::On => {
                let on = binding.item.value().truthy();
                let command = command.with("on", Value::Bool(on));
                if !on {
                    command
                } else if let Some(bri) = self.registry.send(key.bridge, &key.lamp, Attribute::Bri)
                {
                    // the bridge forgets brightness across power cycles
                    command.with("bri", wire(&bri.item, Attribute::Bri)?)
                } else {
                    info!("{key} has no 'bri' send item, brightness cannot be restored");
                    command
                }
            }
            Attribute::Bri => {
                let value = wire(&binding.item, attr)?;
                if self.registry.lookup_on(key.bridge, &key.lamp) {
                    command.with("bri", value)
                } else {
                    command.with("on", Value::Bool(true)).with("bri", value)
                }
            }
            Attribute::ColR | Attribute::ColG | Attribute::ColB => {
                if !self.writable(key) {
                    return None;
                }
                command.with("xy", json!(self.xy(key)?))
            }
            other => {
                if !self.writable(key) {
                    return None;
                }
                command.with(other.as_ref(), wire(&binding.item, other)?)
            }
        };
        Some(command.with(
            "transitiontime",
            Value::from(binding.transition.tenths()),
        ))
    }

    fn plan_bridge(&self, key: &BridgeKey) -> Option<Command> {
        let Some(binding) = self.registry.bridge_send(key) else {
            warn!("no send binding for {key}");
            return None;
        };
        match key.attribute.classification() {
            Classification::Group => self.group_command(key.bridge, key.attribute, &binding.item),
            _ => Some(
                Command::new(Target::Config { bridge: key.bridge }).with(
                    key.attribute.config_key(),
                    wire(&binding.item, key.attribute)?,
                ),
            ),
        }
    }

    fn group_command(&self, bridge: usize, attr: Attribute, item: &Arc<dyn Item>) -> Option<Command> {
        Some(
            Command::new(Target::Group {
                bridge,
                group: Target::ALL_LAMPS,
            })
            .with(attr.as_ref(), wire(item, attr)?),
        )
    }

    /// Whether a non-brightness attribute may be sent in the lamp's state.
    fn writable(&self, key: &LampKey) -> bool {
        if self.registry.lookup_on(key.bridge, &key.lamp) || !self.policy.suppress_when_off {
            return true;
        }
        debug!("{key} changed while the lamp is off, not sending");
        false
    }

    fn xy(&self, key: &LampKey) -> Option<[f64; 2]> {
        let mut channels = [0u8; 3];
        for (channel, attr) in channels.iter_mut().zip(Attribute::RGB) {
            let Some(binding) = self.registry.send(key.bridge, &key.lamp, attr) else {
                warn!(
                    "bridge {} lamp {} lacks a '{attr}' send item, color not sent",
                    key.bridge, key.lamp
                );
                return None;
            };
            let value = binding.item.value().as_f64().unwrap_or(0.0);
            *channel = clamp_int(value, 0, 255) as u8;
        }
        let [r, g, b] = channels;
        Some(self.converter.to_xy(Rgb::new(r, g, b)))
    }
}

fn wire(item: &Arc<dyn Item>, attr: Attribute) -> Option<Value> {
    to_wire(&item.value(), attr)
        .inspect_err(|e| warn!("item {}: {e}", item.id()))
        .ok()
}
