//! Send/listen indices between bridge attributes and host items.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;

use log::warn;
use serde::Serialize;

use crate::config::DimConfig;
use crate::errors::Error;
use crate::item::Item;
use crate::types::{Attribute, TransitionTime};

type Result<T> = std::result::Result<T, Error>;

/// Identifies one attribute of one lamp on one bridge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LampKey {
    pub bridge: usize,
    pub lamp: String,
    pub attribute: Attribute,
}

impl LampKey {
    pub fn new(bridge: usize, lamp: &str, attribute: Attribute) -> Self {
        LampKey {
            bridge,
            lamp: lamp.to_string(),
            attribute,
        }
    }
}

impl fmt::Display for LampKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bridge {} lamp {} {}", self.bridge, self.lamp, self.attribute)
    }
}

/// Identifies one bridge wide attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BridgeKey {
    pub bridge: usize,
    pub attribute: Attribute,
}

impl BridgeKey {
    pub fn new(bridge: usize, attribute: Attribute) -> Self {
        BridgeKey { bridge, attribute }
    }
}

impl fmt::Display for BridgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bridge {} {}", self.bridge, self.attribute)
    }
}

/// A local→remote binding.
#[derive(Clone)]
pub struct SendBinding {
    pub item: Arc<dyn Item>,
    pub transition: TransitionTime,
}

/// Handle of a registered send binding, passed back on item changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SendHandle {
    Lamp(LampKey),
    Bridge(BridgeKey),
}

/// Handle of a registered dimmer controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DimHandle(pub(crate) usize);

/// A DPT3 dimmer controller driving fades on its target item.
#[derive(Clone)]
pub struct DimBinding {
    pub controller: Arc<dyn Item>,
    pub target: Arc<dyn Item>,
    pub config: DimConfig,
}

/// Number of registered bindings per index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistrySummary {
    pub lamp_send: usize,
    pub lamp_listen: usize,
    pub bridge_send: usize,
    pub bridge_listen: usize,
    pub dimmers: usize,
}

/// All bindings, built during the parse phase and read-only afterwards.
#[derive(Default)]
pub struct Registry {
    send: HashMap<LampKey, SendBinding>,
    listen: HashMap<LampKey, Arc<dyn Item>>,
    bridge_send: HashMap<BridgeKey, SendBinding>,
    bridge_listen: HashMap<BridgeKey, Arc<dyn Item>>,
    dimmers: Vec<DimBinding>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_send(&mut self, key: LampKey, binding: SendBinding) -> Result<SendHandle> {
        match self.send.entry(key) {
            Entry::Occupied(entry) => Err(reject("send", entry.key(), &binding.item)),
            Entry::Vacant(entry) => {
                let handle = SendHandle::Lamp(entry.key().clone());
                entry.insert(binding);
                Ok(handle)
            }
        }
    }

    pub fn register_listen(&mut self, key: LampKey, item: Arc<dyn Item>) -> Result<()> {
        match self.listen.entry(key) {
            Entry::Occupied(entry) => Err(reject("listen", entry.key(), &item)),
            Entry::Vacant(entry) => {
                entry.insert(item);
                Ok(())
            }
        }
    }

    pub fn register_bridge_send(
        &mut self,
        key: BridgeKey,
        binding: SendBinding,
    ) -> Result<SendHandle> {
        match self.bridge_send.entry(key) {
            Entry::Occupied(entry) => Err(reject("send", entry.key(), &binding.item)),
            Entry::Vacant(entry) => {
                entry.insert(binding);
                Ok(SendHandle::Bridge(key))
            }
        }
    }

    pub fn register_bridge_listen(&mut self, key: BridgeKey, item: Arc<dyn Item>) -> Result<()> {
        match self.bridge_listen.entry(key) {
            Entry::Occupied(entry) => Err(reject("listen", entry.key(), &item)),
            Entry::Vacant(entry) => {
                entry.insert(item);
                Ok(())
            }
        }
    }

    pub fn register_dimmer(&mut self, binding: DimBinding) -> DimHandle {
        self.dimmers.push(binding);
        DimHandle(self.dimmers.len() - 1)
    }

    pub fn send(&self, bridge: usize, lamp: &str, attribute: Attribute) -> Option<&SendBinding> {
        self.send.get(&LampKey::new(bridge, lamp, attribute))
    }

    pub fn send_by_key(&self, key: &LampKey) -> Option<&SendBinding> {
        self.send.get(key)
    }

    pub fn listen(&self, bridge: usize, lamp: &str, attribute: Attribute) -> Option<&Arc<dyn Item>> {
        self.listen.get(&LampKey::new(bridge, lamp, attribute))
    }

    pub fn bridge_send(&self, key: &BridgeKey) -> Option<&SendBinding> {
        self.bridge_send.get(key)
    }

    pub fn bridge_listen(&self, bridge: usize, attribute: Attribute) -> Option<&Arc<dyn Item>> {
        self.bridge_listen.get(&BridgeKey::new(bridge, attribute))
    }

    pub fn dimmer(&self, handle: DimHandle) -> Option<&DimBinding> {
        self.dimmers.get(handle.0)
    }

    /// Desired on/off state of a lamp, read from its `on` send binding.
    ///
    /// A lamp without one cannot be commanded safely and counts as off.
    pub fn lookup_on(&self, bridge: usize, lamp: &str) -> bool {
        match self.send(bridge, lamp, Attribute::On) {
            Some(binding) => binding.item.value().truthy(),
            None => {
                warn!("bridge {bridge} lamp {lamp} has no 'on' send item, treating it as off");
                false
            }
        }
    }

    pub fn summary(&self) -> RegistrySummary {
        RegistrySummary {
            lamp_send: self.send.len(),
            lamp_listen: self.listen.len(),
            bridge_send: self.bridge_send.len(),
            bridge_listen: self.bridge_listen.len(),
            dimmers: self.dimmers.len(),
        }
    }
}

fn reject(direction: &'static str, key: &impl fmt::Display, item: &Arc<dyn Item>) -> Error {
    warn!(
        "duplicate {direction} binding for {key} from item {}, keeping the first one",
        item.id()
    );
    Error::duplicate(direction, key)
}
