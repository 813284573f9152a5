//! The plugin: configuration, bindings, locks and the polling schedule.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use log::{debug, info, warn};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::bridge::{Bridge, BridgeClient};
use crate::command::Planner;
use crate::config::{DimConfig, ItemConf, PluginConfig, Settings};
use crate::errors::Error;
use crate::item::{Item, PLUGIN_ORIGIN};
use crate::registry::{BridgeKey, DimBinding, DimHandle, LampKey, Registry, SendBinding, SendHandle};
use crate::transport::{Method, Transport};
use crate::types::{Attribute, ColorConverter, ItemValue, WideGamut};

type Result<T> = std::result::Result<T, Error>;

/// What the host has to route back to the plugin when an item changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    /// Changes are sent to the bridge via [`Hue::update_item`].
    Send(SendHandle),
    /// Listen only; the plugin writes, the host never calls back.
    Listen,
    /// A DPT3 dimmer controller handled by [`Hue::dim`].
    DimController(DimHandle),
}

enum Scope<'a> {
    Lamp(&'a str),
    Bridge,
}

/// Reconciles host items with the lamps and settings of Hue bridges.
pub struct Hue<T> {
    pub(crate) settings: Settings,
    pub(crate) client: BridgeClient<T>,
    pub(crate) registry: Registry,
    pub(crate) converter: Box<dyn ColorConverter>,
    /// Guards writes to lamp scoped listen items.
    pub(crate) lamps: Mutex<()>,
    /// Guards writes to bridge scoped listen items.
    pub(crate) bridges: Mutex<()>,
    alive: AtomicBool,
    /// Bumped by every `run`; polling tasks of an older run exit.
    generation: AtomicU64,
}

impl<T: Transport> Hue<T> {
    pub fn new(config: &PluginConfig, transport: T) -> Result<Self> {
        let settings = config.resolve()?;
        for (idx, bridge) in settings.bridges.iter().enumerate() {
            info!("bridge {idx} at {}:{}", bridge.ip, bridge.port);
        }
        Ok(Hue {
            client: BridgeClient::new(transport, settings.bridges.clone()),
            settings,
            registry: Registry::new(),
            converter: Box::new(WideGamut),
            lamps: Mutex::new(()),
            bridges: Mutex::new(()),
            alive: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        })
    }

    /// Replaces the RGB to CIE xy conversion.
    pub fn with_converter(mut self, converter: impl ColorConverter + 'static) -> Self {
        self.converter = Box::new(converter);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn bridges(&self) -> &[Bridge] {
        self.client.bridges()
    }

    /// Binds `item` according to its `hue_*` configuration.
    ///
    /// Returns `Ok(None)` for items the plugin does not handle. Unknown
    /// attributes and duplicate bindings are logged and skipped; a lamp
    /// attribute without a lamp id is an error.
    pub fn parse_item(&mut self, item: Arc<dyn Item>, conf: &ItemConf) -> Result<Option<Binding>> {
        if let Some(config) = DimConfig::from_item_conf(conf) {
            return Ok(self.parse_dimmer(item, config));
        }
        if conf.send.is_none() && conf.listen.is_none() {
            return Ok(None);
        }

        let bridge = conf.bridge_index(self.client.bridges().len());
        let mut binding = None;

        if let Some(attr) = Self::attribute(&item, conf.listen.as_deref(), "hue_listen") {
            let caps = attr.capabilities();
            match Self::scope(&item, attr, conf, caps.lamp_listen, caps.bridge_listen)? {
                Some(Scope::Lamp(lamp)) => {
                    let key = LampKey::new(bridge, lamp, attr);
                    if self.registry.register_listen(key, item.clone()).is_ok() {
                        binding = Some(Binding::Listen);
                    }
                }
                Some(Scope::Bridge) => {
                    let key = BridgeKey::new(bridge, attr);
                    if self.registry.register_bridge_listen(key, item.clone()).is_ok() {
                        binding = Some(Binding::Listen);
                    }
                }
                None => {}
            }
        }

        if let Some(attr) = Self::attribute(&item, conf.send.as_deref(), "hue_send") {
            let caps = attr.capabilities();
            let send = SendBinding {
                item: item.clone(),
                transition: conf.transition(self.settings.default_transition),
            };
            let registered = match Self::scope(&item, attr, conf, caps.lamp_send, caps.bridge_send)? {
                Some(Scope::Lamp(lamp)) => {
                    Some(self.registry.register_send(LampKey::new(bridge, lamp, attr), send))
                }
                Some(Scope::Bridge) => Some(
                    self.registry
                        .register_bridge_send(BridgeKey::new(bridge, attr), send),
                ),
                None => None,
            };
            if let Some(Ok(handle)) = registered {
                binding = Some(Binding::Send(handle));
            }
        }

        if let Some(binding) = &binding {
            debug!("item {} bound to bridge {bridge}: {binding:?}", item.id());
        }
        Ok(binding)
    }

    fn parse_dimmer(&mut self, item: Arc<dyn Item>, config: DimConfig) -> Option<Binding> {
        let Some(target) = item.parent() else {
            warn!("dimmer item {} has no parent item to dim", item.id());
            return None;
        };
        let handle = self.registry.register_dimmer(DimBinding {
            controller: item,
            target,
            config,
        });
        Some(Binding::DimController(handle))
    }

    fn attribute(item: &Arc<dyn Item>, name: Option<&str>, key: &str) -> Option<Attribute> {
        let name = name?;
        match name.trim().parse::<Attribute>() {
            Ok(attr) => Some(attr),
            Err(_) => {
                warn!("item {}: {key} {name:?} is not a supported attribute", item.id());
                None
            }
        }
    }

    fn scope<'c>(
        item: &Arc<dyn Item>,
        attr: Attribute,
        conf: &'c ItemConf,
        lamp_ok: bool,
        bridge_ok: bool,
    ) -> Result<Option<Scope<'c>>> {
        match conf.lamp.as_deref().map(str::trim) {
            Some(lamp) if lamp_ok && !lamp.is_empty() => Ok(Some(Scope::Lamp(lamp))),
            _ if bridge_ok => Ok(Some(Scope::Bridge)),
            _ if lamp_ok => Err(Error::MissingLampId {
                item: item.id().to_string(),
                attribute: attr,
            }),
            _ => {
                warn!("item {}: attribute {attr} cannot be bound in this direction", item.id());
                Ok(None)
            }
        }
    }

    /// Routes an item change back into the plugin.
    pub async fn dispatch(&self, binding: &Binding, caller: Option<&str>) {
        match binding {
            Binding::Send(handle) => self.update_item(handle, caller).await,
            Binding::Listen => {}
            Binding::DimController(handle) => self.dim(*handle, caller),
        }
    }

    pub(crate) fn planner(&self) -> Planner<'_> {
        Planner {
            registry: &self.registry,
            converter: self.converter.as_ref(),
            policy: self.settings.policy,
        }
    }

    /// Requests `path` and mirrors the outcome into the bridge's
    /// `errorstatus` listen item.
    pub(crate) async fn request(
        &self,
        bridge: usize,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value> {
        let outcome = self.client.request(bridge, method, path, body).await;
        if let Some(item) = self.registry.bridge_listen(bridge, Attribute::Errorstatus) {
            let _guard = self.bridges.lock().await;
            item.set(ItemValue::Bool(outcome.is_err()), PLUGIN_ORIGIN);
        }
        outcome
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn polling(&self, generation: u64) -> bool {
        self.is_alive() && self.generation.load(Ordering::SeqCst) == generation
    }

    /// Stops future polling cycles. Requests in flight complete normally.
    pub fn stop(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            info!("stopping hue polling");
        }
    }

    /// Users in the whitelist of `bridge`, logged one per line.
    pub async fn known_users(&self, bridge: usize) -> Result<Value> {
        let config = self.request(bridge, Method::Get, "/config", None).await?;
        let whitelist = config.get("whitelist").cloned().unwrap_or_else(|| json!({}));
        if let Some(users) = whitelist.as_object() {
            for (token, user) in users {
                info!(
                    "bridge {bridge} user {token}: {} (created {}, last used {})",
                    field(user, "name"),
                    field(user, "create date"),
                    field(user, "last use date"),
                );
            }
        }
        Ok(whitelist)
    }

    /// Scenes stored on `bridge`, logged one per line.
    pub async fn known_scenes(&self, bridge: usize) -> Result<Value> {
        let scenes = self.request(bridge, Method::Get, "/scenes", None).await?;
        if let Some(entries) = scenes.as_object() {
            for (id, scene) in entries {
                info!("bridge {bridge} scene {id}: {}", field(scene, "name"));
            }
        }
        Ok(scenes)
    }

    /// Snapshot of the plugin's state for the host's diagnostics view.
    pub async fn diagnostics(&self) -> Value {
        let mut bridges = Vec::with_capacity(self.client.bridges().len());
        for bridge in self.client.bridges() {
            bridges.push(bridge.diagnostics().await);
        }
        json!({
            "alive": self.is_alive(),
            "cycle_lamps": self.settings.lamp_cycle.as_secs(),
            "cycle_bridges": self.settings.bridge_cycle.as_secs(),
            "bindings": serde_json::to_value(self.registry.summary()).unwrap_or(Value::Null),
            "bridges": bridges,
        })
    }
}

impl<T: Transport + 'static> Hue<T> {
    /// Starts the lamp and bridge polling cycles; both fire immediately and
    /// then once per configured interval.
    ///
    /// Must be called from within a tokio runtime.
    pub fn run(self: &Arc<Self>) {
        if self.alive.swap(true, Ordering::SeqCst) {
            return;
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            "polling lamps every {}s, bridges every {}s",
            self.settings.lamp_cycle.as_secs(),
            self.settings.bridge_cycle.as_secs()
        );

        let hue = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(hue.settings.lamp_cycle);
            loop {
                ticker.tick().await;
                if !hue.polling(generation) {
                    break;
                }
                hue.update_lamps().await;
            }
        });

        let hue = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(hue.settings.bridge_cycle);
            loop {
                ticker.tick().await;
                if !hue.polling(generation) {
                    break;
                }
                hue.update_bridges().await;
            }
        });
    }
}

#[cfg(feature = "reqwest-transport")]
impl Hue<crate::transport::ReqwestTransport> {
    /// Plugin talking to the bridges over `reqwest`.
    pub fn connect(config: &PluginConfig) -> Result<Self> {
        let transport = crate::transport::ReqwestTransport::new()
            .map_err(|e| Error::Config(format!("cannot build http client: {e}")))?;
        Self::new(config, transport)
    }
}

fn interval(period: Duration) -> tokio::time::Interval {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker
}

fn field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("?")
}
