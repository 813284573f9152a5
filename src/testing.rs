//! In-memory items and a scripted transport for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use crate::config::{ItemConf, PluginConfig};
use crate::item::Item;
use crate::plugin::Hue;
use crate::transport::{HttpResponse, Method, Request, Transport, TransportError};
use crate::types::ItemValue;

/// An item that records every write made through [`Item::set`].
pub(crate) struct MemItem {
    id: String,
    value: Mutex<ItemValue>,
    fading: AtomicBool,
    writes: Mutex<Vec<(ItemValue, String)>>,
    fades: Mutex<Vec<(f64, f64, f64)>>,
    parent: Option<Arc<dyn Item>>,
}

impl MemItem {
    pub fn new(id: &str, value: ItemValue) -> Arc<Self> {
        Arc::new(Self::build(id, value, None))
    }

    pub fn with_parent(id: &str, value: ItemValue, parent: Arc<dyn Item>) -> Arc<Self> {
        Arc::new(Self::build(id, value, Some(parent)))
    }

    fn build(id: &str, value: ItemValue, parent: Option<Arc<dyn Item>>) -> Self {
        MemItem {
            id: id.to_string(),
            value: Mutex::new(value),
            fading: AtomicBool::new(false),
            writes: Mutex::new(Vec::new()),
            fades: Mutex::new(Vec::new()),
            parent,
        }
    }

    /// Changes the value the way the host would, without recording a write.
    pub fn put(&self, value: ItemValue) {
        *self.value.lock().unwrap() = value;
    }

    pub fn set_fading(&self, fading: bool) {
        self.fading.store(fading, Ordering::SeqCst);
    }

    pub fn writes(&self) -> Vec<(ItemValue, String)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn fades(&self) -> Vec<(f64, f64, f64)> {
        self.fades.lock().unwrap().clone()
    }
}

impl Item for MemItem {
    fn id(&self) -> &str {
        &self.id
    }

    fn value(&self) -> ItemValue {
        self.value.lock().unwrap().clone()
    }

    fn set(&self, value: ItemValue, caller: &str) {
        self.put(value.clone());
        self.writes.lock().unwrap().push((value, caller.to_string()));
    }

    fn fading(&self) -> bool {
        self.fading.load(Ordering::SeqCst)
    }

    fn fade(&self, dest: f64, step: f64, delta: f64) {
        self.fades.lock().unwrap().push((dest, step, delta));
    }

    fn parent(&self) -> Option<Arc<dyn Item>> {
        self.parent.clone()
    }
}

type Handler = dyn Fn(&Request) -> Result<HttpResponse, TransportError> + Send + Sync;

/// Transport answering from a closure and logging every request.
#[derive(Clone)]
pub(crate) struct MockTransport {
    handler: Arc<Handler>,
    log: Arc<Mutex<Vec<Request>>>,
}

impl MockTransport {
    pub fn replying<F>(handler: F) -> Self
    where
        F: Fn(&Request) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        MockTransport {
            handler: Arc::new(handler),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn unreachable() -> Self {
        Self::replying(|_| Err(TransportError("connection refused".into())))
    }

    /// Confirms every key of a `PUT` body the way a bridge does, and answers
    /// other requests with `{}`.
    pub fn echo() -> Self {
        Self::replying(|request| {
            let (Method::Put, Some(Value::Object(body))) = (request.method, &request.body) else {
                return Ok(HttpResponse::ok("{}"));
            };
            let path = user_path(&request.url);
            let entries: Vec<Value> = body
                .iter()
                .map(|(key, value)| json!({"success": {format!("{path}/{key}"): value}}))
                .collect();
            Ok(HttpResponse::ok(Value::Array(entries).to_string()))
        })
    }

    pub fn requests(&self) -> Vec<Request> {
        self.log.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    async fn send(&self, request: Request) -> Result<HttpResponse, TransportError> {
        self.log.lock().unwrap().push(request.clone());
        (self.handler)(&request)
    }
}

/// Path of `url` below the user segment, e.g. `/lights/1/state`.
pub(crate) fn user_path(url: &str) -> String {
    url.split_once("/api/")
        .and_then(|(_, rest)| rest.split_once('/'))
        .map(|(_, path)| format!("/{path}"))
        .unwrap_or_default()
}

/// A plugin with one bridge at 10.0.0.2 using the token `token`.
pub(crate) fn plugin(transport: MockTransport) -> Hue<MockTransport> {
    let config = PluginConfig {
        hue_ip: "10.0.0.2".into(),
        hue_user: "token".into(),
        ..Default::default()
    };
    Hue::new(&config, transport).unwrap()
}

pub(crate) fn item_conf(pairs: &[(&str, &str)]) -> ItemConf {
    let conf = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ItemConf::from_conf(&conf).unwrap()
}
