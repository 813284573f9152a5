//! Request/response client for Hue bridges.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, error};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::config::BridgeConfig;
use crate::errors::Error;
use crate::history::{MessageHistory, MessageType};
use crate::transport::{Method, Request, Transport};

type Result<T> = std::result::Result<T, Error>;

/// A configured Hue bridge.
///
/// Address and token are fixed for the plugin's lifetime; only the error
/// flag and history change.
#[derive(Debug)]
pub struct Bridge {
    id: usize,
    config: BridgeConfig,
    errored: AtomicBool,
    history: Mutex<MessageHistory>,
}

impl Bridge {
    pub fn new(id: usize, config: BridgeConfig) -> Self {
        Bridge {
            id,
            config,
            errored: AtomicBool::new(false),
            history: Mutex::new(MessageHistory::new()),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn ip(&self) -> &str {
        &self.config.ip
    }

    pub fn port(&self) -> u16 {
        self.config.port
    }

    pub fn user(&self) -> &str {
        &self.config.user
    }

    /// True if the last exchange with this bridge failed.
    pub fn errored(&self) -> bool {
        self.errored.load(Ordering::SeqCst)
    }

    pub async fn history(&self) -> MessageHistory {
        self.history.lock().await.clone()
    }

    /// Base url of the bridge API, without a user.
    pub fn api_url(&self) -> String {
        format!("http://{}:{}/api", self.config.ip, self.config.port)
    }

    /// Url of `path` below the user's API root.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}{}", self.api_url(), self.config.user, path)
    }

    pub async fn diagnostics(&self) -> Value {
        let history = self.history.lock().await;
        let answered = |endpoint: &str| {
            history
                .last(MessageType::Response, endpoint)
                .map(|entry| entry.timestamp)
        };
        json!({
            "id": self.id,
            "ip": self.config.ip,
            "port": self.config.port,
            "errored": self.errored(),
            "last_lamp_poll": answered("GET /lights"),
            "last_config_poll": answered("GET /config"),
            "history": serde_json::to_value(history.summary()).unwrap_or(Value::Null),
        })
    }
}

/// Issues single-attempt requests against the configured bridges.
pub struct BridgeClient<T> {
    transport: T,
    bridges: Vec<Bridge>,
}

impl<T: Transport> BridgeClient<T> {
    pub fn new(transport: T, configs: Vec<BridgeConfig>) -> Self {
        let bridges = configs
            .into_iter()
            .enumerate()
            .map(|(id, config)| Bridge::new(id, config))
            .collect();
        BridgeClient { transport, bridges }
    }

    pub fn bridges(&self) -> &[Bridge] {
        &self.bridges
    }

    pub fn bridge(&self, id: usize) -> Result<&Bridge> {
        self.bridges.get(id).ok_or(Error::UnknownBridge(id))
    }

    /// Requests `path` below the bridge's user API root.
    ///
    /// Every failure is logged here; callers only decide whether to go on.
    pub async fn request(
        &self,
        id: usize,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value> {
        let bridge = self.bridge(id)?;
        let url = bridge.url(path);
        self.exchange(bridge, &format!("{method} {path}"), method, url, body)
            .await
    }

    /// Requests the API root itself, used for pairing.
    pub async fn request_root(&self, id: usize, method: Method, body: Option<Value>) -> Result<Value> {
        let bridge = self.bridge(id)?;
        let url = bridge.api_url();
        self.exchange(bridge, &format!("{method} /"), method, url, body)
            .await
    }

    async fn exchange(
        &self,
        bridge: &Bridge,
        endpoint: &str,
        method: Method,
        url: String,
        body: Option<Value>,
    ) -> Result<Value> {
        debug!("bridge {} {endpoint} {:?}", bridge.id, body);
        bridge.history.lock().await.record(
            MessageType::Request,
            endpoint,
            body.as_ref().unwrap_or(&Value::Null),
        );

        let outcome = self.send(bridge.id, Request { method, url, body }).await;

        let mut history = bridge.history.lock().await;
        match &outcome {
            Ok(value) => {
                history.record(MessageType::Response, endpoint, value);
                bridge.errored.store(false, Ordering::SeqCst);
            }
            Err(e) => {
                history.record_error(endpoint, &e.to_string());
                bridge.errored.store(true, Ordering::SeqCst);
            }
        }
        outcome
    }

    async fn send(&self, id: usize, request: Request) -> Result<Value> {
        let response = self.transport.send(request).await.map_err(|e| {
            error!("bridge {id} unreachable: {e}");
            Error::transport(id, e)
        })?;

        if response.status != 200 {
            error!("bridge {id} request failed with status {}", response.status);
            return Err(Error::HttpStatus {
                bridge: id,
                status: response.status,
            });
        }

        let value: Value = serde_json::from_str(&response.body).map_err(|e| {
            error!("bridge {id} sent invalid json: {e}");
            Error::JsonLoad(e)
        })?;

        match rejection(id, &value) {
            Some(err) => Err(err),
            None => Ok(value),
        }
    }
}

/// A response rejects the whole request when it is a non-empty list of
/// nothing but error objects. Mixed lists are partial successes and are
/// evaluated entry by entry by the caller.
fn rejection(id: usize, value: &Value) -> Option<Error> {
    let entries = value.as_array().filter(|entries| !entries.is_empty())?;
    let errors = entries
        .iter()
        .map(|entry| entry.get("error"))
        .collect::<Option<Vec<_>>>()?;

    for err in &errors {
        let description = err
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        if err.get("type").and_then(Value::as_u64) == Some(1) {
            error!("bridge {id}: {description} (need to specify correct hue user?)");
        } else {
            error!("bridge {id}: {description}");
        }
    }

    let first = errors[0];
    Some(Error::Bridge {
        bridge: id,
        kind: first.get("type").and_then(Value::as_u64).unwrap_or(0),
        description: first
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use crate::transport::HttpResponse;

    fn client(transport: MockTransport) -> BridgeClient<MockTransport> {
        BridgeClient::new(
            transport,
            vec![BridgeConfig {
                ip: "10.0.0.2".into(),
                port: 80,
                user: "token".into(),
            }],
        )
    }

    #[tokio::test]
    async fn test_request_success() {
        let transport = MockTransport::replying(|_| Ok(HttpResponse::ok(r#"{"1": {}}"#)));
        let client = client(transport.clone());

        let value = client.request(0, Method::Get, "/lights", None).await.unwrap();
        assert_eq!(value, json!({"1": {}}));

        let sent = transport.requests();
        assert_eq!(sent[0].url, "http://10.0.0.2:80/api/token/lights");
        assert_eq!(sent[0].method, Method::Get);
        assert!(!client.bridge(0).unwrap().errored());
        assert_eq!(client.bridge(0).unwrap().history().await.entries().count(), 2);
    }

    #[tokio::test]
    async fn test_unauthorized_user() {
        let transport = MockTransport::replying(|_| {
            Ok(HttpResponse::ok(
                r#"[{"error": {"type": 1, "address": "/", "description": "unauthorized user"}}]"#,
            ))
        });
        let client = client(transport);

        let err = client.request(0, Method::Get, "/lights", None).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(client.bridge(0).unwrap().errored());
    }

    #[tokio::test]
    async fn test_partial_success_is_not_rejected() {
        let body = r#"[{"success": {"/lights/1/state/on": true}},
                       {"error": {"type": 201, "address": "/lights/1/state/bri", "description": "off"}}]"#;
        let transport = MockTransport::replying(move |_| Ok(HttpResponse::ok(body)));
        let client = client(transport);

        let value = client
            .request(0, Method::Put, "/lights/1/state", Some(json!({"on": true})))
            .await
            .unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_leading_error_is_partial_success() {
        let body = r#"[{"error": {"type": 7, "address": "/lights/1/state/xy", "description": "invalid value"}},
                       {"success": {"/lights/1/state/on": true}}]"#;
        let transport = MockTransport::replying(move |_| Ok(HttpResponse::ok(body)));
        let client = client(transport);

        let value = client
            .request(0, Method::Put, "/lights/1/state", Some(json!({"on": true})))
            .await
            .unwrap();
        assert_eq!(value[1]["success"]["/lights/1/state/on"], true);
        assert!(!client.bridge(0).unwrap().errored());
    }

    #[tokio::test]
    async fn test_diagnostics_reports_last_poll() {
        let transport = MockTransport::replying(|_| Ok(HttpResponse::ok("{}")));
        let client = client(transport);
        let bridge = client.bridge(0).unwrap();
        assert_eq!(bridge.diagnostics().await["last_lamp_poll"], Value::Null);

        client.request(0, Method::Get, "/lights", None).await.unwrap();
        let diagnostics = bridge.diagnostics().await;
        assert!(diagnostics["last_lamp_poll"].is_f64());
        assert_eq!(diagnostics["last_config_poll"], Value::Null);
        assert_eq!(diagnostics["history"]["retained"], 2);
    }

    #[tokio::test]
    async fn test_http_status() {
        let transport = MockTransport::replying(|_| {
            Ok(HttpResponse {
                status: 404,
                body: String::new(),
            })
        });
        let client = client(transport);
        assert_eq!(
            client.request(0, Method::Get, "/config", None).await.unwrap_err(),
            Error::HttpStatus {
                bridge: 0,
                status: 404
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_bridge() {
        let client = client(MockTransport::unreachable());
        assert_eq!(
            client.request(3, Method::Get, "/lights", None).await.unwrap_err(),
            Error::UnknownBridge(3)
        );
    }

    #[test]
    fn test_empty_list_is_not_a_rejection() {
        assert!(rejection(0, &json!([])).is_none());
        assert!(rejection(0, &json!({"error": "x"})).is_none());
    }
}
