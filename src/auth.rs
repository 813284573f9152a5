//! Pairing a user token with a bridge.

use log::info;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::errors::Error;
use crate::plugin::Hue;
use crate::transport::{Method, Transport};

type Result<T> = std::result::Result<T, Error>;

/// Generates a random 40 character hex token, the length bridges issue.
///
/// ```
/// let user = hue_items_rs::generate_user();
/// assert_eq!(user.len(), 40);
/// assert!(user.chars().all(|c| c.is_ascii_hexdigit()));
/// ```
pub fn generate_user() -> String {
    let mut user = Uuid::new_v4().simple().to_string();
    user.push_str(&Uuid::new_v4().simple().to_string()[..8]);
    user
}

impl<T: Transport> Hue<T> {
    /// Registers the bridge's configured user (or a generated one when none
    /// is configured) under `devicetype`.
    ///
    /// The link button of the bridge has to be pressed shortly before;
    /// otherwise the bridge answers with error 101. The raw response is
    /// returned and nothing is stored.
    pub async fn authorize_user(&self, bridge: usize, devicetype: &str) -> Result<Value> {
        let configured = self.client.bridge(bridge)?.user();
        let username = if configured.is_empty() {
            generate_user()
        } else {
            configured.to_string()
        };
        info!("bridge {bridge}: registering user {username} as {devicetype}");
        self.client
            .request_root(
                bridge,
                Method::Post,
                Some(json!({"devicetype": devicetype, "username": username})),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockTransport, plugin};
    use crate::transport::HttpResponse;

    #[test]
    fn test_generated_users_differ() {
        assert_ne!(generate_user(), generate_user());
    }

    #[tokio::test]
    async fn test_authorize_user() {
        let transport = MockTransport::replying(|_| {
            Ok(HttpResponse::ok(r#"[{"success": {"username": "token"}}]"#))
        });
        let hue = plugin(transport.clone());

        let response = hue.authorize_user(0, "smarthome#pi").await.unwrap();
        assert_eq!(response[0]["success"]["username"], "token");

        let sent = transport.requests();
        assert_eq!(sent[0].url, "http://10.0.0.2:80/api");
        assert_eq!(sent[0].method, Method::Post);
        assert_eq!(
            sent[0].body,
            Some(json!({"devicetype": "smarthome#pi", "username": "token"}))
        );
    }

    #[tokio::test]
    async fn test_authorize_without_link_button() {
        let transport = MockTransport::replying(|_| {
            Ok(HttpResponse::ok(
                r#"[{"error": {"type": 101, "address": "", "description": "link button not pressed"}}]"#,
            ))
        });
        let hue = plugin(transport);
        let err = hue.authorize_user(0, "smarthome#pi").await.unwrap_err();
        assert!(matches!(err, Error::Bridge { kind: 101, .. }));
    }
}
