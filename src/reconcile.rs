//! Write path: item change → bridge command → confirmed listen values.

use log::{debug, warn};
use serde_json::Value;

use crate::coerce::cast_by_classification;
use crate::command::{Command, Target};
use crate::errors::Error;
use crate::item::PLUGIN_ORIGIN;
use crate::plugin::Hue;
use crate::registry::SendHandle;
use crate::transport::{Method, Transport};
use crate::types::Attribute;

type Result<T> = std::result::Result<T, Error>;

impl<T: Transport> Hue<T> {
    /// Sends the change of a send bound item to its bridge.
    ///
    /// Changes made by the plugin itself are ignored. Listen items are only
    /// updated from the bridge's confirmation.
    pub async fn update_item(&self, handle: &SendHandle, caller: Option<&str>) {
        if caller == Some(PLUGIN_ORIGIN) {
            return;
        }
        let Some(command) = self.planner().plan(handle) else {
            return;
        };
        if let Err(e) = self.execute(command).await {
            debug!("{handle:?} not applied: {e}");
        }
    }

    /// Sends `command` and applies the confirmed values, returning how many
    /// listen items were written.
    pub(crate) async fn execute(&self, command: Command) -> Result<usize> {
        let Command { target, body } = command;
        let response = self
            .request(target.bridge(), Method::Put, &target.path(), Some(Value::Object(body)))
            .await?;
        Ok(self.apply_confirmation(&target, &response).await)
    }

    async fn apply_confirmation(&self, target: &Target, response: &Value) -> usize {
        let Some(entries) = response.as_array() else {
            warn!("bridge {} sent an unexpected confirmation: {response}", target.bridge());
            return 0;
        };

        let _guard = match target {
            Target::Lamp { .. } => self.lamps.lock().await,
            Target::Group { .. } | Target::Config { .. } => self.bridges.lock().await,
        };

        let mut written = 0;
        for entry in entries {
            if let Some(success) = entry.get("success").and_then(Value::as_object) {
                for (address, value) in success {
                    if self.confirm(target, address, value) {
                        written += 1;
                    }
                }
            } else if let Some(err) = entry.get("error") {
                warn!(
                    "bridge {}: {} rejected: {}",
                    target.bridge(),
                    err.get("address").and_then(Value::as_str).unwrap_or("?"),
                    err.get("description").and_then(Value::as_str).unwrap_or("unknown error"),
                );
            }
        }
        written
    }

    /// Writes one confirmed `address: value` pair to its listen item.
    fn confirm(&self, target: &Target, address: &str, value: &Value) -> bool {
        let name = address.rsplit('/').next().unwrap_or(address);
        let item = match target {
            Target::Lamp { bridge, lamp } => name
                .parse::<Attribute>()
                .ok()
                .and_then(|attr| Some((attr, self.registry.listen(*bridge, lamp, attr)?))),
            Target::Group { bridge, .. } | Target::Config { bridge } => Attribute::from_config_key(name)
                .and_then(|attr| Some((attr, self.registry.bridge_listen(*bridge, attr)?))),
        };
        let Some((attr, item)) = item else {
            return false;
        };
        match cast_by_classification(value, attr) {
            Ok(value) => {
                item.set(value, PLUGIN_ORIGIN);
                true
            }
            Err(e) => {
                warn!("item {}: {e}", item.id());
                false
            }
        }
    }
}
