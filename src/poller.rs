//! Poll path: periodic bridge state → listen items.

use futures::future::join_all;
use log::{debug, warn};
use serde_json::{Map, Value};

use crate::coerce::cast_by_classification;
use crate::errors::Error;
use crate::item::PLUGIN_ORIGIN;
use crate::plugin::Hue;
use crate::transport::{Method, Transport};
use crate::types::Attribute;

type Result<T> = std::result::Result<T, Error>;

/// Merges a lamp's `state` object into its top level fields; state wins.
pub(crate) fn flatten_lamp(lamp: &Map<String, Value>) -> Map<String, Value> {
    let mut flat: Map<String, Value> = lamp
        .iter()
        .filter(|(key, _)| key.as_str() != "state")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    if let Some(Value::Object(state)) = lamp.get("state") {
        flat.extend(state.iter().map(|(key, value)| (key.clone(), value.clone())));
    }
    flat
}

impl<T: Transport> Hue<T> {
    /// Polls the lamps of every bridge; a failing bridge does not hold up
    /// the others.
    pub async fn update_lamps(&self) {
        let bridges = self.client.bridges().len();
        join_all((0..bridges).map(|bridge| self.poll_lamps(bridge))).await;
    }

    /// Polls the configuration of every bridge.
    pub async fn update_bridges(&self) {
        let bridges = self.client.bridges().len();
        join_all((0..bridges).map(|bridge| self.poll_bridge(bridge))).await;
    }

    /// Reads `GET /lights` of one bridge into its lamp listen items,
    /// returning how many items were written.
    pub async fn poll_lamps(&self, bridge: usize) -> Result<usize> {
        let lights = self.request(bridge, Method::Get, "/lights", None).await?;
        let Some(lights) = lights.as_object() else {
            warn!("bridge {bridge} sent an unexpected lamp list: {lights}");
            return Ok(0);
        };

        let _guard = self.lamps.lock().await;
        let mut written = 0;
        for (lamp, state) in lights {
            let Some(state) = state.as_object() else {
                continue;
            };
            for (name, raw) in flatten_lamp(state) {
                let Ok(attr) = name.parse::<Attribute>() else {
                    continue;
                };
                let Some(item) = self.registry.listen(bridge, lamp, attr) else {
                    continue;
                };
                if item.fading() {
                    debug!("item {} is fading, skipping poll value", item.id());
                    continue;
                }
                // brightness of a lamp the host wants off would flicker the item
                if attr == Attribute::Bri && !self.registry.lookup_on(bridge, lamp) {
                    continue;
                }
                match cast_by_classification(&raw, attr) {
                    Ok(value) => {
                        item.set(value, PLUGIN_ORIGIN);
                        written += 1;
                    }
                    Err(e) => warn!("item {}: {e}", item.id()),
                }
            }
        }
        Ok(written)
    }

    /// Reads `GET /config` of one bridge into its bridge listen items.
    pub async fn poll_bridge(&self, bridge: usize) -> Result<usize> {
        let config = self.request(bridge, Method::Get, "/config", None).await?;
        let Some(config) = config.as_object() else {
            warn!("bridge {bridge} sent an unexpected config: {config}");
            return Ok(0);
        };

        let _guard = self.bridges.lock().await;
        let mut written = 0;
        for (key, raw) in config {
            let Some(attr) = Attribute::from_config_key(key) else {
                continue;
            };
            let Some(item) = self.registry.bridge_listen(bridge, attr) else {
                continue;
            };
            if item.fading() {
                continue;
            }
            match cast_by_classification(raw, attr) {
                Ok(value) => {
                    item.set(value, PLUGIN_ORIGIN);
                    written += 1;
                }
                Err(e) => warn!("item {}: {e}", item.id()),
            }
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::PluginConfig;
    use crate::item::Item;
    use crate::testing::{MemItem, MockTransport, item_conf, plugin, user_path};
    use crate::transport::{HttpResponse, TransportError};
    use crate::types::ItemValue;
    use serde_json::json;

    const LIGHTS: &str = r#"{
        "1": {"name": "Desk", "type": "Extended color light",
              "state": {"on": true, "bri": 144, "ct": 366, "reachable": true, "xy": [0.4, 0.4]}},
        "2": {"name": "Hall", "state": {"on": false, "bri": 10, "reachable": false}}
    }"#;

    fn bridge_replying(body: &'static str) -> MockTransport {
        MockTransport::replying(move |_| Ok(HttpResponse::ok(body)))
    }

    fn listen(hue: &mut Hue<MockTransport>, id: &str, attr: &str, lamp: &str) -> Arc<MemItem> {
        let item = MemItem::new(id, ItemValue::Bool(false));
        hue.parse_item(item.clone(), &item_conf(&[("hue_listen", attr), ("hue_lamp", lamp)]))
            .unwrap();
        item
    }

    #[test]
    fn test_flatten_lamp_state_wins() {
        let lamp = json!({"name": "Desk", "on": "shadowed", "state": {"on": true, "bri": 1}});
        let flat = flatten_lamp(lamp.as_object().unwrap());
        assert_eq!(
            Value::Object(flat),
            json!({"name": "Desk", "on": true, "bri": 1})
        );
    }

    #[tokio::test]
    async fn test_poll_lamps() {
        let mut hue = plugin(bridge_replying(LIGHTS));
        let on = MemItem::new("desk.on", ItemValue::Bool(true));
        hue.parse_item(on.clone(), &item_conf(&[("hue_send", "on"), ("hue_listen", "on"), ("hue_lamp", "1")]))
            .unwrap();
        let bri = listen(&mut hue, "desk.bri", "bri", "1");
        let name = listen(&mut hue, "desk.name", "name", "1");
        let xy = listen(&mut hue, "desk.xy", "xy", "1");
        let reachable = listen(&mut hue, "hall.reachable", "reachable", "2");

        assert_eq!(hue.poll_lamps(0).await.unwrap(), 5);
        assert_eq!(bri.value(), ItemValue::Int(144));
        assert_eq!(name.value(), ItemValue::Str("Desk".into()));
        assert_eq!(
            xy.value(),
            ItemValue::List(vec![ItemValue::Num(0.4), ItemValue::Num(0.4)])
        );
        assert_eq!(reachable.value(), ItemValue::Bool(false));
        assert_eq!(on.writes()[0].1, PLUGIN_ORIGIN);
    }

    #[tokio::test]
    async fn test_poll_skips_fading_items() {
        let mut hue = plugin(bridge_replying(LIGHTS));
        let ct = listen(&mut hue, "desk.ct", "ct", "1");
        ct.set_fading(true);

        hue.poll_lamps(0).await.unwrap();
        assert!(ct.writes().is_empty());
    }

    #[tokio::test]
    async fn test_poll_skips_brightness_of_lamps_held_off() {
        let mut hue = plugin(bridge_replying(LIGHTS));
        let on = MemItem::new("hall.on", ItemValue::Bool(false));
        hue.parse_item(on, &item_conf(&[("hue_send", "on"), ("hue_lamp", "2")]))
            .unwrap();
        let bri = listen(&mut hue, "hall.bri", "bri", "2");
        // lamp 1 has no on binding and counts as off as well
        let desk = listen(&mut hue, "desk.bri", "bri", "1");

        hue.poll_lamps(0).await.unwrap();
        assert!(bri.writes().is_empty());
        assert!(desk.writes().is_empty());
    }

    #[tokio::test]
    async fn test_poll_bridge_renames_config_keys() {
        let transport = bridge_replying(
            r#"{"name": "attic", "swversion": "1941132080", "zigbeechannel": 25,
                "linkbutton": false, "whitelist": {"token": {"name": "plugin"}}, "unknownkey": 1}"#,
        );
        let mut hue = plugin(transport);
        let mut bind = |id: &str, attr: &str| {
            let item = MemItem::new(id, ItemValue::Bool(true));
            hue.parse_item(item.clone(), &item_conf(&[("hue_listen", attr)]))
                .unwrap();
            item
        };
        let name = bind("name", "bridge_name");
        let swversion = bind("swversion", "bridge_swversion");
        let channel = bind("channel", "zigbeechannel");
        let link = bind("link", "linkbutton");
        let whitelist = bind("whitelist", "whitelist");

        assert_eq!(hue.poll_bridge(0).await.unwrap(), 5);
        assert_eq!(name.value(), ItemValue::Str("attic".into()));
        assert_eq!(swversion.value(), ItemValue::Str("1941132080".into()));
        assert_eq!(channel.value(), ItemValue::Int(25));
        assert_eq!(link.value(), ItemValue::Bool(false));
        assert!(matches!(whitelist.value(), ItemValue::Dict(map) if map.contains_key("token")));
    }

    #[tokio::test]
    async fn test_poll_bridge_skips_fading_items() {
        let mut hue = plugin(bridge_replying(r#"{"name": "attic", "zigbeechannel": 15}"#));
        let name = MemItem::new("bridge.name", ItemValue::Str("cellar".into()));
        hue.parse_item(name.clone(), &item_conf(&[("hue_listen", "bridge_name")]))
            .unwrap();
        let channel = MemItem::new("bridge.channel", ItemValue::Int(0));
        hue.parse_item(channel.clone(), &item_conf(&[("hue_listen", "zigbeechannel")]))
            .unwrap();
        name.set_fading(true);

        assert_eq!(hue.poll_bridge(0).await.unwrap(), 1);
        assert!(name.writes().is_empty());
        assert_eq!(name.value(), ItemValue::Str("cellar".into()));
        assert_eq!(channel.value(), ItemValue::Int(15));
    }

    #[tokio::test]
    async fn test_unreachable_bridge_sets_error_status() {
        let mut hue = plugin(MockTransport::unreachable());
        let status = MemItem::new("errorstatus", ItemValue::Bool(false));
        hue.parse_item(status.clone(), &item_conf(&[("hue_listen", "errorstatus")]))
            .unwrap();
        let reachable = listen(&mut hue, "desk.reachable", "reachable", "1");

        hue.update_lamps().await;
        assert_eq!(status.value(), ItemValue::Bool(true));
        assert!(reachable.writes().is_empty());
    }

    #[tokio::test]
    async fn test_failing_bridge_does_not_block_others() {
        let config = PluginConfig {
            hue_ip: "10.0.0.2,10.0.0.3".into(),
            hue_user: "a,b".into(),
            ..Default::default()
        };
        let transport = MockTransport::replying(|request| {
            if request.url.starts_with("http://10.0.0.2") {
                Err(TransportError("timed out".into()))
            } else {
                assert_eq!(user_path(&request.url), "/lights");
                Ok(HttpResponse::ok(LIGHTS))
            }
        });
        let mut hue = Hue::new(&config, transport).unwrap();
        let name = MemItem::new("desk.name", ItemValue::Str(String::new()));
        hue.parse_item(
            name.clone(),
            &item_conf(&[("hue_listen", "name"), ("hue_lamp", "1"), ("hue_bridge", "1")]),
        )
        .unwrap();

        hue.update_lamps().await;
        assert_eq!(name.value(), ItemValue::Str("Desk".into()));
        assert!(hue.bridges()[0].errored());
        assert!(!hue.bridges()[1].errored());
    }
}
