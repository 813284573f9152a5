//! DPT3 relative dimming through host side fades.

use log::{debug, warn};

use crate::item::{FADE_ORIGIN, PLUGIN_ORIGIN};
use crate::plugin::Hue;
use crate::registry::DimHandle;
use crate::transport::Transport;
use crate::types::ItemValue;

/// A relative dimming telegram: direction and step code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Dpt3 {
    pub up: bool,
    pub step: i64,
}

impl Dpt3 {
    /// Reads a `[direction, step]` pair.
    pub fn from_value(value: &ItemValue) -> Option<Self> {
        let ItemValue::List(values) = value else {
            return None;
        };
        let [direction, step] = values.as_slice() else {
            return None;
        };
        Some(Dpt3 {
            up: direction.truthy(),
            step: step.as_f64()? as i64,
        })
    }

    /// Step code 1 starts a fade, anything else stops it.
    pub fn starts(&self) -> bool {
        self.step == 1
    }
}

impl<T: Transport> Hue<T> {
    /// Handles a telegram of a dimmer controller item.
    pub fn dim(&self, handle: DimHandle, caller: Option<&str>) {
        if caller == Some(PLUGIN_ORIGIN) {
            return;
        }
        let Some(dimmer) = self.registry.dimmer(handle) else {
            warn!("unknown dimmer {handle:?}");
            return;
        };
        let value = dimmer.controller.value();
        let Some(telegram) = Dpt3::from_value(&value) else {
            warn!("item {}: {value:?} is not a dimming telegram", dimmer.controller.id());
            return;
        };

        let config = dimmer.config;
        let target = &dimmer.target;
        if telegram.starts() {
            let dest = if telegram.up { config.max } else { 0.0 };
            debug!("fading {} towards {dest}", target.id());
            target.fade(dest, config.step, config.time);
        } else {
            // two writes with a fresh value interrupt the host's fade
            let current = target.value().as_f64().unwrap_or(0.0) as i64;
            target.set(ItemValue::Int(current + 1), FADE_ORIGIN);
            target.set(ItemValue::Int(current), FADE_ORIGIN);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::Binding;
    use crate::testing::{MemItem, MockTransport, item_conf, plugin};

    fn telegram(up: i64, step: i64) -> ItemValue {
        ItemValue::List(vec![ItemValue::Int(up), ItemValue::Int(step)])
    }

    #[test]
    fn test_dpt3_parse() {
        assert_eq!(
            Dpt3::from_value(&telegram(1, 1)),
            Some(Dpt3 { up: true, step: 1 })
        );
        assert_eq!(Dpt3::from_value(&ItemValue::Int(1)), None);
        assert_eq!(Dpt3::from_value(&ItemValue::List(vec![ItemValue::Int(1)])), None);
        assert!(!Dpt3::from_value(&telegram(0, 0)).unwrap().starts());
    }

    #[tokio::test]
    async fn test_dim_up_down_and_stop() {
        let mut hue = plugin(MockTransport::unreachable());
        let target = MemItem::new("desk.bri", ItemValue::Int(100));
        let dimmer = MemItem::with_parent("desk.bri.dim", telegram(1, 1), target.clone());
        let binding = hue
            .parse_item(dimmer.clone(), &item_conf(&[("hue_dim_max", "200"), ("hue_dim_step", "10")]))
            .unwrap()
            .unwrap();
        assert!(matches!(binding, Binding::DimController(_)));

        hue.dispatch(&binding, Some("knx")).await;
        dimmer.put(telegram(0, 1));
        hue.dispatch(&binding, Some("knx")).await;
        assert_eq!(target.fades(), vec![(200.0, 10.0, 1.0), (0.0, 10.0, 1.0)]);

        dimmer.put(telegram(1, 0));
        hue.dispatch(&binding, Some("knx")).await;
        assert_eq!(
            target.writes(),
            vec![
                (ItemValue::Int(101), FADE_ORIGIN.to_string()),
                (ItemValue::Int(100), FADE_ORIGIN.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_dim_ignores_own_writes() {
        let mut hue = plugin(MockTransport::unreachable());
        let target = MemItem::new("desk.bri", ItemValue::Int(100));
        let dimmer = MemItem::with_parent("desk.bri.dim", telegram(1, 1), target.clone());
        let binding = hue
            .parse_item(dimmer, &item_conf(&[("hue_dim_max", "255")]))
            .unwrap()
            .unwrap();

        hue.dispatch(&binding, Some(PLUGIN_ORIGIN)).await;
        assert!(target.fades().is_empty());
    }
}
