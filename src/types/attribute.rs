//! The closed set of lamp and bridge attributes and their classification.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Every attribute name an item can bind to.
///
/// Names match the Hue v1 wire names, except for the bridge level
/// `bridge_name` and `bridge_swversion` which are renamed so they do not
/// collide with the lamp scoped `name` and `swversion`.
///
/// ```
/// use std::str::FromStr;
/// use hue_items_rs::{Attribute, Classification};
///
/// let attr = Attribute::from_str("col_r").unwrap();
/// assert_eq!(attr, Attribute::ColR);
/// assert_eq!(attr.classification(), Classification::Rgb);
/// assert_eq!(Attribute::Utc.to_string(), "UTC");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    // lamp state
    On,
    Bri,
    Sat,
    Hue,
    Ct,
    ColR,
    ColG,
    ColB,
    Effect,
    Alert,
    Reachable,
    Xy,
    Colormode,
    // lamp metadata
    Type,
    Name,
    Modelid,
    Uniqueid,
    Manufacturername,
    Swversion,
    // group command
    Scene,
    // bridge config
    BridgeName,
    Zigbeechannel,
    Mac,
    Dhcp,
    Ipaddress,
    Netmask,
    Gateway,
    #[strum(serialize = "UTC")]
    #[serde(rename = "UTC")]
    Utc,
    Localtime,
    Timezone,
    BridgeSwversion,
    Apiversion,
    Swupdate,
    Linkbutton,
    Portalservices,
    Portalconnection,
    Portalstate,
    Whitelist,
    Errorstatus,
}

/// Type and range category governing coercion for an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Bool,
    Str,
    /// Dicts and lists, passed through as native JSON.
    Structured,
    /// 0..=255
    Int8,
    /// 0..=65535
    Int16,
    /// 153..=500 mired
    ColorTemperature,
    /// One channel of the col_r/col_g/col_b triple, 0..=255.
    Rgb,
    /// Routed as a group action instead of a lamp state change.
    Group,
}

impl Classification {
    /// Inclusive integer range for the integer classes.
    pub fn range(&self) -> Option<(i64, i64)> {
        match self {
            Classification::Int8 | Classification::Rgb => Some((0, 255)),
            Classification::Int16 => Some((0, 65535)),
            Classification::ColorTemperature => Some((153, 500)),
            _ => None,
        }
    }
}

/// Which directions an attribute supports in which scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub lamp_send: bool,
    pub lamp_listen: bool,
    pub bridge_send: bool,
    pub bridge_listen: bool,
}

impl Capabilities {
    const LAMP: Self = Self {
        lamp_send: true,
        lamp_listen: true,
        bridge_send: false,
        bridge_listen: false,
    };
    const LAMP_SEND: Self = Self {
        lamp_send: true,
        lamp_listen: false,
        bridge_send: false,
        bridge_listen: false,
    };
    const LAMP_LISTEN: Self = Self {
        lamp_send: false,
        lamp_listen: true,
        bridge_send: false,
        bridge_listen: false,
    };
    const BRIDGE: Self = Self {
        lamp_send: false,
        lamp_listen: false,
        bridge_send: true,
        bridge_listen: true,
    };
    const BRIDGE_LISTEN: Self = Self {
        lamp_send: false,
        lamp_listen: false,
        bridge_send: false,
        bridge_listen: true,
    };
    const GROUP: Self = Self {
        lamp_send: true,
        lamp_listen: false,
        bridge_send: true,
        bridge_listen: true,
    };

    /// True if the attribute can only live in bridge scope.
    pub fn bridge_only(&self) -> bool {
        !self.lamp_send && !self.lamp_listen
    }
}

impl Attribute {
    pub const RGB: [Attribute; 3] = [Attribute::ColR, Attribute::ColG, Attribute::ColB];

    pub fn classification(&self) -> Classification {
        use Attribute::*;
        match self {
            On | Reachable | Dhcp | Linkbutton | Portalservices | Errorstatus => {
                Classification::Bool
            }
            Bri | Sat | Zigbeechannel => Classification::Int8,
            Hue => Classification::Int16,
            Ct => Classification::ColorTemperature,
            ColR | ColG | ColB => Classification::Rgb,
            Xy | Swupdate | Portalstate | Whitelist => Classification::Structured,
            Scene => Classification::Group,
            Effect | Alert | Colormode | Type | Name | Modelid | Uniqueid | Manufacturername
            | Swversion | BridgeName | Mac | Ipaddress | Netmask | Gateway | Utc | Localtime
            | Timezone | BridgeSwversion | Apiversion | Portalconnection => Classification::Str,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        use Attribute::*;
        match self {
            On | Bri | Sat | Hue | Ct | Effect | Alert => Capabilities::LAMP,
            ColR | ColG | ColB => Capabilities::LAMP_SEND,
            Reachable | Xy | Colormode | Type | Name | Modelid | Uniqueid | Manufacturername
            | Swversion => Capabilities::LAMP_LISTEN,
            Scene => Capabilities::GROUP,
            BridgeName => Capabilities::BRIDGE,
            Zigbeechannel | Mac | Dhcp | Ipaddress | Netmask | Gateway | Utc | Localtime
            | Timezone | BridgeSwversion | Apiversion | Swupdate | Linkbutton | Portalservices
            | Portalconnection | Portalstate | Whitelist | Errorstatus => {
                Capabilities::BRIDGE_LISTEN
            }
        }
    }

    /// Maps a key of `GET /config` onto the bridge attribute it feeds.
    pub fn from_config_key(key: &str) -> Option<Self> {
        match key {
            "name" => Some(Attribute::BridgeName),
            "swversion" => Some(Attribute::BridgeSwversion),
            other => other
                .parse::<Attribute>()
                .ok()
                .filter(|attr| attr.capabilities().bridge_listen),
        }
    }

    /// The key this attribute uses in the body of `PUT /config`.
    pub fn config_key(&self) -> &str {
        match self {
            Attribute::BridgeName => "name",
            Attribute::BridgeSwversion => "swversion",
            other => other.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_wire_names() {
        assert_eq!(Attribute::BridgeSwversion.as_ref(), "bridge_swversion");
        assert_eq!(Attribute::Manufacturername.as_ref(), "manufacturername");
        assert_eq!(Attribute::from_str("UTC").unwrap(), Attribute::Utc);
        assert!(Attribute::from_str("transitiontime").is_err());
    }

    #[test]
    fn test_names_round_trip() {
        for attr in Attribute::iter() {
            assert_eq!(Attribute::from_str(attr.as_ref()).unwrap(), attr);
        }
    }

    #[test]
    fn test_every_attribute_has_a_direction() {
        for attr in Attribute::iter() {
            let caps = attr.capabilities();
            assert!(
                caps.lamp_send || caps.lamp_listen || caps.bridge_send || caps.bridge_listen,
                "{attr} is unreachable"
            );
        }
    }

    #[test]
    fn test_config_key_renames() {
        assert_eq!(Attribute::from_config_key("name"), Some(Attribute::BridgeName));
        assert_eq!(
            Attribute::from_config_key("swversion"),
            Some(Attribute::BridgeSwversion)
        );
        assert_eq!(Attribute::from_config_key("whitelist"), Some(Attribute::Whitelist));
        // lamp scoped names never leak into bridge scope
        assert_eq!(Attribute::from_config_key("bri"), None);
        assert_eq!(Attribute::BridgeName.config_key(), "name");
    }

    #[test]
    fn test_ranges() {
        assert_eq!(Attribute::Ct.classification().range(), Some((153, 500)));
        assert_eq!(Attribute::Hue.classification().range(), Some((0, 65535)));
        assert_eq!(Attribute::On.classification().range(), None);
    }
}
