use crate::types::Attribute;

/// All error types that can occur while reconciling items with Hue bridges.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to serialize data to JSON.
    #[error("failed to dump json: {0:?}")]
    JsonDump(serde_json::Error),

    /// Failed to deserialize JSON data.
    #[error("failed to load json: {0:?}")]
    JsonLoad(serde_json::Error),

    /// The HTTP call to a bridge did not complete (refused, timed out, ...).
    #[error("bridge {bridge} transport error: {reason}")]
    Transport { bridge: usize, reason: String },

    /// The bridge answered with a status other than 200.
    #[error("bridge {bridge} answered with http status {status}")]
    HttpStatus { bridge: usize, status: u16 },

    /// The bridge answered 200 but the body only carried error objects.
    #[error("bridge {bridge} error type {kind}: {description}")]
    Bridge {
        bridge: usize,
        kind: u64,
        description: String,
    },

    /// A bridge index was referenced that was never configured.
    #[error("bridge {0} is not configured")]
    UnknownBridge(usize),

    /// A send or listen binding already exists for this key.
    #[error("duplicate {direction} binding for {key}")]
    DuplicateBinding { direction: &'static str, key: String },

    /// A lamp scoped attribute was configured without `hue_lamp`.
    #[error("item {item} binds lamp attribute {attribute} but has no lamp id")]
    MissingLampId { item: String, attribute: Attribute },

    /// A value could not be coerced into the attribute's classification.
    #[error("cannot coerce {value} for attribute {attribute}")]
    Coercion { attribute: Attribute, value: String },

    /// Invalid plugin or item configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Create a new transport error
    pub fn transport(bridge: usize, reason: impl ToString) -> Self {
        Error::Transport {
            bridge,
            reason: reason.to_string(),
        }
    }

    /// Create a new coercion error
    pub fn coercion(attribute: Attribute, value: impl ToString) -> Self {
        Error::Coercion {
            attribute,
            value: value.to_string(),
        }
    }

    /// Create a new duplicate binding error
    pub fn duplicate(direction: &'static str, key: impl ToString) -> Self {
        Error::DuplicateBinding {
            direction,
            key: key.to_string(),
        }
    }

    /// True when the bridge rejected the configured user token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Bridge { kind: 1, .. })
    }
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
