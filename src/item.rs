//! The host item seam.

use std::sync::Arc;

use crate::types::ItemValue;

/// Caller tag of every write the plugin makes; the write path ignores
/// changes carrying it.
pub const PLUGIN_ORIGIN: &str = "HUE";

/// Caller tag used when a dimmer controller stops a fade.
pub const FADE_ORIGIN: &str = "HUE_FADE";

/// An item of the host's automation tree.
///
/// The host owns items; bindings keep `Arc`s as back-references. All calls
/// are synchronous and must not block: the plugin holds its state locks
/// while writing back.
pub trait Item: Send + Sync {
    /// Path or name of the item, used in log messages.
    fn id(&self) -> &str;

    /// Current value.
    fn value(&self) -> ItemValue;

    /// Writes `value`. The host dispatches change notifications tagged with
    /// `caller`.
    fn set(&self, value: ItemValue, caller: &str);

    /// True while a host driven fade on this item is in progress.
    fn fading(&self) -> bool;

    /// Fades the item towards `dest` in steps of `step` every `delta` seconds.
    fn fade(&self, dest: f64, step: f64, delta: f64);

    /// The parent item in the host tree, if any.
    fn parent(&self) -> Option<Arc<dyn Item>> {
        None
    }
}
