//! Transition times for lamp state changes.

use serde::{Deserialize, Serialize};

/// Transition time in tenths of a second, the unit of the `transitiontime`
/// wire field.
#[derive(Default, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TransitionTime {
    pub(crate) tenths: u16,
}

impl TransitionTime {
    pub fn new() -> Self {
        TransitionTime { tenths: 0 }
    }

    pub fn tenths(&self) -> u16 {
        self.tenths
    }

    /// Returns None for negative, non-finite or too long durations.
    ///
    /// ```
    /// use hue_items_rs::TransitionTime;
    ///
    /// assert_eq!(TransitionTime::from_seconds(0.4).unwrap().tenths(), 4);
    /// assert_eq!(TransitionTime::from_seconds(1.25).unwrap().tenths(), 12);
    /// assert!(TransitionTime::from_seconds(-1.0).is_none());
    /// ```
    pub fn from_seconds(seconds: f64) -> Option<Self> {
        let tenths = (seconds * 10.0).trunc();
        if tenths.is_finite() && (0.0..=f64::from(u16::MAX)).contains(&tenths) {
            Some(TransitionTime {
                tenths: tenths as u16,
            })
        } else {
            None
        }
    }

    /// Returns `fallback` if the duration is invalid.
    pub fn from_seconds_or(seconds: f64, fallback: Self) -> Self {
        Self::from_seconds(seconds).unwrap_or(fallback)
    }
}
