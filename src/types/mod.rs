//! Value types for attributes, item values and lamp parameters.

mod attribute;
mod color;
mod transition;
mod value;

pub use attribute::{Attribute, Capabilities, Classification};
pub use color::{ColorConverter, Rgb, WideGamut};
pub use transition::TransitionTime;
pub use value::ItemValue;
