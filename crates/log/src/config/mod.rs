//! Configuration types
//!
//! - `base`: the top-level [`Config`] and [`Format`]
//! - `display`: what each formatted line shows
//! - `fields`: global fields attached to a root span
//! - `presets`: development / production / environment setups

mod base;
mod display;
mod fields;
mod presets;

pub use base::{Config, Format};
pub use display::DisplayConfig;
pub use fields::Fields;
