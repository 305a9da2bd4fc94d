//! Utilities shared across modules.

pub mod scaling;

pub use scaling::{atoms_to_ui_amount, parse_ui_amount, scale_ui_amount, usd_to_scaled, ScalingError};
