//! Bus route table viewer: data layer and configuration.
//!
//! The dashboard binary (`src/main.rs`) is a thin egui front-end over
//! [`data::filter::apply`]. Everything in this library is UI-agnostic.

pub mod config;
pub mod data;
