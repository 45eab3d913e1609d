// Flog - platform/mod.rs
//
// Platform layer: configuration loading and filesystem helpers.
// Dependencies: core (config value types), directories crate.
// Must NOT depend on: app.

pub mod config;
pub mod fs;
