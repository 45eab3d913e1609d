// Flog - util/mod.rs
//
// Utility modules: error types, named constants, diagnostics setup, date
// patterns. No dependencies on core, app, or platform layers.

pub mod constants;
pub mod date;
pub mod error;
pub mod logging;
