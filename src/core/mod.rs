// Flog - core/mod.rs
//
// Core layer: data model, line rendering and file naming.
// Pure functions only; no file I/O and no threads.
// Must NOT depend on: app or platform.

pub mod format;
pub mod model;
pub mod naming;
