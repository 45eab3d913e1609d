// Flog - app/mod.rs
//
// Application layer: the file registry, archival, dispatch and the public
// `Logger` facade.
// Dependencies: core, platform.

pub mod archive;
pub mod dispatch;
pub mod logger;
pub mod registry;
