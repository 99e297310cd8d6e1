//! Glue between the command line and the pbval workflows.
//!
//! Cache location, instrument list resolution and progress display.

pub(crate) mod cache_manager;
pub(crate) mod input;
pub(crate) mod progress;
