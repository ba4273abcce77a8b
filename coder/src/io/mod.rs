//! I/O helpers: filesystem store, processes, configuration and the model backend.

pub mod config;
pub mod model;
pub mod process;
pub mod prompt;
pub mod store;
