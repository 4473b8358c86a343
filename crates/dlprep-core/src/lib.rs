pub mod config;
pub mod error;
pub mod layout;
pub mod logging;
pub mod manifest;
