pub mod app;
pub mod config;
pub mod exporter;
pub mod logging;
pub mod provisioning;
pub mod server;
pub mod state;
