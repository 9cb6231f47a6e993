pub mod clock;
pub mod config;
pub mod display;
pub mod error;
pub mod pricing;
pub mod refresh;
pub mod server;
pub mod store;
pub mod telemetry;
