pub mod config;
pub mod logging;
pub mod runner;
pub mod version;

pub mod alerting;
pub mod notifications;
pub mod service_monitor;
