//! EasyDeploy telemetry client
//!
//! Subscribes to the EasyDeploy backend's server-push endpoints (container
//! logs, application logs, dashboard metrics), keeps a bounded de-duplicated
//! view of what arrives, and reconnects on failure.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod logging;
pub mod stream;
pub mod view;
