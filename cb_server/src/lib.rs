//! # cb_server
//!
//! HTTP server for the courtbook reservation platform: the axum API
//! surface, configuration, logging, metrics, and the periodic sweeper
//! task, wired around the `courtbook` domain core.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod sweep;
