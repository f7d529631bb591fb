//! HTTP API: the upload endpoint that runs the pipeline, output table serving and health.

pub mod app;
pub mod config;

pub use config::ApiConfig;
