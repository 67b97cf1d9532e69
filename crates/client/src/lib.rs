//! Caller-facing upload API.
//!
//! Takes the camelCase request payloads of `tusbridge-protocol`, drives the
//! coordinator in `tusbridge-transfer` and reports failures as
//! `{code, message}` rejections for the host bridge.

mod client;
pub mod config;
mod error;

pub use client::TusClient;
pub use config::{ClientConfig, config_path};
pub use error::ClientError;
