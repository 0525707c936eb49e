//! Subtext Gateway - HTTP surface for the analysis pipeline
//!
//! ```text
//!    ┌──────────┐     ┌─────────────────────┐     ┌──────────────┐
//!    │  Client  │────▶│  POST /analyze/text │────▶│   Pipeline   │
//!    └──────────┘     │  GET  /health       │     │  (engine)    │
//!                     │  GET  /status       │     └──────────────┘
//!                     └─────────────────────┘
//! ```
//!
//! The gateway owns transport concerns only: routing, CORS, request
//! correlation ids, and the mapping from typed pipeline failures to HTTP
//! statuses. Analysis semantics live in `subtext-engine`; safety policy in
//! `subtext-core`. Nothing here stores request or result data.

pub mod config;
pub mod error;
pub mod gateway;

pub use config::GatewayConfig;
pub use error::{ApiFailure, GatewayError};
pub use gateway::{Gateway, GatewayState};

/// Default bind host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default bind port
pub const DEFAULT_PORT: u16 = 8787;
