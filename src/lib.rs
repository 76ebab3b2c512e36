//! Estate Gateway - session-gated front end for the estate planning service
//!
//! This crate provides the HTTP gateway that sits between browsers and the
//! estate planning backend: sign-in through an external identity provider, a
//! session gate for protected pages, per-route authorizing proxy handlers,
//! server-rendered dashboard pages, and the document vault encryption helper.

pub mod api;
pub mod config;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod pages;
pub mod policy;
pub mod server;
pub mod session;
pub mod state;
pub mod telemetry;
pub mod upstream;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
