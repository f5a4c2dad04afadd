//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace span, concurrency limit)
//!     → gateway::Gateway::handle
//!     → Send to client
//! ```

pub mod server;

pub use server::{AppState, HttpServer};
