//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → SecretMap → HttpDispatcher → analytics store → Gateway → HttpServer
//!
//! Shutdown (shutdown.rs):
//!     Trigger → server stops accepting and drains, retention job exits
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{build, Components, StartupError};
