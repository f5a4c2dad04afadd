//! Credential-injecting forwarding gateway.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → directive.rs   (read x-gateway-* control headers)
//!     → credentials.rs (explicit token, else secret mapping)
//!     → headers.rs     (strip control + sensitive headers)
//!     → auth.rs        (place credential in header or query)
//!     → dispatch.rs    (send to target host)
//!     → relay.rs       (buffered passthrough or event stream)
//!     → capture.rs     (4xx/5xx body copy for analytics)
//!     → Response
//! ```
//!
//! # Design Decisions
//! - Every failure before dispatch short-circuits with a 400; nothing is sent upstream
//! - Caller-supplied `authorization` is never forwarded
//! - The secret mapping is built once at startup and shared read-only

pub mod auth;
pub mod capture;
pub mod credentials;
pub mod directive;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod headers;
pub mod relay;

pub use credentials::SecretMap;
pub use directive::{AuthPlacement, GatewayDirective};
pub use dispatch::{Dispatcher, HttpDispatcher, OutboundRequest, UpstreamResponse};
pub use error::GatewayError;
pub use handler::Gateway;
pub use relay::RelayMode;
