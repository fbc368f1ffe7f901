//! HTTP middleware stack for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers
//! 5. Session layer (tower-sessions, in-memory store)
//! 6. Role gate (per route group)

pub mod auth;
pub mod request_id;
pub mod role_gate;
pub mod security_headers;
pub mod session;

pub use auth::{
    Authenticated, RoleChecked, SessionContext, clear_authentication, push_flash,
    set_authentication, take_flashes,
};
pub use request_id::request_id_middleware;
pub use role_gate::{RoleGate, role_gate};
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
