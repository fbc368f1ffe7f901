//! Session-stored models for admin.

pub mod flash;
pub mod session;

pub use flash::{Flash, FlashKind};
pub use session::{CurrentUser, keys as session_keys};
