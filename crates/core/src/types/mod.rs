//! Core types for Buen Sabor.
//!
//! Wire-compatible representations of the backend's entities plus
//! type-safe wrappers for the values we validate ourselves.

pub mod email;
pub mod employee;
pub mod id;
pub mod role;
pub mod user;

pub use email::{Email, EmailError};
pub use employee::{Employee, Image};
pub use id::*;
pub use role::{Role, RoleParseError};
pub use user::{AccountDraft, User};
