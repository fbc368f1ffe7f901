//! Buen Sabor Core - Shared domain library.
//!
//! This crate provides the types and pure logic used by the admin panel:
//! - `types` - Roles, users, employees, type-safe IDs and email addresses
//! - `password` - Account password policy
//! - `navigation` - Role-to-route sidebar table
//! - `wizard` - The user + employee creation wizard state machine
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no session handling. Everything here can be tested without a
//! runtime.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod navigation;
pub mod password;
pub mod types;
pub mod wizard;

pub use types::*;
