//! Business logic between route handlers and the restaurant API.
//!
//! Services are generic over [`crate::api::Backend`] so they run against
//! in-memory fakes in tests.

pub mod bootstrap;
pub mod guard;
pub mod in_flight;
pub mod users;

pub use bootstrap::{BootstrapOutcome, bootstrap};
pub use guard::{GuardAction, GuardState};
pub use in_flight::{InFlight, InFlightGuard};
pub use users::{SaveError, SaveOutcome, SaveStage};
