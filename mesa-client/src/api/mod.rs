//! Typed wrappers over the three collaborator services
//!
//! Each service is reached through a trait so tests can substitute
//! in-process fakes for the HTTP implementations.

mod reservations;
mod search;
mod users;

pub use reservations::{HttpReservationApi, ReservationApi};
pub use search::{HttpSearchApi, SearchApi};
pub use users::{HttpIdentityApi, IdentityApi};
