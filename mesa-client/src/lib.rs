//! Mesa client data layer
//!
//! Session lifecycle, stale-aware query cache and mutation coordination
//! for the restaurant reservation services. Rendering, routing and form
//! handling live elsewhere; this crate owns the state worth getting
//! right: who is logged in, what reads are cached and when they go stale,
//! and how a booking draft survives the double-booking race.

pub mod api;
pub mod booking;
pub mod cache;
pub mod client;
pub mod config;
pub mod mutation;
pub mod session;
pub mod transport;

// Re-exports
pub use booking::{BookingFlow, BookingState, ReservationDraft};
pub use cache::{QueryCache, QueryKey, QueryOptions, QueryStatus, Subscription};
pub use client::MesaClient;
pub use config::ClientConfig;
pub use mutation::{MutationCoordinator, MutationKind};
pub use session::{RegisterError, Session, SessionStore};
pub use shared::{ClientError, ClientResult, ErrorKind};
