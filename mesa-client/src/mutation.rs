//! Mutation coordinator
//!
//! Executes writes and, only after a write succeeds, invalidates the cache
//! namespaces it may have affected. A failed mutation never touches the
//! cache, so transient failures do not force the read side to refetch.

use crate::api::{ReservationApi, SearchApi};
use crate::cache::QueryCache;
use crate::session::SessionState;
use shared::models::Reservation;
use shared::request::{
    ConfirmReservationRequest, CreateReservationRequest, UpdateReservationRequest,
};
use shared::{ClientError, ClientResult};
use std::sync::Arc;

/// Cache namespaces used by the read side
pub mod namespaces {
    /// Availability searches
    pub const SEARCH: &str = "search";
    /// Reservation lists (global and per-user)
    pub const RESERVATIONS: &str = "reservations";
    /// Single-reservation detail lookups
    pub const RESERVATION: &str = "reservation";
}

/// Kinds of write this coordinator knows how to execute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    CreateReservation,
    UpdateReservation,
    DeleteReservation,
    ConfirmReservation,
    Reindex,
}

impl MutationKind {
    /// Static invalidation edges: the namespaces a successful write of
    /// this kind may have affected
    pub fn invalidates(&self) -> &'static [&'static str] {
        match self {
            Self::CreateReservation
            | Self::UpdateReservation
            | Self::DeleteReservation
            | Self::ConfirmReservation => &[
                namespaces::RESERVATIONS,
                namespaces::RESERVATION,
                namespaces::SEARCH,
            ],
            Self::Reindex => &[namespaces::SEARCH],
        }
    }
}

#[derive(Clone)]
pub struct MutationCoordinator {
    reservations: Arc<dyn ReservationApi>,
    search: Arc<dyn SearchApi>,
    cache: QueryCache,
    session: Arc<SessionState>,
}

impl MutationCoordinator {
    pub fn new(
        reservations: Arc<dyn ReservationApi>,
        search: Arc<dyn SearchApi>,
        cache: QueryCache,
        session: Arc<SessionState>,
    ) -> Self {
        Self {
            reservations,
            search,
            cache,
            session,
        }
    }

    pub async fn create_reservation(
        &self,
        request: &CreateReservationRequest,
    ) -> ClientResult<Reservation> {
        let result = self.reservations.create(request).await;
        self.finish(MutationKind::CreateReservation, result)
    }

    pub async fn update_reservation(
        &self,
        id: &str,
        request: &UpdateReservationRequest,
    ) -> ClientResult<Reservation> {
        let result = self.reservations.update(id, request).await;
        self.finish(MutationKind::UpdateReservation, result)
    }

    pub async fn delete_reservation(&self, id: &str) -> ClientResult<()> {
        let result = self.reservations.delete(id).await;
        self.finish(MutationKind::DeleteReservation, result)
    }

    /// Confirm a pending reservation. The requester must own it or hold
    /// the admin role; that is checked here, before any request is sent,
    /// on top of whatever the server enforces.
    pub async fn confirm_reservation(
        &self,
        reservation: &Reservation,
        request: &ConfirmReservationRequest,
    ) -> ClientResult<Reservation> {
        let session = self
            .session
            .current()
            .ok_or_else(|| ClientError::Authorization("login required".into()))?;
        let requester = &session.identity;
        if !requester.is_admin() && reservation.owner_id != requester.id.to_string() {
            return Err(ClientError::Authorization(
                "only the owner or an administrator may confirm a reservation".into(),
            ));
        }
        if !reservation.is_confirmable() {
            return Err(ClientError::Conflict(format!(
                "reservation {} is not pending",
                reservation.id
            )));
        }

        let result = self.reservations.confirm(&reservation.id, request).await;
        self.finish(MutationKind::ConfirmReservation, result)
    }

    pub async fn reindex(&self) -> ClientResult<()> {
        let result = self.search.reindex().await;
        self.finish(MutationKind::Reindex, result)
    }

    /// Shared success path: invalidate the mapped namespaces, then hand
    /// the result back. Failures pass through untouched.
    fn finish<T>(&self, kind: MutationKind, result: ClientResult<T>) -> ClientResult<T> {
        match result {
            Ok(value) => {
                for namespace in kind.invalidates() {
                    self.cache.invalidate(namespace);
                }
                tracing::debug!(?kind, "mutation succeeded, namespaces invalidated");
                Ok(value)
            }
            Err(err) => {
                tracing::debug!(?kind, error = %err, "mutation failed, cache untouched");
                Err(err)
            }
        }
    }
}
