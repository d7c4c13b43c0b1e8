//! Reservation booking flow
//!
//! Drives a draft from criteria selection through availability lookup to
//! submission. Two invariants are guarded here: the guest count never
//! exceeds the selected table's capacity (edits above it are rejected, not
//! clamped), and changing the date or meal type always clears the
//! selected table, since the availability set it was picked from no
//! longer applies.

use crate::api::SearchApi;
use crate::cache::{self, QueryCache, QueryKey, QueryOptions, QueryStatus, Subscription};
use crate::mutation::{MutationCoordinator, namespaces};
use crate::session::SessionState;
use chrono::{NaiveDate, NaiveTime};
use shared::models::{MAX_GUESTS, MealType, Reservation, TableAvailability, TableRef};
use shared::request::{CreateReservationRequest, SearchParams};
use shared::{ClientError, ClientResult};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingState {
    /// Date or meal type still missing
    SelectingCriteria,
    /// Criteria set; availability query enabled
    LoadingAvailability,
    /// Availability present (possibly empty); waiting for a table pick
    SelectingTable,
    /// Table picked and guest count valid
    ReadyToSubmit,
    Submitting,
    /// Terminal for this draft
    Submitted,
    SubmitFailed,
}

/// Working state of one booking attempt
#[derive(Debug, Clone, Default)]
pub struct ReservationDraft {
    pub date: Option<NaiveDate>,
    pub meal_type: Option<MealType>,
    pub selected_table: Option<TableRef>,
    pub guest_count: Option<u32>,
    pub special_requests: Option<String>,
}

pub struct BookingFlow {
    cache: QueryCache,
    coordinator: MutationCoordinator,
    search: Arc<dyn SearchApi>,
    session: Arc<SessionState>,
    stale_time: Duration,
    state: BookingState,
    draft: ReservationDraft,
    availability: Option<Subscription>,
}

impl BookingFlow {
    pub fn new(
        cache: QueryCache,
        coordinator: MutationCoordinator,
        search: Arc<dyn SearchApi>,
        session: Arc<SessionState>,
        stale_time: Duration,
    ) -> Self {
        Self {
            cache,
            coordinator,
            search,
            session,
            stale_time,
            state: BookingState::SelectingCriteria,
            draft: ReservationDraft::default(),
            availability: None,
        }
    }

    pub fn state(&self) -> BookingState {
        self.state
    }

    pub fn draft(&self) -> &ReservationDraft {
        &self.draft
    }

    // =========================================================================
    // Criteria
    // =========================================================================

    pub fn set_date(&mut self, date: NaiveDate) {
        if self.draft.date != Some(date) {
            self.draft.date = Some(date);
            self.reset_selection();
        }
    }

    pub fn set_meal_type(&mut self, meal_type: MealType) {
        if self.draft.meal_type != Some(meal_type) {
            self.draft.meal_type = Some(meal_type);
            self.reset_selection();
        }
    }

    pub fn set_special_requests(&mut self, notes: impl Into<String>) {
        let notes = notes.into();
        self.draft.special_requests = if notes.is_empty() { None } else { Some(notes) };
    }

    /// Any criteria change re-enters `SelectingCriteria` and clears the
    /// selection in the same transition
    fn reset_selection(&mut self) {
        self.draft.selected_table = None;
        self.draft.guest_count = None;
        self.availability = None;
        self.state = BookingState::SelectingCriteria;
    }

    // =========================================================================
    // Availability
    // =========================================================================

    /// Run the dependent availability query. Requires both criteria; a
    /// `stale_time`-fresh cached result is served without a network call.
    pub async fn load_availability(&mut self) -> ClientResult<Vec<TableAvailability>> {
        let (date, meal_type) = match (self.draft.date, self.draft.meal_type) {
            (Some(date), Some(meal_type)) => (date, meal_type),
            _ => {
                return Err(ClientError::Validation(
                    "date and meal type are required before loading availability".into(),
                ));
            }
        };

        self.state = BookingState::LoadingAvailability;
        let params = SearchParams::availability(date, meal_type);
        let key = QueryKey::new(namespaces::SEARCH, params.cache_segments());
        let search = Arc::clone(&self.search);
        let fetch = cache::fetcher(move || {
            let search = Arc::clone(&search);
            let params = params.clone();
            async move { search.search(&params).await }
        });

        let mut subscription = self.cache.subscribe(
            key,
            fetch,
            QueryOptions::stale_time(self.stale_time),
        );
        let snapshot = subscription.settled().await;
        self.availability = Some(subscription);

        match snapshot.status {
            QueryStatus::Success => {
                let page: Option<shared::response::SearchPage<TableAvailability>> =
                    snapshot.decode()?;
                let tables = page.map(|p| p.results).unwrap_or_default();
                self.state = BookingState::SelectingTable;
                Ok(tables)
            }
            _ => Err(snapshot.error.unwrap_or_else(|| {
                ClientError::Protocol("availability query settled without a result".into())
            })),
        }
    }

    /// Latest availability the flow has observed, without fetching
    pub fn availability(&self) -> Vec<TableAvailability> {
        self.availability
            .as_ref()
            .and_then(|sub| {
                sub.data::<shared::response::SearchPage<TableAvailability>>()
                    .ok()
                    .flatten()
            })
            .map(|page| page.results)
            .unwrap_or_default()
    }

    // =========================================================================
    // Table selection and guest count
    // =========================================================================

    /// Pick a table; the guest count defaults to its capacity
    pub fn select_table(&mut self, table: &TableAvailability) -> ClientResult<()> {
        match self.state {
            BookingState::SelectingTable
            | BookingState::ReadyToSubmit
            | BookingState::SubmitFailed => {}
            _ => {
                return Err(ClientError::Validation(
                    "availability must be loaded before selecting a table".into(),
                ));
            }
        }
        if !table.is_available {
            return Err(ClientError::Conflict(format!(
                "table {} is not available",
                table.table_number
            )));
        }

        self.draft.selected_table = Some(TableRef::from(table));
        self.draft.guest_count = Some(table.capacity.min(MAX_GUESTS));
        self.state = BookingState::ReadyToSubmit;
        Ok(())
    }

    /// Edit the guest count. Values above the table's capacity (or the
    /// service-wide maximum) are rejected and the prior value is kept.
    pub fn set_guest_count(&mut self, guests: u32) -> ClientResult<()> {
        let table = self.draft.selected_table.as_ref().ok_or_else(|| {
            ClientError::Validation("select a table before setting the guest count".into())
        })?;
        let limit = table.capacity.min(MAX_GUESTS);
        if guests == 0 || guests > limit {
            return Err(ClientError::Validation(format!(
                "guests must be between 1 and {limit} for table {}",
                table.table_number
            )));
        }
        self.draft.guest_count = Some(guests);
        Ok(())
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Submit the draft. A second call while a submit is in flight is a
    /// no-op. A `ConflictError` means the table was taken between load and
    /// submit; the flow returns to `LoadingAvailability` and forces the
    /// availability namespace to refetch instead of retrying blindly.
    pub async fn submit(&mut self) -> ClientResult<Option<Reservation>> {
        match self.state {
            BookingState::Submitting => return Ok(None),
            BookingState::ReadyToSubmit | BookingState::SubmitFailed => {}
            _ => {
                return Err(ClientError::Validation(
                    "draft is not ready to submit".into(),
                ));
            }
        }

        let (date, meal_type, table, guests) = match (
            self.draft.date,
            self.draft.meal_type,
            self.draft.selected_table,
            self.draft.guest_count,
        ) {
            (Some(date), Some(meal_type), Some(table), Some(guests)) => {
                (date, meal_type, table, guests)
            }
            _ => {
                return Err(ClientError::Validation("incomplete draft".into()));
            }
        };

        let session = self
            .session
            .current()
            .ok_or_else(|| ClientError::Authorization("login required to book a table".into()))?;

        let seating = NaiveTime::from_hms_opt(meal_type.default_hour(), 0, 0).unwrap_or_default();
        let request = CreateReservationRequest {
            owner_id: session.identity.id.to_string(),
            table_number: table.table_number,
            guests,
            date_time: date.and_time(seating).and_utc(),
            meal_type,
            special_requests: self.draft.special_requests.clone(),
        };

        self.state = BookingState::Submitting;
        match self.coordinator.create_reservation(&request).await {
            Ok(reservation) => {
                tracing::info!(id = %reservation.id, table = table.table_number, "reservation created");
                self.state = BookingState::Submitted;
                self.draft = ReservationDraft::default();
                self.availability = None;
                Ok(Some(reservation))
            }
            Err(ClientError::Conflict(detail)) => {
                // The cached availability is now known stale; drop the
                // selection and make the read side refetch before this
                // table can be offered again.
                tracing::warn!(table = table.table_number, detail = %detail,
                    "table taken concurrently, reloading availability");
                self.draft.selected_table = None;
                self.draft.guest_count = None;
                self.state = BookingState::LoadingAvailability;
                self.cache.invalidate(namespaces::SEARCH);
                Err(ClientError::Conflict(detail))
            }
            Err(err) => {
                self.state = BookingState::SubmitFailed;
                Err(err)
            }
        }
    }
}
