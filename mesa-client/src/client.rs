//! Client factory
//!
//! Wires the data layer together: one session state shared by the three
//! transports, one query cache, one mutation coordinator. Constructed
//! explicitly at process start and passed around; there are no globals.

use crate::api::{
    HttpIdentityApi, HttpReservationApi, HttpSearchApi, IdentityApi, ReservationApi, SearchApi,
};
use crate::booking::BookingFlow;
use crate::cache::{self, QueryCache, QueryKey, QueryOptions, Subscription};
use crate::config::ClientConfig;
use crate::mutation::{MutationCoordinator, namespaces};
use crate::session::{FileSessionStorage, SessionState, SessionStorage, SessionStore};
use crate::transport::ApiTransport;
use shared::ClientResult;
use shared::models::Reservation;
use shared::request::SearchParams;
use std::sync::Arc;

pub struct MesaClient {
    config: ClientConfig,
    state: Arc<SessionState>,
    session: SessionStore,
    cache: QueryCache,
    coordinator: MutationCoordinator,
    reservations: Arc<dyn ReservationApi>,
    search: Arc<dyn SearchApi>,
}

impl MesaClient {
    /// Build a client persisting the session under `config.data_dir`
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let storage = Arc::new(FileSessionStorage::new(&config.data_dir));
        Self::with_storage(config, storage)
    }

    /// Build a client over explicit session storage
    pub fn with_storage(
        config: ClientConfig,
        storage: Arc<dyn SessionStorage>,
    ) -> ClientResult<Self> {
        let state = Arc::new(SessionState::new(storage));
        let timeout = config.request_timeout;

        let users_transport = ApiTransport::new(&config.users_api_url, timeout, state.clone())?;
        let reservations_transport =
            ApiTransport::new(&config.reservations_api_url, timeout, state.clone())?;
        let search_transport = ApiTransport::new(&config.search_api_url, timeout, state.clone())?;

        let identity: Arc<dyn IdentityApi> = Arc::new(HttpIdentityApi::new(users_transport));
        let reservations: Arc<dyn ReservationApi> =
            Arc::new(HttpReservationApi::new(reservations_transport));
        let search: Arc<dyn SearchApi> = Arc::new(HttpSearchApi::new(search_transport));

        let cache = QueryCache::new(config.stale_time);
        let coordinator = MutationCoordinator::new(
            reservations.clone(),
            search.clone(),
            cache.clone(),
            state.clone(),
        );
        let session = SessionStore::new(state.clone(), identity);

        Ok(Self {
            config,
            state,
            session,
            cache,
            coordinator,
            reservations,
            search,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn mutations(&self) -> &MutationCoordinator {
        &self.coordinator
    }

    pub fn search_api(&self) -> &Arc<dyn SearchApi> {
        &self.search
    }

    /// Fresh booking flow sharing this client's cache and session
    pub fn booking(&self) -> BookingFlow {
        BookingFlow::new(
            self.cache.clone(),
            self.coordinator.clone(),
            self.search.clone(),
            self.state.clone(),
            self.config.stale_time,
        )
    }

    // =========================================================================
    // Read subscriptions
    // =========================================================================

    /// Availability search subscription
    pub fn subscribe_search(&self, params: &SearchParams) -> Subscription {
        let key = QueryKey::new(namespaces::SEARCH, params.cache_segments());
        let search = Arc::clone(&self.search);
        let params = params.clone();
        let fetch = cache::fetcher(move || {
            let search = Arc::clone(&search);
            let params = params.clone();
            async move { search.search(&params).await }
        });
        self.cache.subscribe(key, fetch, QueryOptions::default())
    }

    /// All reservations (admin surface)
    pub fn subscribe_reservations(&self) -> Subscription {
        let key = QueryKey::new(namespaces::RESERVATIONS, ["all"]);
        let reservations = Arc::clone(&self.reservations);
        let fetch = cache::fetcher(move || {
            let reservations = Arc::clone(&reservations);
            async move { reservations.list().await }
        });
        self.cache.subscribe(key, fetch, QueryOptions::default())
    }

    /// Reservations for one user. Dependent query: while the user id is
    /// not resolved the subscription stays idle.
    pub fn subscribe_user_reservations(&self, user_id: Option<u64>) -> Subscription {
        let key = QueryKey::new(
            namespaces::RESERVATIONS,
            [
                "user".to_string(),
                user_id.map(|id| id.to_string()).unwrap_or_default(),
            ],
        );
        match user_id {
            Some(id) => {
                let reservations = Arc::clone(&self.reservations);
                let fetch = cache::fetcher(move || {
                    let reservations = Arc::clone(&reservations);
                    let id = id.to_string();
                    async move { reservations.list_for_user(&id).await }
                });
                self.cache.subscribe(key, fetch, QueryOptions::default())
            }
            None => {
                let fetch = cache::fetcher(|| async {
                    Err::<Vec<Reservation>, _>(shared::ClientError::Validation(
                        "user id not resolved".into(),
                    ))
                });
                self.cache.subscribe(key, fetch, QueryOptions::disabled())
            }
        }
    }

    /// Single reservation detail. Dependent query on the id being known.
    pub fn subscribe_reservation(&self, id: Option<&str>) -> Subscription {
        let key = QueryKey::new(
            namespaces::RESERVATION,
            [id.unwrap_or_default().to_string()],
        );
        match id {
            Some(id) => {
                let reservations = Arc::clone(&self.reservations);
                let id = id.to_string();
                let fetch = cache::fetcher(move || {
                    let reservations = Arc::clone(&reservations);
                    let id = id.clone();
                    async move { reservations.get(&id).await }
                });
                self.cache.subscribe(key, fetch, QueryOptions::default())
            }
            None => {
                let fetch = cache::fetcher(|| async {
                    Err::<Reservation, _>(shared::ClientError::Validation(
                        "reservation id not resolved".into(),
                    ))
                });
                self.cache.subscribe(key, fetch, QueryOptions::disabled())
            }
        }
    }
}
