//! Reservation service wrapper

use crate::transport::ApiTransport;
use async_trait::async_trait;
use shared::ClientResult;
use shared::models::Reservation;
use shared::request::{
    ConfirmReservationRequest, CreateReservationRequest, UpdateReservationRequest,
};

const BASE_PATH: &str = "/api/reservations";

/// Reservation service operations; all require the bearer token
#[async_trait]
pub trait ReservationApi: Send + Sync {
    async fn list(&self) -> ClientResult<Vec<Reservation>>;

    async fn list_for_user(&self, user_id: &str) -> ClientResult<Vec<Reservation>>;

    async fn get(&self, id: &str) -> ClientResult<Reservation>;

    async fn create(&self, request: &CreateReservationRequest) -> ClientResult<Reservation>;

    async fn update(
        &self,
        id: &str,
        request: &UpdateReservationRequest,
    ) -> ClientResult<Reservation>;

    async fn delete(&self, id: &str) -> ClientResult<()>;

    async fn confirm(
        &self,
        id: &str,
        request: &ConfirmReservationRequest,
    ) -> ClientResult<Reservation>;
}

pub struct HttpReservationApi {
    transport: ApiTransport,
}

impl HttpReservationApi {
    pub fn new(transport: ApiTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ReservationApi for HttpReservationApi {
    async fn list(&self) -> ClientResult<Vec<Reservation>> {
        self.transport.get(BASE_PATH).await
    }

    async fn list_for_user(&self, user_id: &str) -> ClientResult<Vec<Reservation>> {
        self.transport.get(&format!("{BASE_PATH}/user/{user_id}")).await
    }

    async fn get(&self, id: &str) -> ClientResult<Reservation> {
        self.transport.get(&format!("{BASE_PATH}/{id}")).await
    }

    async fn create(&self, request: &CreateReservationRequest) -> ClientResult<Reservation> {
        self.transport.post(BASE_PATH, request).await
    }

    async fn update(
        &self,
        id: &str,
        request: &UpdateReservationRequest,
    ) -> ClientResult<Reservation> {
        self.transport.put(&format!("{BASE_PATH}/{id}"), request).await
    }

    async fn delete(&self, id: &str) -> ClientResult<()> {
        self.transport.delete(&format!("{BASE_PATH}/{id}")).await
    }

    async fn confirm(
        &self,
        id: &str,
        request: &ConfirmReservationRequest,
    ) -> ClientResult<Reservation> {
        self.transport
            .post(&format!("{BASE_PATH}/{id}/confirm"), request)
            .await
    }
}
