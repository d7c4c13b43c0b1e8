//! Identity service wrapper

use crate::transport::ApiTransport;
use async_trait::async_trait;
use shared::ClientResult;
use shared::models::UserInfo;
use shared::request::{LoginRequest, RegisterRequest};
use shared::response::{LoginResponse, RawLoginResponse, RegisterResponse};

/// Identity service operations
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Exchange credentials for a token and identity
    async fn login(&self, request: &LoginRequest) -> ClientResult<LoginResponse>;

    /// Create an account; does not establish a session
    async fn register(&self, request: &RegisterRequest) -> ClientResult<UserInfo>;

    /// Look up a user by id
    async fn get_user(&self, id: u64) -> ClientResult<UserInfo>;
}

pub struct HttpIdentityApi {
    transport: ApiTransport,
}

impl HttpIdentityApi {
    pub fn new(transport: ApiTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl IdentityApi for HttpIdentityApi {
    async fn login(&self, request: &LoginRequest) -> ClientResult<LoginResponse> {
        let raw: RawLoginResponse = self.transport.post("/api/users/login", request).await?;
        raw.normalize()
    }

    async fn register(&self, request: &RegisterRequest) -> ClientResult<UserInfo> {
        let response: RegisterResponse =
            self.transport.post("/api/users/register", request).await?;
        Ok(response.user)
    }

    async fn get_user(&self, id: u64) -> ClientResult<UserInfo> {
        self.transport.get(&format!("/api/users/{id}")).await
    }
}
