//! Response DTOs and the canonicalization layer
//!
//! The upstream services have shipped several shapes for the same
//! conceptual fields (token nested under `tokens` or not, Go-exported
//! casing on search pages). Each shape is adapted here, once, at decode
//! time; consumers only ever see the canonical snake_case types.

use crate::error::{ClientError, ClientResult};
use crate::models::UserInfo;
use serde::{Deserialize, Serialize};

// =============================================================================
// Identity service
// =============================================================================

/// Canonical login response: one token, one identity
#[derive(Debug, Clone, PartialEq)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Default, Deserialize)]
struct TokenEnvelope {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

/// Login payload as the identity service actually sends it. Older
/// revisions put the token at the top level under either name; current
/// ones nest it in a `tokens` envelope.
#[derive(Debug, Default, Deserialize)]
pub struct RawLoginResponse {
    #[serde(default)]
    tokens: Option<TokenEnvelope>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<UserInfo>,
}

impl RawLoginResponse {
    /// Normalize into the canonical shape. A payload without both a token
    /// and an identity violates the contract.
    pub fn normalize(self) -> ClientResult<LoginResponse> {
        let token = self
            .tokens
            .and_then(|t| t.access_token.or(t.token))
            .or(self.token)
            .or(self.access_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ClientError::Protocol("login response missing token".into()))?;
        let user = self
            .user
            .ok_or_else(|| ClientError::Protocol("login response missing user".into()))?;
        Ok(LoginResponse { token, user })
    }
}

/// Registration response wraps the created identity
#[derive(Debug, Deserialize)]
pub struct RegisterResponse {
    pub user: UserInfo,
}

// =============================================================================
// Search service
// =============================================================================

/// One page of search results with pagination metadata. Accepts both the
/// snake_case casing and the Go-exported one (`Results`, `Pages`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage<T> {
    #[serde(alias = "Results")]
    pub results: Vec<T>,
    #[serde(default, alias = "Total")]
    pub total: u64,
    #[serde(default, alias = "Page")]
    pub page: u32,
    #[serde(default, alias = "Size")]
    pub size: u32,
    #[serde(default, alias = "Pages", alias = "totalPages")]
    pub total_pages: u32,
}

impl<T> SearchPage<T> {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Index statistics passthrough; the shape varies with the search backend
/// so fields are kept as a raw map
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchStats {
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}
