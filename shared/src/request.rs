//! Request DTOs for the three collaborator services

use crate::models::MealType;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Identity service
// =============================================================================

/// Login request; the identifier may be a username or an email
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

/// Registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl RegisterRequest {
    /// Identifier used for the implicit login after registration
    pub fn login_identifier(&self) -> &str {
        if self.email.is_empty() {
            &self.username
        } else {
            &self.email
        }
    }
}

// =============================================================================
// Reservation service
// =============================================================================

/// Create reservation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReservationRequest {
    pub owner_id: String,
    pub table_number: u32,
    pub guests: u32,
    pub date_time: DateTime<Utc>,
    pub meal_type: MealType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
}

/// Update reservation payload; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateReservationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guests: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meal_type: Option<MealType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
}

/// Confirm reservation payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfirmReservationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_notes: Option<String>,
}

// =============================================================================
// Search service
// =============================================================================

/// Availability search parameters. Only set fields are sent; the service
/// applies its own defaults for the rest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchParams {
    pub q: Option<String>,
    pub date: Option<NaiveDate>,
    pub meal_type: Option<MealType>,
    pub capacity: Option<u32>,
    pub is_available: Option<bool>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl SearchParams {
    /// Availability lookup for one date and meal service
    pub fn availability(date: NaiveDate, meal_type: MealType) -> Self {
        Self {
            date: Some(date),
            meal_type: Some(meal_type),
            is_available: Some(true),
            ..Self::default()
        }
    }

    /// Query-string pairs, skipping unset fields
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(q) = &self.q {
            if !q.is_empty() {
                query.push(("q", q.clone()));
            }
        }
        if let Some(date) = self.date {
            query.push(("date", date.to_string()));
        }
        if let Some(meal_type) = self.meal_type {
            query.push(("meal_type", meal_type.to_string()));
        }
        if let Some(capacity) = self.capacity {
            query.push(("capacity", capacity.to_string()));
        }
        if let Some(available) = self.is_available {
            query.push(("is_available", available.to_string()));
        }
        if let Some(page) = self.page {
            query.push(("page", page.to_string()));
        }
        if let Some(size) = self.size {
            query.push(("size", size.to_string()));
        }
        query
    }

    /// Stable representation used inside query keys
    pub fn cache_segments(&self) -> Vec<String> {
        self.to_query()
            .into_iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect()
    }
}
