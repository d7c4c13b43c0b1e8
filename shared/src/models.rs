//! Domain models for the reservation client

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound on party size enforced by the reservation service
pub const MAX_GUESTS: u32 = 20;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// User identity record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: Role,
}

impl UserInfo {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Preferred presentation name: first name, falling back to username
    pub fn display_name(&self) -> &str {
        if self.first_name.is_empty() {
            &self.username
        } else {
            &self.first_name
        }
    }
}

/// Meal service a table belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Event,
}

impl MealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Event => "event",
        }
    }

    /// Default seating hour used when a draft only carries a date
    pub fn default_hour(&self) -> u32 {
        match self {
            Self::Breakfast => 9,
            Self::Lunch => 13,
            Self::Dinner => 20,
            Self::Event => 21,
        }
    }
}

impl std::fmt::Display for MealType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reservation lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

/// Reservation entity as returned by the reservation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    pub owner_id: String,
    pub table_number: u32,
    pub guests: u32,
    pub date_time: DateTime<Utc>,
    pub meal_type: MealType,
    pub status: ReservationStatus,
    #[serde(default)]
    pub total_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Only pending reservations may be confirmed
    pub fn is_confirmable(&self) -> bool {
        self.status == ReservationStatus::Pending
    }
}

/// A table's availability for one date and meal type, as indexed by the
/// search service. The `id` format is `table-{meal_type}-{n}-{date}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableAvailability {
    pub id: String,
    pub table_number: u32,
    pub capacity: u32,
    pub meal_type: MealType,
    pub date: NaiveDate,
    pub is_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<String>,
}

/// Lightweight handle on a selected table, enough to hold the capacity
/// invariant on a booking draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    pub table_number: u32,
    pub capacity: u32,
}

impl From<&TableAvailability> for TableRef {
    fn from(table: &TableAvailability) -> Self {
        Self {
            table_number: table.table_number,
            capacity: table.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meal_type_round_trips_lowercase() {
        let json = serde_json::to_string(&MealType::Dinner).unwrap();
        assert_eq!(json, "\"dinner\"");
        let back: MealType = serde_json::from_str("\"breakfast\"").unwrap();
        assert_eq!(back, MealType::Breakfast);
    }

    #[test]
    fn table_availability_decodes_service_shape() {
        let json = r#"{
            "id": "table-dinner-5-2025-06-01",
            "table_number": 5,
            "capacity": 4,
            "meal_type": "dinner",
            "date": "2025-06-01",
            "is_available": true
        }"#;
        let table: TableAvailability = serde_json::from_str(json).unwrap();
        assert_eq!(table.table_number, 5);
        assert_eq!(table.capacity, 4);
        assert!(table.reservation_id.is_none());

        let table_ref = TableRef::from(&table);
        assert_eq!(table_ref.capacity, 4);
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let user = UserInfo {
            id: 1,
            username: "alice".into(),
            email: "alice@example.com".into(),
            first_name: String::new(),
            last_name: String::new(),
            role: Role::User,
        };
        assert_eq!(user.display_name(), "alice");
    }
}
