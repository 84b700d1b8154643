use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Venue {
    pub id: String,
    pub name: String,
    pub owner_name: String,
    pub created_at: DateTime<Utc>,
}

impl Venue {
    pub fn new(name: String, owner_name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            owner_name,
            created_at: Utc::now(),
        }
    }
}

/// A schedulable unit within a venue (one court, one room, one lane).
/// Every slot references exactly one court.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Court {
    pub id: String,
    pub venue_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Court {
    pub fn new(venue_id: String, name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            venue_id,
            name,
            created_at: Utc::now(),
        }
    }
}
