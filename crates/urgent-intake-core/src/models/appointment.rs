//! Scheduling models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A clinic location from the scheduling catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub wait_time: Option<String>,
    /// Bookable slots, e.g. "9:00 AM"
    pub available_times: Vec<String>,
}

impl Location {
    /// Create a location with required fields.
    pub fn new(id: impl Into<String>, name: impl Into<String>, available_times: Vec<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: None,
            phone: None,
            wait_time: None,
            available_times,
        }
    }

    /// Check if a slot is offered at this location.
    pub fn offers(&self, time: &str) -> bool {
        self.available_times.iter().any(|t| t == time)
    }
}

/// Committed appointment group of the patient record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub location_id: String,
    pub date: NaiveDate,
    pub time: String,
}
