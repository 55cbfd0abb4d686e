//! Location and date validation.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::{FieldCheck, Problem, ValidationError};
use crate::models::{Appointment, Location};
use crate::workflow::Stage;

/// Source of the current date.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local system date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// A clock pinned to one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Location and slot as submitted by the patient.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppointmentForm {
    pub location_id: String,
    pub date: Option<NaiveDate>,
    pub time: String,
}

/// Validates a location/date/time selection against the catalog.
pub struct LocationDateValidator<'a> {
    locations: &'a [Location],
    today: NaiveDate,
}

impl<'a> LocationDateValidator<'a> {
    pub fn new(locations: &'a [Location], today: NaiveDate) -> Self {
        Self { locations, today }
    }

    /// Check whether a date can be booked (not past, not a Sunday).
    pub fn is_bookable_date(&self, date: NaiveDate) -> bool {
        date >= self.today && date.weekday() != Weekday::Sun
    }

    /// Validate the selection into a committed appointment.
    pub fn validate(&self, form: &AppointmentForm) -> Result<Appointment, ValidationError> {
        let mut check = FieldCheck::new(Stage::LocationDateSelection);

        let location = if check.require("location_id", &form.location_id) {
            let found = self.locations.iter().find(|l| l.id == form.location_id.trim());
            if found.is_none() {
                check.malformed("location_id", format!("unknown location {}", form.location_id));
            }
            found
        } else {
            None
        };

        match form.date {
            None => check.missing("date"),
            Some(date) if date < self.today => check.malformed("date", "date is in the past"),
            Some(date) if date.weekday() == Weekday::Sun => {
                check.malformed("date", "clinics are closed on Sundays")
            }
            Some(_) => {}
        }

        if check.require("time", &form.time) {
            if let Some(location) = location {
                if !location.offers(form.time.trim()) {
                    check.malformed(
                        "time",
                        format!("{} is not available at {}", form.time, location.name),
                    );
                }
            }
        }

        check.finish()?;

        match (location, form.date) {
            (Some(location), Some(date)) => Ok(Appointment {
                location_id: location.id.clone(),
                date,
                time: form.time.trim().to_string(),
            }),
            // A clean check always resolved both
            _ => Err(ValidationError::single(
                Stage::LocationDateSelection,
                "location_id",
                Problem::Missing,
            )),
        }
    }
}
