//! Therapist availability configuration models.
//!
//! Read-mostly input to the scheduler: recurring weekly windows plus
//! date-specific overrides. An `unavailable` override blocks the whole
//! date; a `custom_hours` override replaces the weekly windows for that
//! date only.

use chrono::{NaiveDate, NaiveTime, Weekday};
use haven_core::error::{CoreError, CoreResult};
use haven_core::slots::{DayOverride, WeeklyWindow};
use haven_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `availability_windows` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AvailabilityWindow {
    pub id: DbId,
    pub therapist_id: DbId,
    /// ISO weekday number: 1 = Monday .. 7 = Sunday.
    pub weekday: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub created_at: Timestamp,
}

impl AvailabilityWindow {
    /// Convert to the pure slot-math representation.
    pub fn to_weekly_window(&self) -> CoreResult<WeeklyWindow> {
        let weekday = match self.weekday {
            1 => Weekday::Mon,
            2 => Weekday::Tue,
            3 => Weekday::Wed,
            4 => Weekday::Thu,
            5 => Weekday::Fri,
            6 => Weekday::Sat,
            7 => Weekday::Sun,
            other => {
                return Err(CoreError::Internal(format!(
                    "availability window {} has invalid weekday {other}",
                    self.id
                )))
            }
        };
        Ok(WeeklyWindow {
            weekday,
            start_time: self.start_time,
            end_time: self.end_time,
        })
    }
}

/// A row from the `availability_overrides` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AvailabilityOverride {
    pub id: DbId,
    pub therapist_id: DbId,
    pub date: NaiveDate,
    /// `"unavailable"` or `"custom_hours"`.
    pub kind: String,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub created_at: Timestamp,
}

impl AvailabilityOverride {
    /// Convert to the pure slot-math representation.
    pub fn to_day_override(&self) -> CoreResult<DayOverride> {
        match self.kind.as_str() {
            "unavailable" => Ok(DayOverride::Unavailable),
            "custom_hours" => match (self.start_time, self.end_time) {
                (Some(start_time), Some(end_time)) => Ok(DayOverride::CustomHours {
                    start_time,
                    end_time,
                }),
                _ => Err(CoreError::Internal(format!(
                    "custom_hours override {} is missing its hours",
                    self.id
                ))),
            },
            other => Err(CoreError::Internal(format!(
                "unknown override kind '{other}'"
            ))),
        }
    }
}

/// Insert parameters for a weekly availability window.
#[derive(Debug, Clone)]
pub struct CreateAvailabilityWindow {
    pub therapist_id: DbId,
    pub weekday: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Insert parameters for a date-specific override.
#[derive(Debug, Clone)]
pub struct CreateAvailabilityOverride {
    pub therapist_id: DbId,
    pub date: NaiveDate,
    pub kind: String,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}
