use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Latitude/longitude pair recorded with a check-in when the device
/// shares it.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// One attendance row per check-in. `check_out` and `duration_secs` are
/// filled when the shift is closed.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AttendanceRecord {
    pub attendance_id: String,
    pub user_id: String,
    pub company_id: String,
    pub check_in: DateTime<Utc>,
    #[serde(default)]
    pub check_out: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_secs: Option<u32>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

/// Planned work block on the schedule. Independent of the attendance
/// state machine - a scheduled shift does not gate check-in or tasks.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Shift {
    pub shift_id: String,
    pub company_id: String,
    pub name: String,
    /// Free-form label ("morning", "close", ...); display only.
    pub shift_type: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub assigned_to: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateShiftPayload {
    pub name: String,
    pub shift_type: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub assigned_to: String,
}
