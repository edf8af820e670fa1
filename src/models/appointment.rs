use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::common::{text_enum, MonthRange};

text_enum! {
    pub enum AppointmentKind {
        Visit => "visit",
        Meeting => "meeting",
        Signing => "signing",
        Other => "other",
    }
}

impl Default for AppointmentKind {
    fn default() -> Self {
        AppointmentKind::Visit
    }
}

text_enum! {
    pub enum AppointmentStatus {
        Pending => "pending",
        Confirmed => "confirmed",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

/// An agenda entry: a visit, meeting or signing with a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Appointment {
    pub id: i32,
    pub title: String,
    pub client_name: String,
    pub client_phone: String,
    pub client_email: Option<String>,
    pub property_id: Option<i32>,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub location: Option<String>,
    pub kind: AppointmentKind,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Body of both `POST /api/appointments` and `PUT /api/appointments/:id`.
///
/// On update `status` may be omitted to keep the current one.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppointmentRequest {
    #[validate(length(min = 1, max = 255, message = "title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 255, message = "client_name is required"))]
    pub client_name: String,
    #[validate(length(min = 8, max = 20, message = "client_phone must have between 8 and 20 characters"))]
    pub client_phone: String,
    #[validate(email(message = "client_email is not valid"))]
    pub client_email: Option<String>,
    pub property_id: Option<i32>,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub location: Option<String>,
    #[serde(default)]
    pub kind: AppointmentKind,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppointmentStatusUpdate {
    pub status: AppointmentStatus,
}

/// Criteria for listing the agenda.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,
    pub month: Option<MonthRange>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.status.map_or(true, |s| appointment.status == s)
            && self
                .month
                .map_or(true, |m| m.contains(appointment.appointment_date))
    }
}
