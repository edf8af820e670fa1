use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::common::text_enum;

text_enum! {
    /// Channel the contact came through.
    pub enum LeadSource {
        Site => "site",
        Whatsapp => "whatsapp",
        Phone => "phone",
    }
}

impl Default for LeadSource {
    fn default() -> Self {
        LeadSource::Site
    }
}

text_enum! {
    pub enum LeadStatus {
        New => "new",
        Contacted => "contacted",
        Scheduled => "scheduled",
        Closed => "closed",
    }
}

/// A contact request left by a site visitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Lead {
    pub id: i32,
    pub property_id: Option<i32>,
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub message: Option<String>,
    pub source: LeadSource,
    pub status: LeadStatus,
    pub created_at: NaiveDateTime,
}

/// Body of `POST /api/leads`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewLead {
    pub property_id: Option<i32>,
    #[validate(length(min = 1, max = 100, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "email is not valid"))]
    pub email: Option<String>,
    #[validate(length(min = 8, max = 20, message = "phone must have between 8 and 20 characters"))]
    pub phone: String,
    #[validate(length(max = 2000))]
    pub message: Option<String>,
    #[serde(default)]
    pub source: LeadSource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeadStatusUpdate {
    pub status: LeadStatus,
}
