// libs/scheduling-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::StorageError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub appointment_type: AppointmentType,
    pub status: AppointmentStatus,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Whether this appointment still occupies its slot on the calendar.
    pub fn blocks_slot(&self) -> bool {
        matches!(
            self.status,
            AppointmentStatus::Pending | AppointmentStatus::Confirmed
        )
    }

    /// Half-open interval overlap: [start1, end1) against [start2, end2).
    pub fn overlaps(&self, start: NaiveTime, end: NaiveTime) -> bool {
        self.start_time < end && start < self.end_time
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    #[serde(alias = "general_consultation", alias = "general")]
    Consultation,

    #[serde(alias = "followup")]
    FollowUp,

    #[serde(alias = "check_up")]
    Checkup,

    #[serde(alias = "urgent")]
    Emergency,
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentType::Consultation => write!(f, "consultation"),
            AppointmentType::FollowUp => write!(f, "follow_up"),
            AppointmentType::Checkup => write!(f, "checkup"),
            AppointmentType::Emergency => write!(f, "emergency"),
        }
    }
}

// ==============================================================================
// AVAILABILITY MODELS
// ==============================================================================

/// A doctor's recurring weekly template. Owned by profile management; the
/// slot allocator only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorAvailability {
    pub doctor_id: Uuid,
    /// Days of week the template applies to, 0 = Sunday .. 6 = Saturday.
    pub available_days: Vec<u8>,
    pub slot_duration_minutes: u32,
    /// Ordered start times of the daily slots.
    pub daily_slots: Vec<NaiveTime>,
    pub updated_at: DateTime<Utc>,
}

impl DoctorAvailability {
    pub fn covers_weekday(&self, day_of_week: u8) -> bool {
        self.available_days.contains(&day_of_week)
    }
}

/// One bookable interval on a doctor's calendar.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotWindow {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub appointment_type: AppointmentType,
    pub symptoms: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionAppointmentRequest {
    pub new_status: AppointmentStatus,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    pub performed_by: Actor,
}

/// Who is asking for a state change. Filled in by the API layer from its
/// session; authentication itself lives outside this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub role: ActorRole,
    pub actor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Patient,
    Doctor,
    Admin,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentQuery {
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAvailabilityRequest {
    pub available_days: Vec<u8>,
    pub slot_duration_minutes: u32,
    pub daily_slots: Vec<NaiveTime>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("slot no longer available")]
    SlotConflict,

    #[error("appointment not found")]
    AppointmentNotFound,

    #[error("no availability configured for doctor {0} on the requested date")]
    AvailabilityNotFound(Uuid),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("only the assigned doctor can complete an appointment")]
    NotAssignedDoctor,

    #[error("appointment was modified concurrently, re-read and retry")]
    StaleWrite,

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<StorageError> for SchedulingError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => SchedulingError::AppointmentNotFound,
            StorageError::StaleWrite { .. } => SchedulingError::StaleWrite,
            StorageError::Duplicate => {
                SchedulingError::StorageUnavailable("duplicate id generated".to_string())
            }
            StorageError::Unavailable(msg) => SchedulingError::StorageUnavailable(msg),
        }
    }
}
