// libs/triage-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::StorageError;

// ==============================================================================
// CORE EMERGENCY CASE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyCase {
    pub id: Uuid,
    /// Unknown for walk-ins that have no patient record yet.
    pub patient_id: Option<Uuid>,
    pub patient_name: String,
    pub triage_level: TriageLevel,
    pub chief_complaint: String,
    pub vital_signs: Option<VitalSigns>,
    pub status: CaseStatus,
    pub arrival_time: DateTime<Utc>,
    pub treatment_start_time: Option<DateTime<Utc>>,
    pub discharge_time: Option<DateTime<Utc>>,
    pub assigned_doctor_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalSigns {
    pub blood_pressure: Option<String>,
    pub heart_rate_bpm: Option<u16>,
    pub temperature_celsius: Option<f32>,
    pub respiratory_rate: Option<u16>,
    pub oxygen_saturation_pct: Option<u8>,
}

/// Five-level urgency classification; 1 is most urgent. Variant order gives
/// the queue its primary sort key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum TriageLevel {
    #[serde(rename = "1-immediate")]
    Immediate,
    #[serde(rename = "2-emergent")]
    Emergent,
    #[serde(rename = "3-urgent")]
    Urgent,
    #[serde(rename = "4-less_urgent")]
    LessUrgent,
    #[serde(rename = "5-non_urgent")]
    NonUrgent,
}

impl TriageLevel {
    pub fn code(&self) -> u8 {
        match self {
            TriageLevel::Immediate => 1,
            TriageLevel::Emergent => 2,
            TriageLevel::Urgent => 3,
            TriageLevel::LessUrgent => 4,
            TriageLevel::NonUrgent => 5,
        }
    }
}

impl fmt::Display for TriageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriageLevel::Immediate => write!(f, "1-immediate"),
            TriageLevel::Emergent => write!(f, "2-emergent"),
            TriageLevel::Urgent => write!(f, "3-urgent"),
            TriageLevel::LessUrgent => write!(f, "4-less_urgent"),
            TriageLevel::NonUrgent => write!(f, "5-non_urgent"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Waiting,
    InTreatment,
    Admitted,
    Discharged,
    Transferred,
}

impl CaseStatus {
    /// Admitted is deliberately non-terminal: an admitted case still moves
    /// on to discharged or transferred.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CaseStatus::Discharged | CaseStatus::Transferred)
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseStatus::Waiting => write!(f, "waiting"),
            CaseStatus::InTreatment => write!(f, "in_treatment"),
            CaseStatus::Admitted => write!(f, "admitted"),
            CaseStatus::Discharged => write!(f, "discharged"),
            CaseStatus::Transferred => write!(f, "transferred"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmitCaseRequest {
    pub patient_id: Option<Uuid>,
    pub patient_name: String,
    pub triage_level: TriageLevel,
    pub chief_complaint: String,
    pub vital_signs: Option<VitalSigns>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCaseRequest {
    pub new_status: Option<CaseStatus>,
    pub new_triage_level: Option<TriageLevel>,
    pub assigned_doctor_id: Option<Uuid>,
    pub notes: Option<String>,
    /// Version the caller read before deciding on this update. When set,
    /// the write is rejected as stale if the case has moved on since.
    pub expected_version: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseQuery {
    pub status: Option<CaseStatus>,
    pub triage_level: Option<TriageLevel>,
}

/// Queue entry as shown on the board: the case plus its derived wait time
/// and the version callers echo back on update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseView {
    #[serde(flatten)]
    pub case: EmergencyCase,
    pub wait_minutes: i64,
    pub version: u64,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("emergency case not found")]
    CaseNotFound,

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: CaseStatus, to: CaseStatus },

    #[error("case was modified concurrently, re-read and retry")]
    StaleWrite,

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<StorageError> for TriageError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => TriageError::CaseNotFound,
            StorageError::StaleWrite { .. } => TriageError::StaleWrite,
            StorageError::Duplicate => {
                TriageError::StorageUnavailable("duplicate id generated".to_string())
            }
            StorageError::Unavailable(msg) => TriageError::StorageUnavailable(msg),
        }
    }
}
