// libs/shared/events/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Finalized state changes handed to the notification subsystem. Statuses
/// and triage levels travel as their wire names so consumers stay decoupled
/// from the owning cell's types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    BookingCreated {
        appointment_id: Uuid,
        doctor_id: Uuid,
        patient_id: Uuid,
        date: NaiveDate,
        start_time: NaiveTime,
        occurred_at: DateTime<Utc>,
    },
    AppointmentStatusChanged {
        appointment_id: Uuid,
        from: String,
        to: String,
        occurred_at: DateTime<Utc>,
    },
    CaseAdmitted {
        case_id: Uuid,
        triage_level: String,
        occurred_at: DateTime<Utc>,
    },
    CaseStatusChanged {
        case_id: Uuid,
        from: String,
        to: String,
        occurred_at: DateTime<Utc>,
    },
    InvoiceCreated {
        invoice_id: Uuid,
        invoice_number: String,
        total: Decimal,
        occurred_at: DateTime<Utc>,
    },
    PaymentRecorded {
        invoice_id: Uuid,
        payment_id: Uuid,
        amount: Decimal,
        status_after: String,
        occurred_at: DateTime<Utc>,
    },
    InvoiceCancelled {
        invoice_id: Uuid,
        occurred_at: DateTime<Utc>,
    },
}

impl DomainEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            DomainEvent::BookingCreated { .. } => "booking_created",
            DomainEvent::AppointmentStatusChanged { .. } => "appointment_status_changed",
            DomainEvent::CaseAdmitted { .. } => "case_admitted",
            DomainEvent::CaseStatusChanged { .. } => "case_status_changed",
            DomainEvent::InvoiceCreated { .. } => "invoice_created",
            DomainEvent::PaymentRecorded { .. } => "payment_recorded",
            DomainEvent::InvoiceCancelled { .. } => "invoice_cancelled",
        }
    }
}
