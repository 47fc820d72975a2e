// libs/billing-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::StorageError;

// ==============================================================================
// CORE LEDGER MODELS
// ==============================================================================

/// An invoice and the payment history it owns. Status, paid amount and paid
/// date are never stored; they are derived from the payments and the clock
/// on every read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub patient_id: Uuid,
    pub items: Vec<InvoiceItem>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub payments: Vec<Payment>,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    pub fn paid_amount(&self) -> Decimal {
        self.payments.iter().map(|p| p.amount).sum()
    }

    pub fn balance(&self) -> Decimal {
        self.total - self.paid_amount()
    }

    /// Derivation table: cancelled overrides everything; a fully covered
    /// invoice is paid; any partial coverage reads partial even past the
    /// due date; an untouched invoice past due reads overdue.
    pub fn status(&self, now: DateTime<Utc>) -> InvoiceStatus {
        if self.cancelled_at.is_some() {
            return InvoiceStatus::Cancelled;
        }
        let paid = self.paid_amount();
        if paid >= self.total {
            return InvoiceStatus::Paid;
        }
        if paid > Decimal::ZERO {
            return InvoiceStatus::Partial;
        }
        if now.date_naive() > self.due_date {
            return InvoiceStatus::Overdue;
        }
        InvoiceStatus::Pending
    }

    /// When the invoice became fully paid: the timestamp of the payment
    /// that reached the total.
    pub fn paid_date(&self) -> Option<DateTime<Utc>> {
        if self.total > self.paid_amount() {
            return None;
        }
        let mut cumulative = Decimal::ZERO;
        for payment in &self.payments {
            cumulative += payment.amount;
            if cumulative >= self.total {
                return Some(payment.paid_at);
            }
        }
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Append-only: a recorded payment is never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Insurance,
    MobileMoney,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
    Cancelled,
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceStatus::Pending => write!(f, "pending"),
            InvoiceStatus::Partial => write!(f, "partial"),
            InvoiceStatus::Paid => write!(f, "paid"),
            InvoiceStatus::Overdue => write!(f, "overdue"),
            InvoiceStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItemInput {
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInvoiceRequest {
    pub patient_id: Uuid,
    pub items: Vec<InvoiceItemInput>,
    pub tax: Decimal,
    pub discount: Decimal,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPaymentRequest {
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceQuery {
    pub patient_id: Option<Uuid>,
    pub status: Option<InvoiceStatus>,
}

/// Read projection: the stored facts plus every derived field evaluated at
/// read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceView {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub paid_amount: Decimal,
    pub balance: Decimal,
    pub status: InvoiceStatus,
    pub paid_date: Option<DateTime<Utc>>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("invoice not found")]
    InvoiceNotFound,

    #[error("payment of {amount} exceeds outstanding balance of {balance}")]
    ExceedsBalance { amount: Decimal, balance: Decimal },

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<StorageError> for BillingError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => BillingError::InvoiceNotFound,
            // Ledger writes run inside the per-invoice critical section, so
            // a version race here means the lock discipline was broken.
            StorageError::StaleWrite { .. } => {
                BillingError::StorageUnavailable("ledger write raced outside its lock".to_string())
            }
            StorageError::Duplicate => {
                BillingError::StorageUnavailable("duplicate id generated".to_string())
            }
            StorageError::Unavailable(msg) => BillingError::StorageUnavailable(msg),
        }
    }
}
