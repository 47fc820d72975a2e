// libs/billing-cell/src/services/ledger.rs
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_events::{DomainEvent, EventBus};
use shared_utils::Clock;

use crate::models::{
    BillingError, CreateInvoiceRequest, Invoice, InvoiceItem, InvoiceQuery, InvoiceView, Payment,
    RecordPaymentRequest,
};
use crate::store::BillingStore;

pub struct LedgerService {
    store: Arc<BillingStore>,
    events: EventBus,
    clock: Arc<dyn Clock>,
    invoice_number_prefix: String,
    overpayment_tolerance: Decimal,
}

impl LedgerService {
    pub fn new(
        store: Arc<BillingStore>,
        events: EventBus,
        clock: Arc<dyn Clock>,
        config: &AppConfig,
    ) -> Self {
        Self {
            store,
            events,
            clock,
            invoice_number_prefix: config.invoice_number_prefix.clone(),
            overpayment_tolerance: config.overpayment_tolerance,
        }
    }

    /// Create an invoice with computed line totals and the next sequential
    /// invoice number.
    pub fn create_invoice(&self, request: CreateInvoiceRequest) -> Result<InvoiceView, BillingError> {
        self.validate_invoice_request(&request)?;

        let items: Vec<InvoiceItem> = request
            .items
            .into_iter()
            .map(|item| InvoiceItem {
                line_total: item.unit_price * Decimal::from(item.quantity),
                description: item.description,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect();

        let subtotal: Decimal = items.iter().map(|item| item.line_total).sum();
        let total = subtotal + request.tax - request.discount;
        if total < Decimal::ZERO {
            return Err(BillingError::ValidationError(
                "invoice total must not be negative".to_string(),
            ));
        }

        let now = self.clock.now();
        let invoice = Invoice {
            id: Uuid::new_v4(),
            invoice_number: format!(
                "{}-{:05}",
                self.invoice_number_prefix,
                self.store.invoice_numbers.next()
            ),
            patient_id: request.patient_id,
            items,
            subtotal,
            tax: request.tax,
            discount: request.discount,
            total,
            due_date: request.due_date,
            notes: request.notes,
            cancelled_at: None,
            payments: Vec::new(),
            created_at: now,
        };
        let stored = self.store.invoices.insert(invoice.id, invoice)?;

        self.events.publish(DomainEvent::InvoiceCreated {
            invoice_id: stored.record.id,
            invoice_number: stored.record.invoice_number.clone(),
            total: stored.record.total,
            occurred_at: now,
        });

        info!(
            "invoice {} created for patient {} with total {}",
            stored.record.invoice_number, stored.record.patient_id, stored.record.total
        );
        Ok(self.view(stored.record))
    }

    /// Append a payment under the invoice's critical section. Two cashiers
    /// recording against the same invoice serialize here, so the second
    /// sees the balance left by the first.
    pub async fn record_payment(
        &self,
        invoice_id: Uuid,
        request: RecordPaymentRequest,
    ) -> Result<InvoiceView, BillingError> {
        if request.amount <= Decimal::ZERO {
            return Err(BillingError::ValidationError(
                "payment amount must be positive".to_string(),
            ));
        }

        let _guard = self.store.invoice_locks.acquire(invoice_id).await?;

        let stored = self
            .store
            .invoices
            .get(invoice_id)?
            .ok_or(BillingError::InvoiceNotFound)?;
        let invoice = &stored.record;

        if invoice.cancelled_at.is_some() {
            return Err(BillingError::InvalidTransition(
                "cannot record payment against a cancelled invoice".to_string(),
            ));
        }

        let balance = invoice.balance();
        if request.amount > balance + self.overpayment_tolerance {
            warn!(
                "payment of {} rejected on {}: balance is {}",
                request.amount, invoice.invoice_number, balance
            );
            return Err(BillingError::ExceedsBalance {
                amount: request.amount,
                balance,
            });
        }

        let now = self.clock.now();
        let payment = Payment {
            id: Uuid::new_v4(),
            invoice_id,
            amount: request.amount,
            method: request.method,
            reference: request.reference,
            notes: request.notes,
            paid_at: now,
        };
        let payment_id = payment.id;

        let updated = self
            .store
            .invoices
            .update(invoice_id, stored.version, |invoice| {
                invoice.payments.push(payment.clone());
            })?;

        let view = self.view(updated.record);
        self.events.publish(DomainEvent::PaymentRecorded {
            invoice_id,
            payment_id,
            amount: request.amount,
            status_after: view.status.to_string(),
            occurred_at: now,
        });

        info!(
            "payment of {} recorded on {}: paid {} of {}",
            request.amount, view.invoice.invoice_number, view.paid_amount, view.invoice.total
        );
        Ok(view)
    }

    /// Cancellation is a terminal override, legal only before any money has
    /// been taken.
    pub async fn cancel_invoice(&self, invoice_id: Uuid) -> Result<InvoiceView, BillingError> {
        let _guard = self.store.invoice_locks.acquire(invoice_id).await?;

        let stored = self
            .store
            .invoices
            .get(invoice_id)?
            .ok_or(BillingError::InvoiceNotFound)?;

        if stored.record.cancelled_at.is_some() {
            return Err(BillingError::InvalidTransition(
                "invoice is already cancelled".to_string(),
            ));
        }
        if stored.record.paid_amount() > Decimal::ZERO {
            return Err(BillingError::InvalidTransition(
                "cannot cancel an invoice with recorded payments".to_string(),
            ));
        }

        let now = self.clock.now();
        let updated = self
            .store
            .invoices
            .update(invoice_id, stored.version, |invoice| {
                invoice.cancelled_at = Some(now);
            })?;

        self.events.publish(DomainEvent::InvoiceCancelled {
            invoice_id,
            occurred_at: now,
        });

        info!("invoice {} cancelled", updated.record.invoice_number);
        Ok(self.view(updated.record))
    }

    pub fn get_invoice(&self, invoice_id: Uuid) -> Result<InvoiceView, BillingError> {
        let stored = self
            .store
            .invoices
            .get(invoice_id)?
            .ok_or(BillingError::InvoiceNotFound)?;
        Ok(self.view(stored.record))
    }

    pub fn list_invoices(&self, query: &InvoiceQuery) -> Result<Vec<InvoiceView>, BillingError> {
        let now = self.clock.now();
        let mut invoices = self.store.invoices.filter(|invoice| {
            query.patient_id.map_or(true, |id| invoice.patient_id == id)
                && query.status.map_or(true, |s| invoice.status(now) == s)
        })?;

        invoices.sort_by(|a, b| a.record.invoice_number.cmp(&b.record.invoice_number));
        Ok(invoices.into_iter().map(|v| self.view(v.record)).collect())
    }

    fn validate_invoice_request(&self, request: &CreateInvoiceRequest) -> Result<(), BillingError> {
        if request.items.is_empty() {
            return Err(BillingError::ValidationError(
                "invoice must have at least one item".to_string(),
            ));
        }
        for item in &request.items {
            if item.description.trim().is_empty() {
                return Err(BillingError::ValidationError(
                    "item description is required".to_string(),
                ));
            }
            if item.unit_price <= Decimal::ZERO {
                return Err(BillingError::ValidationError(
                    "item unit price must be positive".to_string(),
                ));
            }
            if item.quantity == 0 {
                return Err(BillingError::ValidationError(
                    "item quantity must be positive".to_string(),
                ));
            }
        }
        if request.tax < Decimal::ZERO || request.discount < Decimal::ZERO {
            return Err(BillingError::ValidationError(
                "tax and discount must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    fn view(&self, invoice: Invoice) -> InvoiceView {
        let now = self.clock.now();
        debug!(
            "deriving status for invoice {} at {}",
            invoice.invoice_number, now
        );
        InvoiceView {
            paid_amount: invoice.paid_amount(),
            balance: invoice.balance(),
            status: invoice.status(now),
            paid_date: invoice.paid_date(),
            invoice,
        }
    }
}
