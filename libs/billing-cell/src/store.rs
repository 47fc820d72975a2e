// libs/billing-cell/src/store.rs
use uuid::Uuid;

use shared_database::{Collection, ScopeLocks, Sequence};

use crate::models::Invoice;

/// Persisted state for the billing cell. Ledger mutations serialize on the
/// invoice id; the sequence hands out invoice numbers monotonically and
/// tolerates gaps from failed creations.
pub struct BillingStore {
    pub invoices: Collection<Invoice>,
    pub invoice_locks: ScopeLocks<Uuid>,
    pub invoice_numbers: Sequence,
}

impl BillingStore {
    pub fn new() -> Self {
        Self {
            invoices: Collection::new(),
            invoice_locks: ScopeLocks::new(),
            invoice_numbers: Sequence::default(),
        }
    }
}

impl Default for BillingStore {
    fn default() -> Self {
        Self::new()
    }
}
