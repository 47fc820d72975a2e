// libs/scheduling-cell/src/store.rs
use chrono::NaiveDate;
use uuid::Uuid;

use shared_database::{Collection, ScopeLocks};

use crate::models::{Appointment, DoctorAvailability};

/// Persisted state for the scheduling cell. Availability records are keyed
/// by doctor id; booking writes serialize on the (doctor, date) calendar
/// page they touch.
pub struct SchedulingStore {
    pub appointments: Collection<Appointment>,
    pub availability: Collection<DoctorAvailability>,
    pub booking_locks: ScopeLocks<(Uuid, NaiveDate)>,
}

impl SchedulingStore {
    pub fn new() -> Self {
        Self {
            appointments: Collection::new(),
            availability: Collection::new(),
            booking_locks: ScopeLocks::new(),
        }
    }
}

impl Default for SchedulingStore {
    fn default() -> Self {
        Self::new()
    }
}
