// libs/scheduling-cell/src/services/conflict.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{Appointment, SchedulingError};
use crate::store::SchedulingStore;

pub struct ConflictService {
    store: Arc<SchedulingStore>,
}

impl ConflictService {
    pub fn new(store: Arc<SchedulingStore>) -> Self {
        Self { store }
    }

    /// All appointments that still occupy calendar space for this doctor
    /// and date, ordered by start time.
    pub fn blocking_appointments(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let mut appointments: Vec<Appointment> = self
            .store
            .appointments
            .filter(|apt| apt.doctor_id == doctor_id && apt.date == date && apt.blocks_slot())?
            .into_iter()
            .map(|v| v.record)
            .collect();

        appointments.sort_by_key(|apt| apt.start_time);
        Ok(appointments)
    }

    /// Commit-time overlap check for the requested interval.
    pub fn has_overlap(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<bool, SchedulingError> {
        debug!(
            "checking conflicts for doctor {} on {} from {} to {}",
            doctor_id, date, start, end
        );

        let conflicting = self
            .blocking_appointments(doctor_id, date)?
            .iter()
            .any(|apt| apt.overlaps(start, end));

        if conflicting {
            warn!("conflict detected for doctor {} on {} at {}", doctor_id, date, start);
        }

        Ok(conflicting)
    }
}
