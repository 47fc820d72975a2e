// libs/scheduling-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::models::{DoctorAvailability, SchedulingError, SetAvailabilityRequest, SlotWindow};
use crate::store::SchedulingStore;

pub struct AvailabilityService {
    store: Arc<SchedulingStore>,
}

impl AvailabilityService {
    pub fn new(store: Arc<SchedulingStore>) -> Self {
        Self { store }
    }

    /// Upsert a doctor's weekly template. Slots must be strictly ascending
    /// and spaced at least one slot duration apart so configured windows
    /// never overlap each other.
    pub fn set_availability(
        &self,
        doctor_id: Uuid,
        request: SetAvailabilityRequest,
        now: DateTime<Utc>,
    ) -> Result<DoctorAvailability, SchedulingError> {
        debug!("updating availability template for doctor {}", doctor_id);

        if request.slot_duration_minutes == 0 {
            return Err(SchedulingError::InvalidInput(
                "slot duration must be positive".to_string(),
            ));
        }
        if request.available_days.is_empty() || request.daily_slots.is_empty() {
            return Err(SchedulingError::InvalidInput(
                "available days and daily slots must not be empty".to_string(),
            ));
        }
        if request.available_days.iter().any(|day| *day > 6) {
            return Err(SchedulingError::InvalidInput(
                "days of week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
            ));
        }

        let duration = Duration::minutes(request.slot_duration_minutes as i64);
        for pair in request.daily_slots.windows(2) {
            if pair[1] <= pair[0] {
                return Err(SchedulingError::InvalidInput(
                    "daily slots must be strictly ascending".to_string(),
                ));
            }
            if pair[1] - pair[0] < duration {
                return Err(SchedulingError::InvalidInput(
                    "daily slots closer together than the slot duration".to_string(),
                ));
            }
        }
        if let Some(last) = request.daily_slots.last() {
            if last.overflowing_add_signed(duration).1 != 0 {
                return Err(SchedulingError::InvalidInput(
                    "last slot must end before midnight".to_string(),
                ));
            }
        }

        let availability = DoctorAvailability {
            doctor_id,
            available_days: request.available_days,
            slot_duration_minutes: request.slot_duration_minutes,
            daily_slots: request.daily_slots,
            updated_at: now,
        };

        let stored = self.store.availability.upsert(doctor_id, availability)?;
        Ok(stored.record)
    }

    pub fn get_availability(&self, doctor_id: Uuid) -> Result<DoctorAvailability, SchedulingError> {
        self.store
            .availability
            .get(doctor_id)?
            .map(|v| v.record)
            .ok_or(SchedulingError::AvailabilityNotFound(doctor_id))
    }

    /// The template applying to a concrete date, or NotFound when the doctor
    /// does not work that weekday.
    pub fn availability_for_date(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<DoctorAvailability, SchedulingError> {
        let availability = self.get_availability(doctor_id)?;
        let day_of_week = date.weekday().num_days_from_sunday() as u8;

        if !availability.covers_weekday(day_of_week) {
            return Err(SchedulingError::AvailabilityNotFound(doctor_id));
        }

        Ok(availability)
    }

    /// Expand the template into concrete windows for one day.
    pub fn configured_windows(&self, availability: &DoctorAvailability) -> Vec<SlotWindow> {
        let duration = Duration::minutes(availability.slot_duration_minutes as i64);
        availability
            .daily_slots
            .iter()
            .filter_map(|start| {
                let (end, wrapped) = start.overflowing_add_signed(duration);
                (wrapped == 0).then_some(SlotWindow {
                    start_time: *start,
                    end_time: end,
                })
            })
            .collect()
    }
}
