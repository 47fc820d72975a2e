// libs/scheduling-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_events::{DomainEvent, EventBus};
use shared_utils::Clock;

use crate::models::{
    ActorRole, Appointment, AppointmentQuery, AppointmentStatus, BookAppointmentRequest,
    DoctorAvailability, SchedulingError, SetAvailabilityRequest, SlotWindow,
    TransitionAppointmentRequest,
};
use crate::services::availability::AvailabilityService;
use crate::services::conflict::ConflictService;
use crate::services::lifecycle::AppointmentLifecycle;
use crate::store::SchedulingStore;

pub struct BookingService {
    store: Arc<SchedulingStore>,
    availability: AvailabilityService,
    conflict: ConflictService,
    lifecycle: AppointmentLifecycle,
    events: EventBus,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    pub fn new(store: Arc<SchedulingStore>, events: EventBus, clock: Arc<dyn Clock>) -> Self {
        let availability = AvailabilityService::new(Arc::clone(&store));
        let conflict = ConflictService::new(Arc::clone(&store));

        Self {
            store,
            availability,
            conflict,
            lifecycle: AppointmentLifecycle::new(),
            events,
            clock,
        }
    }

    // ==========================================================================
    // SLOT ALLOCATION
    // ==========================================================================

    /// Free slots for a doctor on a date. Recomputed on every call; a
    /// returned slot may be taken by the time the caller books, which is why
    /// `book` re-validates at commit time.
    pub fn list_free_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<SlotWindow>, SchedulingError> {
        let availability = self.availability.availability_for_date(doctor_id, date)?;
        let blocking = self.conflict.blocking_appointments(doctor_id, date)?;

        let free: Vec<SlotWindow> = self
            .availability
            .configured_windows(&availability)
            .into_iter()
            .filter(|slot| {
                !blocking
                    .iter()
                    .any(|apt| apt.overlaps(slot.start_time, slot.end_time))
            })
            .collect();

        debug!(
            "doctor {} on {}: {} of {} configured slots free",
            doctor_id,
            date,
            free.len(),
            availability.daily_slots.len()
        );
        Ok(free)
    }

    /// Book a slot. Validation and insert happen inside the (doctor, date)
    /// critical section so exactly one of two concurrent calls for the same
    /// slot succeeds.
    pub async fn book(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        info!(
            "booking request: patient {} with doctor {} on {} at {}",
            request.patient_id, request.doctor_id, request.date, request.start_time
        );

        let availability = self
            .availability
            .availability_for_date(request.doctor_id, request.date)?;
        let slot = self.validate_requested_slot(&availability, &request)?;

        let _guard = self
            .store
            .booking_locks
            .acquire((request.doctor_id, request.date))
            .await?;

        // Re-check against current appointments, not a previously fetched
        // free-list: closes the race between "slot offered" and "slot taken".
        if self.conflict.has_overlap(
            request.doctor_id,
            request.date,
            slot.start_time,
            slot.end_time,
        )? {
            warn!(
                "slot race lost for doctor {} on {} at {}",
                request.doctor_id, request.date, request.start_time
            );
            return Err(SchedulingError::SlotConflict);
        }

        let now = self.clock.now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            doctor_id: request.doctor_id,
            patient_id: request.patient_id,
            date: request.date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            appointment_type: request.appointment_type,
            status: AppointmentStatus::Pending,
            symptoms: request.symptoms,
            diagnosis: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        self.store.appointments.insert(appointment.id, appointment.clone())?;

        self.events.publish(DomainEvent::BookingCreated {
            appointment_id: appointment.id,
            doctor_id: appointment.doctor_id,
            patient_id: appointment.patient_id,
            date: appointment.date,
            start_time: appointment.start_time,
            occurred_at: now,
        });

        info!("appointment {} booked for doctor {}", appointment.id, appointment.doctor_id);
        Ok(appointment)
    }

    fn validate_requested_slot(
        &self,
        availability: &DoctorAvailability,
        request: &BookAppointmentRequest,
    ) -> Result<SlotWindow, SchedulingError> {
        if request.date < self.clock.now().date_naive() {
            return Err(SchedulingError::InvalidInput(
                "appointment date is in the past".to_string(),
            ));
        }

        if !availability.daily_slots.contains(&request.start_time) {
            return Err(SchedulingError::InvalidInput(format!(
                "{} is not a configured slot for this doctor",
                request.start_time
            )));
        }

        let duration = Duration::minutes(availability.slot_duration_minutes as i64);
        let (end_time, wrapped) = request.start_time.overflowing_add_signed(duration);
        if wrapped != 0 {
            return Err(SchedulingError::InvalidInput(
                "slot crosses midnight".to_string(),
            ));
        }

        Ok(SlotWindow {
            start_time: request.start_time,
            end_time,
        })
    }

    // ==========================================================================
    // LIFECYCLE
    // ==========================================================================

    /// Drive an appointment through its lifecycle. Pending can be confirmed
    /// or cancelled by doctor/admin; only the assigned doctor completes a
    /// confirmed appointment, optionally attaching diagnosis and notes.
    pub fn transition(
        &self,
        appointment_id: Uuid,
        request: TransitionAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        let stored = self
            .store
            .appointments
            .get(appointment_id)?
            .ok_or(SchedulingError::AppointmentNotFound)?;
        let current = stored.record.status;

        self.lifecycle.validate_transition(current, request.new_status)?;
        self.authorize_transition(&stored.record, &request)?;

        let now = self.clock.now();
        let updated = self.store.appointments.update(appointment_id, stored.version, |apt| {
            apt.status = request.new_status;
            if request.new_status == AppointmentStatus::Completed && request.diagnosis.is_some() {
                apt.diagnosis = request.diagnosis.clone();
            }
            if request.notes.is_some() {
                apt.notes = request.notes.clone();
            }
            apt.updated_at = now;
        })?;

        self.events.publish(DomainEvent::AppointmentStatusChanged {
            appointment_id,
            from: current.to_string(),
            to: request.new_status.to_string(),
            occurred_at: now,
        });

        info!(
            "appointment {} transitioned {} -> {}",
            appointment_id, current, request.new_status
        );
        Ok(updated.record)
    }

    fn authorize_transition(
        &self,
        appointment: &Appointment,
        request: &TransitionAppointmentRequest,
    ) -> Result<(), SchedulingError> {
        match request.new_status {
            AppointmentStatus::Completed => {
                let is_assigned_doctor = request.performed_by.role == ActorRole::Doctor
                    && request.performed_by.actor_id == Some(appointment.doctor_id);
                if !is_assigned_doctor {
                    return Err(SchedulingError::NotAssignedDoctor);
                }
            }
            AppointmentStatus::Confirmed | AppointmentStatus::Cancelled => {
                if !matches!(request.performed_by.role, ActorRole::Doctor | ActorRole::Admin) {
                    return Err(SchedulingError::InvalidInput(
                        "confirmation and cancellation are doctor or admin actions".to_string(),
                    ));
                }
            }
            AppointmentStatus::Pending => {}
        }
        Ok(())
    }

    // ==========================================================================
    // READS AND AVAILABILITY UPKEEP
    // ==========================================================================

    pub fn search(&self, query: &AppointmentQuery) -> Result<Vec<Appointment>, SchedulingError> {
        let mut results: Vec<Appointment> = self
            .store
            .appointments
            .filter(|apt| {
                query.doctor_id.map_or(true, |id| apt.doctor_id == id)
                    && query.patient_id.map_or(true, |id| apt.patient_id == id)
                    && query.date.map_or(true, |d| apt.date == d)
                    && query.status.map_or(true, |s| apt.status == s)
            })?
            .into_iter()
            .map(|v| v.record)
            .collect();

        results.sort_by_key(|apt| (apt.date, apt.start_time));
        Ok(results)
    }

    pub fn get(&self, appointment_id: Uuid) -> Result<Appointment, SchedulingError> {
        self.store
            .appointments
            .get(appointment_id)?
            .map(|v| v.record)
            .ok_or(SchedulingError::AppointmentNotFound)
    }

    pub fn set_availability(
        &self,
        doctor_id: Uuid,
        request: SetAvailabilityRequest,
    ) -> Result<DoctorAvailability, SchedulingError> {
        self.availability
            .set_availability(doctor_id, request, self.clock.now())
    }

    pub fn get_availability(&self, doctor_id: Uuid) -> Result<DoctorAvailability, SchedulingError> {
        self.availability.get_availability(doctor_id)
    }
}
