use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime};
use futures::future::join_all;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use scheduling_cell::models::{
    Actor, ActorRole, AppointmentStatus, AppointmentType, BookAppointmentRequest, SchedulingError,
    SetAvailabilityRequest, TransitionAppointmentRequest,
};
use scheduling_cell::{BookingService, SchedulingStore};
use shared_events::{DomainEvent, EventBus};
use shared_utils::{Clock, ManualClock};

fn test_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::at("2025-05-30T08:00:00Z".parse().unwrap()))
}

fn test_service(clock: Arc<ManualClock>) -> (Arc<BookingService>, UnboundedReceiver<DomainEvent>) {
    let (bus, rx) = EventBus::new();
    let service = BookingService::new(
        Arc::new(SchedulingStore::new()),
        bus,
        clock as Arc<dyn Clock>,
    );
    (Arc::new(service), rx)
}

fn seed_availability(service: &BookingService, doctor_id: Uuid) {
    service
        .set_availability(
            doctor_id,
            SetAvailabilityRequest {
                available_days: vec![0, 1, 2, 3, 4, 5, 6],
                slot_duration_minutes: 30,
                daily_slots: vec![
                    NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                    NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
                    NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                ],
            },
        )
        .expect("availability should seed");
}

fn booking_request(doctor_id: Uuid, patient_id: Uuid, start: NaiveTime) -> BookAppointmentRequest {
    BookAppointmentRequest {
        doctor_id,
        patient_id,
        date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        start_time: start,
        appointment_type: AppointmentType::Consultation,
        symptoms: Some("fever".to_string()),
    }
}

fn admin() -> Actor {
    Actor {
        role: ActorRole::Admin,
        actor_id: None,
    }
}

fn doctor(id: Uuid) -> Actor {
    Actor {
        role: ActorRole::Doctor,
        actor_id: Some(id),
    }
}

#[tokio::test]
async fn booked_slot_disappears_from_free_list() {
    let (service, _rx) = test_service(test_clock());
    let doctor_id = Uuid::new_v4();
    seed_availability(&service, doctor_id);
    let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

    let before = service.list_free_slots(doctor_id, date).unwrap();
    assert_eq!(before.len(), 3);

    let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
    service
        .book(booking_request(doctor_id, Uuid::new_v4(), nine))
        .await
        .unwrap();

    let after = service.list_free_slots(doctor_id, date).unwrap();
    assert_eq!(after.len(), 2);
    assert!(after.iter().all(|slot| slot.start_time != nine));
}

#[tokio::test]
async fn concurrent_bookings_for_same_slot_yield_one_winner() {
    let (service, _rx) = test_service(test_clock());
    let doctor_id = Uuid::new_v4();
    seed_availability(&service, doctor_id);
    let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();

    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            let request = booking_request(doctor_id, Uuid::new_v4(), nine);
            tokio::spawn(async move { service.book(request).await })
        })
        .collect();

    let outcomes: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task should not panic"))
        .collect();

    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|r| matches!(r, Err(SchedulingError::SlotConflict)))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(conflicts, 7);
}

#[tokio::test]
async fn no_two_blocking_appointments_overlap_after_churn() {
    let (service, _rx) = test_service(test_clock());
    let doctor_id = Uuid::new_v4();
    seed_availability(&service, doctor_id);
    let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
    let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();

    let first = service
        .book(booking_request(doctor_id, Uuid::new_v4(), nine))
        .await
        .unwrap();

    // Taken slot rejects a second booking until the first is cancelled.
    assert_matches!(
        service
            .book(booking_request(doctor_id, Uuid::new_v4(), nine))
            .await,
        Err(SchedulingError::SlotConflict)
    );

    service
        .transition(
            first.id,
            TransitionAppointmentRequest {
                new_status: AppointmentStatus::Cancelled,
                diagnosis: None,
                notes: Some("patient called off".to_string()),
                performed_by: admin(),
            },
        )
        .unwrap();

    let rebooked = service
        .book(booking_request(doctor_id, Uuid::new_v4(), nine))
        .await
        .unwrap();
    assert_eq!(rebooked.start_time, nine);

    let active = service
        .search(&scheduling_cell::models::AppointmentQuery {
            doctor_id: Some(doctor_id),
            date: Some(date),
            ..Default::default()
        })
        .unwrap();
    let blocking: Vec<_> = active.iter().filter(|apt| apt.blocks_slot()).collect();
    for (i, a) in blocking.iter().enumerate() {
        for b in blocking.iter().skip(i + 1) {
            assert!(!a.overlaps(b.start_time, b.end_time));
        }
    }
}

#[tokio::test]
async fn booking_lifecycle_runs_to_completed_with_diagnosis() {
    let clock = test_clock();
    let (service, mut rx) = test_service(Arc::clone(&clock));
    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    seed_availability(&service, doctor_id);
    let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();

    let appointment = service
        .book(booking_request(doctor_id, patient_id, nine))
        .await
        .unwrap();
    assert_eq!(appointment.status, AppointmentStatus::Pending);

    assert_matches!(
        service
            .book(booking_request(doctor_id, Uuid::new_v4(), nine))
            .await,
        Err(SchedulingError::SlotConflict)
    );

    let confirmed = service
        .transition(
            appointment.id,
            TransitionAppointmentRequest {
                new_status: AppointmentStatus::Confirmed,
                diagnosis: None,
                notes: None,
                performed_by: admin(),
            },
        )
        .unwrap();
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

    let completed = service
        .transition(
            appointment.id,
            TransitionAppointmentRequest {
                new_status: AppointmentStatus::Completed,
                diagnosis: Some("flu".to_string()),
                notes: None,
                performed_by: doctor(doctor_id),
            },
        )
        .unwrap();
    assert_eq!(completed.status, AppointmentStatus::Completed);
    assert_eq!(completed.diagnosis.as_deref(), Some("flu"));

    // Terminal: any further transition is rejected.
    assert_matches!(
        service.transition(
            appointment.id,
            TransitionAppointmentRequest {
                new_status: AppointmentStatus::Cancelled,
                diagnosis: None,
                notes: None,
                performed_by: admin(),
            },
        ),
        Err(SchedulingError::InvalidTransition { .. })
    );

    // One booking event plus one event per committed transition.
    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        kinds.push(event.kind());
    }
    assert_eq!(
        kinds,
        vec![
            "booking_created",
            "appointment_status_changed",
            "appointment_status_changed"
        ]
    );
}

#[tokio::test]
async fn completion_requires_the_assigned_doctor() {
    let (service, _rx) = test_service(test_clock());
    let doctor_id = Uuid::new_v4();
    seed_availability(&service, doctor_id);

    let appointment = service
        .book(booking_request(
            doctor_id,
            Uuid::new_v4(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        ))
        .await
        .unwrap();
    service
        .transition(
            appointment.id,
            TransitionAppointmentRequest {
                new_status: AppointmentStatus::Confirmed,
                diagnosis: None,
                notes: None,
                performed_by: admin(),
            },
        )
        .unwrap();

    assert_matches!(
        service.transition(
            appointment.id,
            TransitionAppointmentRequest {
                new_status: AppointmentStatus::Completed,
                diagnosis: None,
                notes: None,
                performed_by: doctor(Uuid::new_v4()),
            },
        ),
        Err(SchedulingError::NotAssignedDoctor)
    );
}

#[tokio::test]
async fn booking_validation_failures() {
    let (service, _rx) = test_service(test_clock());
    let doctor_id = Uuid::new_v4();

    // No availability configured at all.
    assert_matches!(
        service
            .book(booking_request(
                doctor_id,
                Uuid::new_v4(),
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            ))
            .await,
        Err(SchedulingError::AvailabilityNotFound(_))
    );

    seed_availability(&service, doctor_id);

    // Past date.
    let mut past = booking_request(
        doctor_id,
        Uuid::new_v4(),
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
    );
    past.date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
    assert_matches!(
        service.book(past).await,
        Err(SchedulingError::InvalidInput(_))
    );

    // Start time outside the configured slot set.
    assert_matches!(
        service
            .book(booking_request(
                doctor_id,
                Uuid::new_v4(),
                NaiveTime::from_hms_opt(9, 15, 0).unwrap(),
            ))
            .await,
        Err(SchedulingError::InvalidInput(_))
    );
}

#[tokio::test]
async fn weekday_without_availability_is_not_found() {
    let (service, _rx) = test_service(test_clock());
    let doctor_id = Uuid::new_v4();

    // Weekdays only; 2025-06-01 is a Sunday.
    service
        .set_availability(
            doctor_id,
            SetAvailabilityRequest {
                available_days: vec![1, 2, 3, 4, 5],
                slot_duration_minutes: 30,
                daily_slots: vec![NaiveTime::from_hms_opt(9, 0, 0).unwrap()],
            },
        )
        .unwrap();

    assert_matches!(
        service.list_free_slots(doctor_id, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()),
        Err(SchedulingError::AvailabilityNotFound(_))
    );

    // Monday is covered.
    let slots = service
        .list_free_slots(doctor_id, NaiveDate::from_ymd_opt(2025, 6, 2).unwrap())
        .unwrap();
    assert_eq!(slots.len(), 1);
}
