use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use shared_events::{DomainEvent, EventBus};
use shared_utils::{Clock, ManualClock};
use triage_cell::models::{
    AdmitCaseRequest, CaseQuery, CaseStatus, TriageError, TriageLevel, UpdateCaseRequest,
};
use triage_cell::{TriageService, TriageStore};

fn test_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::at("2025-06-01T10:00:00Z".parse().unwrap()))
}

fn test_service(clock: Arc<ManualClock>) -> (TriageService, UnboundedReceiver<DomainEvent>) {
    let (bus, rx) = EventBus::new();
    let service = TriageService::new(Arc::new(TriageStore::new()), bus, clock as Arc<dyn Clock>);
    (service, rx)
}

fn admit_request(name: &str, level: TriageLevel) -> AdmitCaseRequest {
    AdmitCaseRequest {
        patient_id: None,
        patient_name: name.to_string(),
        triage_level: level,
        chief_complaint: "chest pain".to_string(),
        vital_signs: None,
        notes: None,
    }
}

fn status_change(new_status: CaseStatus) -> UpdateCaseRequest {
    UpdateCaseRequest {
        new_status: Some(new_status),
        ..Default::default()
    }
}

#[tokio::test]
async fn queue_orders_by_level_then_arrival() {
    let clock = test_clock();
    let (service, _rx) = test_service(Arc::clone(&clock));

    // Insertion order deliberately scrambled against the expected output.
    let urgent_first = service
        .admit(admit_request("first urgent", TriageLevel::Urgent))
        .unwrap();
    clock.advance(Duration::minutes(1));
    let immediate = service
        .admit(admit_request("immediate", TriageLevel::Immediate))
        .unwrap();
    clock.advance(Duration::minutes(1));
    let urgent_second = service
        .admit(admit_request("second urgent", TriageLevel::Urgent))
        .unwrap();
    clock.advance(Duration::minutes(1));
    let non_urgent = service
        .admit(admit_request("non urgent", TriageLevel::NonUrgent))
        .unwrap();

    let listed = service.list(&CaseQuery::default()).unwrap();
    let ids: Vec<Uuid> = listed.iter().map(|view| view.case.id).collect();

    assert_eq!(
        ids,
        vec![
            immediate.case.id,
            urgent_first.case.id,
            urgent_second.case.id,
            non_urgent.case.id
        ]
    );
}

#[tokio::test]
async fn level_one_arriving_first_stays_ahead_of_later_level_three() {
    let clock = test_clock();
    let (service, _rx) = test_service(Arc::clone(&clock));

    let immediate = service
        .admit(admit_request("level one", TriageLevel::Immediate))
        .unwrap();
    clock.advance(Duration::minutes(1));
    service
        .admit(admit_request("level three", TriageLevel::Urgent))
        .unwrap();

    let listed = service.list(&CaseQuery::default()).unwrap();
    assert_eq!(listed[0].case.id, immediate.case.id);
}

#[tokio::test]
async fn admit_requires_chief_complaint() {
    let (service, _rx) = test_service(test_clock());

    let mut request = admit_request("walk in", TriageLevel::Urgent);
    request.chief_complaint = "   ".to_string();

    assert_matches!(service.admit(request), Err(TriageError::ValidationError(_)));
}

#[tokio::test]
async fn wait_time_grows_while_waiting_and_freezes_on_treatment() {
    let clock = test_clock();
    let (service, _rx) = test_service(Arc::clone(&clock));

    let admitted = service
        .admit(admit_request("waiting", TriageLevel::Emergent))
        .unwrap();
    assert_eq!(admitted.wait_minutes, 0);

    clock.advance(Duration::minutes(10));
    let after_ten = service.get(admitted.case.id).unwrap();
    assert_eq!(after_ten.wait_minutes, 10);

    clock.advance(Duration::minutes(15));
    let after_twenty_five = service.get(admitted.case.id).unwrap();
    assert_eq!(after_twenty_five.wait_minutes, 25);

    let in_treatment = service
        .update_case(admitted.case.id, status_change(CaseStatus::InTreatment))
        .unwrap();
    assert_eq!(in_treatment.wait_minutes, 25);
    assert!(in_treatment.case.treatment_start_time.is_some());

    // Frozen: more elapsed time no longer counts as waiting.
    clock.advance(Duration::minutes(30));
    let later = service.get(admitted.case.id).unwrap();
    assert_eq!(later.wait_minutes, 25);
}

#[tokio::test]
async fn treatment_and_discharge_timestamps_are_set_once() {
    let clock = test_clock();
    let (service, _rx) = test_service(Arc::clone(&clock));

    let case = service
        .admit(admit_request("full path", TriageLevel::Immediate))
        .unwrap();
    let arrival = case.case.arrival_time;

    clock.advance(Duration::minutes(5));
    let treating = service
        .update_case(case.case.id, status_change(CaseStatus::InTreatment))
        .unwrap();
    let treatment_start = treating.case.treatment_start_time.unwrap();
    assert_eq!(treatment_start - arrival, Duration::minutes(5));

    clock.advance(Duration::minutes(40));
    let admitted = service
        .update_case(case.case.id, status_change(CaseStatus::Admitted))
        .unwrap();
    assert!(admitted.case.discharge_time.is_none());

    clock.advance(Duration::hours(2));
    let discharged = service
        .update_case(case.case.id, status_change(CaseStatus::Discharged))
        .unwrap();
    assert_eq!(discharged.case.treatment_start_time.unwrap(), treatment_start);
    assert!(discharged.case.discharge_time.is_some());
}

#[tokio::test]
async fn waiting_case_may_leave_before_treatment() {
    let clock = test_clock();
    let (service, _rx) = test_service(Arc::clone(&clock));

    let case = service
        .admit(admit_request("left early", TriageLevel::LessUrgent))
        .unwrap();

    clock.advance(Duration::minutes(45));
    let departed = service
        .update_case(case.case.id, status_change(CaseStatus::Transferred))
        .unwrap();

    assert!(departed.case.treatment_start_time.is_none());
    assert!(departed.case.discharge_time.is_some());
    assert_eq!(departed.wait_minutes, 45);

    // Wait time stays frozen at departure.
    clock.advance(Duration::hours(1));
    assert_eq!(service.get(case.case.id).unwrap().wait_minutes, 45);
}

#[tokio::test]
async fn terminal_cases_reject_further_transitions() {
    let (service, _rx) = test_service(test_clock());

    let case = service
        .admit(admit_request("done", TriageLevel::Urgent))
        .unwrap();
    service
        .update_case(case.case.id, status_change(CaseStatus::Discharged))
        .unwrap();

    assert_matches!(
        service.update_case(case.case.id, status_change(CaseStatus::InTreatment)),
        Err(TriageError::InvalidTransition {
            from: CaseStatus::Discharged,
            ..
        })
    );

    assert_matches!(
        service.update_case(
            case.case.id,
            UpdateCaseRequest {
                new_triage_level: Some(TriageLevel::Immediate),
                ..Default::default()
            },
        ),
        Err(TriageError::ValidationError(_))
    );
}

#[tokio::test]
async fn re_triage_takes_effect_in_ordering_immediately() {
    let clock = test_clock();
    let (service, _rx) = test_service(Arc::clone(&clock));

    let first = service
        .admit(admit_request("first", TriageLevel::Urgent))
        .unwrap();
    clock.advance(Duration::minutes(1));
    let second = service
        .admit(admit_request("second", TriageLevel::Urgent))
        .unwrap();

    service
        .update_case(
            second.case.id,
            UpdateCaseRequest {
                new_triage_level: Some(TriageLevel::Immediate),
                ..Default::default()
            },
        )
        .unwrap();

    let listed = service.list(&CaseQuery::default()).unwrap();
    assert_eq!(listed[0].case.id, second.case.id);
    assert_eq!(listed[1].case.id, first.case.id);
}

#[tokio::test]
async fn stale_version_is_rejected_without_clobbering() {
    let (service, _rx) = test_service(test_clock());

    let case = service
        .admit(admit_request("contended", TriageLevel::Emergent))
        .unwrap();
    assert_eq!(case.version, 1);

    // First writer lands normally.
    let updated = service
        .update_case(case.case.id, status_change(CaseStatus::InTreatment))
        .unwrap();
    assert_eq!(updated.version, 2);

    // Second writer still holds the version from before that update.
    let stale = UpdateCaseRequest {
        new_triage_level: Some(TriageLevel::NonUrgent),
        expected_version: Some(case.version),
        ..Default::default()
    };
    assert_matches!(
        service.update_case(case.case.id, stale),
        Err(TriageError::StaleWrite)
    );

    let current = service.get(case.case.id).unwrap();
    assert_eq!(current.case.triage_level, TriageLevel::Emergent);
    assert_eq!(current.case.status, CaseStatus::InTreatment);
}

#[tokio::test]
async fn admission_and_updates_emit_events() {
    let (service, mut rx) = test_service(test_clock());

    let case = service
        .admit(admit_request("eventful", TriageLevel::Immediate))
        .unwrap();
    service
        .update_case(case.case.id, status_change(CaseStatus::InTreatment))
        .unwrap();

    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        kinds.push(event.kind());
    }
    assert_eq!(kinds, vec!["case_admitted", "case_status_changed"]);
}

#[tokio::test]
async fn status_filter_narrows_the_board() {
    let (service, _rx) = test_service(test_clock());

    let waiting = service
        .admit(admit_request("waiting", TriageLevel::Urgent))
        .unwrap();
    let treated = service
        .admit(admit_request("treated", TriageLevel::Urgent))
        .unwrap();
    service
        .update_case(treated.case.id, status_change(CaseStatus::InTreatment))
        .unwrap();

    let only_waiting = service
        .list(&CaseQuery {
            status: Some(CaseStatus::Waiting),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(only_waiting.len(), 1);
    assert_eq!(only_waiting[0].case.id, waiting.case.id);
}
