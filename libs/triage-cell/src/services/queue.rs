// libs/triage-cell/src/services/queue.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_events::{DomainEvent, EventBus};
use shared_utils::Clock;

use crate::models::{
    AdmitCaseRequest, CaseQuery, CaseStatus, CaseView, EmergencyCase, TriageError,
    UpdateCaseRequest,
};
use crate::store::TriageStore;

pub struct TriageService {
    store: Arc<TriageStore>,
    events: EventBus,
    clock: Arc<dyn Clock>,
}

impl TriageService {
    pub fn new(store: Arc<TriageStore>, events: EventBus, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            events,
            clock,
        }
    }

    /// Register an arriving emergency case at the back of its triage level.
    pub fn admit(&self, request: AdmitCaseRequest) -> Result<CaseView, TriageError> {
        if request.chief_complaint.trim().is_empty() {
            return Err(TriageError::ValidationError(
                "chief complaint is required".to_string(),
            ));
        }
        if request.patient_name.trim().is_empty() {
            return Err(TriageError::ValidationError(
                "patient name is required".to_string(),
            ));
        }

        let now = self.clock.now();
        let case = EmergencyCase {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            patient_name: request.patient_name,
            triage_level: request.triage_level,
            chief_complaint: request.chief_complaint,
            vital_signs: request.vital_signs,
            status: CaseStatus::Waiting,
            arrival_time: now,
            treatment_start_time: None,
            discharge_time: None,
            assigned_doctor_id: None,
            notes: request.notes,
        };
        let stored = self.store.cases.insert(case.id, case)?;

        self.events.publish(DomainEvent::CaseAdmitted {
            case_id: stored.record.id,
            triage_level: stored.record.triage_level.to_string(),
            occurred_at: now,
        });

        info!(
            "case {} admitted at level {}",
            stored.record.id, stored.record.triage_level
        );
        Ok(self.view(stored.record, stored.version, now))
    }

    /// Queue ordered by urgency, then first-come within a level. Recomputed
    /// on every call; nothing about the ordering is stored.
    pub fn list(&self, query: &CaseQuery) -> Result<Vec<CaseView>, TriageError> {
        let now = self.clock.now();
        let mut entries = self.store.cases.filter(|case| {
            query.status.map_or(true, |s| case.status == s)
                && query.triage_level.map_or(true, |l| case.triage_level == l)
        })?;

        entries.sort_by_key(|v| (v.record.triage_level, v.record.arrival_time));

        Ok(entries
            .into_iter()
            .map(|v| self.view(v.record, v.version, now))
            .collect())
    }

    pub fn get(&self, case_id: Uuid) -> Result<CaseView, TriageError> {
        let stored = self
            .store
            .cases
            .get(case_id)?
            .ok_or(TriageError::CaseNotFound)?;
        Ok(self.view(stored.record, stored.version, self.clock.now()))
    }

    /// Apply a status change and/or re-triage. The write is protected by a
    /// version check against the state read here; a concurrent update makes
    /// this one fail with StaleWrite instead of silently clobbering it.
    pub fn update_case(
        &self,
        case_id: Uuid,
        request: UpdateCaseRequest,
    ) -> Result<CaseView, TriageError> {
        let stored = self
            .store
            .cases
            .get(case_id)?
            .ok_or(TriageError::CaseNotFound)?;
        let current = stored.record.status;

        if let Some(requested) = request.new_status {
            if !Self::valid_transitions(current).contains(&requested) {
                warn!(
                    "invalid case transition attempted on {}: {} -> {}",
                    case_id, current, requested
                );
                return Err(TriageError::InvalidTransition {
                    from: current,
                    to: requested,
                });
            }
        } else if current.is_terminal() && request.new_triage_level.is_some() {
            return Err(TriageError::ValidationError(
                "cannot re-triage a case in a terminal status".to_string(),
            ));
        }

        let now = self.clock.now();
        let expected_version = request.expected_version.unwrap_or(stored.version);
        let updated = self.store.cases.update(case_id, expected_version, |case| {
            if let Some(new_status) = request.new_status {
                if new_status == CaseStatus::InTreatment && case.treatment_start_time.is_none() {
                    case.treatment_start_time = Some(now);
                }
                if new_status.is_terminal() && case.discharge_time.is_none() {
                    case.discharge_time = Some(now);
                }
                case.status = new_status;
            }
            if let Some(level) = request.new_triage_level {
                debug!("re-triaging case {} to {}", case_id, level);
                case.triage_level = level;
            }
            if let Some(doctor_id) = request.assigned_doctor_id {
                case.assigned_doctor_id = Some(doctor_id);
            }
            if request.notes.is_some() {
                case.notes = request.notes.clone();
            }
        })?;

        self.events.publish(DomainEvent::CaseStatusChanged {
            case_id,
            from: current.to_string(),
            to: updated.record.status.to_string(),
            occurred_at: now,
        });

        info!(
            "case {} updated: {} -> {}",
            case_id, current, updated.record.status
        );
        Ok(self.view(updated.record, updated.version, now))
    }

    /// Legal next statuses. Waiting cases may leave before treatment;
    /// admitted cases still move on; discharged and transferred are final.
    pub fn valid_transitions(current: CaseStatus) -> Vec<CaseStatus> {
        match current {
            CaseStatus::Waiting => vec![
                CaseStatus::InTreatment,
                CaseStatus::Discharged,
                CaseStatus::Transferred,
            ],
            CaseStatus::InTreatment => vec![
                CaseStatus::Admitted,
                CaseStatus::Discharged,
                CaseStatus::Transferred,
            ],
            CaseStatus::Admitted => vec![CaseStatus::Discharged, CaseStatus::Transferred],
            CaseStatus::Discharged => vec![],
            CaseStatus::Transferred => vec![],
        }
    }

    /// Minutes waited. Live while waiting, frozen at the start of treatment,
    /// and frozen at departure for cases that left without being seen.
    fn wait_minutes(case: &EmergencyCase, now: DateTime<Utc>) -> i64 {
        let waited_until = match (case.treatment_start_time, case.discharge_time) {
            (Some(treatment_start), _) => treatment_start,
            (None, Some(departed)) => departed,
            (None, None) => now,
        };
        (waited_until - case.arrival_time).num_minutes()
    }

    fn view(&self, case: EmergencyCase, version: u64, now: DateTime<Utc>) -> CaseView {
        let wait_minutes = Self::wait_minutes(&case, now);
        CaseView {
            case,
            wait_minutes,
            version,
        }
    }
}
