//! Patient analytics.
//!
//! Readings carry only a `sessionId`, so the pipeline first joins each reading to its session
//! to learn which patient it belongs to:
//!
//! 1. `Lookup` sessions by `sessionId` into `session`
//! 2. `Unwind` `session`
//! 3. `Match` on `session.patientId` and the `timestamp` window
//! 4. `Group` everything into one document of averages, a count and a maximum
//! 5. `Project` away the group key

use crate::constants::{READINGS_COLLECTION, SESSIONS_COLLECTION};
use crate::models::PatientAnalytics;
use crate::repositories::to_json;
use crate::RecordResult;
use chrono::{DateTime, Utc};
use dialysis_store::document::from_document;
use dialysis_store::{
    Accumulator, DocumentStore, Filter, Pipeline, Projection, Stage, ID_FIELD,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AnalyticsService {
    store: Arc<dyn DocumentStore>,
}

impl AnalyticsService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Aggregates a patient's readings, optionally within an inclusive `timestamp` window.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when no reading matches.
    pub fn patient_summary(
        &self,
        patient_id: &str,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> RecordResult<Option<PatientAnalytics>> {
        let pipeline = patient_pipeline(patient_id, start_date, end_date)?;
        let mut groups = self.store.aggregate(READINGS_COLLECTION, &pipeline)?;
        if groups.is_empty() {
            return Ok(None);
        }
        Ok(Some(from_document(groups.swap_remove(0))?))
    }
}

/// Builds the aggregation pipeline for one patient.
pub fn patient_pipeline(
    patient_id: &str,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
) -> RecordResult<Pipeline> {
    let window = Filter::range(
        "timestamp",
        start_date.as_ref().map(to_json).transpose()?,
        end_date.as_ref().map(to_json).transpose()?,
    );

    Ok(Pipeline::new()
        .stage(Stage::Lookup {
            from: SESSIONS_COLLECTION.into(),
            local_field: "sessionId".into(),
            foreign_field: "sessionId".into(),
            as_field: "session".into(),
        })
        .stage(Stage::Unwind("session".into()))
        .stage(Stage::Match(
            Filter::equals("session.patientId", patient_id).and(window),
        ))
        .stage(Stage::Group {
            key: None,
            accumulators: vec![
                (
                    "avgHeartRate".into(),
                    Accumulator::Avg("vitalSigns.heartRate".into()),
                ),
                (
                    "avgDialysisProgress".into(),
                    Accumulator::Avg("vitalSigns.dialysisProgress".into()),
                ),
                (
                    "avgFlowRate".into(),
                    Accumulator::Avg("fluidManagement.flowRate".into()),
                ),
                ("totalReadings".into(), Accumulator::Count),
                (
                    "maxSeismicMagnitude".into(),
                    Accumulator::Max("seismic.magnitude".into()),
                ),
            ],
        })
        .stage(Stage::Project(Projection::Exclude(vec![ID_FIELD.into()]))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewReading, NewSession};
    use crate::repositories::test_support::services;
    use crate::repositories::RecordServices;
    use crate::validation::decode_json;
    use serde_json::json;

    fn start_session(services: &RecordServices, patient_id: &str) -> String {
        let req: NewSession = decode_json(json!({
            "patientId": patient_id,
            "startTime": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        services.sessions.create(req).unwrap().session_id
    }

    fn record(services: &RecordServices, session_id: &str, timestamp: &str, body: serde_json::Value) {
        let mut reading = json!({"sessionId": session_id, "timestamp": timestamp});
        if let (Some(target), Some(extra)) = (reading.as_object_mut(), body.as_object()) {
            target.extend(extra.clone());
        }
        let req: NewReading = decode_json(reading).expect("reading body should decode");
        services.readings.record(req).expect("record should succeed");
    }

    #[test]
    fn test_pipeline_has_five_stages_in_order() {
        let pipeline = patient_pipeline("P1", None, None).unwrap();
        let stages = pipeline.stages();

        assert_eq!(stages.len(), 5);
        assert!(matches!(stages[0], Stage::Lookup { .. }));
        assert!(matches!(stages[1], Stage::Unwind(_)));
        assert!(matches!(stages[2], Stage::Match(_)));
        assert!(matches!(stages[3], Stage::Group { key: None, .. }));
        assert!(matches!(stages[4], Stage::Project(Projection::Exclude(_))));
    }

    #[test]
    fn test_no_readings_is_none() {
        let services = services();
        start_session(&services, "P1");

        let summary = services.analytics.patient_summary("P1", None, None).unwrap();
        assert!(summary.is_none());
    }

    #[test]
    fn test_summary_averages_and_max() {
        let services = services();
        let session = start_session(&services, "P1");
        let other = start_session(&services, "P2");

        record(
            &services,
            &session,
            "2024-01-01T00:01:00Z",
            json!({
                "vitalSigns": {"heartRate": 70, "dialysisProgress": 10},
                "fluidManagement": {"flowRate": 300},
                "seismic": {"magnitude": 1.0}
            }),
        );
        record(
            &services,
            &session,
            "2024-01-01T00:02:00Z",
            json!({
                "vitalSigns": {"heartRate": 80, "dialysisProgress": 30},
                "fluidManagement": {"flowRate": 320},
                "seismic": {"magnitude": 3.5}
            }),
        );
        record(
            &services,
            &other,
            "2024-01-01T00:03:00Z",
            json!({"vitalSigns": {"heartRate": 200}, "seismic": {"magnitude": 9.0}}),
        );

        let summary = services
            .analytics
            .patient_summary("P1", None, None)
            .unwrap()
            .expect("summary should exist");

        assert_eq!(summary.total_readings, 2);
        assert_eq!(summary.avg_heart_rate, Some(75.0));
        assert_eq!(summary.avg_dialysis_progress, Some(20.0));
        assert_eq!(summary.avg_flow_rate, Some(310.0));
        assert_eq!(summary.max_seismic_magnitude, Some(3.5));
    }

    #[test]
    fn test_summary_respects_window_and_missing_values() {
        let services = services();
        let session = start_session(&services, "P1");

        record(
            &services,
            &session,
            "2024-01-01T00:00:00Z",
            json!({"vitalSigns": {"heartRate": 100}}),
        );
        record(&services, &session, "2024-01-02T00:00:00Z", json!({}));
        record(
            &services,
            &session,
            "2024-01-03T00:00:00Z",
            json!({"vitalSigns": {"heartRate": 60}}),
        );

        let summary = services
            .analytics
            .patient_summary(
                "P1",
                Some("2024-01-02T00:00:00Z".parse().unwrap()),
                Some("2024-01-03T00:00:00Z".parse().unwrap()),
            )
            .unwrap()
            .expect("summary should exist");

        assert_eq!(summary.total_readings, 2);
        assert_eq!(summary.avg_heart_rate, Some(60.0));
        assert_eq!(summary.avg_flow_rate, None);
        assert_eq!(summary.max_seismic_magnitude, None);
    }

    #[test]
    fn test_readings_without_a_session_are_ignored() {
        let services = services();
        record(
            &services,
            "SES_1_P1",
            "2024-01-01T00:00:00Z",
            json!({"vitalSigns": {"heartRate": 100}}),
        );

        assert!(services
            .analytics
            .patient_summary("P1", None, None)
            .unwrap()
            .is_none());
    }
}
