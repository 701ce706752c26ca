use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;
use thiserror::Error;

use crate::scorer::MatchScore;

/// One logged prediction. Created at scoring time with no outcome;
/// mutated exactly once when a human validates or rejects the
/// suggestion, which is what turns it into training data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub model: String,
    pub transaction_ref: String,
    pub ledger_entry_id: i64,
    pub predicted_match: bool,
    /// 0-100 scale, same as [`MatchScore::confidence`].
    pub confidence: f64,
    /// Feature snapshot persisted for audit and retraining.
    pub features: BTreeMap<String, f64>,
    pub latency_ms: u64,
    pub actual_outcome: Option<bool>,
    pub was_correct: Option<bool>,
}

impl PredictionRecord {
    pub fn new(
        model: &str,
        transaction_ref: &str,
        ledger_entry_id: i64,
        score: &MatchScore,
        latency_ms: u64,
    ) -> Self {
        PredictionRecord {
            model: model.to_string(),
            transaction_ref: transaction_ref.to_string(),
            ledger_entry_id,
            predicted_match: score.predicted_match,
            confidence: score.confidence,
            features: score.features.to_map(),
            latency_ms,
            actual_outcome: None,
            was_correct: None,
        }
    }

    /// Record the human verdict. Idempotent: the first call decides and
    /// later calls return the already-derived correctness.
    pub fn resolve_outcome(&mut self, actual: bool) -> bool {
        if let Some(was_correct) = self.was_correct {
            return was_correct;
        }
        self.actual_outcome = Some(actual);
        let was_correct = self.predicted_match == actual;
        self.was_correct = Some(was_correct);
        was_correct
    }
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("prediction storage failure: {0}")]
    Storage(String),
}

/// Where prediction records go. The accounting application implements
/// this over its database; [`MemorySink`] serves tests and tooling.
pub trait PredictionSink: Send + Sync {
    fn record(&self, record: &PredictionRecord) -> Result<(), SinkError>;
}

/// In-memory sink.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<PredictionRecord>>,
}

impl MemorySink {
    pub fn records(&self) -> Vec<PredictionRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl PredictionSink for MemorySink {
    fn record(&self, record: &PredictionRecord) -> Result<(), SinkError> {
        self.records
            .lock()
            .map_err(|e| SinkError::Storage(e.to_string()))?
            .push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::MatchFeatures;

    fn record(predicted: bool) -> PredictionRecord {
        let score = MatchScore {
            confidence: if predicted { 80.0 } else { 20.0 },
            predicted_match: predicted,
            explanation: String::new(),
            features: MatchFeatures::default(),
        };
        PredictionRecord::new("test-model", "TXN001", 1, &score, 3)
    }

    #[test]
    fn new_record_has_no_outcome() {
        let r = record(true);
        assert!(r.actual_outcome.is_none());
        assert!(r.was_correct.is_none());
        assert_eq!(r.model, "test-model");
        assert_eq!(r.latency_ms, 3);
    }

    #[test]
    fn resolve_outcome_derives_correctness() {
        let mut correct = record(true);
        assert!(correct.resolve_outcome(true));
        assert_eq!(correct.actual_outcome, Some(true));
        assert_eq!(correct.was_correct, Some(true));

        let mut wrong = record(true);
        assert!(!wrong.resolve_outcome(false));
        assert_eq!(wrong.was_correct, Some(false));

        let mut true_negative = record(false);
        assert!(true_negative.resolve_outcome(false));
    }

    #[test]
    fn resolve_outcome_is_idempotent() {
        let mut r = record(true);
        assert!(r.resolve_outcome(true));
        // Second verdict does not overwrite the first.
        assert!(r.resolve_outcome(false));
        assert_eq!(r.actual_outcome, Some(true));
        assert_eq!(r.was_correct, Some(true));
    }

    #[test]
    fn feature_snapshot_is_carried() {
        let r = record(true);
        assert_eq!(r.features.len(), crate::features::FEATURE_COUNT);
        assert!(r.features.contains_key("amount_difference"));
    }

    #[test]
    fn memory_sink_stores_records() {
        let sink = MemorySink::default();
        sink.record(&record(true)).unwrap();
        sink.record(&record(false)).unwrap();
        assert_eq!(sink.records().len(), 2);
    }

    #[test]
    fn serde_round_trip() {
        let r = record(true);
        let json = serde_json::to_string(&r).unwrap();
        let back: PredictionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.transaction_ref, r.transaction_ref);
        assert_eq!(back.confidence, r.confidence);
        assert_eq!(back.features, r.features);
    }
}
