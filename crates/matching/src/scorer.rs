use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::features::{MatchFeatures, FEATURE_COUNT};
use crate::log::{PredictionRecord, PredictionSink};

/// Suggestions at or above this confidence may be applied without human
/// review. Policy constant, not derived from any model.
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 95.0;

/// Suggestions at or above this confidence are surfaced as predicted
/// matches; below it they are predicted non-matches.
pub const MATCH_THRESHOLD: f64 = 50.0;

/// A trained model mapping a feature vector to a match probability in
/// [0, 1]. Training happens outside this crate; implementations wrap
/// whatever the model server or embedded weights provide.
pub trait Classifier: Send + Sync {
    fn model_name(&self) -> &str;

    fn predict(&self, features: &MatchFeatures) -> f64;
}

/// Logistic model over the normalized feature vector. Ships as the
/// default so scoring works before any externally trained model is
/// plugged in; the weights favour the signals a human reconciler checks
/// first (amount, date, text, reference).
pub struct WeightedClassifier {
    weights: [f64; FEATURE_COUNT],
    bias: f64,
}

impl Default for WeightedClassifier {
    fn default() -> Self {
        // Same order as FEATURE_NAMES.
        WeightedClassifier {
            weights: [
                -6.0, // amount_difference (normalized to [0,1])
                -0.2, // date_diff_days (capped at 30)
                2.5,  // text_similarity
                2.0,  // amount_ratio
                1.0,  // same_sense
                4.0,  // reference_match
                0.1,  // is_round_number
                0.1,  // is_month_end
                0.0,  // day_of_week_bt
                0.0,  // day_of_week_gl
                1.5,  // historical_match_rate
                0.0,  // avg_days_historical
            ],
            bias: -1.0,
        }
    }
}

impl WeightedClassifier {
    pub fn new(weights: [f64; FEATURE_COUNT], bias: f64) -> Self {
        WeightedClassifier { weights, bias }
    }
}

impl Classifier for WeightedClassifier {
    fn model_name(&self) -> &str {
        "weighted-logistic-v1"
    }

    fn predict(&self, features: &MatchFeatures) -> f64 {
        let values = features.normalized().to_array();
        let z: f64 = values
            .iter()
            .zip(self.weights.iter())
            .map(|(v, w)| v * w)
            .sum::<f64>()
            + self.bias;
        1.0 / (1.0 + (-z).exp())
    }
}

/// One scored candidate pair: confidence on a 0-100 scale, the binary
/// suggestion, and a reviewer-facing explanation.
#[derive(Debug, Clone)]
pub struct MatchScore {
    pub confidence: f64,
    pub predicted_match: bool,
    pub explanation: String,
    pub features: MatchFeatures,
}

impl MatchScore {
    pub fn is_high_confidence(&self) -> bool {
        self.confidence >= HIGH_CONFIDENCE_THRESHOLD
    }
}

/// Identifies the pair being scored, for the prediction log.
#[derive(Debug, Clone)]
pub struct ScoringContext {
    pub transaction_ref: String,
    pub ledger_entry_id: i64,
}

pub struct MatchScorer<C: Classifier> {
    classifier: C,
    log_failures: AtomicU64,
}

impl Default for MatchScorer<WeightedClassifier> {
    fn default() -> Self {
        Self::new(WeightedClassifier::default())
    }
}

impl<C: Classifier> MatchScorer<C> {
    pub fn new(classifier: C) -> Self {
        MatchScorer {
            classifier,
            log_failures: AtomicU64::new(0),
        }
    }

    pub fn score(&self, features: &MatchFeatures) -> MatchScore {
        let confidence = (self.classifier.predict(features) * 100.0).clamp(0.0, 100.0);
        MatchScore {
            confidence,
            predicted_match: confidence >= MATCH_THRESHOLD,
            explanation: build_explanation(features),
            features: *features,
        }
    }

    /// Score and append to the prediction log. A sink failure never
    /// withholds the score from the caller; it is logged and counted so
    /// operators can see the feedback loop leaking.
    pub fn score_and_log(
        &self,
        features: &MatchFeatures,
        context: &ScoringContext,
        sink: &dyn PredictionSink,
    ) -> MatchScore {
        let started = Instant::now();
        let score = self.score(features);
        let latency_ms = started.elapsed().as_millis() as u64;

        let record = PredictionRecord::new(
            self.classifier.model_name(),
            &context.transaction_ref,
            context.ledger_entry_id,
            &score,
            latency_ms,
        );

        if let Err(e) = sink.record(&record) {
            self.log_failures.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                error = %e,
                transaction_ref = %context.transaction_ref,
                "failed to persist prediction record"
            );
        }

        score
    }

    /// How many prediction-log writes have failed since construction.
    pub fn log_failures(&self) -> u64 {
        self.log_failures.load(Ordering::Relaxed)
    }
}

/// Human-readable justification from threshold checks on the raw
/// (un-normalized) features.
fn build_explanation(features: &MatchFeatures) -> String {
    let mut clauses: Vec<&str> = Vec::new();
    if features.amount_difference < 100.0 {
        clauses.push("amounts near-identical");
    }
    if features.date_diff_days <= 3.0 {
        clauses.push("dates close");
    }
    if features.text_similarity > 0.7 {
        clauses.push("descriptions similar");
    }
    if features.reference_match != 0.0 {
        clauses.push("references identical");
    }
    if clauses.is_empty() {
        "no strong signal".to_string()
    } else {
        clauses.join("; ")
    }
}
