pub mod features;
pub mod log;
pub mod scorer;
pub(crate) mod util;

pub use features::{extract_features, MatchFeatures, MatchHistory, FEATURE_COUNT, FEATURE_NAMES};
pub use log::{MemorySink, PredictionRecord, PredictionSink, SinkError};
pub use scorer::{
    Classifier, MatchScore, MatchScorer, ScoringContext, WeightedClassifier,
    HIGH_CONFIDENCE_THRESHOLD, MATCH_THRESHOLD,
};
