use chrono::{Datelike, NaiveDate};
use concilio_core::{LedgerEntry, NormalizedTransaction};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::util::description_similarity;

/// Declares the feature struct, the name list, and the array conversions
/// from one field list, so the positional encoding and the names can
/// never drift apart. Consumers index `to_array()` by the position of the
/// name in `FEATURE_NAMES`.
macro_rules! match_features {
    ($($name:ident),+ $(,)?) => {
        /// Numeric description of one (bank transaction, ledger entry)
        /// candidate pair. Binary facts are encoded 0.0/1.0 so the whole
        /// vector is uniform for the classifier; anything missing on
        /// either side is 0.0, never a sentinel.
        #[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
        pub struct MatchFeatures {
            $(pub $name: f64,)+
        }

        /// Length of the feature vector.
        pub const FEATURE_COUNT: usize = [$(stringify!($name)),+].len();

        /// Feature names, in vector order.
        pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [$(stringify!($name)),+];

        impl MatchFeatures {
            /// Positional encoding; `to_array()[i]` is the value of
            /// `FEATURE_NAMES[i]`.
            pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
                [$(self.$name),+]
            }

            pub fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
                let [$($name),+] = values;
                MatchFeatures { $($name),+ }
            }
        }
    };
}

match_features!(
    amount_difference,
    date_diff_days,
    text_similarity,
    amount_ratio,
    same_sense,
    reference_match,
    is_round_number,
    is_month_end,
    day_of_week_bt,
    day_of_week_gl,
    historical_match_rate,
    avg_days_historical,
);

impl MatchFeatures {
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        FEATURE_NAMES
            .iter()
            .map(|n| n.to_string())
            .zip(self.to_array())
            .collect()
    }

    /// Missing keys coerce to 0.0, matching the extraction convention.
    pub fn from_map(map: &BTreeMap<String, f64>) -> Self {
        Self::from_array(FEATURE_NAMES.map(|n| map.get(n).copied().unwrap_or(0.0)))
    }

    /// JSON projection persisted with each prediction for audit and
    /// retraining.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!(self.to_map())
    }

    /// Tolerant of missing keys and nulls; both read as 0.0.
    pub fn from_json(value: &serde_json::Value) -> Self {
        Self::from_array(
            FEATURE_NAMES.map(|n| value.get(n).and_then(serde_json::Value::as_f64).unwrap_or(0.0)),
        )
    }

    /// Scale the unbounded features into ranges the classifier was
    /// trained on: amount delta to [0, 1] against a 100 000-unit span,
    /// date delta capped at 30 days.
    pub fn normalized(&self) -> Self {
        MatchFeatures {
            amount_difference: (self.amount_difference / 100_000.0).min(1.0),
            date_diff_days: self.date_diff_days.min(30.0),
            ..*self
        }
    }
}

/// Aggregate matching history for the account or counterparty, supplied
/// by the reconciliation layer when it has any.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MatchHistory {
    /// Share of past suggestions that were confirmed, in [0, 1].
    pub match_rate: f64,
    /// Average days between booking and confirmation.
    pub avg_days_to_match: f64,
}

/// Compute the feature vector for one candidate pair.
pub fn extract_features(
    bank: &NormalizedTransaction,
    ledger: &LedgerEntry,
    history: Option<&MatchHistory>,
) -> MatchFeatures {
    let bank_amount = bank.amount.to_f64().unwrap_or(0.0);
    let ledger_amount = ledger.amount.to_f64().unwrap_or(0.0);

    MatchFeatures {
        amount_difference: (bank_amount - ledger_amount).abs(),
        date_diff_days: (bank.date - ledger.date).num_days().abs() as f64,
        text_similarity: description_similarity(&bank.description, &ledger.description),
        amount_ratio: amount_ratio(bank_amount, ledger_amount),
        same_sense: bool_feature(bank_amount.signum() == ledger_amount.signum()),
        reference_match: bool_feature(references_match(
            bank.reference.as_deref(),
            ledger.reference.as_deref(),
        )),
        is_round_number: bool_feature(is_round_amount(bank.amount)),
        is_month_end: bool_feature(is_month_end(bank.date)),
        day_of_week_bt: f64::from(bank.date.weekday().number_from_monday()),
        day_of_week_gl: f64::from(ledger.date.weekday().number_from_monday()),
        historical_match_rate: history.map_or(0.0, |h| h.match_rate),
        avg_days_historical: history.map_or(0.0, |h| h.avg_days_to_match),
    }
}

fn bool_feature(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

fn amount_ratio(a: f64, b: f64) -> f64 {
    let (a, b) = (a.abs(), b.abs());
    if a == 0.0 || b == 0.0 {
        return 0.0;
    }
    a.min(b) / a.max(b)
}

fn references_match(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => {
            let a = a.trim().to_uppercase();
            !a.is_empty() && a == b.trim().to_uppercase()
        }
        _ => false,
    }
}

/// Round amounts (whole multiples of 1 000) are disproportionately
/// transfers and cash operations, which the classifier cares about.
fn is_round_amount(amount: Decimal) -> bool {
    !amount.is_zero() && (amount.abs() % Decimal::from(1000)).is_zero()
}

fn is_month_end(date: NaiveDate) -> bool {
    let days_in_month = days_in_month(date);
    date.day() > days_in_month - 3
}

fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.pred_opt())
        .map_or(31, |d| d.day())
}
