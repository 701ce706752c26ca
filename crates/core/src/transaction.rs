use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single bank-statement entry normalized out of whatever export format
/// the bank produced.
///
/// Sign convention: positive amounts are credits (money in), negative
/// amounts are debits (money out). Every parser must honour this — the
/// reconciliation layer matches on signed amounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTransaction {
    /// Booking date.
    pub date: NaiveDate,
    /// Value date, when the bank distinguishes it from the booking date.
    pub value_date: Option<NaiveDate>,
    /// Signed amount in the statement currency.
    pub amount: Decimal,
    pub description: String,
    /// Bank-assigned reference, used downstream for dedup.
    pub reference: Option<String>,
    pub counterparty: Option<String>,
    pub account_number: Option<String>,
    /// ISO 4217 code, e.g. "XAF".
    pub currency: Option<String>,
    /// Balance after this transaction, when the format carries one.
    pub balance: Option<Decimal>,
    /// Unmapped additional info kept verbatim for audit.
    pub raw_info: Option<String>,
}

impl NormalizedTransaction {
    pub fn new(date: NaiveDate, amount: Decimal, description: impl Into<String>) -> Self {
        NormalizedTransaction {
            date,
            value_date: None,
            amount,
            description: description.into(),
            reference: None,
            counterparty: None,
            account_number: None,
            currency: None,
            balance: None,
            raw_info: None,
        }
    }

    pub fn is_credit(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    pub fn is_debit(&self) -> bool {
        self.amount < Decimal::ZERO
    }
}

/// A candidate ledger entry supplied by the accounting layer for matching
/// against a bank transaction. Same sign convention as
/// [`NormalizedTransaction`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
    pub reference: Option<String>,
    pub account_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn credit_and_debit_follow_sign() {
        let credit = NormalizedTransaction::new(date(2024, 1, 15), Decimal::from(1000), "Vente");
        assert!(credit.is_credit());
        assert!(!credit.is_debit());

        let debit = NormalizedTransaction::new(date(2024, 1, 15), Decimal::from(-500), "Achat");
        assert!(debit.is_debit());
        assert!(!debit.is_credit());
    }

    #[test]
    fn zero_amount_is_neither() {
        let tx = NormalizedTransaction::new(date(2024, 1, 15), Decimal::ZERO, "Frais");
        assert!(!tx.is_credit());
        assert!(!tx.is_debit());
    }

    #[test]
    fn optional_fields_default_to_none() {
        let tx = NormalizedTransaction::new(date(2024, 1, 15), Decimal::from(100), "X");
        assert!(tx.value_date.is_none());
        assert!(tx.reference.is_none());
        assert!(tx.balance.is_none());
    }
}
