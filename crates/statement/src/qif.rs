use chrono::NaiveDate;
use concilio_core::{NormalizedTransaction, StatementFormat};
use rust_decimal::Decimal;

use crate::util::{parse_flex_amount, parse_flex_date};
use crate::{has_extension, ParseError, ParseOutcome, StatementParser};

/// Quicken Interchange Format parser.
///
/// Each line carries a one-letter field code; a lone `^` terminates the
/// transaction. A record is only emitted once it has both a date and an
/// amount — QIF files routinely carry memo-only fragments that are not
/// transactions.
pub struct QifParser;

#[derive(Default)]
struct BuildingEntry {
    date: Option<NaiveDate>,
    amount: Option<Decimal>,
    payee: Option<String>,
    memo: Option<String>,
    reference: Option<String>,
    cleared: Option<String>,
    seen_any: bool,
}

impl StatementParser for QifParser {
    fn parse(&self, data: &[u8], _filename: &str) -> Result<ParseOutcome, ParseError> {
        let content = String::from_utf8_lossy(data);

        let mut outcome = ParseOutcome::default();
        let mut current = BuildingEntry::default();

        for raw_line in content.lines() {
            let line = raw_line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }

            // Type headers like "!Type:Bank" carry no record data.
            if line.starts_with('!') {
                continue;
            }

            if line == "^" {
                flush(std::mem::take(&mut current), &mut outcome);
                continue;
            }

            let Some(code) = line.chars().next() else {
                continue;
            };
            let value = line[code.len_utf8()..].trim();
            current.seen_any = true;

            match code {
                'D' => current.date = parse_flex_date(value),
                // U duplicates T in Quicken exports; either counts.
                'T' | 'U' => current.amount = parse_flex_amount(value),
                'P' => current.payee = non_empty(value),
                'M' => current.memo = non_empty(value),
                'N' => current.reference = non_empty(value),
                'C' => current.cleared = non_empty(value),
                _ => {}
            }
        }

        // No terminator after the last record is common.
        flush(current, &mut outcome);

        Ok(outcome)
    }

    fn supports(&self, filename: &str, content_type: Option<&str>) -> bool {
        let _ = content_type;
        has_extension(filename, &[".qif"])
    }

    fn format(&self) -> StatementFormat {
        StatementFormat::Qif
    }
}

fn flush(entry: BuildingEntry, outcome: &mut ParseOutcome) {
    if !entry.seen_any {
        return;
    }
    let (Some(date), Some(amount)) = (entry.date, entry.amount) else {
        outcome.skip(
            StatementFormat::Qif,
            format!(
                "record missing date or amount (payee {})",
                entry.payee.as_deref().unwrap_or("?")
            ),
        );
        return;
    };

    let description = match (&entry.payee, &entry.memo) {
        (Some(payee), Some(memo)) => format!("{payee} - {memo}"),
        (Some(payee), None) => payee.clone(),
        (None, Some(memo)) => memo.clone(),
        (None, None) => String::new(),
    };

    let mut tx = NormalizedTransaction::new(date, amount, description);
    tx.reference = entry.reference;
    tx.counterparty = entry.payee;
    tx.raw_info = entry.cleared.map(|c| format!("cleared: {c}"));
    outcome.transactions.push(tx);
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}
