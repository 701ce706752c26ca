use chrono::NaiveDate;
use concilio_core::{NormalizedTransaction, StatementFormat};
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::{has_extension, ParseError, ParseOutcome, StatementParser};

/// SWIFT MT940 statement parser.
///
/// Line-oriented state machine keyed by tag prefix: `:25:` carries the
/// account number, `:61:` opens a transaction, `:86:` and its untagged
/// continuation lines accumulate the description. A `:61:` line flushes
/// whatever transaction was being built; end of stream flushes the last
/// one since nothing guarantees a trailing tag.
pub struct Mt940Parser;

/// `:61:` layout — value date YYMMDD, optional booking date MMDD,
/// C/D indicator (possibly reversal RC/RD), amount terminated at the
/// first character that is neither a digit nor a separator, then an
/// optional transaction type code and the reference tail.
fn statement_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^:61:(?P<val>\d{6})(?P<book>\d{4})?(?P<dc>RC|RD|C|D)(?P<amt>[\d,\.]+)(?P<tx>[A-Z][A-Z0-9]{3})?(?P<ref>.*)$",
        )
        .expect("hardcoded :61: pattern")
    })
}

struct BuildingEntry {
    date: NaiveDate,
    value_date: Option<NaiveDate>,
    amount: Decimal,
    description: String,
    reference: Option<String>,
}

impl StatementParser for Mt940Parser {
    fn parse(&self, data: &[u8], _filename: &str) -> Result<ParseOutcome, ParseError> {
        let content = String::from_utf8_lossy(data);

        if !content.lines().any(|l| l.trim_start().starts_with(':')) {
            return Err(ParseError::InvalidFormat(
                StatementFormat::Mt940,
                "no SWIFT tags found".to_string(),
            ));
        }

        let mut outcome = ParseOutcome::default();
        let mut account_number: Option<String> = None;
        let mut current: Option<BuildingEntry> = None;
        let mut in_field_86 = false;

        for raw_line in content.lines() {
            let line = raw_line.trim_end_matches('\r');

            if let Some(value) = line.strip_prefix(":25:") {
                account_number = Some(value.trim().to_string());
                in_field_86 = false;
            } else if line.starts_with(":61:") {
                if let Some(entry) = current.take() {
                    flush(entry, account_number.as_deref(), &mut outcome);
                }
                in_field_86 = false;
                match parse_statement_line(line) {
                    Ok(entry) => current = Some(entry),
                    Err(reason) => outcome.skip(StatementFormat::Mt940, reason),
                }
            } else if let Some(value) = line.strip_prefix(":86:") {
                if let Some(ref mut entry) = current {
                    append_description(&mut entry.description, value.trim());
                    in_field_86 = true;
                }
            } else if line.starts_with(':') {
                // Some other tag (:20:, :60F:, :62F:, ...) — ends any
                // running :86: continuation.
                in_field_86 = false;
            } else if in_field_86 {
                if let Some(ref mut entry) = current {
                    append_description(&mut entry.description, line.trim());
                }
            }
        }

        if let Some(entry) = current.take() {
            flush(entry, account_number.as_deref(), &mut outcome);
        }

        Ok(outcome)
    }

    fn supports(&self, filename: &str, content_type: Option<&str>) -> bool {
        let _ = content_type;
        has_extension(filename, &[".mt940", ".sta", ".940"])
    }

    fn format(&self) -> StatementFormat {
        StatementFormat::Mt940
    }
}

fn parse_statement_line(line: &str) -> Result<BuildingEntry, String> {
    let caps = statement_line_re()
        .captures(line)
        .ok_or_else(|| format!("malformed :61: line: '{line}'"))?;

    let value_date = parse_swift_date(&caps["val"])
        .ok_or_else(|| format!("invalid value date in :61: line: '{line}'"))?;

    let booking_date = match caps.name("book") {
        Some(book) => parse_booking_date(value_date, book.as_str())
            .ok_or_else(|| format!("invalid booking date in :61: line: '{line}'"))?,
        None => value_date,
    };

    let raw_amount = caps["amt"].replace(',', ".");
    let amount = Decimal::from_str(raw_amount.trim_end_matches('.'))
        .map_err(|_| format!("invalid amount in :61: line: '{line}'"))?;

    // D and RD (reversal of credit) are money out.
    let amount = match &caps["dc"] {
        "D" | "RD" => -amount,
        _ => amount,
    };

    let reference = caps
        .name("ref")
        .map(|m| m.as_str().trim().trim_start_matches("//").trim().to_string())
        .filter(|s| !s.is_empty() && s != "NONREF");

    Ok(BuildingEntry {
        date: booking_date,
        value_date: Some(value_date),
        amount,
        description: String::new(),
        reference,
    })
}

fn flush(entry: BuildingEntry, account_number: Option<&str>, outcome: &mut ParseOutcome) {
    let mut tx = NormalizedTransaction::new(entry.date, entry.amount, entry.description);
    tx.value_date = entry.value_date;
    tx.reference = entry.reference;
    tx.account_number = account_number.map(str::to_string);
    outcome.transactions.push(tx);
}

fn append_description(description: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    if !description.is_empty() {
        description.push(' ');
    }
    description.push_str(text);
}

/// YYMMDD with a fixed 2000 pivot — SWIFT statements in circulation are
/// all post-2000.
fn parse_swift_date(s: &str) -> Option<NaiveDate> {
    let y: i32 = s[0..2].parse().ok()?;
    let m: u32 = s[2..4].parse().ok()?;
    let d: u32 = s[4..6].parse().ok()?;
    NaiveDate::from_ymd_opt(2000 + y, m, d)
}

/// Booking date is MMDD; the year comes from the value date.
fn parse_booking_date(value_date: NaiveDate, s: &str) -> Option<NaiveDate> {
    use chrono::Datelike;
    let m: u32 = s[0..2].parse().ok()?;
    let d: u32 = s[2..4].parse().ok()?;
    NaiveDate::from_ymd_opt(value_date.year(), m, d)
}
