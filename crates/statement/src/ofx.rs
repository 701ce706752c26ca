use chrono::NaiveDate;
use concilio_core::{NormalizedTransaction, StatementFormat};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::{has_extension, ParseError, ParseOutcome, StatementParser};

/// OFX / QFX statement parser.
///
/// Real-world OFX is frequently OFX 1.x SGML: a colon-delimited header
/// block, then unclosed tags. Rather than fight an XML parser, this scans
/// line-by-line from the `<OFX>` root, which handles both SGML and the
/// well-formed OFX 2.x XML the same way. Anything before the root
/// (headers, BOM, stray bytes) is discarded.
pub struct OfxParser;

#[derive(Default)]
struct BuildingTrx {
    reference: Option<String>,
    date: Option<NaiveDate>,
    amount: Option<Decimal>,
    memo: Option<String>,
    name: Option<String>,
}

impl BuildingTrx {
    fn is_empty(&self) -> bool {
        self.reference.is_none()
            && self.date.is_none()
            && self.amount.is_none()
            && self.memo.is_none()
            && self.name.is_none()
    }
}

impl StatementParser for OfxParser {
    fn parse(&self, data: &[u8], _filename: &str) -> Result<ParseOutcome, ParseError> {
        let content = String::from_utf8_lossy(data);

        let root = content.find("<OFX>").ok_or_else(|| {
            ParseError::InvalidFormat(StatementFormat::Ofx, "missing <OFX> root".to_string())
        })?;
        let body = &content[root..];

        let mut outcome = ParseOutcome::default();
        let mut account_number: Option<String> = None;
        let mut currency: Option<String> = None;
        let mut in_stmttrn = false;
        let mut current: Option<BuildingTrx> = None;

        for line in body.lines() {
            let line = line.trim();
            let Some(tag) = line.strip_prefix('<') else {
                continue;
            };

            let (tag_name, value) = match tag.split_once('>') {
                Some((name, val)) => {
                    // OFX 2.x closes tags inline ("<TRNAMT>-100</TRNAMT>");
                    // SGML leaves the value bare. Cut at the closing tag.
                    let val = val.split("</").next().unwrap_or("");
                    (name.trim().to_uppercase(), non_empty(val))
                }
                None => (tag.trim_end_matches(['>', '\r']).to_uppercase(), None),
            };

            match tag_name.as_str() {
                "ACCTID" => {
                    if account_number.is_none() {
                        account_number = value;
                    }
                }
                "CURDEF" => {
                    if currency.is_none() {
                        currency = value;
                    }
                }
                "STMTTRN" => {
                    in_stmttrn = true;
                    current = Some(BuildingTrx::default());
                }
                "/STMTTRN" => {
                    if let Some(trx) = current.take() {
                        flush(trx, &mut outcome);
                    }
                    in_stmttrn = false;
                }
                _ if in_stmttrn => {
                    if let Some(ref mut trx) = current {
                        match tag_name.as_str() {
                            "FITID" => {
                                if value.is_some() {
                                    trx.reference = value;
                                }
                            }
                            "DTPOSTED" => trx.date = value.as_deref().and_then(parse_ofx_date),
                            "TRNAMT" => trx.amount = value.as_deref().and_then(parse_ofx_amount),
                            "MEMO" => trx.memo = value,
                            "NAME" => trx.name = value,
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }

        // SGML files routinely omit the closing </STMTTRN>.
        if let Some(trx) = current.take() {
            flush(trx, &mut outcome);
        }

        for tx in &mut outcome.transactions {
            tx.account_number = account_number.clone();
            tx.currency = currency.clone();
        }

        Ok(outcome)
    }

    fn supports(&self, filename: &str, content_type: Option<&str>) -> bool {
        has_extension(filename, &[".ofx", ".qfx"])
            || content_type.is_some_and(|ct| ct.to_lowercase().contains("ofx"))
    }

    fn format(&self) -> StatementFormat {
        StatementFormat::Ofx
    }
}

fn flush(trx: BuildingTrx, outcome: &mut ParseOutcome) {
    if trx.is_empty() {
        return;
    }
    let (Some(date), Some(amount)) = (trx.date, trx.amount) else {
        outcome.skip(
            StatementFormat::Ofx,
            format!(
                "STMTTRN missing date or amount (ref {})",
                trx.reference.as_deref().unwrap_or("?")
            ),
        );
        return;
    };

    let description = match (&trx.name, &trx.memo) {
        (Some(name), Some(memo)) => format!("{name} - {memo}"),
        (Some(name), None) => name.clone(),
        (None, Some(memo)) => memo.clone(),
        (None, None) => String::new(),
    };

    let mut tx = NormalizedTransaction::new(date, amount, description);
    tx.reference = trx.reference;
    tx.counterparty = trx.name;
    outcome.transactions.push(tx);
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// OFX dates are YYYYMMDD, often with a time and timezone suffix
/// ("20240115120000[-5:EST]") — only the first 8 characters matter.
fn parse_ofx_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.len() < 8 || !s.is_char_boundary(8) {
        return None;
    }
    let y: i32 = s[0..4].parse().ok()?;
    let m: u32 = s[4..6].parse().ok()?;
    let d: u32 = s[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)
}

fn parse_ofx_amount(s: &str) -> Option<Decimal> {
    let s = s.trim().replace(',', "");
    Decimal::from_str(&s).ok()
}
