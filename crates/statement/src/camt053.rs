use chrono::NaiveDate;
use concilio_core::{NormalizedTransaction, StatementFormat};
use quick_xml::events::Event;
use quick_xml::Reader;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::{has_extension, ParseError, ParseOutcome, StatementParser};

/// ISO 20022 camt.053 statement parser.
///
/// Banks disagree on the namespace they declare (camt.053.001.02 through
/// .08 and the occasional proprietary URN), so all element matching is on
/// local names only. The reader is event-driven and keeps a path of open
/// elements; entry fields are picked out by where the text sits relative
/// to the enclosing `Ntry`.
pub struct Camt053Parser;

#[derive(Default)]
struct BuildingEntry {
    booking_date: Option<NaiveDate>,
    value_date: Option<NaiveDate>,
    amount: Option<Decimal>,
    currency: Option<String>,
    debit: Option<bool>,
    reference: Option<String>,
    creditor: Option<String>,
    debtor: Option<String>,
    unstructured: Vec<String>,
    additional_tx_info: Option<String>,
    additional_entry_info: Option<String>,
}

impl StatementParser for Camt053Parser {
    fn parse(&self, data: &[u8], _filename: &str) -> Result<ParseOutcome, ParseError> {
        let mut reader = Reader::from_reader(data);
        reader.config_mut().trim_text(true);

        let mut outcome = ParseOutcome::default();
        let mut buf = Vec::new();
        let mut path: Vec<String> = Vec::new();
        let mut saw_element = false;

        let mut account_number: Option<String> = None;
        let mut account_fallback: Option<String> = None;
        let mut current: Option<BuildingEntry> = None;
        // Set while the path sits inside an <Amt> that belongs to the
        // current entry; carries the Ccy attribute.
        let mut pending_currency: Option<String> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    saw_element = true;
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();

                    if name == "Ntry" && current.is_none() {
                        current = Some(BuildingEntry::default());
                    }

                    if name == "Amt" && current.is_some() {
                        pending_currency = None;
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"Ccy" {
                                if let Ok(v) = attr.unescape_value() {
                                    pending_currency = Some(v.into_owned());
                                }
                            }
                        }
                    }

                    path.push(name);
                }
                Ok(Event::End(_)) => {
                    let name = path.pop().unwrap_or_default();
                    if name == "Ntry" {
                        if let Some(entry) = current.take() {
                            finalize(entry, account_number.as_deref().or(account_fallback.as_deref()), &mut outcome);
                        }
                    }
                }
                Ok(Event::Text(t)) => {
                    let text = t
                        .unescape()
                        .map_err(|e| ParseError::Xml(e.to_string()))?
                        .trim()
                        .to_string();
                    if text.is_empty() {
                        continue;
                    }

                    match &mut current {
                        Some(entry) => collect_entry_text(entry, &path, &text, &mut pending_currency),
                        None => {
                            // Statement-level account identification.
                            if ends_with(&path, &["Acct", "Id", "IBAN"]) && account_number.is_none() {
                                account_number = Some(text);
                            } else if ends_with(&path, &["Acct", "Id", "Othr", "Id"])
                                && account_fallback.is_none()
                            {
                                account_fallback = Some(text);
                            }
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(ParseError::Xml(e.to_string())),
            }
            buf.clear();
        }

        if !saw_element {
            return Err(ParseError::InvalidFormat(
                StatementFormat::Camt053,
                "not an XML document".to_string(),
            ));
        }

        Ok(outcome)
    }

    fn supports(&self, filename: &str, content_type: Option<&str>) -> bool {
        has_extension(filename, &[".xml", ".camt", ".camt053"])
            || content_type.is_some_and(|ct| ct.to_lowercase().contains("xml"))
    }

    fn format(&self) -> StatementFormat {
        StatementFormat::Camt053
    }
}

fn collect_entry_text(
    entry: &mut BuildingEntry,
    path: &[String],
    text: &str,
    pending_currency: &mut Option<String>,
) {
    let last = path.last().map(String::as_str).unwrap_or("");

    match last {
        // Entry-level amount only; TxDtls repeats it per sub-transaction.
        "Amt" if entry.amount.is_none() => {
            entry.amount = Decimal::from_str(text).ok();
            entry.currency = pending_currency.take();
        }
        "CdtDbtInd" if entry.debit.is_none() => {
            entry.debit = Some(text == "DBIT");
        }
        "AcctSvcrRef" if entry.reference.is_none() => {
            entry.reference = Some(text.to_string());
        }
        "AddtlTxInf" if entry.additional_tx_info.is_none() => {
            entry.additional_tx_info = Some(text.to_string());
        }
        "AddtlNtryInf" if entry.additional_entry_info.is_none() => {
            entry.additional_entry_info = Some(text.to_string());
        }
        "Dt" | "DtTm" => {
            if path.iter().rev().nth(1).is_some_and(|p| p == "BookgDt") {
                entry.booking_date = entry.booking_date.or_else(|| parse_iso_date(text));
            } else if path.iter().rev().nth(1).is_some_and(|p| p == "ValDt") {
                entry.value_date = entry.value_date.or_else(|| parse_iso_date(text));
            }
        }
        "Ustrd" => {
            if path.iter().rev().nth(1).is_some_and(|p| p == "RmtInf") {
                entry.unstructured.push(text.to_string());
            }
        }
        "Nm" => {
            if path.iter().rev().nth(1).is_some_and(|p| p == "Cdtr") && entry.creditor.is_none() {
                entry.creditor = Some(text.to_string());
            } else if path.iter().rev().nth(1).is_some_and(|p| p == "Dbtr")
                && entry.debtor.is_none()
            {
                entry.debtor = Some(text.to_string());
            }
        }
        _ => {}
    }
}

fn finalize(entry: BuildingEntry, account_number: Option<&str>, outcome: &mut ParseOutcome) {
    let (Some(date), Some(amount)) = (entry.booking_date, entry.amount) else {
        outcome.skip(
            StatementFormat::Camt053,
            format!(
                "Ntry missing booking date or amount (ref {})",
                entry.reference.as_deref().unwrap_or("?")
            ),
        );
        return;
    };

    let amount = if entry.debit == Some(true) { -amount } else { amount };

    // Description preference: structured remittance info, then
    // transaction-level info, then entry-level info.
    let description = if !entry.unstructured.is_empty() {
        entry.unstructured.join(" ")
    } else if let Some(info) = &entry.additional_tx_info {
        info.clone()
    } else {
        entry.additional_entry_info.clone().unwrap_or_default()
    };

    let mut tx = NormalizedTransaction::new(date, amount, description);
    tx.value_date = entry.value_date;
    tx.reference = entry.reference;
    tx.counterparty = entry.creditor.or(entry.debtor);
    tx.account_number = account_number.map(str::to_string);
    tx.currency = entry.currency;
    tx.raw_info = entry.additional_entry_info;
    outcome.transactions.push(tx);
}

fn ends_with(path: &[String], suffix: &[&str]) -> bool {
    path.len() >= suffix.len()
        && path[path.len() - suffix.len()..]
            .iter()
            .zip(suffix)
            .all(|(a, b)| a == b)
}

fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    // DtTm carries a full timestamp; the date is always the first 10 chars.
    let s = s.get(0..10)?;
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}
