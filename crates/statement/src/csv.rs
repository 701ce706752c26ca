use concilio_core::{NormalizedTransaction, StatementFormat};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::util::{parse_flex_amount, parse_flex_date};
use crate::{has_extension, ParseError, ParseOutcome, StatementParser};

/// Generic CSV statement parser.
///
/// Column layout is inferred from the header row: when both a
/// debit-labelled and a credit-labelled column are present (French or
/// English spelling), each row's amount is credit minus debit; otherwise
/// a single signed amount column is used. The delimiter is picked
/// between `;` and `,` by counting occurrences in the header line —
/// CEMAC bank exports overwhelmingly use `;`.
pub struct CsvParser;

/// Explicit column layout for banks whose exports defeat header
/// detection. Passed per call; the parser itself stays stateless so one
/// instance can serve concurrent imports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvTemplate {
    pub delimiter: Option<u8>,
    pub has_header: bool,
    pub date_column: usize,
    pub description_column: Option<usize>,
    pub amount_column: Option<usize>,
    pub debit_column: Option<usize>,
    pub credit_column: Option<usize>,
    pub reference_column: Option<usize>,
    /// chrono format string tried before the flexible fallback list.
    pub date_format: Option<String>,
}

impl Default for CsvTemplate {
    fn default() -> Self {
        CsvTemplate {
            delimiter: None,
            has_header: true,
            date_column: 0,
            description_column: Some(1),
            amount_column: Some(2),
            debit_column: None,
            credit_column: None,
            reference_column: None,
            date_format: None,
        }
    }
}

/// Resolved column layout for one parse call.
struct Layout {
    date: usize,
    description: Option<usize>,
    reference: Option<usize>,
    amount: AmountColumns,
    date_format: Option<String>,
}

enum AmountColumns {
    /// One signed column.
    Single(usize),
    /// Separate debit/credit columns; amount = credit - debit.
    DebitCredit { debit: usize, credit: usize },
}

impl StatementParser for CsvParser {
    fn parse(&self, data: &[u8], _filename: &str) -> Result<ParseOutcome, ParseError> {
        let content = String::from_utf8_lossy(data);

        let header_line = content.lines().find(|l| !l.trim().is_empty());
        let Some(header_line) = header_line else {
            return Ok(ParseOutcome::default());
        };
        let delimiter = detect_delimiter(header_line);

        let mut reader = ::csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| normalize_header(h))
            .collect();
        let layout = infer_layout(&headers);

        self.parse_records(&mut reader, &layout)
    }

    fn supports(&self, filename: &str, content_type: Option<&str>) -> bool {
        has_extension(filename, &[".csv", ".txt"])
            || content_type.is_some_and(|ct| ct.to_lowercase().contains("csv"))
    }

    fn format(&self) -> StatementFormat {
        StatementFormat::CsvGeneric
    }
}

impl CsvParser {
    /// Parse with an explicit template instead of header inference.
    pub fn parse_with_template(
        &self,
        data: &[u8],
        template: &CsvTemplate,
    ) -> Result<ParseOutcome, ParseError> {
        let content = String::from_utf8_lossy(data);

        let delimiter = template.delimiter.unwrap_or_else(|| {
            content
                .lines()
                .find(|l| !l.trim().is_empty())
                .map(detect_delimiter)
                .unwrap_or(b';')
        });

        let mut reader = ::csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(template.has_header)
            .flexible(true)
            .from_reader(content.as_bytes());

        let amount = match (template.debit_column, template.credit_column) {
            (Some(debit), Some(credit)) => AmountColumns::DebitCredit { debit, credit },
            _ => AmountColumns::Single(template.amount_column.unwrap_or(2)),
        };
        let layout = Layout {
            date: template.date_column,
            description: template.description_column,
            reference: template.reference_column,
            amount,
            date_format: template.date_format.clone(),
        };

        self.parse_records(&mut reader, &layout)
    }

    fn parse_records<R: std::io::Read>(
        &self,
        reader: &mut ::csv::Reader<R>,
        layout: &Layout,
    ) -> Result<ParseOutcome, ParseError> {
        let mut outcome = ParseOutcome::default();

        for (row_index, result) in reader.records().enumerate() {
            let row_number = row_index + 1;
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    outcome.skip(
                        StatementFormat::CsvGeneric,
                        format!("row {row_number}: unreadable ({e})"),
                    );
                    continue;
                }
            };
            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }

            let raw_date = record.get(layout.date).unwrap_or_default();
            let date = layout
                .date_format
                .as_deref()
                .and_then(|fmt| chrono::NaiveDate::parse_from_str(raw_date.trim(), fmt).ok())
                .or_else(|| parse_flex_date(raw_date));
            let Some(date) = date else {
                outcome.skip(
                    StatementFormat::CsvGeneric,
                    format!("row {row_number}: unparsable date '{raw_date}'"),
                );
                continue;
            };

            let amount = match layout.amount {
                AmountColumns::Single(col) => {
                    let raw = record.get(col).unwrap_or_default();
                    match parse_flex_amount(raw) {
                        Some(a) => a,
                        None => {
                            outcome.skip(
                                StatementFormat::CsvGeneric,
                                format!("row {row_number}: unparsable amount '{raw}'"),
                            );
                            continue;
                        }
                    }
                }
                AmountColumns::DebitCredit { debit, credit } => {
                    match signed_from_debit_credit(&record, debit, credit) {
                        Ok(a) => a,
                        Err(raw) => {
                            outcome.skip(
                                StatementFormat::CsvGeneric,
                                format!("row {row_number}: unparsable amount '{raw}'"),
                            );
                            continue;
                        }
                    }
                }
            };

            let description = layout
                .description
                .and_then(|col| record.get(col))
                .unwrap_or_default()
                .trim()
                .to_string();

            let mut tx = NormalizedTransaction::new(date, amount, description);
            tx.reference = layout
                .reference
                .and_then(|col| record.get(col))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            outcome.transactions.push(tx);
        }

        Ok(outcome)
    }
}

/// Empty debit/credit cells count as zero; a non-empty cell that does
/// not parse invalidates the row.
fn signed_from_debit_credit(
    record: &::csv::StringRecord,
    debit_col: usize,
    credit_col: usize,
) -> Result<Decimal, String> {
    let cell = |col: usize| -> Result<Decimal, String> {
        let raw = record.get(col).unwrap_or_default().trim();
        if raw.is_empty() {
            return Ok(Decimal::ZERO);
        }
        parse_flex_amount(raw).ok_or_else(|| raw.to_string())
    };
    let debit = cell(debit_col)?;
    let credit = cell(credit_col)?;
    Ok(credit - debit)
}

fn detect_delimiter(header_line: &str) -> u8 {
    let semicolons = header_line.matches(';').count();
    let commas = header_line.matches(',').count();
    if semicolons >= commas && semicolons > 0 {
        b';'
    } else {
        b','
    }
}

/// Lowercase and fold the accents that show up in French bank headers,
/// so "Débit" and "debit" land on the same keyword.
fn normalize_header(h: &str) -> String {
    h.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'à' | 'â' => 'a',
            'î' | 'ï' => 'i',
            'ô' => 'o',
            'û' | 'ù' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

fn find_column(headers: &[String], keywords: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| keywords.iter().any(|k| h.contains(k)))
}

fn infer_layout(headers: &[String]) -> Layout {
    let debit = find_column(headers, &["debit"]);
    let credit = find_column(headers, &["credit"]);

    let amount = match (debit, credit) {
        (Some(debit), Some(credit)) => AmountColumns::DebitCredit { debit, credit },
        _ => AmountColumns::Single(
            find_column(headers, &["montant", "amount"]).unwrap_or(2),
        ),
    };

    let date = find_column(headers, &["date"]).unwrap_or(0);

    // Positional fallback for the description, unless column 1 is already
    // claimed by an amount or date column.
    let claimed = |col: usize| -> bool {
        col == date
            || match amount {
                AmountColumns::Single(a) => col == a,
                AmountColumns::DebitCredit { debit, credit } => col == debit || col == credit,
            }
    };
    let description = find_column(headers, &["libell", "description", "motif", "detail"])
        .or_else(|| (!claimed(1)).then_some(1));

    Layout {
        date,
        description,
        reference: find_column(headers, &["ref"]),
        amount,
        date_format: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    // ── header inference ──────────────────────────────────────────────────────

    #[test]
    fn debit_credit_headers_give_signed_amounts() {
        let data = "Date;D\u{e9}bit;Cr\u{e9}dit;Description\n01/03/2024;1000;0;Achat\n02/03/2024;0;2500;Vente\n";
        let outcome = CsvParser.parse(data.as_bytes(), "releve.csv").unwrap();
        assert_eq!(outcome.transactions.len(), 2);
        assert_eq!(outcome.transactions[0].amount, Decimal::from(-1000));
        assert_eq!(outcome.transactions[0].description, "Achat");
        assert_eq!(outcome.transactions[1].amount, Decimal::from(2500));
    }

    #[test]
    fn single_amount_header_keeps_sign() {
        let data = "Date;Montant;Description\n01/03/2024;1000;Vente\n";
        let outcome = CsvParser.parse(data.as_bytes(), "releve.csv").unwrap();
        assert_eq!(outcome.transactions[0].amount, Decimal::from(1000));
    }

    #[test]
    fn comma_delimited_detected() {
        let data = "Date,Description,Montant,R\u{e9}f\u{e9}rence\n01/01/2024,Vente,1000,R1\n";
        let outcome = CsvParser.parse(data.as_bytes(), "releve.csv").unwrap();
        assert_eq!(outcome.transactions.len(), 1);
        assert_eq!(outcome.transactions[0].reference.as_deref(), Some("R1"));
    }

    #[test]
    fn unlabelled_columns_fall_back_to_positions() {
        let data = "a;b;c\n01/03/2024;Achat;-500\n";
        let outcome = CsvParser.parse(data.as_bytes(), "releve.csv").unwrap();
        assert_eq!(outcome.transactions[0].amount, Decimal::from(-500));
        assert_eq!(outcome.transactions[0].description, "Achat");
    }

    // ── best-effort row skipping ──────────────────────────────────────────────

    #[test]
    fn bad_date_row_is_skipped_not_fatal() {
        let data = "Date;Montant;Description\n\
                    01/03/2024;100;a\n\
                    02/03/2024;200;b\n\
                    pas-une-date;300;c\n\
                    04/03/2024;400;d\n\
                    05/03/2024;500;e\n";
        let outcome = CsvParser.parse(data.as_bytes(), "releve.csv").unwrap();
        assert_eq!(outcome.transactions.len(), 4);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("pas-une-date"));
    }

    #[test]
    fn bad_amount_row_is_skipped() {
        let data = "Date;Montant\n01/03/2024;abc\n02/03/2024;100\n";
        let outcome = CsvParser.parse(data.as_bytes(), "releve.csv").unwrap();
        assert_eq!(outcome.transactions.len(), 1);
        assert_eq!(outcome.skipped, 1);
    }

    #[test]
    fn nonempty_unparsable_debit_invalidates_row() {
        let data = "Date;Debit;Credit\n01/03/2024;oops;100\n02/03/2024;;200\n";
        let outcome = CsvParser.parse(data.as_bytes(), "releve.csv").unwrap();
        assert_eq!(outcome.transactions.len(), 1);
        assert_eq!(outcome.transactions[0].amount, Decimal::from(200));
        assert_eq!(outcome.skipped, 1);
    }

    #[test]
    fn empty_input_yields_empty_outcome() {
        let outcome = CsvParser.parse(b"", "releve.csv").unwrap();
        assert!(outcome.transactions.is_empty());
        assert_eq!(outcome.skipped, 0);
    }

    // ── end-to-end scenario ───────────────────────────────────────────────────

    #[test]
    fn three_row_statement_parses_in_order() {
        let data = "Date,Description,Montant,R\u{e9}f\u{e9}rence\n\
                    01/01/2024,Vente comptant,1000,REF-A\n\
                    02/01/2024,Achat fournitures,-500,REF-B\n\
                    03/01/2024,Virement client,2000.50,REF-C\n";
        let outcome = CsvParser.parse(data.as_bytes(), "releve.csv").unwrap();
        assert_eq!(outcome.transactions.len(), 3);
        assert_eq!(outcome.skipped, 0);

        let t = &outcome.transactions;
        assert_eq!(t[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(t[0].amount, Decimal::from(1000));
        assert_eq!(t[0].description, "Vente comptant");
        assert_eq!(t[0].reference.as_deref(), Some("REF-A"));
        assert_eq!(t[1].amount, Decimal::from(-500));
        assert_eq!(t[2].date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(t[2].amount, Decimal::from_str("2000.50").unwrap());
    }

    // ── template mode ─────────────────────────────────────────────────────────

    #[test]
    fn template_overrides_header_inference() {
        let data = "ignored;header;row\n01/03/2024;R9;750\n";
        let template = CsvTemplate {
            amount_column: Some(2),
            description_column: None,
            reference_column: Some(1),
            ..CsvTemplate::default()
        };
        let outcome = CsvParser
            .parse_with_template(data.as_bytes(), &template)
            .unwrap();
        assert_eq!(outcome.transactions[0].amount, Decimal::from(750));
        assert_eq!(outcome.transactions[0].reference.as_deref(), Some("R9"));
        assert_eq!(outcome.transactions[0].description, "");
    }

    #[test]
    fn template_without_header() {
        let data = "01/03/2024;Achat;-500\n";
        let template = CsvTemplate {
            has_header: false,
            ..CsvTemplate::default()
        };
        let outcome = CsvParser
            .parse_with_template(data.as_bytes(), &template)
            .unwrap();
        assert_eq!(outcome.transactions.len(), 1);
        assert_eq!(outcome.transactions[0].description, "Achat");
    }

    #[test]
    fn template_explicit_date_format() {
        let data = "2024.03.01;X;100\n";
        let template = CsvTemplate {
            has_header: false,
            date_format: Some("%Y.%m.%d".to_string()),
            ..CsvTemplate::default()
        };
        let outcome = CsvParser
            .parse_with_template(data.as_bytes(), &template)
            .unwrap();
        assert_eq!(
            outcome.transactions[0].date,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn template_debit_credit_columns() {
        let data = "01/03/2024;desc;1000;\n02/03/2024;desc;;2500\n";
        let template = CsvTemplate {
            has_header: false,
            debit_column: Some(2),
            credit_column: Some(3),
            ..CsvTemplate::default()
        };
        let outcome = CsvParser
            .parse_with_template(data.as_bytes(), &template)
            .unwrap();
        assert_eq!(outcome.transactions[0].amount, Decimal::from(-1000));
        assert_eq!(outcome.transactions[1].amount, Decimal::from(2500));
    }

    // ── helpers ───────────────────────────────────────────────────────────────

    #[test]
    fn delimiter_detection() {
        assert_eq!(detect_delimiter("a;b;c"), b';');
        assert_eq!(detect_delimiter("a,b,c"), b',');
        assert_eq!(detect_delimiter("a"), b',');
    }

    #[test]
    fn header_normalization_folds_accents() {
        assert_eq!(normalize_header(" D\u{e9}bit "), "debit");
        assert_eq!(normalize_header("CR\u{c9}DIT"), "credit");
    }

    #[test]
    fn supports_csv_and_text() {
        assert!(CsvParser.supports("releve.csv", None));
        assert!(CsvParser.supports("upload.bin", Some("text/csv")));
        assert!(!CsvParser.supports("releve.ofx", None));
    }
}
