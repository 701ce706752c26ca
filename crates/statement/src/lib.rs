pub mod camt053;
pub mod csv;
pub mod detect;
pub mod mt940;
pub mod ofx;
pub mod qif;
pub mod registry;
pub(crate) mod util;

pub use camt053::Camt053Parser;
pub use csv::{CsvParser, CsvTemplate};
pub use detect::detect_format;
pub use mt940::Mt940Parser;
pub use ofx::OfxParser;
pub use qif::QifParser;
pub use registry::ParserRegistry;

use concilio_core::{NormalizedTransaction, StatementFormat};
use thiserror::Error;

/// Container-level failures. Record-level problems never reach this type:
/// a malformed row is skipped and counted in [`ParseOutcome::skipped`].
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Invalid {0} file: {1}")]
    InvalidFormat(StatementFormat, String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML error: {0}")]
    Xml(String),
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
}

/// What a parse call hands back: the valid records, plus how many entries
/// were dropped and why. Import summaries report parsed vs. total from this.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub transactions: Vec<NormalizedTransaction>,
    pub skipped: usize,
    pub warnings: Vec<String>,
}

impl ParseOutcome {
    pub(crate) fn skip(&mut self, format: StatementFormat, reason: String) {
        tracing::warn!(format = %format, %reason, "skipping unparsable record");
        self.skipped += 1;
        self.warnings.push(reason);
    }
}

/// Common contract for the five statement parsers.
///
/// Parsing is best-effort per record: one bad entry is skipped with a
/// warning, never fatal. Only container-level corruption (an OFX stream
/// without an `<OFX>` root, XML that does not parse) fails the whole call.
/// Parsers hold no per-parse state, so one instance is safe to share
/// across threads.
pub trait StatementParser: Send + Sync {
    fn parse(&self, data: &[u8], filename: &str) -> Result<ParseOutcome, ParseError>;

    fn supports(&self, filename: &str, content_type: Option<&str>) -> bool;

    fn format(&self) -> StatementFormat;
}

pub(crate) fn has_extension(filename: &str, extensions: &[&str]) -> bool {
    let lower = filename.to_lowercase();
    extensions.iter().any(|ext| lower.ends_with(ext))
}
