use serde::{Deserialize, Serialize};
use std::fmt;

/// Statement export formats we can ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementFormat {
    /// OFX 1.x SGML or OFX 2.x XML.
    Ofx,
    /// SWIFT MT940 tagged text.
    Mt940,
    /// ISO 20022 camt.053 XML.
    Camt053,
    /// Quicken interchange format.
    Qif,
    /// Generic delimited text, header-driven.
    CsvGeneric,
}

impl fmt::Display for StatementFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementFormat::Ofx => write!(f, "OFX"),
            StatementFormat::Mt940 => write!(f, "MT940"),
            StatementFormat::Camt053 => write!(f, "CAMT.053"),
            StatementFormat::Qif => write!(f, "QIF"),
            StatementFormat::CsvGeneric => write!(f, "CSV"),
        }
    }
}
