use concilio_core::{BankProvider, StatementFormat};

/// Export formats each known bank actually produces, most preferred first.
fn preferred_formats(provider: BankProvider) -> &'static [StatementFormat] {
    use StatementFormat::*;
    match provider {
        BankProvider::Sgbc => &[Camt053, Mt940, CsvGeneric],
        BankProvider::AfrilandFirstBank => &[Mt940, CsvGeneric],
        BankProvider::EcobankCemac | BankProvider::EcobankUemoa => &[Ofx, CsvGeneric],
        BankProvider::UbaCameroun | BankProvider::UbaGroup => &[Ofx, Mt940, CsvGeneric],
        BankProvider::Bicec | BankProvider::Boa => &[CsvGeneric, Mt940],
        BankProvider::StandardBank => &[Mt940, Camt053, CsvGeneric],
        BankProvider::Other => &[CsvGeneric],
    }
}

fn format_from_extension(filename: &str) -> Option<StatementFormat> {
    let lower = filename.to_lowercase();
    let ext = lower.rsplit('.').next()?;
    match ext {
        "ofx" | "qfx" => Some(StatementFormat::Ofx),
        "mt940" | "sta" => Some(StatementFormat::Mt940),
        "xml" | "camt" => Some(StatementFormat::Camt053),
        "qif" => Some(StatementFormat::Qif),
        "csv" => Some(StatementFormat::CsvGeneric),
        _ => None,
    }
}

fn format_from_content_type(content_type: &str) -> Option<StatementFormat> {
    let ct = content_type.to_lowercase();
    if ct.contains("ofx") {
        Some(StatementFormat::Ofx)
    } else if ct.contains("xml") {
        Some(StatementFormat::Camt053)
    } else if ct.contains("csv") {
        Some(StatementFormat::CsvGeneric)
    } else {
        None
    }
}

/// Decide which format a statement upload most likely is.
///
/// A provider hint narrows the choice to what that bank exports,
/// intersected with the filename evidence. Detection is total: anything
/// unresolvable falls through to generic CSV, never an error.
pub fn detect_format(
    filename: &str,
    content_type: Option<&str>,
    provider: Option<BankProvider>,
) -> StatementFormat {
    let evidence = format_from_extension(filename)
        .or_else(|| content_type.and_then(format_from_content_type));

    if let Some(provider) = provider {
        let preferred = preferred_formats(provider);
        // Filename evidence is direct; trust it even when the table says
        // the bank exports something else. No evidence at all means the
        // bank's most likely format.
        return evidence.unwrap_or(preferred[0]);
    }

    evidence.unwrap_or(StatementFormat::CsvGeneric)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_only_detection() {
        assert_eq!(detect_format("releve.ofx", None, None), StatementFormat::Ofx);
        assert_eq!(detect_format("releve.QFX", None, None), StatementFormat::Ofx);
        assert_eq!(detect_format("releve.mt940", None, None), StatementFormat::Mt940);
        assert_eq!(detect_format("releve.sta", None, None), StatementFormat::Mt940);
        assert_eq!(detect_format("releve.xml", None, None), StatementFormat::Camt053);
        assert_eq!(detect_format("releve.qif", None, None), StatementFormat::Qif);
        assert_eq!(detect_format("releve.csv", None, None), StatementFormat::CsvGeneric);
    }

    #[test]
    fn unknown_extension_falls_to_csv() {
        assert_eq!(detect_format("releve.pdf", None, None), StatementFormat::CsvGeneric);
        assert_eq!(detect_format("releve", None, None), StatementFormat::CsvGeneric);
    }

    #[test]
    fn content_type_used_when_extension_unknown() {
        assert_eq!(
            detect_format("upload.bin", Some("application/x-ofx"), None),
            StatementFormat::Ofx
        );
        assert_eq!(
            detect_format("upload.bin", Some("text/xml"), None),
            StatementFormat::Camt053
        );
    }

    #[test]
    fn sgbc_prefers_camt_without_extension_evidence() {
        assert_eq!(
            detect_format("export", None, Some(BankProvider::Sgbc)),
            StatementFormat::Camt053
        );
    }

    #[test]
    fn afriland_prefers_mt940() {
        assert_eq!(
            detect_format("export.dat", None, Some(BankProvider::AfrilandFirstBank)),
            StatementFormat::Mt940
        );
    }

    #[test]
    fn ecobank_prefers_ofx() {
        assert_eq!(
            detect_format("export", None, Some(BankProvider::EcobankCemac)),
            StatementFormat::Ofx
        );
    }

    #[test]
    fn extension_evidence_wins_over_provider_table() {
        // SGBC never exports QIF per the table, but the extension is
        // direct evidence from the actual file.
        assert_eq!(
            detect_format("export.qif", None, Some(BankProvider::Sgbc)),
            StatementFormat::Qif
        );
    }

    #[test]
    fn provider_table_intersects_with_extension() {
        assert_eq!(
            detect_format("export.mt940", None, Some(BankProvider::Sgbc)),
            StatementFormat::Mt940
        );
    }
}
