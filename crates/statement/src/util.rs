use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Locale-tolerant date parsing. Formats are tried in a fixed preference
/// order: day-first (the dominant convention for CEMAC bank exports), ISO,
/// then US month-first as a last resort.
pub fn parse_flex_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in &["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    None
}

/// Amount parsing for bank exports: strips regular and non-breaking
/// spaces, accepts a comma as the decimal separator when no dot is
/// present, and treats parenthesized values as negative.
pub fn parse_flex_amount(s: &str) -> Option<Decimal> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (negative, s) = if s.starts_with('(') && s.ends_with(')') {
        (true, &s[1..s.len() - 1])
    } else {
        (false, s)
    };

    let mut cleaned = s.replace([' ', '\u{a0}'], "");
    if cleaned.contains(',') {
        if cleaned.contains('.') {
            // "1.234,56" and "1,234.56" both appear in the wild; whichever
            // separator comes last is the decimal one.
            if cleaned.rfind(',') > cleaned.rfind('.') {
                cleaned = cleaned.replace('.', "").replace(',', ".");
            } else {
                cleaned = cleaned.replace(',', "");
            }
        } else {
            cleaned = cleaned.replace(',', ".");
        }
    }

    let mut dec = Decimal::from_str(&cleaned).ok()?;
    if negative {
        dec = -dec;
    }
    Some(dec)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── parse_flex_date ───────────────────────────────────────────────────────

    #[test]
    fn date_day_first() {
        assert_eq!(
            parse_flex_date("01/03/2024"),
            Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );
    }

    #[test]
    fn date_iso() {
        assert_eq!(
            parse_flex_date("2024-03-01"),
            Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );
    }

    #[test]
    fn date_single_digit_day_and_month() {
        assert_eq!(
            parse_flex_date("1/3/2024"),
            Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
        );
    }

    #[test]
    fn date_us_fallback() {
        // Day-first cannot yield month 25, so the US pattern catches it.
        assert_eq!(
            parse_flex_date("12/25/2024"),
            Some(NaiveDate::from_ymd_opt(2024, 12, 25).unwrap())
        );
    }

    #[test]
    fn date_invalid_is_none() {
        assert_eq!(parse_flex_date("not-a-date"), None);
        assert_eq!(parse_flex_date(""), None);
    }

    // ── parse_flex_amount ─────────────────────────────────────────────────────

    #[test]
    fn amount_plain() {
        assert_eq!(parse_flex_amount("1000"), Some(Decimal::from(1000)));
    }

    #[test]
    fn amount_comma_decimal() {
        assert_eq!(
            parse_flex_amount("2000,50"),
            Some(Decimal::from_str("2000.50").unwrap())
        );
    }

    #[test]
    fn amount_spaces_stripped() {
        assert_eq!(parse_flex_amount("1 500 000"), Some(Decimal::from(1_500_000)));
        assert_eq!(parse_flex_amount("1\u{a0}500"), Some(Decimal::from(1500)));
    }

    #[test]
    fn amount_parenthesized_negative() {
        assert_eq!(parse_flex_amount("(750)"), Some(Decimal::from(-750)));
    }

    #[test]
    fn amount_mixed_separators() {
        assert_eq!(
            parse_flex_amount("1.234,56"),
            Some(Decimal::from_str("1234.56").unwrap())
        );
        assert_eq!(
            parse_flex_amount("1,234.56"),
            Some(Decimal::from_str("1234.56").unwrap())
        );
    }

    #[test]
    fn amount_invalid_is_none() {
        assert_eq!(parse_flex_amount("abc"), None);
        assert_eq!(parse_flex_amount(""), None);
    }
}
