use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};
use tracing::debug;

// ── DateCoercer ───────────────────────────────────────────────────────────────

/// Leniently parses the `Date` cell of a spreadsheet row.
///
/// Parsing never fails loudly: anything unrecognised becomes `None` and the
/// caller keeps the row.
pub struct DateCoercer;

/// Day zero of the spreadsheet serial-date system.
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Largest serial a spreadsheet accepts (9999-12-31).
const MAX_SERIAL: f64 = 2_958_465.0;

impl DateCoercer {
    const DATE_FORMATS: &'static [&'static str] = &[
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%m/%d/%Y",
        "%m-%d-%Y",
        "%d-%b-%Y",
        "%d %b %Y",
        "%d %B %Y",
        "%b %d, %Y",
        "%B %d, %Y",
    ];

    const DATETIME_FORMATS: &'static [&'static str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
    ];

    /// Attempt to turn a raw cell into a calendar date.
    ///
    /// Handles:
    /// * RFC 3339 timestamps (offset or `Z`) → the date part as written
    /// * ISO and common month-first / named-month date patterns
    /// * a bare four-digit year → 1 January of that year
    /// * eight digits → `YYYYMMDD`
    /// * other numbers → spreadsheet serial day numbers
    pub fn parse(raw: &str) -> Option<NaiveDate> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.date_naive());
        }

        for fmt in Self::DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(naive.date());
            }
        }

        for fmt in Self::DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                return Some(date);
            }
        }

        if s.bytes().all(|b| b.is_ascii_digit()) {
            match s.len() {
                4 => return s.parse().ok().and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1)),
                8 => {
                    let (y, m, d) = (s[..4].parse(), s[4..6].parse(), s[6..].parse());
                    if let (Ok(y), Ok(m), Ok(d)) = (y, m, d) {
                        if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
                            return Some(date);
                        }
                    }
                }
                _ => {}
            }
        }

        if let Some(date) = Self::from_serial(s) {
            return Some(date);
        }

        debug!("DateCoercer: could not parse date \"{}\"", s);
        None
    }

    /// Interpret `s` as a spreadsheet serial day number; the fractional
    /// (time-of-day) part is dropped.
    fn from_serial(s: &str) -> Option<NaiveDate> {
        let serial: f64 = s.parse().ok()?;
        if !serial.is_finite() || !(1.0..=MAX_SERIAL).contains(&serial) {
            return None;
        }
        let (y, m, d) = SERIAL_EPOCH;
        NaiveDate::from_ymd_opt(y, m, d)?.checked_add_days(Days::new(serial.trunc() as u64))
    }
}

// ── AmountParser ──────────────────────────────────────────────────────────────

/// Parses numeric `Sales` / `Quantity` cells that may carry currency symbols,
/// thousands separators or accounting-style negatives.
pub struct AmountParser;

impl AmountParser {
    /// Parse a cell into a finite number. Blank or non-numeric cells → `None`.
    pub fn parse(raw: &str) -> Option<f64> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }

        let (negative, body) = match s.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
            Some(inner) => (true, inner),
            None => (false, s),
        };

        let cleaned: String = body
            .chars()
            .filter(|c| !matches!(c, '$' | '€' | '£' | ',' | ' '))
            .collect();

        let value: f64 = cleaned.parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        Some(if negative { -value } else { value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── DateCoercer ───────────────────────────────────────────────────────────

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(DateCoercer::parse("2023-04-15"), Some(ymd(2023, 4, 15)));
    }

    #[test]
    fn test_parse_iso_datetime_variants() {
        assert_eq!(DateCoercer::parse("2023-04-15 13:45:00"), Some(ymd(2023, 4, 15)));
        assert_eq!(DateCoercer::parse("2023-04-15T13:45:00"), Some(ymd(2023, 4, 15)));
        assert_eq!(DateCoercer::parse("2023-04-15T13:45:00Z"), Some(ymd(2023, 4, 15)));
        assert_eq!(
            DateCoercer::parse("2023-04-15T23:30:00-05:00"),
            Some(ymd(2023, 4, 15))
        );
    }

    #[test]
    fn test_parse_slash_dates_are_month_first() {
        assert_eq!(DateCoercer::parse("03/04/2023"), Some(ymd(2023, 3, 4)));
        assert_eq!(DateCoercer::parse("2023/03/04"), Some(ymd(2023, 3, 4)));
    }

    #[test]
    fn test_parse_named_month() {
        assert_eq!(DateCoercer::parse("15-Apr-2023"), Some(ymd(2023, 4, 15)));
        assert_eq!(DateCoercer::parse("April 15, 2023"), Some(ymd(2023, 4, 15)));
    }

    #[test]
    fn test_parse_year_only() {
        assert_eq!(DateCoercer::parse("2022"), Some(ymd(2022, 1, 1)));
    }

    #[test]
    fn test_parse_compact_digits() {
        assert_eq!(DateCoercer::parse("20230115"), Some(ymd(2023, 1, 15)));
    }

    #[test]
    fn test_parse_spreadsheet_serial() {
        assert_eq!(DateCoercer::parse("45000"), Some(ymd(2023, 3, 15)));
        assert_eq!(DateCoercer::parse("45000.75"), Some(ymd(2023, 3, 15)));
    }

    #[test]
    fn test_parse_garbage_returns_none() {
        assert!(DateCoercer::parse("").is_none());
        assert!(DateCoercer::parse("   ").is_none());
        assert!(DateCoercer::parse("not a date").is_none());
        assert!(DateCoercer::parse("2023-13-45").is_none());
        assert!(DateCoercer::parse("-4").is_none());
    }

    // ── AmountParser ──────────────────────────────────────────────────────────

    #[test]
    fn test_amount_plain() {
        assert_eq!(AmountParser::parse("250"), Some(250.0));
        assert_eq!(AmountParser::parse(" 12.5 "), Some(12.5));
    }

    #[test]
    fn test_amount_currency_and_separators() {
        assert_eq!(AmountParser::parse("$1,234.50"), Some(1234.5));
        assert_eq!(AmountParser::parse("€ 99"), Some(99.0));
    }

    #[test]
    fn test_amount_accounting_negative() {
        assert_eq!(AmountParser::parse("(40.00)"), Some(-40.0));
        assert_eq!(AmountParser::parse("-40"), Some(-40.0));
    }

    #[test]
    fn test_amount_rejects_non_numeric() {
        assert!(AmountParser::parse("").is_none());
        assert!(AmountParser::parse("n/a").is_none());
        assert!(AmountParser::parse("inf").is_none());
        assert!(AmountParser::parse("NaN").is_none());
    }
}
