use chrono::{Datelike, NaiveDate};

use crate::error::ScrapeError;

pub fn parse_date(s: &str, fmt: &str) -> Result<NaiveDate, ScrapeError> {
    NaiveDate::parse_from_str(s.trim(), fmt)
        .map_err(|e| ScrapeError::Parse(format!("invalid date '{}' for format '{}': {}", s, fmt, e)))
}

/// Parse a day/month string that carries no year, borrowing the year from
/// the statement's own reference date.
///
/// Statement tables straddle December/January: a parsed date that lands
/// after the statement date belongs to the preceding year.
///
/// `fmt` must contain `%Y`; the year is appended with a space when the
/// format expects one (`"%d %b %Y"`) and bare otherwise (`"%d%b%Y"`).
pub fn parse_with_inferred_year(
    s: &str,
    fmt: &str,
    statement_date: NaiveDate,
) -> Result<NaiveDate, ScrapeError> {
    let sep = if fmt.ends_with(" %Y") { " " } else { "" };
    let year = statement_date.year();
    let candidate = parse_date(&format!("{}{}{}", s.trim(), sep, year), fmt)?;
    if candidate > statement_date {
        parse_date(&format!("{}{}{}", s.trim(), sep, year - 1), fmt)
    } else {
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_exact_formats() {
        assert_eq!(parse_date("21 August 2019", "%d %B %Y").unwrap(), date(2019, 8, 21));
        assert_eq!(parse_date("04.02.19", "%d.%m.%y").unwrap(), date(2019, 2, 4));
        assert_eq!(parse_date("31/01/2019", "%d/%m/%Y").unwrap(), date(2019, 1, 31));
    }

    #[test]
    fn test_inferred_year_same_year() {
        let st = date(2024, 3, 15);
        assert_eq!(
            parse_with_inferred_year("20 Feb", "%d %b %Y", st).unwrap(),
            date(2024, 2, 20)
        );
    }

    #[test]
    fn test_inferred_year_rolls_back_across_january() {
        let st = date(2024, 1, 15);
        assert_eq!(
            parse_with_inferred_year("20 Dec", "%d %b %Y", st).unwrap(),
            date(2023, 12, 20)
        );
    }

    #[test]
    fn test_inferred_year_compact_format() {
        let st = date(2019, 1, 10);
        assert_eq!(
            parse_with_inferred_year("28Dec", "%d%b%Y", st).unwrap(),
            date(2018, 12, 28)
        );
    }

    #[test]
    fn test_invalid_date_is_parse_error() {
        assert!(parse_date("not a date", "%d %b %Y").is_err());
    }
}
