use crate::error::ScrapeError;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Digit grouping conventions across the supported banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberLocale {
    /// `1,234.56` — HSBC HK and the SocGen card tables.
    Anglo,
    /// `1.234,56` (with optional space grouping) — the French banks.
    French,
}

/// Parse one table cell into an amount.
///
/// Whitespace and `*` fill characters are stripped; an empty cell is
/// `None`. Any `-` anywhere in the cell marks the value negative.
pub fn parse_amount(s: &str, locale: NumberLocale) -> Result<Option<Decimal>, ScrapeError> {
    let mut cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '*')
        .collect();
    if cleaned.is_empty() {
        return Ok(None);
    }

    let negative = cleaned.contains('-');
    cleaned.retain(|c| c != '-');

    let normalized = match locale {
        NumberLocale::Anglo => cleaned.replace(',', ""),
        NumberLocale::French => cleaned.replace('.', "").replace(',', "."),
    };

    let value = Decimal::from_str(&normalized)
        .map_err(|e| ScrapeError::Parse(format!("invalid amount '{}': {}", s.trim(), e)))?;
    Ok(Some(if negative { -value } else { value }))
}

/// Resolve a credit/debit column pair into one signed amount: credit
/// positive, debit negative, both empty means the row carries no amount.
pub fn signed_amount(
    credit: &str,
    debit: &str,
    locale: NumberLocale,
) -> Result<Option<Decimal>, ScrapeError> {
    let credit = parse_amount(credit, locale)?;
    let debit = parse_amount(debit, locale)?;
    match (credit, debit) {
        (None, None) => Ok(None),
        (c, d) => Ok(Some(
            c.map(|v| v.abs()).unwrap_or_default() - d.map(|v| v.abs()).unwrap_or_default(),
        )),
    }
}

/// Negate an amount flagged with the `DR` marker column.
pub fn apply_dr(amount: Decimal, flag: &str) -> Decimal {
    if flag.trim() == "DR" {
        -amount
    } else {
        amount
    }
}

/// SocGen card amounts: the table is debit-positive, with a `CR` suffix on
/// credits, so the sign is flipped unless the suffix is present.
pub fn card_amount(s: &str) -> Result<Option<Decimal>, ScrapeError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let credit = trimmed.contains("CR");
    let value = match parse_amount(&trimmed.replace("CR", ""), NumberLocale::Anglo)? {
        Some(v) => v,
        None => return Ok(None),
    };
    Ok(Some(if credit { value } else { -value }))
}
