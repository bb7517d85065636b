use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ScrapeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatementType {
    Bank,
    Card,
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementType::Bank => write!(f, "BANK"),
            StatementType::Card => write!(f, "CARD"),
        }
    }
}

/// account -> currency -> amount
pub type BalanceMap = BTreeMap<String, BTreeMap<String, Decimal>>;

/// One transaction line. Credit amounts are positive, debits negative;
/// rows without an amount never become entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub account: String,
    #[serde(with = "date_ddmmyyyy")]
    pub post_date: NaiveDate,
    #[serde(with = "date_ddmmyyyy")]
    pub transaction_date: NaiveDate,
    pub description: String,
    pub currency: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    #[serde(rename = "type")]
    pub statement_type: StatementType,
    pub main_account: String,
    #[serde(with = "date_ddmmyyyy")]
    pub statement_date: NaiveDate,
    pub previous_balance: BalanceMap,
    pub new_balance: BalanceMap,
    pub entries: Vec<Entry>,
    #[serde(skip)]
    pub source_path: String,
}

impl Statement {
    pub fn to_json(&self) -> Result<String, ScrapeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, ScrapeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// One tabular row per entry, carrying the statement-level context.
    pub fn flatten(&self) -> Vec<FlatEntry> {
        self.entries
            .iter()
            .map(|e| FlatEntry {
                account: e.account.clone(),
                post_date: e.post_date,
                transaction_date: e.transaction_date,
                description: e.description.clone(),
                currency: e.currency.clone(),
                amount: e.amount,
                statement_date: self.statement_date,
                main_account: self.main_account.clone(),
                source_file_path: self.source_path.clone(),
            })
            .collect()
    }
}

/// An entry augmented with its statement's identity, for tabular exports.
#[derive(Debug, Clone, Serialize)]
pub struct FlatEntry {
    pub account: String,
    #[serde(with = "date_ddmmyyyy")]
    pub post_date: NaiveDate,
    #[serde(with = "date_ddmmyyyy")]
    pub transaction_date: NaiveDate,
    pub description: String,
    pub currency: String,
    pub amount: Decimal,
    #[serde(with = "date_ddmmyyyy")]
    pub statement_date: NaiveDate,
    pub main_account: String,
    pub source_file_path: String,
}

/// Per-currency closing figure from the HK portfolio summary: the amount in
/// its own currency and its HKD equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryBalance {
    pub ccy_amount: Decimal,
    pub hkd_equivalent: Decimal,
}

/// Independently extracted portfolio summary, used only to cross-validate
/// the per-account transaction tables; never merged into the statement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    pub total_balance_hkd: Option<Decimal>,
    pub new_acc_balances: BTreeMap<String, BTreeMap<String, SummaryBalance>>,
}

/// Dates render as `DD/MM/YYYY` in JSON.
pub mod date_ddmmyyyy {
    use chrono::NaiveDate;
    use serde::{self, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%d/%m/%Y";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> Statement {
        let mut previous = BalanceMap::new();
        previous
            .entry("default".into())
            .or_default()
            .insert("EUR".into(), dec!(1000.00));
        let mut new = BalanceMap::new();
        new.entry("default".into())
            .or_default()
            .insert("EUR".into(), dec!(1300.00));
        Statement {
            statement_type: StatementType::Bank,
            main_account: "123 456 789".into(),
            statement_date: NaiveDate::from_ymd_opt(2019, 1, 31).unwrap(),
            previous_balance: previous,
            new_balance: new,
            entries: vec![Entry {
                account: "default".into(),
                post_date: NaiveDate::from_ymd_opt(2019, 1, 4).unwrap(),
                transaction_date: NaiveDate::from_ymd_opt(2019, 1, 4).unwrap(),
                description: "VIREMENT RECU".into(),
                currency: "EUR".into(),
                amount: dec!(300.00),
            }],
            source_path: "statement.pdf".into(),
        }
    }

    #[test]
    fn test_json_dates_are_ddmmyyyy() {
        let json = sample().to_json().unwrap();
        assert!(json.contains("\"statement_date\":\"31/01/2019\""));
        assert!(json.contains("\"post_date\":\"04/01/2019\""));
        assert!(json.contains("\"type\":\"BANK\""));
    }

    #[test]
    fn test_json_roundtrip() {
        let json = sample().to_json().unwrap();
        let back: Statement = serde_json::from_str(&json).unwrap();
        assert_eq!(back.entries.len(), 1);
        assert_eq!(back.entries[0].amount, dec!(300.00));
        assert_eq!(
            back.statement_date,
            NaiveDate::from_ymd_opt(2019, 1, 31).unwrap()
        );
    }

    #[test]
    fn test_flatten_carries_statement_context() {
        let flat = sample().flatten();
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].main_account, "123 456 789");
        assert_eq!(flat[0].source_file_path, "statement.pdf");
        assert_eq!(
            flat[0].statement_date,
            NaiveDate::from_ymd_opt(2019, 1, 31).unwrap()
        );
    }
}
