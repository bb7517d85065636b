//! HSBC Hong Kong Premier account statements: a portfolio summary table
//! followed by up to four per-account transaction tables (HKD/FCY,
//! savings/current), every table cross-checked against the summary.

use chrono::NaiveDate;
use log::{debug, warn};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::check::{check_summary_total, check_zone_against_summary};
use crate::error::ScrapeError;
use crate::geometry::{next_section, BBox, Section};
use crate::index::{GridSource, LayoutIndex};
use crate::locate::{find_first_of, text_in_box, TextFinder};
use crate::model::{
    BalanceMap, Entry, Statement, Summary, SummaryBalance,
};
use crate::parsing::dates::{parse_date, parse_with_inferred_year};
use crate::parsing::values::{apply_dr, parse_amount, signed_amount, NumberLocale};
use crate::profile::{
    AccountSection, LayoutProfile, MultiZoneSpec, Pipeline, TextAnchor, ZoneKind,
};
use crate::zone::{Margins, Zone};

const BF_BALANCE: &str = "B/F BALANCE";

pub fn profile() -> LayoutProfile {
    LayoutProfile {
        bank: "hsbchk",
        statement_type: crate::model::StatementType::Bank,
        bank_signature: vec![TextAnchor::new("Financial Overview")],
        type_signature: vec![TextAnchor::new("HSBC Premier Account Transaction History")],
        repair_trailing_bytes: false,
        pipeline: Pipeline::MultiZone(MultiZoneSpec {
            account_number_box: BBox::new(486.0, 700.0, 538.0, 712.0),
            statement_date_box: BBox::new(394.0, 651.0, 538.0, 660.0),
            statement_date_format: "%d %B %Y",
            summary_anchor: TextAnchor::new("Portfolio Summary").height(10.0),
            top_anchor: TextAnchor::new("HSBC Premier Account Transaction History").height(10.0),
            account_sections: vec![
                AccountSection {
                    account: "HKDSavings",
                    anchor: TextAnchor::new("HKD Savings").height(9.0),
                    kind: ZoneKind::SingleCurrency { currency: "HKD" },
                },
                AccountSection {
                    account: "HKDCurrent",
                    anchor: TextAnchor::new("HKD Current").height(9.0),
                    kind: ZoneKind::SingleCurrency { currency: "HKD" },
                },
                AccountSection {
                    account: "FCYSavings",
                    anchor: TextAnchor::new("Foreign Currency Savings").height(9.0),
                    kind: ZoneKind::MultiCurrency,
                },
                AccountSection {
                    account: "FCYCurrent",
                    anchor: TextAnchor::new("Foreign Currency Current").height(9.0),
                    kind: ZoneKind::MultiCurrency,
                },
            ],
            end_anchors: vec![
                TextAnchor::new("Total Relationship Balance").height(10.0),
                TextAnchor::new("Important Notice").height(10.0),
            ],
            end_clamp_y: 679.0,
            margins: Margins::default(),
            locale: NumberLocale::Anglo,
            entry_date_format: "%d %b %Y",
        }),
    }
}

/// Per-zone ledger: opening/closing balances by currency plus the entries,
/// with the closing side recomputed as a running balance.
#[derive(Debug, Default)]
struct ZoneLedger {
    previous: BTreeMap<String, Decimal>,
    new: BTreeMap<String, Decimal>,
    entries: Vec<Entry>,
}

pub fn run(
    source_path: &str,
    index: &dyn LayoutIndex,
    grid: &dyn GridSource,
    profile: &LayoutProfile,
    spec: &MultiZoneSpec,
) -> Result<Statement, ScrapeError> {
    let (page_width, _) = index.page_size(1)?;

    let account_number = text_in_box(index, 1, &spec.account_number_box)?;
    let statement_date = parse_date(
        &text_in_box(index, 1, &spec.statement_date_box)?,
        spec.statement_date_format,
    )?;
    debug!("processing statement of {account_number} on {statement_date}");

    let summary_section = spec.summary_anchor.finder().require(index, None, None)?.section;
    let top_section = spec.top_anchor.finder().require(index, None, None)?.section;

    let end_finders: Vec<TextFinder> = spec.end_anchors.iter().map(TextAnchor::finder).collect();
    let mut end_section = find_first_of(index, &end_finders)?.section;
    if end_section.y_top > spec.end_clamp_y {
        // An end anchor in a page's letterhead means the tables finished on
        // the previous page; clamp it to that page's bottom margin.
        end_section = Section::new(
            end_section.page - 1,
            spec.margins.bottom,
            spec.margins.bottom,
        );
    }

    // Locate whichever account sections this statement carries.
    let mut found: Vec<(&AccountSection, Section)> = Vec::new();
    for section_spec in &spec.account_sections {
        match section_spec
            .anchor
            .finder()
            .find(index, Some(&top_section), Some(&end_section))?
        {
            Some(located) => found.push((section_spec, located.section)),
            None => warn!("section {} not found in statement", section_spec.account),
        }
    }

    // Each zone runs until the next located section (or the end anchor).
    let mut available: Vec<Section> = vec![end_section];
    available.extend(found.iter().map(|(_, s)| *s));

    let summary_zone_rows = {
        let mut zone = Zone::build(&summary_section, &top_section, &spec.margins);
        zone.locate_header(index, page_width)?;
        zone.extract(grid, page_width)?
    };
    let summary = clean_summary(&summary_zone_rows, spec.locale)?;

    let mut ledgers: Vec<(&'static str, ZoneLedger)> = Vec::new();
    for (section_spec, section) in &found {
        let refs: Vec<&Section> = available.iter().collect();
        let next = *next_section(section, &refs).ok_or_else(|| {
            ScrapeError::Template(format!(
                "no section follows {} to bound its table",
                section_spec.account
            ))
        })?;
        available.retain(|s| s != &next);

        let mut zone = Zone::build(section, &next, &spec.margins);
        zone.locate_header(index, page_width)?;
        let rows = zone.extract(grid, page_width)?;
        debug!(
            "zone {} spans {} chunk(s), {} row(s)",
            section_spec.account,
            zone.chunks.len(),
            rows.len()
        );

        let ledger = match section_spec.kind {
            ZoneKind::SingleCurrency { currency } => clean_single_currency(
                &rows,
                section_spec.account,
                currency,
                statement_date,
                spec,
            )?,
            ZoneKind::MultiCurrency => {
                clean_multi_currency(&rows, section_spec.account, statement_date, spec)?
            }
        };
        ledgers.push((section_spec.account, ledger));
    }

    check_summary_total(&summary)?;
    for (account, ledger) in &ledgers {
        check_zone_against_summary(account, &ledger.new, &summary)?;
    }

    let mut previous_balance = BalanceMap::new();
    let mut new_balance = BalanceMap::new();
    let mut entries = Vec::new();
    for (account, ledger) in ledgers {
        previous_balance.insert(account.to_string(), ledger.previous);
        new_balance.insert(account.to_string(), ledger.new);
        entries.extend(ledger.entries);
    }

    Ok(Statement {
        statement_type: profile.statement_type,
        main_account: account_number,
        statement_date,
        previous_balance,
        new_balance,
        entries,
        source_path: source_path.to_string(),
    })
}

fn cell(row: &[String], i: usize) -> &str {
    row.get(i).map(|s| s.trim()).unwrap_or("")
}

/// HKD zones: date | description | deposit | withdrawal | balance | DR.
///
/// A leading B/F BALANCE row supplies the opening balance; a first-ever
/// statement has none, in which case the opening balance is zero and the
/// row is an ordinary entry.
fn clean_single_currency(
    rows: &[Vec<String>],
    account: &str,
    currency: &str,
    statement_date: NaiveDate,
    spec: &MultiZoneSpec,
) -> Result<ZoneLedger, ScrapeError> {
    let mut ledger = ZoneLedger::default();
    let mut start = 0usize;
    let mut previous = Decimal::ZERO;

    if let Some(first) = rows.first() {
        if cell(first, 1) == BF_BALANCE {
            let balance = parse_amount(cell(first, 4), spec.locale)?.ok_or_else(|| {
                ScrapeError::Template(format!("{BF_BALANCE} row of {account} carries no balance"))
            })?;
            previous = apply_dr(balance, cell(first, 5));
            start = 1;
        }
    }
    ledger.previous.insert(currency.to_string(), previous);

    let mut date: Option<NaiveDate> = None;
    let mut description = String::new();
    let mut balance = previous;

    for row in &rows[start.min(rows.len())..] {
        if !cell(row, 0).is_empty() {
            date = Some(parse_with_inferred_year(
                cell(row, 0),
                spec.entry_date_format,
                statement_date,
            )?);
        }
        push_description(&mut description, cell(row, 1));

        let amount = match signed_amount(cell(row, 2), cell(row, 3), spec.locale)? {
            Some(a) => a,
            None => continue,
        };
        let date = date.ok_or_else(|| {
            ScrapeError::Template(format!("entry row of {account} precedes any dated row"))
        })?;
        balance += amount;
        if !amount.is_zero() {
            ledger.entries.push(Entry {
                account: account.to_string(),
                post_date: date,
                transaction_date: date,
                description: std::mem::take(&mut description),
                currency: currency.to_string(),
                amount,
            });
        } else {
            description.clear();
        }
    }

    ledger.new.insert(currency.to_string(), balance);
    Ok(ledger)
}

/// FCY zones: currency | date | description | deposit | withdrawal |
/// balance | DR, with back-to-back per-currency sub-sections.
///
/// Each sub-section opens with a row naming the currency; when that row
/// carries a balance it must be tagged B/F BALANCE, and it resets the
/// running balance. A currency's first-ever movement has no balance cell
/// and starts from zero.
fn clean_multi_currency(
    rows: &[Vec<String>],
    account: &str,
    statement_date: NaiveDate,
    spec: &MultiZoneSpec,
) -> Result<ZoneLedger, ScrapeError> {
    let mut ledger = ZoneLedger::default();
    let mut currency = String::new();
    let mut balance = Decimal::ZERO;
    let mut date: Option<NaiveDate> = None;
    let mut description = String::new();

    for row in rows {
        let leading = cell(row, 0);
        if !leading.is_empty() && leading != currency {
            if !currency.is_empty() {
                ledger.new.insert(currency.clone(), balance);
                balance = Decimal::ZERO;
            }
            currency = leading.to_string();
            if !cell(row, 5).is_empty() {
                if cell(row, 2) != BF_BALANCE {
                    return Err(ScrapeError::Template(format!(
                        "first line of {currency} sub-section should contain {BF_BALANCE} vs [{}]",
                        cell(row, 2)
                    )));
                }
                let opening = parse_amount(cell(row, 5), spec.locale)?.ok_or_else(|| {
                    ScrapeError::Template(format!(
                        "{BF_BALANCE} row of {account}({currency}) carries no balance"
                    ))
                })?;
                let opening = apply_dr(opening, cell(row, 6));
                ledger.previous.insert(currency.clone(), opening);
                balance = opening;
            }
        }

        if !cell(row, 1).is_empty() {
            date = Some(parse_with_inferred_year(
                cell(row, 1),
                spec.entry_date_format,
                statement_date,
            )?);
        }
        push_description(&mut description, cell(row, 2));

        let amount = match signed_amount(cell(row, 3), cell(row, 4), spec.locale)? {
            Some(a) => a,
            None => {
                if description == BF_BALANCE {
                    description.clear();
                }
                continue;
            }
        };
        let date = date.ok_or_else(|| {
            ScrapeError::Template(format!("entry row of {account} precedes any dated row"))
        })?;
        balance += amount;
        if !amount.is_zero() {
            ledger.entries.push(Entry {
                account: account.to_string(),
                post_date: date,
                transaction_date: date,
                description: std::mem::take(&mut description),
                currency: currency.clone(),
                amount,
            });
        } else {
            description.clear();
        }
    }

    if !currency.is_empty() {
        ledger.new.insert(currency, balance);
    }
    Ok(ledger)
}

fn push_description(acc: &mut String, piece: &str) {
    if piece.is_empty() {
        return;
    }
    if !acc.is_empty() {
        acc.push(' ');
    }
    acc.push_str(piece);
}

/// Portfolio summary: account type | _ | currency | _ | balance | DR |
/// HKD equivalent | DR, closed by a Total row. The first two rows are the
/// header echo and the account narrative.
fn clean_summary(rows: &[Vec<String>], locale: NumberLocale) -> Result<Summary, ScrapeError> {
    let mut summary = Summary::default();
    let mut account = String::new();

    for row in rows.iter().skip(2) {
        let leading = cell(row, 0);
        if leading == "Total" {
            let total = parse_amount(cell(row, 6), locale)?.ok_or_else(|| {
                ScrapeError::Template("summary Total row carries no amount".to_string())
            })?;
            summary.total_balance_hkd = Some(apply_dr(total, cell(row, 7)));
            continue;
        }
        if !leading.is_empty() {
            account = map_summary_account(leading)?.to_string();
        }

        let currency = cell(row, 2);
        if currency.is_empty() {
            continue;
        }
        let ccy_amount = match parse_amount(cell(row, 4), locale)? {
            Some(a) => apply_dr(a, cell(row, 5)),
            None => continue,
        };
        let hkd_equivalent = parse_amount(cell(row, 6), locale)?
            .map(|a| apply_dr(a, cell(row, 7)))
            .ok_or_else(|| {
                ScrapeError::Template(format!(
                    "summary row for {account}({currency}) carries no HKD equivalent"
                ))
            })?;

        summary
            .new_acc_balances
            .entry(account.clone())
            .or_default()
            .insert(
                currency.to_string(),
                SummaryBalance {
                    ccy_amount,
                    hkd_equivalent,
                },
            );
    }

    debug!("statement summary: {summary:?}");
    Ok(summary)
}

fn map_summary_account(label: &str) -> Result<&'static str, ScrapeError> {
    match label {
        "HKD Savings" => Ok("HKDSavings"),
        "HKD Current" => Ok("HKDCurrent"),
        "FCY Savings" => Ok("FCYSavings"),
        "FCY Current" => Ok("FCYCurrent"),
        other => Err(ScrapeError::Template(format!(
            "summary contains an unknown account type [{other}]"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn spec() -> MultiZoneSpec {
        match profile().pipeline {
            Pipeline::MultiZone(spec) => spec,
            _ => unreachable!(),
        }
    }

    fn st_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 8, 21).unwrap()
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_hkd_zone_basic_ledger() {
        let rows = vec![
            row(&["", "B/F BALANCE", "", "", "1,000.00", ""]),
            row(&["04 Apr", "SALARY", "500.00", "", "", ""]),
            row(&["06 Apr", "GROCERIES", "", "200.00", "", ""]),
        ];
        let ledger =
            clean_single_currency(&rows, "HKDSavings", "HKD", st_date(), &spec()).unwrap();
        assert_eq!(ledger.previous["HKD"], dec!(1000.00));
        assert_eq!(ledger.new["HKD"], dec!(1300.00));
        assert_eq!(ledger.entries.len(), 2);
        assert_eq!(ledger.entries[0].amount, dec!(500.00));
        assert_eq!(ledger.entries[1].amount, dec!(-200.00));
    }

    #[test]
    fn test_hkd_zone_missing_bf_row_defaults_to_zero() {
        let rows = vec![
            row(&["04 Apr", "FIRST DEPOSIT", "500.00", "", "", ""]),
        ];
        let ledger =
            clean_single_currency(&rows, "HKDSavings", "HKD", st_date(), &spec()).unwrap();
        assert_eq!(ledger.previous["HKD"], dec!(0));
        assert_eq!(ledger.entries.len(), 1);
        assert_eq!(ledger.new["HKD"], dec!(500.00));
    }

    #[test]
    fn test_hkd_zone_dr_flag_negates_opening() {
        let rows = vec![
            row(&["", "B/F BALANCE", "", "", "250.00", "DR"]),
            row(&["04 Apr", "DEPOSIT", "250.00", "", "", ""]),
        ];
        let ledger =
            clean_single_currency(&rows, "HKDCurrent", "HKD", st_date(), &spec()).unwrap();
        assert_eq!(ledger.previous["HKD"], dec!(-250.00));
        assert_eq!(ledger.new["HKD"], dec!(0));
    }

    #[test]
    fn test_hkd_zone_wrapped_description_merges_forward() {
        let rows = vec![
            row(&["", "B/F BALANCE", "", "", "0.00", ""]),
            row(&["04 Apr", "TRANSFER FROM", "", "", "", ""]),
            row(&["", "JOHN DOE", "100.00", "", "", ""]),
        ];
        let ledger =
            clean_single_currency(&rows, "HKDSavings", "HKD", st_date(), &spec()).unwrap();
        assert_eq!(ledger.entries.len(), 1);
        assert_eq!(ledger.entries[0].description, "TRANSFER FROM JOHN DOE");
    }

    #[test]
    fn test_fcy_zone_currency_sections() {
        let rows = vec![
            row(&["USD", "", "B/F BALANCE", "", "", "100.00", ""]),
            row(&["", "04 Apr", "INTEREST", "10.00", "", "", ""]),
            row(&["EUR", "", "B/F BALANCE", "", "", "50.00", "DR"]),
            row(&["", "06 Apr", "PAYMENT", "", "25.00", "", ""]),
        ];
        let ledger = clean_multi_currency(&rows, "FCYSavings", st_date(), &spec()).unwrap();
        assert_eq!(ledger.previous["USD"], dec!(100.00));
        assert_eq!(ledger.previous["EUR"], dec!(-50.00));
        assert_eq!(ledger.new["USD"], dec!(110.00));
        assert_eq!(ledger.new["EUR"], dec!(-75.00));
        assert_eq!(ledger.entries.len(), 2);
        assert_eq!(ledger.entries[0].currency, "USD");
        assert_eq!(ledger.entries[1].currency, "EUR");
    }

    #[test]
    fn test_fcy_zone_mislabeled_bf_row_is_fatal() {
        let rows = vec![
            row(&["USD", "", "SOMETHING ELSE", "", "", "100.00", ""]),
        ];
        let err = clean_multi_currency(&rows, "FCYSavings", st_date(), &spec()).unwrap_err();
        assert!(matches!(err, ScrapeError::Template(_)));
    }

    #[test]
    fn test_fcy_zone_first_movement_has_no_opening() {
        let rows = vec![
            row(&["JPY", "04 Apr", "FIRST DEPOSIT", "1,000", "", "", ""]),
        ];
        let ledger = clean_multi_currency(&rows, "FCYCurrent", st_date(), &spec()).unwrap();
        assert!(ledger.previous.get("JPY").is_none());
        assert_eq!(ledger.new["JPY"], dec!(1000));
    }

    #[test]
    fn test_summary_parses_accounts_and_total() {
        let rows = vec![
            row(&["header", "", "", "", "", "", "", ""]),
            row(&["narrative", "", "", "", "", "", "", ""]),
            row(&["HKD Savings", "", "HKD", "", "1,300.00", "", "1,300.00", ""]),
            row(&["FCY Savings", "", "USD", "", "110.00", "", "860.20", ""]),
            row(&["", "", "EUR", "", "75.00", "DR", "650.00", "DR"]),
            row(&["Total", "", "", "", "", "", "1,510.20", ""]),
        ];
        let summary = clean_summary(&rows, NumberLocale::Anglo).unwrap();
        assert_eq!(summary.total_balance_hkd, Some(dec!(1510.20)));
        assert_eq!(
            summary.new_acc_balances["HKDSavings"]["HKD"].ccy_amount,
            dec!(1300.00)
        );
        assert_eq!(
            summary.new_acc_balances["FCYSavings"]["EUR"].ccy_amount,
            dec!(-75.00)
        );
        assert_eq!(
            summary.new_acc_balances["FCYSavings"]["EUR"].hkd_equivalent,
            dec!(-650.00)
        );
    }

    #[test]
    fn test_summary_unknown_account_type_is_fatal() {
        let rows = vec![
            row(&["h", "", "", "", "", "", "", ""]),
            row(&["n", "", "", "", "", "", "", ""]),
            row(&["Offshore Gold", "", "XAU", "", "1.00", "", "9,000.00", ""]),
        ];
        assert!(matches!(
            clean_summary(&rows, NumberLocale::Anglo),
            Err(ScrapeError::Template(_))
        ));
    }
}
