use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::error::ScrapeError;
use crate::model::Summary;

/// Running-balance invariant: previous balance plus the signed entry total
/// must equal the declared closing balance, at 2-decimal rounding.
pub fn check_running_balance(
    scope: &str,
    previous: Decimal,
    entries_total: Decimal,
    declared_new: Decimal,
) -> Result<(), ScrapeError> {
    let computed = previous + entries_total;
    if computed.round_dp(2) != declared_new.round_dp(2) {
        return Err(ScrapeError::mismatch(scope, computed, declared_new));
    }
    Ok(())
}

/// The summary's own grand total must equal the sum of every per-account
/// HKD-equivalent figure it declares.
pub fn check_summary_total(summary: &Summary) -> Result<(), ScrapeError> {
    let declared = summary.total_balance_hkd.ok_or_else(|| {
        ScrapeError::Template("portfolio summary carries no Total row".to_string())
    })?;
    let computed: Decimal = summary
        .new_acc_balances
        .values()
        .flat_map(|per_ccy| per_ccy.values())
        .map(|b| b.hkd_equivalent)
        .sum();
    if computed.round_dp(2) != declared.round_dp(2) {
        return Err(ScrapeError::mismatch("portfolio summary", computed, declared));
    }
    Ok(())
}

/// One zone's per-currency closing balances against the summary's breakdown
/// for the same account. A currency missing from the summary is tolerated
/// only when the computed balance is zero.
pub fn check_zone_against_summary(
    account: &str,
    new_balances: &BTreeMap<String, Decimal>,
    summary: &Summary,
) -> Result<(), ScrapeError> {
    let empty = BTreeMap::new();
    let expected = summary.new_acc_balances.get(account).unwrap_or(&empty);
    for (currency, computed) in new_balances {
        match expected.get(currency) {
            None => {
                if computed.round_dp(2) != Decimal::ZERO {
                    return Err(ScrapeError::mismatch(
                        format!("missing non-null balance in summary for {account}({currency})"),
                        *computed,
                        Decimal::ZERO,
                    ));
                }
            }
            Some(declared) => {
                if computed.round_dp(2) != declared.ccy_amount.round_dp(2) {
                    return Err(ScrapeError::mismatch(
                        format!("{account}({currency})"),
                        *computed,
                        declared.ccy_amount,
                    ));
                }
            }
        }
    }
    Ok(())
}
