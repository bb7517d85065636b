//! Single-table statement pipeline: one logical transaction table, possibly
//! spanning pages, bounded by text anchors and ruled lines, carrying its
//! own opening/closing balance rows. Driven entirely by a `TableSpec`.

use chrono::NaiveDate;
use log::debug;
use regex::Regex;
use rust_decimal::Decimal;

use crate::check::check_running_balance;
use crate::error::ScrapeError;
use crate::geometry::{BBox, Section};
use crate::index::{GridSource, LayoutIndex};
use crate::locate::{find_first_of, text_in_box, TextFinder, VRuleFinder};
use crate::model::{BalanceMap, Entry, Statement};
use crate::parsing::dates::{parse_date, parse_with_inferred_year};
use crate::parsing::values::{card_amount, parse_amount, signed_amount};
use crate::profile::{
    AmountStyle, ClosingRow, ColumnRole, ColumnsSpec, CurrencySource, EntryDateStyle, FieldSource,
    HRuleSpec, LayoutProfile, MergeStyle, OpeningRow, RuleColumnsSpec, TableSpan, TableSpec,
    TextAnchor,
};

pub fn run(
    source_path: &str,
    index: &dyn LayoutIndex,
    grid: &dyn GridSource,
    profile: &LayoutProfile,
    spec: &TableSpec,
) -> Result<Statement, ScrapeError> {
    let account_number = resolve_field(index, &spec.account_number)?;
    let statement_date = parse_date(
        &resolve_field(index, &spec.statement_date)?,
        spec.statement_date_format,
    )?;
    let currency = resolve_currency(index, &spec.currency)?;
    debug!(
        "processing {} statement of {} on {} ({})",
        profile.bank, account_number, statement_date, currency
    );

    let begin = match &spec.begin_anchor {
        Some(anchor) => Some(anchor.finder().require(index, None, None)?.section),
        None => None,
    };
    let end = locate_end(index, spec)?;

    let (columns, page1_area, cont_area) = resolve_columns(index, spec, begin.as_ref())?;
    let chunks = build_chunks(index, spec, &page1_area, &cont_area, end.as_ref())?;

    let mut rows: Vec<Row> = Vec::new();
    for (i, (page, area)) in chunks.iter().enumerate() {
        let skip = if i == 0 { spec.page1_skip } else { spec.cont_skip };
        let raw = grid.grid(*page, area, &columns)?;
        debug!("chunk page {page}: {} raw row(s), skipping {skip}", raw.len());
        for cells in raw.into_iter().skip(skip) {
            let row = Row::from_cells(&cells, spec.roles);
            if spec
                .row_filters
                .iter()
                .any(|f| row.cell(f.role).contains(f.needle))
            {
                continue;
            }
            rows.push(row);
        }
    }

    let mut amounts: Vec<Option<Decimal>> = rows
        .iter()
        .map(|r| row_amount(r, spec))
        .collect::<Result<_, _>>()?;

    if matches!(spec.merge, MergeStyle::Lookahead) {
        let merged = lookahead_merge(&rows, &amounts);
        rows = merged.0;
        amounts = merged.1;
    }

    let mut start = 0usize;
    let opening = match &spec.opening_row {
        OpeningRow::None => Decimal::ZERO,
        OpeningRow::Labeled { labels } => {
            let first = rows.first().ok_or_else(|| {
                ScrapeError::Template("transaction table came out empty".to_string())
            })?;
            if !labels.iter().any(|l| first.description.contains(l)) {
                return Err(ScrapeError::Template(format!(
                    "first line of table should carry one of {:?} instead of \"{}\"",
                    labels, first.description
                )));
            }
            start = 1;
            amounts[0].ok_or_else(|| {
                ScrapeError::Template("opening balance row carries no amount".to_string())
            })?
        }
    };

    let mut stop = rows.len();
    let closing = match &spec.closing_row {
        ClosingRow::Labeled { labels } => {
            let last = rows.last().ok_or_else(|| {
                ScrapeError::Template("transaction table came out empty".to_string())
            })?;
            if !labels.iter().any(|l| last.description.contains(l)) {
                return Err(ScrapeError::Template(format!(
                    "last line of table should carry one of {:?} instead of \"{}\"",
                    labels, last.description
                )));
            }
            stop -= 1;
            amounts[stop].ok_or_else(|| {
                ScrapeError::Template("closing balance row carries no amount".to_string())
            })?
        }
        ClosingRow::Boxed {
            label,
            rule,
            x_left,
            x_right,
        } => boxed_balance(index, spec, label, rule, *x_left, *x_right)?,
    };

    let stop = stop.max(start);
    let entries = build_entries(
        &rows[start..stop],
        &amounts[start..stop],
        spec,
        statement_date,
        &currency,
    )?;

    let total: Decimal = entries.iter().map(|e| e.amount).sum();
    check_running_balance(&format!("default({currency})"), opening, total, closing)?;

    let mut previous_balance = BalanceMap::new();
    previous_balance
        .entry("default".to_string())
        .or_default()
        .insert(currency.clone(), opening);
    let mut new_balance = BalanceMap::new();
    new_balance
        .entry("default".to_string())
        .or_default()
        .insert(currency.clone(), closing);

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

// ---------------------------------------------------------------------------
// Rows

#[derive(Debug, Clone, Default)]
struct Row {
    post_date: String,
    transaction_date: String,
    description: String,
    debit: String,
    credit: String,
    amount: String,
}

impl Row {
    fn from_cells(cells: &[String], roles: &[ColumnRole]) -> Row {
        let mut row = Row::default();
        for (i, role) in roles.iter().enumerate() {
            let cell = cells.get(i).map(|c| c.trim().to_string()).unwrap_or_default();
            match role {
                ColumnRole::PostDate => row.post_date = cell,
                ColumnRole::TransactionDate => row.transaction_date = cell,
                ColumnRole::Description => row.description = cell,
                ColumnRole::Debit => row.debit = cell,
                ColumnRole::Credit => row.credit = cell,
                ColumnRole::Amount => row.amount = cell,
            }
        }
        row
    }

    fn cell(&self, role: ColumnRole) -> &str {
        match role {
            ColumnRole::PostDate => &self.post_date,
            ColumnRole::TransactionDate => &self.transaction_date,
            ColumnRole::Description => &self.description,
            ColumnRole::Debit => &self.debit,
            ColumnRole::Credit => &self.credit,
            ColumnRole::Amount => &self.amount,
        }
    }
}

fn row_amount(row: &Row, spec: &TableSpec) -> Result<Option<Decimal>, ScrapeError> {
    match spec.amounts {
        AmountStyle::DebitCredit => signed_amount(&row.credit, &row.debit, spec.locale),
        AmountStyle::CardSigned => card_amount(&row.amount),
    }
}

/// An entry row absorbs the description of the following row when that row
/// carries neither a date nor an amount; rows without an amount are
/// dropped afterwards.
fn lookahead_merge(rows: &[Row], amounts: &[Option<Decimal>]) -> (Vec<Row>, Vec<Option<Decimal>>) {
    let mut out_rows = Vec::new();
    let mut out_amounts = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        if amounts[i].is_none() {
            continue;
        }
        let mut merged = row.clone();
        if !row.post_date.is_empty() {
            if let Some(next) = rows.get(i + 1) {
                if next.post_date.is_empty() && amounts[i + 1].is_none() && !next.description.is_empty()
                {
                    merged.description = format!("{} {}", merged.description, next.description);
                }
            }
        }
        out_rows.push(merged);
        out_amounts.push(amounts[i]);
    }
    (out_rows, out_amounts)
}

fn build_entries(
    rows: &[Row],
    amounts: &[Option<Decimal>],
    spec: &TableSpec,
    statement_date: NaiveDate,
    currency: &str,
) -> Result<Vec<Entry>, ScrapeError> {
    struct Pending {
        post_date: String,
        transaction_date: String,
        description: String,
        amount: Option<Decimal>,
    }

    let forward_fill = matches!(spec.merge, MergeStyle::ForwardFill { .. });
    let join = match spec.merge {
        MergeStyle::ForwardFill { join } => join,
        _ => " ",
    };

    let mut entries = Vec::new();
    let mut pending: Option<Pending> = None;

    let mut flush = |p: Option<Pending>, entries: &mut Vec<Entry>| -> Result<(), ScrapeError> {
        if let Some(p) = p {
            let amount = match p.amount {
                Some(a) => a,
                None => {
                    debug!("dropping row without amount: \"{}\"", p.description);
                    return Ok(());
                }
            };
            let post_date = entry_date(&p.post_date, spec, statement_date)?;
            let transaction_date = if p.transaction_date.is_empty() {
                post_date
            } else {
                entry_date(&p.transaction_date, spec, statement_date)?
            };
            entries.push(Entry {
                account: "default".to_string(),
                post_date,
                transaction_date,
                description: p.description,
                currency: currency.to_string(),
                amount,
            });
        }
        Ok(())
    };

    for (i, row) in rows.iter().enumerate() {
        let continuation = forward_fill && row.post_date.is_empty() && pending.is_some();
        if continuation {
            let p = pending.as_mut().expect("continuation requires a pending row");
            if !row.description.is_empty() {
                if !p.description.is_empty() {
                    p.description.push_str(join);
                }
                p.description.push_str(&row.description);
            }
            // A wrapped row's numbers only count when the lead row had none.
            if p.amount.is_none() {
                p.amount = amounts[i];
            }
        } else {
            flush(pending.take(), &mut entries)?;
            pending = Some(Pending {
                post_date: row.post_date.clone(),
                transaction_date: row.transaction_date.clone(),
                description: row.description.clone(),
                amount: amounts[i],
            });
        }
    }
    flush(pending.take(), &mut entries)?;

    Ok(entries)
}

fn entry_date(
    cell: &str,
    spec: &TableSpec,
    statement_date: NaiveDate,
) -> Result<NaiveDate, ScrapeError> {
    match spec.entry_date {
        EntryDateStyle::Exact(fmt) => parse_date(cell, fmt),
        EntryDateStyle::InferYear(fmt) => parse_with_inferred_year(cell, fmt, statement_date),
    }
}

// ---------------------------------------------------------------------------
// Field and currency resolution

fn capture(pattern: &str, text: &str) -> Result<String, ScrapeError> {
    let re = Regex::new(pattern).map_err(|e| ScrapeError::Parse(e.to_string()))?;
    let caps = re.captures(text).ok_or_else(|| {
        ScrapeError::Template(format!("\"{text}\" does not match pattern \"{pattern}\""))
    })?;
    let group = caps.get(1).unwrap_or_else(|| caps.get(0).expect("match exists"));
    Ok(group.as_str().trim().to_string())
}

fn resolve_field(index: &dyn LayoutIndex, source: &FieldSource) -> Result<String, ScrapeError> {
    match source {
        FieldSource::InBox {
            page,
            bbox,
            pattern,
        } => {
            let text = text_in_box(index, *page, bbox)?;
            match pattern {
                None => Ok(text),
                Some(p) => capture(p, &text),
            }
        }
        FieldSource::AtLabel {
            anchor,
            pattern,
            side_box,
        } => {
            let located = anchor.finder().require(index, None, None)?;
            let re = Regex::new(pattern).map_err(|e| ScrapeError::Parse(e.to_string()))?;
            if let Some(caps) = re.captures(&located.text) {
                let group = caps.get(1).unwrap_or_else(|| caps.get(0).expect("match exists"));
                return Ok(group.as_str().trim().to_string());
            }
            if let Some((x_left, x_right)) = side_box {
                let bbox = BBox::new(
                    *x_left,
                    located.section.y_bottom - 3.0,
                    *x_right,
                    located.section.y_top + 3.0,
                );
                let text = text_in_box(index, located.section.page, &bbox)?;
                return capture(pattern, &text);
            }
            Err(ScrapeError::Template(format!(
                "\"{}\" line does not match pattern \"{}\"",
                located.text, pattern
            )))
        }
    }
}

fn resolve_currency(
    index: &dyn LayoutIndex,
    source: &CurrencySource,
) -> Result<String, ScrapeError> {
    match source {
        CurrencySource::Fixed(c) => Ok((*c).to_string()),
        CurrencySource::HeaderBox { bbox, pattern } => {
            let text = text_in_box(index, 1, bbox)?;
            capture(pattern, &text)
        }
    }
}

// ---------------------------------------------------------------------------
// Table geometry

fn locate_end(index: &dyn LayoutIndex, spec: &TableSpec) -> Result<Option<Section>, ScrapeError> {
    if spec.end_anchors.is_empty() {
        return Ok(None);
    }
    let finders: Vec<TextFinder> = spec.end_anchors.iter().map(TextAnchor::finder).collect();
    Ok(Some(find_first_of(index, &finders)?.section))
}

/// Column boundaries plus the page-1 and continuation areas, threaded
/// explicitly: rule discovery feeds both areas the same x extent instead of
/// mutating shared profile state.
fn resolve_columns(
    index: &dyn LayoutIndex,
    spec: &TableSpec,
    begin: Option<&Section>,
) -> Result<(Vec<f64>, BBox, BBox), ScrapeError> {
    match &spec.columns {
        ColumnsSpec::Fixed(cols) => {
            let mut p1 = spec.page1_area;
            if let Some(b) = begin {
                p1 = p1.with_vertical(p1.y_bottom, b.y_bottom + 2.0);
            }
            Ok((cols.to_vec(), p1, spec.cont_area))
        }
        ColumnsSpec::FromRules(rc) => {
            let begin = begin.ok_or_else(|| {
                ScrapeError::Template(
                    "rule-derived columns require a begin anchor".to_string(),
                )
            })?;
            let (columns, x_left, x_right, footer_y) = discover_columns(index, rc)?;
            let p1 = BBox::new(x_left, footer_y + 2.0, x_right, begin.y_bottom + 2.0);
            let cont = spec
                .cont_area
                .with_horizontal(x_left, x_right);
            Ok((columns, p1, cont))
        }
    }
}

/// Find the ruled header grid on page 1: the last footer rule bounds the
/// search downward, the band anchor upward; the top two thin rules frame
/// the header band, and the vertical rules crossing that band are the
/// column separators. Outermost verticals become the table's x extent.
fn discover_columns(
    index: &dyn LayoutIndex,
    rc: &RuleColumnsSpec,
) -> Result<(Vec<f64>, f64, f64, f64), ScrapeError> {
    let footer = rc
        .footer
        .finder()
        .find_sections(index, Some(1), None, None)
        .pop()
        .ok_or_else(|| {
            ScrapeError::Template("could not find the table footer rule on page 1".to_string())
        })?;

    let anchor = rc
        .band_anchor
        .finder()
        .on_page(1)
        .require(index, None, None)?;

    let band = rc
        .band_rules
        .finder()
        .find_sections(index, Some(1), Some(&anchor.section), Some(&footer));
    if band.len() < 2 {
        return Err(ScrapeError::Template(
            "could not frame the table header band between its rules".to_string(),
        ));
    }

    let xs = VRuleFinder::new(band[0].y_top + 1.0, band[1].y_bottom - 1.0, rc.column_span_min)
        .with_thickness(0.0, rc.column_thickness_max)
        .find_x_positions(index, Some(1));
    if xs.len() < 3 {
        return Err(ScrapeError::Template(format!(
            "expected at least 3 vertical rules in the table header, found {}",
            xs.len()
        )));
    }

    let x_left = xs[0];
    let x_right = *xs.last().expect("len checked above");
    let columns = xs[1..xs.len() - 1].to_vec();
    debug!("columns found: {columns:?} within [{x_left}, {x_right}]");
    Ok((columns, x_left, x_right, footer.y_bottom))
}

fn build_chunks(
    index: &dyn LayoutIndex,
    spec: &TableSpec,
    page1_area: &BBox,
    cont_area: &BBox,
    end: Option<&Section>,
) -> Result<Vec<(usize, BBox)>, ScrapeError> {
    let mut chunks: Vec<(usize, BBox)> = Vec::new();
    let mut p1 = *page1_area;

    match (end, spec.span) {
        (Some(end), TableSpan::Anchored) => {
            if end.page == 1 {
                p1 = p1.with_vertical(end_bottom(spec, end), p1.y_top);
                chunks.push((1, p1));
            } else {
                chunks.push((1, p1));
                let cont = cont_with_rule_top(index, spec, cont_area)?;
                for page in 2..end.page {
                    chunks.push((page, cont));
                }
                chunks.push((end.page, cont.with_vertical(end_bottom(spec, end), cont.y_top)));
            }
        }
        (_, TableSpan::AllPages) => {
            chunks.push((1, p1));
            if index.page_count() > 1 {
                let cont = cont_with_rule_top(index, spec, cont_area)?;
                for page in 2..=index.page_count() {
                    chunks.push((page, cont));
                }
            }
        }
        (None, TableSpan::Anchored) => {
            chunks.push((1, p1));
        }
    }
    Ok(chunks)
}

fn end_bottom(spec: &TableSpec, end: &Section) -> f64 {
    if spec.end_included {
        end.y_bottom - 2.0
    } else {
        end.y_top - 1.0
    }
}

fn cont_with_rule_top(
    index: &dyn LayoutIndex,
    spec: &TableSpec,
    cont_area: &BBox,
) -> Result<BBox, ScrapeError> {
    match &spec.cont_top_rule {
        None => Ok(*cont_area),
        Some(rule) => {
            let top = rule
                .finder()
                .find_sections(index, Some(2), None, None)
                .into_iter()
                .next()
                .ok_or_else(|| {
                    ScrapeError::Template(
                        "could not find the continuation-page top rule".to_string(),
                    )
                })?;
            Ok(cont_area.with_vertical(cont_area.y_bottom, top.y_top))
        }
    }
}

fn boxed_balance(
    index: &dyn LayoutIndex,
    spec: &TableSpec,
    label: &TextAnchor,
    rule: &HRuleSpec,
    x_left: f64,
    x_right: f64,
) -> Result<Decimal, ScrapeError> {
    let located = label.finder().require(index, None, None)?;
    let page = located.section.page;

    let above = rule
        .finder()
        .find_sections(index, Some(page), None, Some(&located.section))
        .pop()
        .ok_or_else(|| {
            ScrapeError::Template("no rule above the closing balance box".to_string())
        })?;
    let below = rule
        .finder()
        .find_sections(index, Some(page), Some(&located.section), None)
        .into_iter()
        .next()
        .ok_or_else(|| {
            ScrapeError::Template("no rule below the closing balance box".to_string())
        })?;

    let bbox = BBox::new(x_left, below.y_bottom, x_right, above.y_top);
    let text = text_in_box(index, page, &bbox)?;
    debug!("closing balance box reads \"{text}\"");
    parse_amount(&text, spec.locale)?.ok_or_else(|| {
        ScrapeError::Template("closing balance box is empty".to_string())
    })
}
