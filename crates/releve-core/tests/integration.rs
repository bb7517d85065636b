//! End-to-end pipeline tests over a mock layout index, modelling miniature
//! statements without invoking poppler or lopdf.

use releve_core::banks;
use releve_core::error::ScrapeError;
use releve_core::geometry::{BBox, Orientation};
use releve_core::index::grid::TextGrid;
use releve_core::index::{LayoutIndex, RulePrim, TextRun};
use releve_core::process_document;
use rust_decimal_macros::dec;

struct MockIndex {
    pages: Vec<(f64, f64)>,
    runs: Vec<TextRun>,
    rules: Vec<RulePrim>,
}

impl LayoutIndex for MockIndex {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, page: usize) -> Result<(f64, f64), ScrapeError> {
        self.pages
            .get(page - 1)
            .copied()
            .ok_or_else(|| ScrapeError::Template(format!("page {page} out of range")))
    }

    fn text_runs(&self, page: Option<usize>, clip: Option<&BBox>) -> Vec<TextRun> {
        self.runs
            .iter()
            .filter(|r| page.map(|p| r.page == p).unwrap_or(true))
            .filter(|r| clip.map(|c| c.contains(&r.bbox)).unwrap_or(true))
            .cloned()
            .collect()
    }

    fn rules(&self, page: Option<usize>, clip: Option<&BBox>) -> Vec<RulePrim> {
        self.rules
            .iter()
            .filter(|r| page.map(|p| r.page == p).unwrap_or(true))
            .filter(|r| clip.map(|c| c.contains(&r.bbox)).unwrap_or(true))
            .cloned()
            .collect()
    }
}

fn text(x0: f64, y0: f64, x1: f64, y1: f64, s: &str) -> TextRun {
    TextRun {
        page: 1,
        bbox: BBox::new(x0, y0, x1, y1),
        text: s.to_string(),
    }
}

fn hline(y: f64, x0: f64, x1: f64, thickness: f64) -> RulePrim {
    RulePrim {
        page: 1,
        bbox: BBox::new(x0, y, x1, y),
        thickness,
        orientation: Orientation::Horizontal,
    }
}

fn vline(x: f64, y0: f64, y1: f64) -> RulePrim {
    RulePrim {
        page: 1,
        bbox: BBox::new(x, y0, x, y1),
        thickness: 0.4,
        orientation: Orientation::Vertical,
    }
}

// ---------------------------------------------------------------------------
// HSBC HK account statement, one page, one HKD Savings zone + summary
// ---------------------------------------------------------------------------

fn hk_index(summary_ccy_amount: &str) -> MockIndex {
    let runs = vec![
        // Signatures and structuring anchors.
        text(50.0, 770.0, 150.0, 780.0, "Financial Overview"),
        text(
            50.0,
            540.0,
            300.0,
            550.0,
            "HSBC Premier Account Transaction History",
        ),
        text(50.0, 640.0, 150.0, 650.0, "Portfolio Summary"),
        text(50.0, 120.0, 200.0, 130.0, "Total Relationship Balance"),
        // Placeholder boxes.
        text(487.0, 701.0, 537.0, 711.0, "123-456789-833"),
        text(395.0, 652.0, 536.0, 660.0, "21 August 2019"),
        // Portfolio summary table: header echo, header part, narrative,
        // one data row, Total row.
        text(10.0, 618.0, 90.0, 626.0, "Account Type"),
        text(10.0, 600.0, 60.0, 608.0, "Balances"),
        text(10.0, 588.0, 120.0, 596.0, "Account Portfolio"),
        text(10.0, 578.0, 90.0, 586.0, "HKD Savings"),
        text(160.0, 578.0, 200.0, 586.0, "HKD"),
        text(340.0, 578.0, 400.0, 586.0, summary_ccy_amount),
        text(490.0, 578.0, 530.0, 586.0, "1,300.00"),
        text(10.0, 563.0, 40.0, 571.0, "Total"),
        text(490.0, 563.0, 530.0, 571.0, "1,300.00"),
        // HKD Savings section anchor (height 9 distinguishes it from the
        // summary row wording).
        text(50.0, 520.0, 110.0, 529.0, "HKD Savings"),
        // HKD Savings table: header echo, B/F BALANCE, two entries.
        text(10.0, 496.0, 40.0, 504.0, "Date"),
        text(420.0, 496.0, 460.0, 504.0, "Balance"),
        text(90.0, 468.0, 170.0, 476.0, "B/F BALANCE"),
        text(420.0, 468.0, 470.0, 476.0, "1,000.00"),
        text(10.0, 448.0, 50.0, 456.0, "04 Apr"),
        text(90.0, 448.0, 200.0, 456.0, "SALARY PAYMENT"),
        text(270.0, 448.0, 320.0, 456.0, "500.00"),
        text(10.0, 428.0, 50.0, 436.0, "06 Apr"),
        text(90.0, 428.0, 190.0, 436.0, "SUPERMARKET"),
        text(340.0, 428.0, 390.0, 436.0, "200.00"),
    ];

    let mut rules = vec![
        // Summary header: thick divider + column separators in its band.
        hline(620.0, 0.0, 595.0, 13.0),
        // HKD table header.
        hline(500.0, 0.0, 595.0, 13.0),
    ];
    for x in [100.0, 150.0, 250.0, 330.0, 420.0, 480.0, 540.0] {
        rules.push(vline(x, 613.0, 627.0));
    }
    for x in [80.0, 260.0, 330.0, 410.0, 490.0] {
        rules.push(vline(x, 492.0, 507.0));
    }

    MockIndex {
        pages: vec![(595.0, 842.0)],
        runs,
        rules,
    }
}

#[test]
fn hk_statement_end_to_end() {
    let index = hk_index("1,300.00");
    let grid = TextGrid::new(&index);
    let statement =
        process_document("statement.pdf", &index, &grid, &banks::registry()).unwrap();

    assert_eq!(statement.main_account, "123-456789-833");
    assert_eq!(
        statement.statement_date,
        chrono::NaiveDate::from_ymd_opt(2019, 8, 21).unwrap()
    );

    assert_eq!(
        statement.previous_balance["HKDSavings"]["HKD"],
        dec!(1000.00)
    );
    assert_eq!(statement.new_balance["HKDSavings"]["HKD"], dec!(1300.00));

    assert_eq!(statement.entries.len(), 2);
    assert_eq!(statement.entries[0].description, "SALARY PAYMENT");
    assert_eq!(statement.entries[0].amount, dec!(500.00));
    assert_eq!(statement.entries[1].description, "SUPERMARKET");
    assert_eq!(statement.entries[1].amount, dec!(-200.00));
    assert_eq!(
        statement.entries[0].post_date,
        chrono::NaiveDate::from_ymd_opt(2019, 4, 4).unwrap()
    );

    // Balance invariant across the whole statement.
    for (account, per_ccy) in &statement.new_balance {
        for (currency, new) in per_ccy {
            let previous = statement.previous_balance[account][currency];
            let total: rust_decimal::Decimal = statement
                .entries
                .iter()
                .filter(|e| &e.account == account && &e.currency == currency)
                .map(|e| e.amount)
                .sum();
            assert_eq!((previous + total).round_dp(2), new.round_dp(2));
        }
    }
}

#[test]
fn hk_statement_json_is_idempotent() {
    let index = hk_index("1,300.00");
    let grid = TextGrid::new(&index);
    let first = process_document("statement.pdf", &index, &grid, &banks::registry())
        .unwrap()
        .to_json()
        .unwrap();
    let second = process_document("statement.pdf", &index, &grid, &banks::registry())
        .unwrap()
        .to_json()
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn hk_summary_mismatch_is_fatal_with_difference() {
    // The summary declares 1,299.98 where the zone computes 1,300.00.
    let index = hk_index("1,299.98");
    let grid = TextGrid::new(&index);
    let err =
        process_document("statement.pdf", &index, &grid, &banks::registry()).unwrap_err();
    match err {
        ScrapeError::Consistency {
            computed,
            declared,
            difference,
            ..
        } => {
            assert_eq!(computed, dec!(1300.00));
            assert_eq!(declared, dec!(1299.98));
            assert_eq!(difference.abs(), dec!(0.02));
        }
        other => panic!("expected Consistency, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// SocGen card statement: lookahead merge, CR amounts, year inference
// ---------------------------------------------------------------------------

fn socgen_card_index() -> MockIndex {
    let runs = vec![
        text(50.0, 800.0, 170.0, 810.0, "Société Générale"),
        text(50.0, 750.0, 140.0, 760.0, "RELEVÉ CARTE"),
        text(330.0, 683.0, 550.0, 692.0, "1234 56XX XXXX 7890"),
        text(330.0, 635.0, 440.0, 647.0, "15 Jan 2024"),
        text(480.0, 602.0, 560.0, 614.0, "Amount (EUR)"),
        // Table rows (the Amount header row above is the dropped echo).
        text(140.0, 580.0, 300.0, 588.0, "PREVIOUS BALANCE"),
        text(490.0, 580.0, 550.0, 588.0, "100.00"),
        text(65.0, 560.0, 95.0, 568.0, "20Dec"),
        text(100.0, 560.0, 130.0, 568.0, "21Dec"),
        text(140.0, 560.0, 320.0, 568.0, "RESTAURANT LE PARIS"),
        text(490.0, 560.0, 545.0, 568.0, "45.50"),
        text(140.0, 545.0, 250.0, 553.0, "PARIS 8EME"),
        text(65.0, 530.0, 95.0, 538.0, "05Jan"),
        text(100.0, 530.0, 130.0, 538.0, "06Jan"),
        text(140.0, 530.0, 280.0, 538.0, "REFUND STORE"),
        text(490.0, 530.0, 552.0, 538.0, "30.00CR"),
        text(140.0, 510.0, 290.0, 518.0, "CLOSING BALANCE"),
        text(490.0, 510.0, 548.0, 518.0, "115.50"),
    ];

    MockIndex {
        pages: vec![(595.0, 842.0)],
        runs,
        rules: vec![],
    }
}

#[test]
fn socgen_card_end_to_end() {
    let index = socgen_card_index();
    let grid = TextGrid::new(&index);
    let statement =
        process_document("card.pdf", &index, &grid, &banks::registry()).unwrap();

    assert_eq!(statement.main_account, "1234 56XX XXXX 7890");
    assert_eq!(statement.entries.len(), 2);

    // Card tables are debit-positive: the printed 100.00 opening balance is
    // money owed.
    assert_eq!(statement.previous_balance["default"]["EUR"], dec!(-100.00));
    assert_eq!(statement.new_balance["default"]["EUR"], dec!(-115.50));

    // Lookahead merge absorbed the wrapped venue line.
    assert_eq!(
        statement.entries[0].description,
        "RESTAURANT LE PARIS PARIS 8EME"
    );
    assert_eq!(statement.entries[0].amount, dec!(-45.50));
    // December dates on a January statement belong to the prior year.
    assert_eq!(
        statement.entries[0].post_date,
        chrono::NaiveDate::from_ymd_opt(2023, 12, 20).unwrap()
    );
    assert_eq!(
        statement.entries[0].transaction_date,
        chrono::NaiveDate::from_ymd_opt(2023, 12, 21).unwrap()
    );

    // CR suffix marks a credit.
    assert_eq!(statement.entries[1].amount, dec!(30.00));
    assert_eq!(statement.entries[1].currency, "EUR");
}

#[test]
fn unrecognized_document_is_not_a_template_error() {
    let index = MockIndex {
        pages: vec![(595.0, 842.0)],
        runs: vec![text(50.0, 700.0, 200.0, 710.0, "Some Random Document")],
        rules: vec![],
    };
    let grid = TextGrid::new(&index);
    let err = process_document("mystery.pdf", &index, &grid, &banks::registry()).unwrap_err();
    assert!(matches!(err, ScrapeError::Unrecognized { .. }));
}
