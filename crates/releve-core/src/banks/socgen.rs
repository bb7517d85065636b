//! Société Générale statements. The bank layout uses fixed table areas and
//! column positions with SOLDE PRÉCÉDENT / NOUVEAU SOLDE boundary rows;
//! the card layout is an English-format table (debit-positive amounts with
//! a CR suffix) whose currency is sniffed from the Amount column header.

use crate::geometry::BBox;
use crate::model::StatementType;
use crate::parsing::values::NumberLocale;
use crate::profile::{
    AmountStyle, ClosingRow, ColumnRole, ColumnsSpec, CurrencySource, EntryDateStyle, FieldSource,
    LayoutProfile, MergeStyle, OpeningRow, Pipeline, RowFilter, TableSpan, TableSpec, TextAnchor,
};

const PREVIOUS_BAL: &str = "SOLDE PRÉCÉDENT";
const NEW_BAL: &str = "NOUVEAU SOLDE";

pub fn bank_profile() -> LayoutProfile {
    LayoutProfile {
        bank: "societegenerale",
        statement_type: StatementType::Bank,
        bank_signature: vec![TextAnchor::new("Société Générale")],
        type_signature: vec![TextAnchor::new("RELEVÉ DE COMPTE")],
        repair_trailing_bytes: false,
        pipeline: Pipeline::SingleTable(TableSpec {
            account_number: FieldSource::InBox {
                page: 1,
                bbox: BBox::new(410.0, 782.0, 570.0, 799.0),
                pattern: Some(r"(\d[ \d]+\d)"),
            },
            statement_date: FieldSource::InBox {
                page: 1,
                bbox: BBox::new(420.0, 765.0, 568.0, 782.0),
                pattern: Some(r"du .* au (.*)"),
            },
            statement_date_format: "%d/%m/%Y",
            currency: CurrencySource::Fixed("EUR"),
            begin_anchor: None,
            end_anchors: vec![TextAnchor::new(NEW_BAL).height(10.0)],
            end_included: true,
            span: TableSpan::Anchored,
            page1_area: BBox::new(25.0, 95.0, 570.0, 509.0),
            cont_area: BBox::new(25.0, 95.0, 570.0, 700.0),
            cont_top_rule: None,
            columns: ColumnsSpec::Fixed(&[78.0, 130.0, 413.0, 489.0]),
            roles: &[
                ColumnRole::PostDate,
                ColumnRole::TransactionDate,
                ColumnRole::Description,
                ColumnRole::Debit,
                ColumnRole::Credit,
            ],
            page1_skip: 1,
            cont_skip: 0,
            row_filters: vec![RowFilter {
                role: ColumnRole::Description,
                needle: "TOTAUX DES MOUVEMENTS",
            }],
            opening_row: OpeningRow::Labeled {
                labels: &[PREVIOUS_BAL],
            },
            closing_row: ClosingRow::Labeled {
                labels: &[NEW_BAL],
            },
            merge: MergeStyle::ForwardFill { join: "\n" },
            entry_date: EntryDateStyle::Exact("%d/%m/%Y"),
            amounts: AmountStyle::DebitCredit,
            locale: NumberLocale::French,
        }),
    }
}

pub fn card_profile() -> LayoutProfile {
    LayoutProfile {
        bank: "societegenerale",
        statement_type: StatementType::Card,
        bank_signature: vec![TextAnchor::new("Société Générale")],
        type_signature: vec![TextAnchor::new("RELEVÉ CARTE").first()],
        repair_trailing_bytes: false,
        pipeline: Pipeline::SingleTable(TableSpec {
            account_number: FieldSource::InBox {
                page: 1,
                bbox: BBox::new(325.0, 681.0, 561.0, 694.0),
                pattern: None,
            },
            statement_date: FieldSource::InBox {
                page: 1,
                bbox: BBox::new(326.0, 633.0, 446.0, 649.0),
                pattern: None,
            },
            statement_date_format: "%d %b %Y",
            currency: CurrencySource::HeaderBox {
                bbox: BBox::new(477.0, 600.0, 566.0, 616.0),
                pattern: r"Amount +\(([A-Z]{3})\)$",
            },
            begin_anchor: None,
            end_anchors: vec![],
            end_included: true,
            span: TableSpan::AllPages,
            page1_area: BBox::new(60.0, 339.0, 570.0, 617.0),
            cont_area: BBox::new(60.0, 77.0, 570.0, 666.0),
            cont_top_rule: None,
            columns: ColumnsSpec::Fixed(&[97.0, 135.0, 477.0]),
            roles: &[
                ColumnRole::PostDate,
                ColumnRole::TransactionDate,
                ColumnRole::Description,
                ColumnRole::Amount,
            ],
            page1_skip: 1,
            cont_skip: 1,
            row_filters: vec![],
            opening_row: OpeningRow::Labeled {
                labels: &["OPENING BALANCE", "PREVIOUS BALANCE"],
            },
            closing_row: ClosingRow::Labeled {
                labels: &["CLOSING BALANCE", "STATEMENT BALANCE"],
            },
            merge: MergeStyle::Lookahead,
            entry_date: EntryDateStyle::InferYear("%d%b%Y"),
            amounts: AmountStyle::CardSigned,
            locale: NumberLocale::Anglo,
        }),
    }
}
