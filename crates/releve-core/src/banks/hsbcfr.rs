//! HSBC France statements. Both layouts share the ruled transaction grid
//! whose columns are discovered from the header rules; the bank statement
//! prints its closing balance in a ruled box beside "NOUVEAU SOLDE", the
//! card statement closes with a "TOTAL FACTURE" row and opens from zero.
//!
//! HSBC FR PDFs routinely carry trailing garbage after %%EOF, so both
//! profiles request the repair pass.

use crate::geometry::BBox;
use crate::model::StatementType;
use crate::parsing::values::NumberLocale;
use crate::profile::{
    AmountStyle, ClosingRow, ColumnRole, ColumnsSpec, CurrencySource, EntryDateStyle, FieldSource,
    HRuleSpec, LayoutProfile, MergeStyle, OpeningRow, Pipeline, RowFilter, RuleColumnsSpec,
    TableSpan, TableSpec, TextAnchor,
};

const PREVIOUS_BAL: &str = "SOLDE PRÉCÉDENT";
const NEW_BAL: &str = "NOUVEAU SOLDE";
const CARD_NEW_BAL: &str = "TOTAL FACTURE";

fn page1_area() -> BBox {
    BBox::new(25.0, 125.0, 570.0, 505.0)
}

fn cont_area() -> BBox {
    BBox::new(25.0, 84.0, 570.0, 700.0)
}

fn cont_top_rule() -> HRuleSpec {
    HRuleSpec::new(0.0, 595.0, 0.0, 1.0).span_min(20.0)
}

pub fn bank_profile() -> LayoutProfile {
    LayoutProfile {
        bank: "hsbcfr",
        statement_type: StatementType::Bank,
        bank_signature: vec![TextAnchor::new("www.hsbc.fr")],
        type_signature: vec![TextAnchor::new("Votre Relevé de Compte")],
        repair_trailing_bytes: true,
        pipeline: Pipeline::SingleTable(TableSpec {
            account_number: FieldSource::InBox {
                page: 1,
                bbox: BBox::new(410.0, 782.0, 570.0, 799.0),
                pattern: Some(r"(\d[ \d]+\d)"),
            },
            statement_date: FieldSource::InBox {
                page: 1,
                bbox: BBox::new(420.0, 765.0, 568.0, 788.0),
                pattern: Some(r"du .* au (.*)"),
            },
            statement_date_format: "%d.%m.%y",
            currency: CurrencySource::Fixed("EUR"),
            begin_anchor: Some(TextAnchor::new("RELEVÉ DES OPÉRATIONS").height(13.0)),
            end_anchors: vec![
                TextAnchor::new("TOTAUX DES MOUVEMENTS").height(10.0),
                TextAnchor::new("SOLDE DE FIN DE PERIODE").height(10.0),
            ],
            end_included: false,
            span: TableSpan::Anchored,
            page1_area: page1_area(),
            cont_area: cont_area(),
            cont_top_rule: Some(cont_top_rule()),
            columns: ColumnsSpec::FromRules(RuleColumnsSpec {
                footer: HRuleSpec::new(0.0, 595.0, 0.0, 3.0)
                    .span_min(500.0)
                    .below(90.0),
                band_anchor: TextAnchor::new(PREVIOUS_BAL).height(10.0),
                band_rules: HRuleSpec::new(0.0, 595.0, 0.0, 0.8).span_min(500.0),
                column_span_min: 10.0,
                column_thickness_max: 0.8,
            }),
            roles: &[
                ColumnRole::PostDate,
                ColumnRole::TransactionDate,
                ColumnRole::Description,
                ColumnRole::Debit,
                ColumnRole::Credit,
            ],
            page1_skip: 1,
            cont_skip: 0,
            row_filters: vec![
                RowFilter {
                    role: ColumnRole::Credit,
                    needle: "suite >>>",
                },
                RowFilter {
                    role: ColumnRole::Description,
                    needle: "SOLDE AU",
                },
            ],
            opening_row: OpeningRow::Labeled {
                labels: &[PREVIOUS_BAL],
            },
            closing_row: ClosingRow::Boxed {
                label: TextAnchor::new(NEW_BAL).height(10.0),
                rule: HRuleSpec::new(400.0, 570.0, 1.0, 1.5),
                x_left: 415.0,
                x_right: 570.0,
            },
            merge: MergeStyle::ForwardFill { join: "\n" },
            entry_date: EntryDateStyle::Exact("%d.%m.%y"),
            amounts: AmountStyle::DebitCredit,
            locale: NumberLocale::French,
        }),
    }
}

pub fn card_profile() -> LayoutProfile {
    LayoutProfile {
        bank: "hsbcfr",
        statement_type: StatementType::Card,
        bank_signature: vec![TextAnchor::new("www.hsbc.fr")],
        type_signature: vec![TextAnchor::new("Votre Relevé de Carte").first()],
        repair_trailing_bytes: true,
        pipeline: Pipeline::SingleTable(TableSpec {
            account_number: FieldSource::AtLabel {
                anchor: TextAnchor::new("CARTE N°").first(),
                pattern: r"CARTE N° (\d{4} \d\dXX XXXX \d{4})",
                side_box: None,
            },
            statement_date: FieldSource::AtLabel {
                anchor: TextAnchor::new("Relevé cartes bancaires au").first(),
                pattern: r"(\d\d\.\d\d\.\d\d)$",
                side_box: Some((480.0, 585.0)),
            },
            statement_date_format: "%d.%m.%y",
            currency: CurrencySource::Fixed("EUR"),
            begin_anchor: Some(TextAnchor::new("TOTAL IMPUTE A VOTRE COMPTE")),
            end_anchors: vec![TextAnchor::new(CARD_NEW_BAL).height(13.0)],
            end_included: true,
            span: TableSpan::Anchored,
            page1_area: page1_area(),
            cont_area: cont_area(),
            cont_top_rule: Some(cont_top_rule()),
            columns: ColumnsSpec::FromRules(RuleColumnsSpec {
                footer: HRuleSpec::new(40.0, 562.0, 0.1, 3.0).span_min(498.0),
                band_anchor: TextAnchor::new("TOTAL IMPUTE A VOTRE COMPTE").first(),
                band_rules: HRuleSpec::new(0.0, 595.0, 0.0, 0.8).span_min(20.0),
                column_span_min: 10.0,
                column_thickness_max: 0.8,
            }),
            roles: &[
                ColumnRole::PostDate,
                ColumnRole::Description,
                ColumnRole::Debit,
                ColumnRole::Credit,
            ],
            page1_skip: 2,
            cont_skip: 1,
            row_filters: vec![
                RowFilter {
                    role: ColumnRole::Description,
                    needle: "Opérations effectuées",
                },
                RowFilter {
                    role: ColumnRole::Credit,
                    needle: "suite >>>",
                },
            ],
            opening_row: OpeningRow::None,
            closing_row: ClosingRow::Labeled {
                labels: &[CARD_NEW_BAL],
            },
            merge: MergeStyle::ForwardFill { join: "\n" },
            entry_date: EntryDateStyle::Exact("%d.%m.%y"),
            amounts: AmountStyle::DebitCredit,
            locale: NumberLocale::French,
        }),
    }
}
