use crate::geometry::BBox;
use crate::locate::{HRuleFinder, TextFinder};
use crate::model::StatementType;
use crate::parsing::values::NumberLocale;
use crate::zone::Margins;

/// A text label anchor as declared by a profile.
#[derive(Debug, Clone)]
pub struct TextAnchor {
    pub text: &'static str,
    pub height: Option<f64>,
    pub first: bool,
}

impl TextAnchor {
    pub fn new(text: &'static str) -> Self {
        TextAnchor {
            text,
            height: None,
            first: false,
        }
    }

    pub fn height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }

    pub fn first(mut self) -> Self {
        self.first = true;
        self
    }

    pub fn finder(&self) -> TextFinder {
        let mut finder = TextFinder::new(self.text);
        if let Some(h) = self.height {
            finder = finder.with_height(h);
        }
        if self.first {
            finder = finder.first_match();
        }
        finder
    }
}

/// A horizontal-rule query as declared by a profile.
#[derive(Debug, Clone)]
pub struct HRuleSpec {
    pub x_left: f64,
    pub x_right: f64,
    pub thickness_min: f64,
    pub thickness_max: f64,
    pub span_min: Option<f64>,
    pub y_max: Option<f64>,
}

impl HRuleSpec {
    pub fn new(x_left: f64, x_right: f64, thickness_min: f64, thickness_max: f64) -> Self {
        HRuleSpec {
            x_left,
            x_right,
            thickness_min,
            thickness_max,
            span_min: None,
            y_max: None,
        }
    }

    pub fn span_min(mut self, span_min: f64) -> Self {
        self.span_min = Some(span_min);
        self
    }

    pub fn below(mut self, y_max: f64) -> Self {
        self.y_max = Some(y_max);
        self
    }

    pub fn finder(&self) -> HRuleFinder {
        let mut finder = HRuleFinder::new(
            self.x_left,
            self.x_right,
            self.thickness_min,
            self.thickness_max,
        );
        if let Some(span) = self.span_min {
            finder = finder.with_span_min(span);
        }
        if let Some(y) = self.y_max {
            finder = finder.below(y);
        }
        finder
    }
}

/// Bank- and statement-type-specific configuration: anchors, margins,
/// columns, formats, and cleaning rules, selected by the dispatcher.
/// Profiles are plain data; adding a bank is an authoring exercise.
#[derive(Debug, Clone)]
pub struct LayoutProfile {
    pub bank: &'static str,
    pub statement_type: StatementType,
    /// Every anchor must appear somewhere in the document.
    pub bank_signature: Vec<TextAnchor>,
    pub type_signature: Vec<TextAnchor>,
    /// Run the trailing-bytes repair before table extraction.
    pub repair_trailing_bytes: bool,
    pub pipeline: Pipeline,
}

#[derive(Debug, Clone)]
pub enum Pipeline {
    /// Several anchored table zones plus a cross-validating summary zone
    /// (HSBC HK account statements).
    MultiZone(MultiZoneSpec),
    /// One logical transaction table spanning pages (the French layouts).
    SingleTable(TableSpec),
}

// ---------------------------------------------------------------------------
// Multi-zone statements

#[derive(Debug, Clone)]
pub struct MultiZoneSpec {
    pub account_number_box: BBox,
    pub statement_date_box: BBox,
    pub statement_date_format: &'static str,
    pub summary_anchor: TextAnchor,
    pub top_anchor: TextAnchor,
    pub account_sections: Vec<AccountSection>,
    /// Ordered fallback chain for the end-of-tables anchor.
    pub end_anchors: Vec<TextAnchor>,
    /// An end anchor above this y sits in a page's letterhead; it is
    /// clamped to the previous page's bottom margin.
    pub end_clamp_y: f64,
    pub margins: Margins,
    pub locale: NumberLocale,
    pub entry_date_format: &'static str,
}

#[derive(Debug, Clone)]
pub struct AccountSection {
    pub account: &'static str,
    pub anchor: TextAnchor,
    pub kind: ZoneKind,
}

#[derive(Debug, Clone)]
pub enum ZoneKind {
    /// All rows in one currency; the leading column is the posting date.
    SingleCurrency { currency: &'static str },
    /// Back-to-back per-currency sub-sections, each opened by a currency
    /// label and a B/F BALANCE row.
    MultiCurrency,
}

// ---------------------------------------------------------------------------
// Single-table statements

#[derive(Debug, Clone)]
pub struct TableSpec {
    pub account_number: FieldSource,
    pub statement_date: FieldSource,
    pub statement_date_format: &'static str,
    pub currency: CurrencySource,
    pub begin_anchor: Option<TextAnchor>,
    pub end_anchors: Vec<TextAnchor>,
    /// Whether the end anchor's own row belongs to the table.
    pub end_included: bool,
    pub span: TableSpan,
    pub page1_area: BBox,
    pub cont_area: BBox,
    /// Top of continuation pages, when derived from a rule instead of the
    /// declared cont_area.
    pub cont_top_rule: Option<HRuleSpec>,
    pub columns: ColumnsSpec,
    pub roles: &'static [ColumnRole],
    /// Rows dropped from the first chunk / from every later chunk (header
    /// echoes and repeated banners).
    pub page1_skip: usize,
    pub cont_skip: usize,
    pub row_filters: Vec<RowFilter>,
    pub opening_row: OpeningRow,
    pub closing_row: ClosingRow,
    pub merge: MergeStyle,
    pub entry_date: EntryDateStyle,
    pub amounts: AmountStyle,
    pub locale: NumberLocale,
}

#[derive(Debug, Clone)]
pub enum FieldSource {
    /// Exactly one text line inside a fixed box, with an optional capture.
    InBox {
        page: usize,
        bbox: BBox,
        pattern: Option<&'static str>,
    },
    /// A located label line, captured by regex; when the capture misses,
    /// read a box beside the label instead.
    AtLabel {
        anchor: TextAnchor,
        pattern: &'static str,
        side_box: Option<(f64, f64)>,
    },
}

#[derive(Debug, Clone)]
pub enum CurrencySource {
    Fixed(&'static str),
    /// Sniffed from a column header like `Amount (EUR)`.
    HeaderBox {
        bbox: BBox,
        pattern: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableSpan {
    /// Continuation chunks stop at the end anchor's page.
    Anchored,
    /// Every page after the first uses the continuation area (the end
    /// anchor only bounds the last page's rows).
    AllPages,
}

#[derive(Debug, Clone)]
pub enum ColumnsSpec {
    Fixed(&'static [f64]),
    /// Columns and table x-extent discovered from the ruled header grid.
    FromRules(RuleColumnsSpec),
}

#[derive(Debug, Clone)]
pub struct RuleColumnsSpec {
    /// Page-1 footer rule; the last match bounds the search downward.
    pub footer: HRuleSpec,
    /// Label bounding the search upward.
    pub band_anchor: TextAnchor,
    /// Thin full-width rules between anchor and footer; the top two frame
    /// the header band.
    pub band_rules: HRuleSpec,
    pub column_span_min: f64,
    pub column_thickness_max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    PostDate,
    TransactionDate,
    Description,
    Debit,
    Credit,
    Amount,
}

/// Drop any row whose cell for `role` contains `needle`.
#[derive(Debug, Clone)]
pub struct RowFilter {
    pub role: ColumnRole,
    pub needle: &'static str,
}

#[derive(Debug, Clone)]
pub enum OpeningRow {
    /// No opening row; the previous balance is zero (card statements).
    None,
    /// First row's description must carry one of these labels; its amount
    /// is the previous balance and the row is removed.
    Labeled { labels: &'static [&'static str] },
}

#[derive(Debug, Clone)]
pub enum ClosingRow {
    /// Last row's description must carry one of these labels; its amount
    /// is the new balance and the row is removed.
    Labeled { labels: &'static [&'static str] },
    /// New balance printed in a ruled box beside a label, outside the
    /// table itself.
    Boxed {
        label: TextAnchor,
        rule: HRuleSpec,
        x_left: f64,
        x_right: f64,
    },
}

#[derive(Debug, Clone)]
pub enum MergeStyle {
    None,
    /// A row with a blank date column continues the previous entry's
    /// description.
    ForwardFill { join: &'static str },
    /// An entry row absorbs the next row's description when that row has
    /// neither date nor amount.
    Lookahead,
}

#[derive(Debug, Clone)]
pub enum EntryDateStyle {
    Exact(&'static str),
    /// Day/month only; year borrowed from the statement date, rolling back
    /// one year for dates that would land after it.
    InferYear(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountStyle {
    /// Separate debit/credit columns.
    DebitCredit,
    /// Single amount column, debit-positive with CR suffix on credits.
    CardSigned,
}
