pub mod grid;
pub mod poppler;

use crate::error::ScrapeError;
use crate::geometry::{BBox, Orientation};

/// One horizontal line of rendered text with its bounding box.
#[derive(Debug, Clone)]
pub struct TextRun {
    pub page: usize,
    pub bbox: BBox,
    pub text: String,
}

/// One vector line or thin rectangle primitive.
///
/// For stroked segments `thickness` is the stroke width; for filled
/// rectangles it is the short side of the rectangle.
#[derive(Debug, Clone)]
pub struct RulePrim {
    pub page: usize,
    pub bbox: BBox,
    pub thickness: f64,
    pub orientation: Orientation,
}

impl RulePrim {
    /// Length of the rule along its own axis.
    pub fn span(&self) -> f64 {
        match self.orientation {
            Orientation::Horizontal => self.bbox.width(),
            Orientation::Vertical => self.bbox.height(),
        }
    }
}

/// Read-only queries against a parsed document's text and line geometry.
///
/// Coordinates are PDF page coordinates (origin bottom-left, y grows
/// upward); pages are numbered from 1.
pub trait LayoutIndex {
    fn page_count(&self) -> usize;

    /// (width, height) of the given page.
    fn page_size(&self, page: usize) -> Result<(f64, f64), ScrapeError>;

    /// Text lines, optionally restricted to one page and clipped to a box
    /// (full containment).
    fn text_runs(&self, page: Option<usize>, clip: Option<&BBox>) -> Vec<TextRun>;

    /// Line/rectangle primitives, with the same filtering semantics.
    fn rules(&self, page: Option<usize>, clip: Option<&BBox>) -> Vec<RulePrim>;
}

/// Table-cell extraction: one grid of strings per requested page area,
/// split at the given interior column x-positions.
pub trait GridSource {
    fn grid(
        &self,
        page: usize,
        area: &BBox,
        columns: &[f64],
    ) -> Result<Vec<Vec<String>>, ScrapeError>;
}

pub(crate) fn run_matches(run: &TextRun, page: Option<usize>, clip: Option<&BBox>) -> bool {
    if let Some(p) = page {
        if run.page != p {
            return false;
        }
    }
    if let Some(c) = clip {
        if !c.contains(&run.bbox) {
            return false;
        }
    }
    true
}

pub(crate) fn rule_matches(rule: &RulePrim, page: Option<usize>, clip: Option<&BBox>) -> bool {
    if let Some(p) = page {
        if rule.page != p {
            return false;
        }
    }
    if let Some(c) = clip {
        if !c.contains(&rule.bbox) {
            return false;
        }
    }
    true
}
