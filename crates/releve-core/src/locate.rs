use log::debug;

use crate::error::ScrapeError;
use crate::geometry::{is_after, is_before, reading_order, BBox, Orientation, Section};
use crate::index::{LayoutIndex, RulePrim};

/// A text anchor match: where it sits, and what the full line said.
#[derive(Debug, Clone)]
pub struct Located {
    pub section: Section,
    pub text: String,
}

/// Locate a section from a text label (exact substring match), optionally
/// restricted to a page and to a rendered height band of ±1 unit around
/// `height` (distinguishes header text from body text of similar wording).
#[derive(Debug, Clone)]
pub struct TextFinder {
    pattern: String,
    page: Option<usize>,
    height: Option<f64>,
    first: bool,
}

impl TextFinder {
    pub fn new(pattern: impl Into<String>) -> Self {
        TextFinder {
            pattern: pattern.into(),
            page: None,
            height: None,
            first: false,
        }
    }

    pub fn on_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }

    /// Tolerate several matches and keep the first in reading order.
    pub fn first_match(mut self) -> Self {
        self.first = true;
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn find_all(
        &self,
        index: &dyn LayoutIndex,
        after: Option<&Section>,
        before: Option<&Section>,
    ) -> Vec<Located> {
        let mut found: Vec<Located> = index
            .text_runs(self.page, None)
            .into_iter()
            .filter(|r| r.text.contains(&self.pattern))
            .filter(|r| match self.height {
                Some(h) => {
                    let rh = r.bbox.height();
                    rh > h - 1.0 && rh < h + 1.0
                }
                None => true,
            })
            .map(|r| Located {
                section: Section::from_bbox(r.page, &r.bbox),
                text: r.text,
            })
            .filter(|l| match after {
                Some(a) => is_after(&l.section, a),
                None => true,
            })
            .filter(|l| match before {
                Some(b) => is_before(&l.section, b),
                None => true,
            })
            .collect();
        found.sort_by(|a, b| reading_order(&a.section, &b.section));
        found
    }

    /// Zero matches is `None`; several matches is a `Template` error unless
    /// this finder was marked `first_match`.
    pub fn find(
        &self,
        index: &dyn LayoutIndex,
        after: Option<&Section>,
        before: Option<&Section>,
    ) -> Result<Option<Located>, ScrapeError> {
        let mut found = self.find_all(index, after, before);
        if found.len() > 1 && !self.first {
            return Err(ScrapeError::Template(format!(
                "several ({}) occurrences found of \"{}\"",
                found.len(),
                self.pattern
            )));
        }
        if found.is_empty() {
            debug!("no section found for text \"{}\"", self.pattern);
            return Ok(None);
        }
        Ok(Some(found.remove(0)))
    }

    pub fn require(
        &self,
        index: &dyn LayoutIndex,
        after: Option<&Section>,
        before: Option<&Section>,
    ) -> Result<Located, ScrapeError> {
        self.find(index, after, before)?.ok_or_else(|| {
            ScrapeError::Template(format!("\"{}\" not found in statement", self.pattern))
        })
    }
}

/// The first finder in `chain` that matches anything wins; a fully dry
/// chain is a `Template` error naming every label tried.
pub fn find_first_of(
    index: &dyn LayoutIndex,
    chain: &[TextFinder],
) -> Result<Located, ScrapeError> {
    for finder in chain {
        if let Some(found) = finder.find(index, None, None)? {
            return Ok(found);
        }
    }
    let labels: Vec<&str> = chain.iter().map(|f| f.pattern()).collect();
    Err(ScrapeError::Template(format!(
        "none of {:?} found in statement",
        labels
    )))
}

/// Locate horizontal rules inside an x window, filtered by stroke
/// thickness, minimum span, and an optional top-of-page ceiling.
#[derive(Debug, Clone)]
pub struct HRuleFinder {
    x_left: f64,
    x_right: f64,
    thickness_min: f64,
    thickness_max: f64,
    span_min: Option<f64>,
    y_max: Option<f64>,
}

impl HRuleFinder {
    pub fn new(x_left: f64, x_right: f64, thickness_min: f64, thickness_max: f64) -> Self {
        HRuleFinder {
            x_left,
            x_right,
            thickness_min,
            thickness_max,
            span_min: None,
            y_max: None,
        }
    }

    pub fn with_span_min(mut self, span_min: f64) -> Self {
        self.span_min = Some(span_min);
        self
    }

    pub fn below(mut self, y_max: f64) -> Self {
        self.y_max = Some(y_max);
        self
    }

    pub fn find_rules(
        &self,
        index: &dyn LayoutIndex,
        page: Option<usize>,
        after: Option<&Section>,
        before: Option<&Section>,
    ) -> Vec<RulePrim> {
        let mut found: Vec<RulePrim> = index
            .rules(page, None)
            .into_iter()
            .filter(|r| r.orientation == Orientation::Horizontal)
            .filter(|r| r.bbox.x_left >= self.x_left - 0.01 && r.bbox.x_right <= self.x_right + 0.01)
            .filter(|r| r.thickness >= self.thickness_min && r.thickness <= self.thickness_max)
            .filter(|r| match self.span_min {
                Some(min) => r.span() >= min,
                None => true,
            })
            .filter(|r| match self.y_max {
                Some(max) => r.bbox.y_top <= max,
                None => true,
            })
            .filter(|r| ordered_between(&rule_section(r), after, before))
            .collect();
        found.sort_by(|a, b| reading_order(&rule_section(a), &rule_section(b)));
        found
    }

    pub fn find_sections(
        &self,
        index: &dyn LayoutIndex,
        page: Option<usize>,
        after: Option<&Section>,
        before: Option<&Section>,
    ) -> Vec<Section> {
        self.find_rules(index, page, after, before)
            .iter()
            .map(rule_section)
            .collect()
    }

    pub fn require_one(
        &self,
        index: &dyn LayoutIndex,
        page: Option<usize>,
        after: Option<&Section>,
        before: Option<&Section>,
    ) -> Result<Section, ScrapeError> {
        let found = self.find_sections(index, page, after, before);
        found.first().copied().ok_or_else(|| {
            ScrapeError::Template(format!(
                "no horizontal rule in x [{}, {}] with thickness [{}, {}]",
                self.x_left, self.x_right, self.thickness_min, self.thickness_max
            ))
        })
    }
}

/// Vertical counterpart: rules inside a y window, filtered by minimum
/// height and a thickness band.
#[derive(Debug, Clone)]
pub struct VRuleFinder {
    y_top: f64,
    y_bottom: f64,
    span_min: f64,
    thickness_min: f64,
    thickness_max: f64,
}

impl VRuleFinder {
    pub fn new(y_top: f64, y_bottom: f64, span_min: f64) -> Self {
        VRuleFinder {
            y_top,
            y_bottom,
            span_min,
            thickness_min: 0.0,
            thickness_max: f64::INFINITY,
        }
    }

    pub fn with_thickness(mut self, min: f64, max: f64) -> Self {
        self.thickness_min = min;
        self.thickness_max = max;
        self
    }

    pub fn find_rules(&self, index: &dyn LayoutIndex, page: Option<usize>) -> Vec<RulePrim> {
        let mut found: Vec<RulePrim> = index
            .rules(page, None)
            .into_iter()
            .filter(|r| r.orientation == Orientation::Vertical)
            .filter(|r| {
                r.bbox.y_bottom >= self.y_bottom - 0.01 && r.bbox.y_top <= self.y_top + 0.01
            })
            .filter(|r| r.span() >= self.span_min)
            .filter(|r| r.thickness >= self.thickness_min && r.thickness <= self.thickness_max)
            .collect();
        found.sort_by(|a, b| {
            a.bbox
                .x_left
                .partial_cmp(&b.bbox.x_left)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        found
    }

    /// Deduplicated, ascending x origins of the matching rules.
    pub fn find_x_positions(&self, index: &dyn LayoutIndex, page: Option<usize>) -> Vec<f64> {
        let mut xs: Vec<f64> = self
            .find_rules(index, page)
            .iter()
            .map(|r| r.bbox.x_left)
            .collect();
        dedup_sorted(&mut xs);
        xs
    }
}

fn rule_section(rule: &RulePrim) -> Section {
    Section::from_bbox(rule.page, &rule.bbox)
}

fn ordered_between(s: &Section, after: Option<&Section>, before: Option<&Section>) -> bool {
    if let Some(a) = after {
        if !is_after(s, a) {
            return false;
        }
    }
    if let Some(b) = before {
        if !is_before(s, b) {
            return false;
        }
    }
    true
}

/// Sort ascending and drop positions closer than 0.1 unit.
pub fn dedup_sorted(xs: &mut Vec<f64>) {
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    xs.dedup_by(|a, b| (*a - *b).abs() < 0.1);
}

/// The original placeholder query: exactly one text line fully inside the
/// given box. Zero or several lines means the layout is not the one this
/// profile expects.
pub fn text_in_box(
    index: &dyn LayoutIndex,
    page: usize,
    bbox: &BBox,
) -> Result<String, ScrapeError> {
    let runs = index.text_runs(Some(page), Some(bbox));
    match runs.len() {
        0 => Err(ScrapeError::Template(format!(
            "no text in placeholder box ({}, {}, {}, {}) on page {}",
            bbox.x_left, bbox.y_bottom, bbox.x_right, bbox.y_top, page
        ))),
        1 => Ok(runs[0].text.trim().to_string()),
        n => Err(ScrapeError::Template(format!(
            "several ({n}) text lines in placeholder box on page {page}"
        ))),
    }
}
