use std::path::Path;
use std::process::Command;

use log::debug;
use lopdf::content::Content;
use lopdf::{Document, Object};

use crate::error::ScrapeError;
use crate::geometry::{BBox, Orientation};
use crate::index::{rule_matches, run_matches, LayoutIndex, RulePrim, TextRun};

/// Layout index backed by poppler's `pdftotext -bbox-layout` for text line
/// geometry and a `lopdf` content-stream scan for line/rectangle primitives.
///
/// Both sources are loaded once; queries are in-memory filters. All
/// coordinates are normalized to PDF orientation (y grows upward).
pub struct PopplerIndex {
    pages: Vec<(f64, f64)>,
    runs: Vec<TextRun>,
    rules: Vec<RulePrim>,
}

impl PopplerIndex {
    pub fn load(path: &Path) -> Result<Self, ScrapeError> {
        let xml = run_pdftotext_bbox(path)?;
        let (pages, runs) = parse_bbox_layout(&xml);
        let rules = scan_rules(path)?;
        debug!(
            "loaded layout index: {} pages, {} text lines, {} rules",
            pages.len(),
            runs.len(),
            rules.len()
        );
        Ok(PopplerIndex { pages, runs, rules })
    }
}

impl LayoutIndex for PopplerIndex {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, page: usize) -> Result<(f64, f64), ScrapeError> {
        self.pages
            .get(page.wrapping_sub(1))
            .copied()
            .ok_or_else(|| ScrapeError::Template(format!("page {page} out of range")))
    }

    fn text_runs(&self, page: Option<usize>, clip: Option<&BBox>) -> Vec<TextRun> {
        self.runs
            .iter()
            .filter(|r| run_matches(r, page, clip))
            .cloned()
            .collect()
    }

    fn rules(&self, page: Option<usize>, clip: Option<&BBox>) -> Vec<RulePrim> {
        self.rules
            .iter()
            .filter(|r| rule_matches(r, page, clip))
            .cloned()
            .collect()
    }
}

fn run_pdftotext_bbox(path: &Path) -> Result<String, ScrapeError> {
    let output = Command::new("pdftotext")
        .arg("-bbox-layout")
        .arg(path)
        .arg("-")
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScrapeError::PdftotextNotFound
            } else {
                ScrapeError::Io(e)
            }
        })?;

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(ScrapeError::PdftotextFailed { code, stderr });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Parse the -bbox-layout XML into page sizes and line-level text runs.
///
/// Word boxes are joined per `<line>` element, matching the granularity of
/// text-line queries. Poppler reports y from the top edge; spans are
/// flipped to PDF orientation here.
fn parse_bbox_layout(xml: &str) -> (Vec<(f64, f64)>, Vec<TextRun>) {
    let mut pages: Vec<(f64, f64)> = Vec::new();
    let mut runs: Vec<TextRun> = Vec::new();

    let mut line_box: Option<(f64, f64, f64, f64)> = None;
    let mut words: Vec<String> = Vec::new();

    for raw in xml.lines() {
        let line = raw.trim();

        if line.starts_with("<page ") {
            let width = parse_attr_f64(line, "width").unwrap_or(0.0);
            let height = parse_attr_f64(line, "height").unwrap_or(0.0);
            pages.push((width, height));
            continue;
        }

        if line.starts_with("<line ") {
            line_box = parse_box_attrs(line);
            words.clear();
            continue;
        }

        if line.starts_with("<word ") {
            if let Some(text) = parse_word_text(line) {
                let w = decode_xml_entities(&text).trim().to_string();
                if !w.is_empty() {
                    words.push(w);
                }
            }
            continue;
        }

        if line.starts_with("</line>") {
            if let (Some((x_min, y_min, x_max, y_max)), false) = (line_box.take(), pages.is_empty())
            {
                let text = words.join(" ");
                let page = pages.len();
                let (_, page_height) = pages[page - 1];
                if !text.is_empty() {
                    runs.push(TextRun {
                        page,
                        bbox: BBox::new(x_min, page_height - y_max, x_max, page_height - y_min),
                        text,
                    });
                }
            }
            words.clear();
        }
    }

    (pages, runs)
}

fn parse_attr<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!("{}=\"", name);
    let start = tag.find(&needle)? + needle.len();
    let rest = &tag[start..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}

fn parse_attr_f64(tag: &str, name: &str) -> Option<f64> {
    parse_attr(tag, name)?.parse().ok()
}

fn parse_box_attrs(tag: &str) -> Option<(f64, f64, f64, f64)> {
    Some((
        parse_attr_f64(tag, "xMin")?,
        parse_attr_f64(tag, "yMin")?,
        parse_attr_f64(tag, "xMax")?,
        parse_attr_f64(tag, "yMax")?,
    ))
}

fn parse_word_text(word_tag: &str) -> Option<String> {
    let start = word_tag.find('>')? + 1;
    let end = word_tag.rfind("</word>")?;
    Some(word_tag[start..end].to_string())
}

fn decode_xml_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
}

/// Walk every page's content stream and collect stroked segments and thin
/// rectangles. Coordinates are taken untransformed; the supported statement
/// layouts draw their rules in unrotated page space.
fn scan_rules(path: &Path) -> Result<Vec<RulePrim>, ScrapeError> {
    let doc = Document::load(path)?;
    let mut rules: Vec<RulePrim> = Vec::new();

    for (page_no, page_id) in doc.get_pages() {
        let data = match doc.get_page_content(page_id) {
            Ok(d) => d,
            Err(_) => continue,
        };
        let content = match Content::decode(&data) {
            Ok(c) => c,
            Err(_) => continue,
        };

        let page = page_no as usize;
        let mut line_width = 1.0f64;
        let mut current: Option<(f64, f64)> = None;
        let mut segments: Vec<((f64, f64), (f64, f64))> = Vec::new();
        let mut rects: Vec<(f64, f64, f64, f64)> = Vec::new();

        for op in &content.operations {
            match op.operator.as_str() {
                "w" => {
                    if let Some(v) = num(op.operands.first()) {
                        line_width = v;
                    }
                }
                "m" => {
                    if let (Some(x), Some(y)) =
                        (num(op.operands.first()), num(op.operands.get(1)))
                    {
                        current = Some((x, y));
                    }
                }
                "l" => {
                    if let (Some(x), Some(y)) =
                        (num(op.operands.first()), num(op.operands.get(1)))
                    {
                        if let Some(from) = current {
                            segments.push((from, (x, y)));
                        }
                        current = Some((x, y));
                    }
                }
                "re" => {
                    if let (Some(x), Some(y), Some(w), Some(h)) = (
                        num(op.operands.first()),
                        num(op.operands.get(1)),
                        num(op.operands.get(2)),
                        num(op.operands.get(3)),
                    ) {
                        rects.push((x, y, w, h));
                    }
                }
                "S" | "s" | "B" | "B*" | "b" | "b*" => {
                    for (from, to) in segments.drain(..) {
                        if let Some(rule) = segment_rule(page, from, to, line_width) {
                            rules.push(rule);
                        }
                    }
                    for rect in rects.drain(..) {
                        rules.push(rect_rule(page, rect));
                    }
                    current = None;
                }
                "f" | "F" | "f*" => {
                    segments.clear();
                    for rect in rects.drain(..) {
                        rules.push(rect_rule(page, rect));
                    }
                    current = None;
                }
                "n" => {
                    segments.clear();
                    rects.clear();
                    current = None;
                }
                _ => {}
            }
        }
    }

    Ok(rules)
}

fn num(obj: Option<&Object>) -> Option<f64> {
    match obj {
        Some(Object::Integer(i)) => Some(*i as f64),
        Some(Object::Real(r)) => Some(*r as f64),
        _ => None,
    }
}

fn segment_rule(page: usize, from: (f64, f64), to: (f64, f64), width: f64) -> Option<RulePrim> {
    const AXIS_EPS: f64 = 0.5;
    let (x0, y0) = from;
    let (x1, y1) = to;
    if (y1 - y0).abs() <= AXIS_EPS {
        let y = (y0 + y1) / 2.0;
        Some(RulePrim {
            page,
            bbox: BBox::new(x0.min(x1), y, x0.max(x1), y),
            thickness: width,
            orientation: Orientation::Horizontal,
        })
    } else if (x1 - x0).abs() <= AXIS_EPS {
        let x = (x0 + x1) / 2.0;
        Some(RulePrim {
            page,
            bbox: BBox::new(x, y0.min(y1), x, y0.max(y1)),
            thickness: width,
            orientation: Orientation::Vertical,
        })
    } else {
        None
    }
}

fn rect_rule(page: usize, rect: (f64, f64, f64, f64)) -> RulePrim {
    let (x, y, w, h) = rect;
    let x_left = x.min(x + w);
    let y_bottom = y.min(y + h);
    let orientation = if w.abs() >= h.abs() {
        Orientation::Horizontal
    } else {
        Orientation::Vertical
    };
    RulePrim {
        page,
        bbox: BBox::new(x_left, y_bottom, x_left + w.abs(), y_bottom + h.abs()),
        thickness: w.abs().min(h.abs()),
        orientation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bbox_layout_flips_y() {
        let xml = r#"
<doc>
  <page width="595.0" height="842.0">
    <line xMin="10.0" yMin="20.0" xMax="80.0" yMax="30.0">
      <word xMin="10.0" yMin="20.0" xMax="40.0" yMax="30.0">B/F</word>
      <word xMin="42.0" yMin="20.0" xMax="80.0" yMax="30.0">BALANCE</word>
    </line>
  </page>
</doc>
"#;
        let (pages, runs) = parse_bbox_layout(xml);
        assert_eq!(pages, vec![(595.0, 842.0)]);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "B/F BALANCE");
        assert_eq!(runs[0].page, 1);
        assert_eq!(runs[0].bbox.y_top, 842.0 - 20.0);
        assert_eq!(runs[0].bbox.y_bottom, 842.0 - 30.0);
    }

    #[test]
    fn test_segment_rule_orientation() {
        let h = segment_rule(1, (0.0, 100.0), (500.0, 100.0), 13.0).unwrap();
        assert_eq!(h.orientation, Orientation::Horizontal);
        assert_eq!(h.thickness, 13.0);
        assert_eq!(h.span(), 500.0);

        let v = segment_rule(1, (50.0, 10.0), (50.0, 90.0), 0.5).unwrap();
        assert_eq!(v.orientation, Orientation::Vertical);
        assert_eq!(v.span(), 80.0);

        assert!(segment_rule(1, (0.0, 0.0), (10.0, 10.0), 1.0).is_none());
    }

    #[test]
    fn test_rect_rule_thickness_is_short_side() {
        let r = rect_rule(1, (40.0, 120.0, 520.0, 1.2));
        assert_eq!(r.orientation, Orientation::Horizontal);
        assert!((r.thickness - 1.2).abs() < 1e-9);
    }
}
