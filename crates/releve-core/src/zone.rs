use log::debug;

use crate::error::ScrapeError;
use crate::geometry::{BBox, Orientation, Section};
use crate::index::{GridSource, LayoutIndex};
use crate::locate::dedup_sorted;

/// Header divider rules are drawn much thicker than row separators; this
/// threshold tells them apart.
const THICK_DIVIDER: f64 = 10.0;

/// Column separators are hairlines.
const THIN_SEPARATOR: f64 = 1.0;

/// Fixed letterhead margins for continuation pages of a multi-page table.
#[derive(Debug, Clone, Copy)]
pub struct Margins {
    pub top: f64,
    pub bottom: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Margins {
            top: 690.0,
            bottom: 69.0,
        }
    }
}

/// The part of a zone confined to a single page.
#[derive(Debug, Clone, Copy)]
pub struct Chunk {
    pub page: usize,
    pub y_top: f64,
    pub y_bottom: f64,
}

/// A located, possibly multi-page rectangular region holding one logical
/// table. Column positions are inferred once from the first chunk's header
/// and shared by every chunk (the format is constant throughout a table).
#[derive(Debug, Clone)]
pub struct Zone {
    pub chunks: Vec<Chunk>,
    pub columns: Vec<f64>,
}

impl Zone {
    /// Partition the space between `begin` (start of data) and `end` (first
    /// element past the table) into per-page chunks.
    ///
    /// Continuation pages span the fixed top/bottom margins so the repeated
    /// running header and footer are excluded. A final chunk is emitted only
    /// when the end anchor sits below the top margin; an end anchor at the
    /// very top of its page would produce a degenerate empty chunk.
    pub fn build(begin: &Section, end: &Section, margins: &Margins) -> Zone {
        let mut chunks = Vec::new();
        if begin.page == end.page {
            chunks.push(Chunk {
                page: begin.page,
                y_top: begin.y_bottom,
                y_bottom: end.y_top,
            });
        } else {
            chunks.push(Chunk {
                page: begin.page,
                y_top: begin.y_bottom,
                y_bottom: margins.bottom,
            });
            for page in begin.page + 1..end.page {
                chunks.push(Chunk {
                    page,
                    y_top: margins.top,
                    y_bottom: margins.bottom,
                });
            }
            if end.y_top < margins.top {
                chunks.push(Chunk {
                    page: end.page,
                    y_top: margins.top,
                    y_bottom: end.y_top,
                });
            }
        }
        debug!("zone built with {} chunk(s)", chunks.len());
        Zone {
            chunks,
            columns: Vec::new(),
        }
    }

    /// Find each chunk's header divider and infer the shared column list.
    ///
    /// Every chunk repeats the table header, bounded below by one thick
    /// horizontal rule; the chunk's top is pulled down to that rule so the
    /// header band itself stays out of the extracted data. The column
    /// separators are the thin vertical rules crossing the divider band of
    /// the first chunk; interior positions only (the extractor derives the
    /// outer extents from the zone's bounding box).
    pub fn locate_header(
        &mut self,
        index: &dyn LayoutIndex,
        page_width: f64,
    ) -> Result<(), ScrapeError> {
        for i in 0..self.chunks.len() {
            let chunk = self.chunks[i];
            let area = BBox::new(0.0, chunk.y_bottom, page_width, chunk.y_top);
            let divider = index
                .rules(Some(chunk.page), Some(&area))
                .into_iter()
                .filter(|r| r.orientation == Orientation::Horizontal)
                .find(|r| r.thickness > THICK_DIVIDER)
                .ok_or_else(|| {
                    ScrapeError::Template(format!(
                        "could not find the table header divider on page {} in ({}, {}, {}, {})",
                        chunk.page, area.x_left, area.y_bottom, area.x_right, area.y_top
                    ))
                })?;

            let upper = divider.bbox.y_bottom + divider.thickness / 2.0 + 1.0;
            let lower = divider.bbox.y_bottom - divider.thickness / 2.0 - 1.0;
            self.chunks[i].y_top = upper;

            if self.columns.is_empty() {
                let band = BBox::new(0.0, lower, page_width, upper);
                let mut xs: Vec<f64> = index
                    .rules(Some(chunk.page), Some(&band))
                    .into_iter()
                    .filter(|r| r.orientation == Orientation::Vertical)
                    .filter(|r| r.thickness < THIN_SEPARATOR)
                    .map(|r| r.bbox.x_left)
                    .collect();
                if xs.is_empty() {
                    return Err(ScrapeError::Template(format!(
                        "could not find the column separators of the table header on page {}",
                        chunk.page
                    )));
                }
                dedup_sorted(&mut xs);
                // Keep interior separators only.
                xs.retain(|x| *x > 0.5 && *x < page_width - 0.5);
                debug!("found {} column separator(s): {:?}", xs.len(), xs);
                self.columns = xs;
            }
        }
        Ok(())
    }

    /// Pull each chunk's grid and concatenate them in page order, dropping
    /// each chunk's first row (the header echo left above the divider
    /// tolerance).
    pub fn extract(
        &self,
        grid: &dyn GridSource,
        page_width: f64,
    ) -> Result<Vec<Vec<String>>, ScrapeError> {
        let mut table: Vec<Vec<String>> = Vec::new();
        for chunk in &self.chunks {
            let area = BBox::new(0.0, chunk.y_bottom, page_width, chunk.y_top);
            let rows = grid.grid(chunk.page, &area, &self.columns)?;
            debug!(
                "chunk page {} produced {} row(s) ({} kept)",
                chunk.page,
                rows.len(),
                rows.len().saturating_sub(1)
            );
            table.extend(rows.into_iter().skip(1));
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn margins() -> Margins {
        Margins::default()
    }

    #[test]
    fn test_single_page_zone_is_one_chunk() {
        let begin = Section::new(2, 500.0, 490.0);
        let end = Section::new(2, 200.0, 190.0);
        let zone = Zone::build(&begin, &end, &margins());
        assert_eq!(zone.chunks.len(), 1);
        let c = zone.chunks[0];
        assert_eq!(c.page, 2);
        assert_eq!(c.y_top, 490.0);
        assert_eq!(c.y_bottom, 200.0);
    }

    #[test]
    fn test_multi_page_zone_partitions_with_margins() {
        let begin = Section::new(1, 500.0, 490.0);
        let end = Section::new(3, 300.0, 290.0);
        let zone = Zone::build(&begin, &end, &margins());
        assert_eq!(zone.chunks.len(), 3);

        assert_eq!(zone.chunks[0].page, 1);
        assert_eq!(zone.chunks[0].y_top, 490.0);
        assert_eq!(zone.chunks[0].y_bottom, 69.0);

        assert_eq!(zone.chunks[1].page, 2);
        assert_eq!(zone.chunks[1].y_top, 690.0);
        assert_eq!(zone.chunks[1].y_bottom, 69.0);

        assert_eq!(zone.chunks[2].page, 3);
        assert_eq!(zone.chunks[2].y_top, 690.0);
        assert_eq!(zone.chunks[2].y_bottom, 300.0);
    }

    #[test]
    fn test_end_anchor_at_page_top_elides_final_chunk() {
        let begin = Section::new(1, 500.0, 490.0);
        let end = Section::new(2, 700.0, 695.0);
        let zone = Zone::build(&begin, &end, &margins());
        // End anchor sits above the top margin: page 2 holds no table data.
        assert_eq!(zone.chunks.len(), 1);
        assert_eq!(zone.chunks[0].page, 1);
    }

    #[test]
    fn test_chunks_never_overlap_or_skip() {
        let begin = Section::new(1, 500.0, 490.0);
        let end = Section::new(4, 100.0, 90.0);
        let zone = Zone::build(&begin, &end, &margins());
        assert_eq!(zone.chunks.len(), 4);
        for pair in zone.chunks.windows(2) {
            assert_eq!(pair[0].page + 1, pair[1].page);
        }
        for c in &zone.chunks {
            assert!(c.y_top >= c.y_bottom);
        }
    }
}
