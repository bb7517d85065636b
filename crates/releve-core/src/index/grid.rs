use crate::error::ScrapeError;
use crate::geometry::BBox;
use crate::index::{GridSource, LayoutIndex, TextRun};

/// Stream-flavor cell extraction over a `LayoutIndex`.
///
/// Text runs inside the requested area are clustered into rows by vertical
/// midpoint, then each run is binned into the column whose x-boundaries
/// contain its horizontal midpoint. Boundaries are the area's own left/right
/// edges plus the interior column positions, so callers pass separators
/// only.
pub struct TextGrid<'a> {
    index: &'a dyn LayoutIndex,
    row_tol: f64,
}

impl<'a> TextGrid<'a> {
    pub fn new(index: &'a dyn LayoutIndex) -> Self {
        TextGrid {
            index,
            row_tol: 3.0,
        }
    }

    pub fn with_row_tol(mut self, row_tol: f64) -> Self {
        self.row_tol = row_tol;
        self
    }
}

impl GridSource for TextGrid<'_> {
    fn grid(
        &self,
        page: usize,
        area: &BBox,
        columns: &[f64],
    ) -> Result<Vec<Vec<String>>, ScrapeError> {
        let mut runs = self.index.text_runs(Some(page), Some(area));
        if runs.is_empty() {
            return Ok(Vec::new());
        }

        // Top of page first.
        runs.sort_by(|a, b| {
            mid_y(b)
                .partial_cmp(&mid_y(a))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut boundaries = Vec::with_capacity(columns.len() + 2);
        boundaries.push(area.x_left);
        boundaries.extend_from_slice(columns);
        boundaries.push(area.x_right);

        let ncols = boundaries.len() - 1;
        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut anchor_y = f64::INFINITY;

        for run in &runs {
            let y = mid_y(run);
            if (anchor_y - y).abs() > self.row_tol {
                rows.push(vec![String::new(); ncols]);
                anchor_y = y;
            }
            let x = run.bbox.x_left + run.bbox.width() / 2.0;
            let col = column_of(&boundaries, x);
            let row = rows.last_mut().expect("row pushed above");
            let cell = &mut row[col];
            if !cell.is_empty() {
                cell.push(' ');
            }
            cell.push_str(run.text.trim());
        }

        Ok(rows)
    }
}

fn mid_y(run: &TextRun) -> f64 {
    run.bbox.y_bottom + run.bbox.height() / 2.0
}

fn column_of(boundaries: &[f64], x: f64) -> usize {
    let ncols = boundaries.len() - 1;
    for i in 1..boundaries.len() - 1 {
        if x < boundaries[i] {
            return i - 1;
        }
    }
    ncols - 1
}
