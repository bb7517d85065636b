pub mod banks;
pub mod check;
pub mod error;
pub mod geometry;
pub mod index;
pub mod locate;
pub mod model;
pub mod parsing;
pub mod profile;
pub mod repair;
pub mod zone;

use std::path::Path;

use error::ScrapeError;
use index::grid::TextGrid;
use index::poppler::PopplerIndex;
use index::{GridSource, LayoutIndex};
use model::Statement;
use profile::LayoutProfile;

/// Main API entry point: extract one statement from a PDF file.
///
/// Loads the bundled layout backend, probes the registered bank/type
/// profiles, and runs the matching pipeline start to finish. When the
/// selected profile flags the bank's files as carrying trailing garbage, a
/// repaired copy feeds the table extraction while anchor queries keep
/// using the original document; the copy is released when processing ends,
/// whatever the outcome.
pub fn process(path: &Path) -> Result<Statement, ScrapeError> {
    if !path.is_file() {
        return Err(ScrapeError::NotAFile(path.to_path_buf()));
    }
    let index = PopplerIndex::load(path)?;
    let profiles = banks::registry();
    let profile = banks::probe(&index, &profiles).ok_or_else(|| ScrapeError::Unrecognized {
        path: path.to_path_buf(),
    })?;

    let source = path.display().to_string();
    if profile.repair_trailing_bytes {
        let repaired = repair::truncate_after_eof(path)?;
        let grid_index = PopplerIndex::load(repaired.path())?;
        let grid = TextGrid::new(&grid_index);
        banks::run_profile(&source, &index, &grid, profile)
    } else {
        let grid = TextGrid::new(&index);
        banks::run_profile(&source, &index, &grid, profile)
    }
}

/// Probe-and-run against caller-provided layout/grid backends. This is the
/// seam integration tests use with mock implementations.
pub fn process_document(
    source_path: &str,
    index: &dyn LayoutIndex,
    grid: &dyn GridSource,
    profiles: &[LayoutProfile],
) -> Result<Statement, ScrapeError> {
    let profile = banks::probe(index, profiles).ok_or_else(|| ScrapeError::Unrecognized {
        path: source_path.into(),
    })?;
    banks::run_profile(source_path, index, grid, profile)
}

/// Which profile a document matches, without extracting anything.
pub fn probe_document(
    index: &dyn LayoutIndex,
    profiles: &[LayoutProfile],
) -> Option<(&'static str, model::StatementType)> {
    banks::probe(index, profiles).map(|p| (p.bank, p.statement_type))
}
