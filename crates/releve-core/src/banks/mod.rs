pub mod common;
pub mod hsbcfr;
pub mod hsbchk;
pub mod socgen;

use log::debug;

use crate::error::ScrapeError;
use crate::index::{GridSource, LayoutIndex};
use crate::model::Statement;
use crate::profile::{LayoutProfile, Pipeline, TextAnchor};

/// Every registered profile, in probe order.
pub fn registry() -> Vec<LayoutProfile> {
    vec![
        hsbchk::profile(),
        hsbcfr::bank_profile(),
        hsbcfr::card_profile(),
        socgen::bank_profile(),
        socgen::card_profile(),
    ]
}

/// The first profile whose bank and type signatures all match.
pub fn probe<'a>(
    index: &dyn LayoutIndex,
    profiles: &'a [LayoutProfile],
) -> Option<&'a LayoutProfile> {
    for profile in profiles {
        if signatures_match(index, &profile.bank_signature)
            && signatures_match(index, &profile.type_signature)
        {
            debug!(
                "document matches {}.{}",
                profile.bank, profile.statement_type
            );
            return Some(profile);
        }
        debug!(
            "document does not match {}.{}",
            profile.bank, profile.statement_type
        );
    }
    None
}

fn signatures_match(index: &dyn LayoutIndex, anchors: &[TextAnchor]) -> bool {
    anchors
        .iter()
        .all(|a| !a.finder().find_all(index, None, None).is_empty())
}

/// Run the selected profile's pipeline over the document.
pub fn run_profile(
    source_path: &str,
    index: &dyn LayoutIndex,
    grid: &dyn GridSource,
    profile: &LayoutProfile,
) -> Result<Statement, ScrapeError> {
    match &profile.pipeline {
        Pipeline::MultiZone(spec) => hsbchk::run(source_path, index, grid, profile, spec),
        Pipeline::SingleTable(spec) => common::run(source_path, index, grid, profile, spec),
    }
}
