use std::path::PathBuf;

use releve_core::banks;
use releve_core::error::ScrapeError;
use releve_core::index::poppler::PopplerIndex;

pub fn run(input_file: PathBuf) -> Result<(), ScrapeError> {
    if !input_file.is_file() {
        return Err(ScrapeError::NotAFile(input_file));
    }
    let index = PopplerIndex::load(&input_file)?;
    let profiles = banks::registry();
    match releve_core::probe_document(&index, &profiles) {
        Some((bank, statement_type)) => {
            println!("{bank} {statement_type}");
            Ok(())
        }
        None => Err(ScrapeError::Unrecognized { path: input_file }),
    }
}
