use std::path::PathBuf;

use releve_core::error::ScrapeError;

use crate::output;

pub fn run(
    input_file: PathBuf,
    output_format: &str,
    output_file: Option<PathBuf>,
) -> Result<(), ScrapeError> {
    let statement = releve_core::process(&input_file)?;

    match output_file {
        Some(path) => {
            std::fs::write(&path, statement.to_json_pretty()?)?;
            eprintln!(
                "{} entries for {}, written to {}",
                statement.entries.len(),
                statement.main_account,
                path.display()
            );
        }
        None => match output_format {
            "json" => output::json::print(&statement)?,
            _ => output::table::print(&statement),
        },
    }

    Ok(())
}
