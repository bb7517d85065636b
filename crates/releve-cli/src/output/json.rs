use releve_core::error::ScrapeError;
use releve_core::model::Statement;

pub fn print(statement: &Statement) -> Result<(), ScrapeError> {
    println!("{}", statement.to_json_pretty()?);
    Ok(())
}
